use approx::assert_relative_eq;
use assert_matches::assert_matches;

use crate::alignment::{Alignment, PairwiseAlignment};
use crate::alphabets::{codon_alphabet, dna_alphabet, protein_alphabet};
use crate::errors::PhyloError;

#[test]
fn alignment_uppercases_and_counts_columns() {
    let msa = Alignment::new(
        vec![
            record_wo_desc!("a", b"acgt-"),
            record_wo_desc!("b", b"ACGTN"),
        ],
        dna_alphabet(),
    )
    .unwrap();
    assert_eq!(msa.len(), 2);
    assert_eq!(msa.msa_len(), 5);
    assert_eq!(msa.record("a").unwrap().seq(), b"ACGT-");
    assert_eq!(msa.column(4), vec![&b"-"[..], &b"N"[..]]);
    assert_eq!(msa.columns().count(), 5);
    assert_eq!(msa.ids(), vec!["a", "b"]);
}

#[test]
fn codon_alignment_columns() {
    let msa = Alignment::new(
        vec![
            record_wo_desc!("a", b"ATGAAA"),
            record_wo_desc!("b", b"ATG---"),
        ],
        codon_alphabet(),
    )
    .unwrap();
    assert_eq!(msa.msa_len(), 2);
    assert_eq!(msa.column(1), vec![&b"AAA"[..], &b"---"[..]]);
}

#[test]
fn unequal_lengths_rejected() {
    let err = Alignment::new(
        vec![record_wo_desc!("a", b"ACGT"), record_wo_desc!("b", b"ACG")],
        dna_alphabet(),
    )
    .unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidInput(_))
    );
}

#[test]
fn duplicate_ids_rejected() {
    assert!(Alignment::new(
        vec![record_wo_desc!("a", b"ACGT"), record_wo_desc!("a", b"ACGA")],
        dna_alphabet(),
    )
    .is_err());
}

#[test]
fn foreign_characters_rejected() {
    assert!(Alignment::new(vec![record_wo_desc!("a", b"MKLV")], dna_alphabet()).is_err());
    assert!(Alignment::new(vec![record_wo_desc!("a", b"MKLV")], protein_alphabet()).is_ok());
    assert!(Alignment::new(vec![record_wo_desc!("a", b"ATGA")], codon_alphabet()).is_err());
}

#[test]
fn alphabet_detection() {
    let msa = Alignment::from_records(vec![record_wo_desc!("a", b"MKLV")]).unwrap();
    assert_eq!(*msa.alphabet(), protein_alphabet());
}

#[test]
fn empirical_freqs_count_ambiguity() {
    let msa = Alignment::new(
        vec![
            record_wo_desc!("a", b"AAC-"),
            record_wo_desc!("b", b"AGCN"),
        ],
        dna_alphabet(),
    )
    .unwrap();
    // T C A G: N adds a quarter to each, T is only seen through N.
    let counts = [0.25, 2.25, 3.25, 1.25];
    let total: f64 = counts.iter().sum();
    let freqs = msa.empirical_freqs();
    for (f, c) in freqs.iter().zip(counts.iter()) {
        assert_relative_eq!(*f, c / total, epsilon = 1e-12);
    }
}

#[test]
fn empirical_freqs_fill_unseen_states() {
    let msa = Alignment::new(vec![record_wo_desc!("a", b"AAAA")], dna_alphabet()).unwrap();
    let freqs = msa.empirical_freqs();
    assert_relative_eq!(freqs[2], 4.0 / 7.0, epsilon = 1e-12);
    assert_relative_eq!(freqs[0], 1.0 / 7.0, epsilon = 1e-12);
}

#[test]
fn pairwise_alignment_to_msa() {
    let x = record_wo_desc!("x", b"ACGT");
    let y = record_wo_desc!("y", b"AGT");
    let pairwise = PairwiseAlignment::new(align!(b"0123"), align!(b"0-12"), 5.0);
    assert_eq!(pairwise.len(), 4);
    assert_eq!(pairwise.gaps(), 1);
    let msa = pairwise.to_alignment(&x, &y, dna_alphabet()).unwrap();
    assert_eq!(msa.record("x").unwrap().seq(), b"ACGT");
    assert_eq!(msa.record("y").unwrap().seq(), b"A-GT");
}

#[test]
fn pairwise_codon_gaps() {
    let pairwise = PairwiseAlignment::new(align!(b"01"), align!(b"-0"), 0.0);
    let (x, y) = pairwise.gapped_sequences(b"ATGAAA", b"AAA", 3);
    assert_eq!(x, b"ATGAAA");
    assert_eq!(y, b"---AAA");
}
