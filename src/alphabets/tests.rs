use approx::assert_relative_eq;
use assert_matches::assert_matches;
use rstest::*;

use crate::alphabets::{
    codon_alphabet, detect_alphabet, dna_alphabet as dna, protein_alphabet as prot, translate,
    AlphabetType, MissingData, SENSE_CODONS,
};
use crate::errors::PhyloError;
use crate::frequencies;
use crate::substitution_models::FreqVector;

#[test]
fn dna_type_test() {
    let seqs = vec![
        record_wo_desc!("a", b"ACGTN-"),
        record_wo_desc!("b", b"acgtry"),
    ];
    assert_eq!(detect_alphabet(&seqs), dna());
    assert!(format!("{}", dna()).contains("DNA"));
}

#[test]
fn protein_type_test() {
    let seqs = vec![
        record_wo_desc!("a", b"ACGT"),
        record_wo_desc!("b", b"MKLEQ"),
    ];
    assert_eq!(detect_alphabet(&seqs), prot());
    assert!(format!("{}", prot()).contains("protein"));
}

#[rstest]
#[case::thymine(b'T', 0)]
#[case::cytosine(b'c', 1)]
#[case::adenine(b'A', 2)]
#[case::guanine(b'g', 3)]
fn dna_index(#[case] char: u8, #[case] expected: usize) {
    assert_eq!(dna().index(&[char]), Some(expected));
    assert_eq!(dna().state(expected), vec![char.to_ascii_uppercase()]);
}

#[test]
fn dna_ambiguity_uniform_weights() {
    let encoding = dna().char_encoding(b"R").unwrap();
    assert_eq!(encoding, frequencies!(&[0.0, 0.0, 0.5, 0.5]));
    let encoding = dna().char_encoding(b"-").unwrap();
    assert_eq!(encoding, frequencies!(&[0.25; 4]));
    let encoding = dna().char_encoding(b"B").unwrap();
    assert_relative_eq!(encoding.sum(), 1.0);
    assert_eq!(encoding[2], 0.0);
}

#[test]
fn dna_ambiguity_marginalised() {
    let alphabet = dna().with_missing_data(MissingData::Marginalise);
    assert_eq!(
        alphabet.char_encoding(b"N").unwrap(),
        frequencies!(&[1.0; 4])
    );
    assert_eq!(
        alphabet.char_encoding(b"Y").unwrap(),
        frequencies!(&[1.0, 1.0, 0.0, 0.0])
    );
    assert_eq!(
        alphabet.char_encoding(b"A").unwrap(),
        dna().char_encoding(b"A").unwrap()
    );
}

#[test]
fn unknown_character_rejected() {
    let err = dna().char_encoding(b"*").unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidInput(_))
    );
    assert!(prot().char_encoding(b"O").is_err());
}

#[test]
fn protein_ambiguity() {
    let encoding = prot().char_encoding(b"B").unwrap();
    assert_eq!(encoding.iter().filter(|&&x| x > 0.0).count(), 2);
    assert_relative_eq!(encoding[prot().index(b"D").unwrap()], 0.5);
    assert_relative_eq!(encoding[prot().index(b"N").unwrap()], 0.5);
    assert_eq!(prot().char_encoding(b"X").unwrap().len(), 20);
}

#[test]
fn codon_alphabet_has_sense_codons() {
    let alphabet = codon_alphabet();
    assert_eq!(alphabet.n(), 61);
    assert_eq!(alphabet.motif_len(), 3);
    assert_eq!(alphabet.alphabet_type(), AlphabetType::Codon);
    assert_eq!(SENSE_CODONS[0], *b"TTT");
    assert_eq!(SENSE_CODONS[60], *b"GGG");
    assert_eq!(alphabet.index(b"TAA"), None);
    assert_eq!(alphabet.index(b"atg").map(|i| alphabet.state(i)), Some(b"ATG".to_vec()));
}

#[rstest]
#[case(b"ATG", b'M')]
#[case(b"TGG", b'W')]
#[case(b"TAG", b'*')]
#[case(b"GCC", b'A')]
fn standard_code(#[case] codon: &[u8], #[case] aa: u8) {
    assert_eq!(translate(codon), Some(aa));
}

#[test]
fn codon_encoding() {
    let alphabet = codon_alphabet();
    let encoding = alphabet.char_encoding(b"---").unwrap();
    assert_relative_eq!(encoding.sum(), 1.0, epsilon = 1e-12);
    assert_eq!(encoding.iter().filter(|&&x| x > 0.0).count(), 61);

    let encoding = alphabet.char_encoding(b"TTY").unwrap();
    assert_eq!(encoding.iter().filter(|&&x| x > 0.0).count(), 2);

    // TAR only matches stop codons
    assert!(alphabet.char_encoding(b"TAR").is_err());
    assert!(alphabet.char_encoding(b"AT").is_err());
}

#[test]
fn codon_words() {
    let alphabet = codon_alphabet();
    assert!(alphabet.is_word(b"ATGAAA---"));
    assert!(!alphabet.is_word(b"ATGAA"));
}

#[rstest]
#[case::dna(dna(), b"TCAGRYSWKMBDHVN?X".as_slice())]
#[case::protein(prot(), b"ARNDCQEGHILKMFPSTWYVBJZX?".as_slice())]
fn characters_include_missing_once(
    #[case] alphabet: crate::alphabets::Alphabet,
    #[case] expected: &[u8],
) {
    let chars = alphabet.characters();
    let mut sorted_chars = chars.clone();
    sorted_chars.sort();
    sorted_chars.dedup();
    assert_eq!(sorted_chars.len(), chars.len());
    assert_eq!(chars, expected);
    assert!(alphabet.is_word(b"N?-"));
}
