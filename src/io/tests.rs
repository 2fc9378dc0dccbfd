use std::io::Write;
use std::path::PathBuf;

use assert_matches::assert_matches;
use rstest::*;
use tempfile::NamedTempFile;

use crate::errors::PhyloError;
use crate::io::read_sequences;

fn fasta_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn reading_correct_fasta() {
    let file = fasta_file(">seq1 first\nACGTA\n>seq2\nacg\ntt\n>seq3\nMKVL\n");
    let sequences = read_sequences(file.path()).unwrap();
    assert_eq!(sequences.len(), 3);
    assert_eq!(sequences[0].id(), "seq1");
    assert_eq!(sequences[0].desc(), Some("first"));
    assert_eq!(sequences[1].seq(), b"ACGTT");
    assert_eq!(sequences[2].seq(), b"MKVL");
}

#[rstest]
#[case::empty_name(">\nACGT\n", "Expecting id")]
#[case::weird_chars(">a\nAC!T\n", "Invalid genetic sequence")]
#[case::no_sequences("", "No sequences found")]
fn reading_incorrect_fasta(#[case] content: &str, #[case] exp_error: &str) {
    let file = fasta_file(content);
    let err = read_sequences(file.path()).unwrap_err();
    assert!(err.to_string().contains(exp_error), "{}", err);
}

#[test]
fn invalid_characters_are_invalid_input() {
    let file = fasta_file(">a\nAC!T\n");
    let err = read_sequences(file.path()).unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidInput(_))
    );
}

#[test]
fn reading_nonexistent_fasta() {
    assert!(read_sequences(&PathBuf::from("./data/sequences_nonexistent.fasta")).is_err());
}
