use std::path::Path;

use anyhow::bail;
use bio::io::fasta::{Reader, Record};
use log::info;

use crate::alphabets::protein_alphabet;
use crate::errors::PhyloError;
use crate::Result;

/// Reads sequences from a fasta file, returning a vector of fasta records.
/// All sequences are converted to uppercase.
///
/// Fails with `InvalidInput` for malformed records, characters outside the DNA and protein
/// alphabets, or a file without sequences.
///
/// # Example
/// ```
/// use std::io::Write;
/// use phyloml::io::read_sequences;
/// let mut file = tempfile::NamedTempFile::new().unwrap();
/// writeln!(file, ">a\nacgt\n>b\nAGT").unwrap();
/// let records = read_sequences(file.path()).unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].seq(), b"ACGT");
/// ```
pub fn read_sequences(path: &Path) -> Result<Vec<Record>> {
    info!("Reading sequences from file {}", path.display());
    let reader = Reader::from_file(path)?;
    let alphabet = protein_alphabet();
    let mut sequences = Vec::new();

    for result in reader.records() {
        let rec = result?;
        if let Err(e) = rec.check() {
            bail!(PhyloError::InvalidInput(e.to_string()));
        }
        let seq = rec.seq().to_ascii_uppercase();
        if !alphabet.is_word(&seq) {
            bail!(PhyloError::InvalidInput(format!(
                "Invalid genetic sequence encountered: {}",
                String::from_utf8_lossy(&seq)
            )));
        }
        sequences.push(Record::with_attrs(rec.id(), rec.desc(), &seq));
    }
    if sequences.is_empty() {
        bail!(PhyloError::InvalidInput(
            "No sequences found in file".to_string()
        ));
    }

    info!("Read {} sequences successfully", sequences.len());
    Ok(sequences)
}

#[cfg(test)]
mod tests;
