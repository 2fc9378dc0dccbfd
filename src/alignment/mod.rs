use anyhow::bail;
use bio::io::fasta::Record;
use log::warn;

use crate::alphabets::{detect_alphabet, Alphabet, GAP};
use crate::errors::PhyloError;
use crate::substitution_models::FreqVector;
use crate::Result;

pub type Mapping = Vec<Option<usize>>;

/// Multiple sequence alignment over a fixed alphabet.
///
/// All sequences are uppercased on construction and have the same length. A column is one motif
/// per sequence, one character for DNA and protein and three for codons.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    seqs: Vec<Record>,
    alphabet: Alphabet,
    msa_len: usize,
}

/// One motif per sequence at a given alignment position, in sequence order.
pub type AlignmentColumn<'a> = Vec<&'a [u8]>;

impl Alignment {
    /// Builds an alignment from gapped sequences.
    ///
    /// Fails with `InvalidInput` when ids repeat, lengths differ, or a sequence contains
    /// characters outside the alphabet.
    pub fn new(seqs: Vec<Record>, alphabet: Alphabet) -> Result<Self> {
        let seqs = seqs
            .into_iter()
            .map(|rec| Record::with_attrs(rec.id(), rec.desc(), &rec.seq().to_ascii_uppercase()))
            .collect::<Vec<_>>();
        let len = seqs.first().map_or(0, |rec| rec.seq().len());
        for (i, rec) in seqs.iter().enumerate() {
            if seqs[..i].iter().any(|other| other.id() == rec.id()) {
                bail!(PhyloError::InvalidInput(format!(
                    "Sequence id {} appears more than once",
                    rec.id()
                )));
            }
            if rec.seq().len() != len {
                bail!(PhyloError::InvalidInput(format!(
                    "Sequence {} has length {}, expected {}",
                    rec.id(),
                    rec.seq().len(),
                    len
                )));
            }
            if !alphabet.is_word(rec.seq()) {
                bail!(PhyloError::InvalidInput(format!(
                    "Sequence {} is not a {} sequence",
                    rec.id(),
                    alphabet
                )));
            }
        }
        Ok(Alignment {
            msa_len: len / alphabet.motif_len(),
            seqs,
            alphabet,
        })
    }

    /// Builds an alignment, guessing between DNA and protein.
    pub fn from_records(seqs: Vec<Record>) -> Result<Self> {
        let alphabet = detect_alphabet(&seqs);
        Self::new(seqs, alphabet)
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Number of columns.
    pub fn msa_len(&self) -> usize {
        self.msa_len
    }

    pub fn seqs(&self) -> &[Record] {
        &self.seqs
    }

    pub fn ids(&self) -> Vec<&str> {
        self.seqs.iter().map(|rec| rec.id()).collect()
    }

    pub fn record(&self, id: &str) -> Option<&Record> {
        self.seqs.iter().find(|rec| rec.id() == id)
    }

    /// Motifs of a sequence, one per column.
    pub fn motifs<'a>(&self, rec: &'a Record) -> impl Iterator<Item = &'a [u8]> {
        rec.seq().chunks(self.alphabet.motif_len())
    }

    pub fn column(&self, idx: usize) -> AlignmentColumn<'_> {
        let motif_len = self.alphabet.motif_len();
        self.seqs
            .iter()
            .map(|rec| &rec.seq()[idx * motif_len..(idx + 1) * motif_len])
            .collect()
    }

    pub fn columns(&self) -> impl Iterator<Item = AlignmentColumn<'_>> {
        (0..self.msa_len).map(move |idx| self.column(idx))
    }

    /// Returns the empirical frequencies of the states in the sequences.
    /// Ambiguous motifs contribute to all compatible states in equal parts, gaps are ignored.
    /// A state that never occurs is counted once so that no frequency is zero.
    ///
    /// # Example
    /// ```
    /// use phyloml::alignment::Alignment;
    /// use phyloml::alphabets::dna_alphabet;
    /// use bio::io::fasta::Record;
    /// let msa = Alignment::new(
    ///     vec![
    ///         Record::with_attrs("a", None, b"AAC-"),
    ///         Record::with_attrs("b", None, b"AGCN"),
    ///     ],
    ///     dna_alphabet(),
    /// )
    /// .unwrap();
    /// let freqs = msa.empirical_freqs();
    /// assert!((freqs.sum() - 1.0).abs() < 1e-12);
    /// ```
    pub fn empirical_freqs(&self) -> FreqVector {
        let mut freqs = self.alphabet.empty_freqs();
        for rec in &self.seqs {
            for motif in self.motifs(rec) {
                if self.alphabet.is_gap(motif) {
                    continue;
                }
                match self.alphabet.compatible_states(motif) {
                    Ok(states) => freqs += states.scale(1.0 / states.sum()),
                    Err(_) => warn!(
                        "Skipping motif {} in frequency counts",
                        String::from_utf8_lossy(motif)
                    ),
                }
            }
        }
        for freq in freqs.iter_mut() {
            if *freq == 0.0 {
                *freq = 1.0;
            }
        }
        let total = freqs.sum();
        freqs.scale(1.0 / total)
    }
}

/// Pairwise alignment as two column-to-position mappings and the optimal score.
#[derive(Clone, Debug, PartialEq)]
pub struct PairwiseAlignment {
    pub map_x: Mapping,
    pub map_y: Mapping,
    pub score: f64,
}

impl PairwiseAlignment {
    pub fn new(map_x: Mapping, map_y: Mapping, score: f64) -> Self {
        debug_assert_eq!(map_x.len(), map_y.len());
        PairwiseAlignment {
            map_x,
            map_y,
            score,
        }
    }

    /// Number of alignment columns.
    pub fn len(&self) -> usize {
        self.map_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map_x.is_empty()
    }

    /// Number of columns with a gap in either sequence.
    pub fn gaps(&self) -> usize {
        self.map_x
            .iter()
            .zip(self.map_y.iter())
            .filter(|(x, y)| x.is_none() || y.is_none())
            .count()
    }

    /// Gapped versions of two sequences whose motifs have `motif_len` characters.
    pub fn gapped_sequences(&self, x: &[u8], y: &[u8], motif_len: usize) -> (Vec<u8>, Vec<u8>) {
        (
            gapped(x, &self.map_x, motif_len),
            gapped(y, &self.map_y, motif_len),
        )
    }

    /// Builds a two-sequence `Alignment` from the records that were aligned.
    pub fn to_alignment(&self, x: &Record, y: &Record, alphabet: Alphabet) -> Result<Alignment> {
        let (gapped_x, gapped_y) = self.gapped_sequences(x.seq(), y.seq(), alphabet.motif_len());
        Alignment::new(
            vec![
                Record::with_attrs(x.id(), x.desc(), &gapped_x),
                Record::with_attrs(y.id(), y.desc(), &gapped_y),
            ],
            alphabet,
        )
    }
}

fn gapped(seq: &[u8], map: &Mapping, motif_len: usize) -> Vec<u8> {
    let mut gapped = Vec::with_capacity(map.len() * motif_len);
    for site in map {
        match site {
            Some(pos) => gapped.extend_from_slice(&seq[pos * motif_len..(pos + 1) * motif_len]),
            None => gapped.extend(std::iter::repeat(GAP).take(motif_len)),
        }
    }
    gapped
}

#[cfg(test)]
mod tests;
