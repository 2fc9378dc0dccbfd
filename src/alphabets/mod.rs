use std::fmt::Display;

use anyhow::bail;
use bio::io::fasta::Record;
use lazy_static::lazy_static;

use crate::errors::PhyloError;
use crate::frequencies;
use crate::substitution_models::FreqVector;
use crate::Result;

pub static AMINOACIDS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";
pub static AMB_AMINOACIDS: &[u8] = b"BJZX";
pub static NUCLEOTIDES: &[u8] = b"TCAG";
pub static AMB_NUCLEOTIDES: &[u8] = b"RYSWKMBDHVN";
pub static MISSING: &[u8] = b"?NX";
pub static GAP: u8 = b'-';

/// Standard genetic code, codons ordered TCAG at every position.
pub static GENETIC_CODE: &[u8] =
    b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";
pub const STOP: u8 = b'*';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum AlphabetType {
    DNA,
    Protein,
    Codon,
}

/// Leaf encoding of gaps, missing data and ambiguity codes.
///
/// `Uniform` spreads the weight over the compatible states (1/k each), `Marginalise` sets every
/// compatible state to 1 and so sums the likelihood over them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissingData {
    #[default]
    Uniform,
    Marginalise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alphabet {
    alphabet_type: AlphabetType,
    missing_data: MissingData,
}

impl Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.alphabet_type {
            AlphabetType::DNA => write!(f, "DNA alphabet"),
            AlphabetType::Protein => write!(f, "protein alphabet"),
            AlphabetType::Codon => write!(f, "codon alphabet"),
        }
    }
}

pub fn dna_alphabet() -> Alphabet {
    Alphabet::new(AlphabetType::DNA)
}

pub fn protein_alphabet() -> Alphabet {
    Alphabet::new(AlphabetType::Protein)
}

pub fn codon_alphabet() -> Alphabet {
    Alphabet::new(AlphabetType::Codon)
}

/// Picks DNA if every sequence is a DNA word, protein otherwise.
pub fn detect_alphabet(sequences: &[Record]) -> Alphabet {
    let dna = dna_alphabet();
    if sequences.iter().all(|rec| dna.is_word(rec.seq())) {
        dna
    } else {
        protein_alphabet()
    }
}

impl Alphabet {
    pub fn new(alphabet_type: AlphabetType) -> Self {
        Alphabet {
            alphabet_type,
            missing_data: MissingData::default(),
        }
    }

    pub fn with_missing_data(mut self, missing_data: MissingData) -> Self {
        self.missing_data = missing_data;
        self
    }

    pub fn alphabet_type(&self) -> AlphabetType {
        self.alphabet_type
    }

    pub fn missing_data(&self) -> MissingData {
        self.missing_data
    }

    /// Number of states of the Markov chain over this alphabet.
    pub fn n(&self) -> usize {
        match self.alphabet_type {
            AlphabetType::DNA => NUCLEOTIDES.len(),
            AlphabetType::Protein => AMINOACIDS.len(),
            AlphabetType::Codon => SENSE_CODONS.len(),
        }
    }

    /// Number of sequence characters per state.
    pub fn motif_len(&self) -> usize {
        match self.alphabet_type {
            AlphabetType::Codon => 3,
            _ => 1,
        }
    }

    /// Characters allowed in sequences, apart from the gap.
    pub fn characters(&self) -> Vec<u8> {
        let (symbols, ambiguous) = match self.alphabet_type {
            AlphabetType::DNA | AlphabetType::Codon => (NUCLEOTIDES, AMB_NUCLEOTIDES),
            AlphabetType::Protein => (AMINOACIDS, AMB_AMINOACIDS),
        };
        let mut chars = symbols.to_vec();
        chars.extend_from_slice(ambiguous);
        let missing = MISSING
            .iter()
            .filter(|c| !chars.contains(c))
            .copied()
            .collect::<Vec<_>>();
        chars.extend(missing);
        chars
    }

    pub fn is_word(&self, word: &[u8]) -> bool {
        let chars = self.characters();
        word.len() % self.motif_len() == 0
            && word
                .to_ascii_uppercase()
                .iter()
                .all(|c| chars.contains(c) || *c == GAP)
    }

    /// The motif of state `idx`.
    pub fn state(&self, idx: usize) -> Vec<u8> {
        match self.alphabet_type {
            AlphabetType::DNA => vec![NUCLEOTIDES[idx]],
            AlphabetType::Protein => vec![AMINOACIDS[idx]],
            AlphabetType::Codon => SENSE_CODONS[idx].to_vec(),
        }
    }

    pub fn states(&self) -> Vec<Vec<u8>> {
        (0..self.n()).map(|i| self.state(i)).collect()
    }

    /// Index of an unambiguous motif, `None` for gaps, ambiguity codes and stop codons.
    pub fn index(&self, motif: &[u8]) -> Option<usize> {
        if motif.len() != self.motif_len() {
            return None;
        }
        match self.alphabet_type {
            AlphabetType::DNA => nucleotide_index(motif[0]),
            AlphabetType::Protein => AMINOACIDS
                .iter()
                .position(|&c| c == motif[0].to_ascii_uppercase()),
            AlphabetType::Codon => codon_index(motif),
        }
    }

    pub fn is_gap(&self, motif: &[u8]) -> bool {
        !motif.is_empty() && motif.iter().all(|&c| c == GAP)
    }

    pub fn empty_freqs(&self) -> FreqVector {
        FreqVector::zeros(self.n())
    }

    pub fn uniform_freqs(&self) -> FreqVector {
        FreqVector::from_element(self.n(), 1.0 / self.n() as f64)
    }

    /// Partial likelihood vector of a leaf motif under the alphabet's missing data convention.
    pub fn char_encoding(&self, motif: &[u8]) -> Result<FreqVector> {
        let mut set = self.compatible_states(motif)?;
        if self.missing_data == MissingData::Uniform {
            let total = set.sum();
            set.scale_mut(1.0 / total);
        }
        Ok(set)
    }

    /// Indicator vector of the states a motif can stand for.
    pub fn compatible_states(&self, motif: &[u8]) -> Result<FreqVector> {
        if motif.len() != self.motif_len() {
            bail!(PhyloError::InvalidInput(format!(
                "Motif {} does not fit the {}",
                String::from_utf8_lossy(motif),
                self
            )));
        }
        let set = match self.alphabet_type {
            AlphabetType::DNA => DNA_SETS[motif[0] as usize].clone(),
            AlphabetType::Protein => PROTEIN_SETS[motif[0] as usize].clone(),
            AlphabetType::Codon => codon_set(motif),
        };
        match set {
            Some(set) if set.sum() > 0.0 => Ok(set),
            _ => bail!(PhyloError::InvalidInput(format!(
                "Unknown {} character {}",
                self,
                String::from_utf8_lossy(motif)
            ))),
        }
    }
}

fn nucleotide_index(char: u8) -> Option<usize> {
    NUCLEOTIDES
        .iter()
        .position(|&c| c == char.to_ascii_uppercase())
}

/// Translates a codon to its amino acid, `*` for stop codons.
pub fn translate(codon: &[u8]) -> Option<u8> {
    let idx = codon.iter().try_fold(0, |acc, &c| {
        nucleotide_index(c).map(|n| acc * NUCLEOTIDES.len() + n)
    })?;
    GENETIC_CODE.get(idx).copied()
}

fn codon_index(codon: &[u8]) -> Option<usize> {
    let codon = codon.to_ascii_uppercase();
    SENSE_CODONS.iter().position(|c| c[..] == codon[..])
}

fn codon_set(codon: &[u8]) -> Option<FreqVector> {
    let position_sets = codon
        .iter()
        .map(|&c| DNA_SETS[c as usize].clone())
        .collect::<Option<Vec<_>>>()?;
    let mut set = FreqVector::zeros(SENSE_CODONS.len());
    for (i, sense) in SENSE_CODONS.iter().enumerate() {
        let compatible = sense
            .iter()
            .zip(position_sets.iter())
            .all(|(&n, pos_set)| nucleotide_index(n).is_some_and(|idx| pos_set[idx] > 0.0));
        if compatible {
            set[i] = 1.0;
        }
    }
    Some(set)
}

lazy_static! {
    pub static ref SENSE_CODONS: Vec<[u8; 3]> = {
        let mut codons = Vec::with_capacity(61);
        for &a in NUCLEOTIDES {
            for &b in NUCLEOTIDES {
                for &c in NUCLEOTIDES {
                    if translate(&[a, b, c]) != Some(STOP) {
                        codons.push([a, b, c]);
                    }
                }
            }
        }
        codons
    };
    pub static ref DNA_SETS: Vec<Option<FreqVector>> = (0..=255u8).map(generic_dna_sets).collect();
    pub static ref PROTEIN_SETS: Vec<Option<FreqVector>> =
        (0..=255u8).map(generic_protein_sets).collect();
}

fn generic_dna_sets(char: u8) -> Option<FreqVector> {
    let set = match char.to_ascii_uppercase() {
        b'T' => frequencies!(&[1.0, 0.0, 0.0, 0.0]),
        b'C' => frequencies!(&[0.0, 1.0, 0.0, 0.0]),
        b'A' => frequencies!(&[0.0, 0.0, 1.0, 0.0]),
        b'G' => frequencies!(&[0.0, 0.0, 0.0, 1.0]),
        b'M' => frequencies!(&[0.0, 1.0, 1.0, 0.0]),
        b'R' => frequencies!(&[0.0, 0.0, 1.0, 1.0]),
        b'W' => frequencies!(&[1.0, 0.0, 1.0, 0.0]),
        b'S' => frequencies!(&[0.0, 1.0, 0.0, 1.0]),
        b'Y' => frequencies!(&[1.0, 1.0, 0.0, 0.0]),
        b'K' => frequencies!(&[1.0, 0.0, 0.0, 1.0]),
        b'V' => frequencies!(&[0.0, 1.0, 1.0, 1.0]),
        b'D' => frequencies!(&[1.0, 0.0, 1.0, 1.0]),
        b'B' => frequencies!(&[1.0, 1.0, 0.0, 1.0]),
        b'H' => frequencies!(&[1.0, 1.0, 1.0, 0.0]),
        b'N' | b'X' | b'?' | b'-' => frequencies!(&[1.0; 4]),
        _ => return None,
    };
    Some(set)
}

fn generic_protein_sets(char: u8) -> Option<FreqVector> {
    let mut set = frequencies!(&[0.0; 20]);
    let mut mark = |aa: u8| {
        if let Some(idx) = AMINOACIDS.iter().position(|&c| c == aa) {
            set[idx] = 1.0;
        }
    };
    match char.to_ascii_uppercase() {
        c if AMINOACIDS.contains(&c) => mark(c),
        b'B' => {
            mark(b'D');
            mark(b'N');
        }
        b'Z' => {
            mark(b'E');
            mark(b'Q');
        }
        b'J' => {
            mark(b'I');
            mark(b'L');
        }
        b'X' | b'?' | b'-' => return Some(frequencies!(&[1.0; 20])),
        _ => return None,
    }
    Some(set)
}

#[cfg(test)]
mod tests;
