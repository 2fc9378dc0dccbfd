use anyhow::bail;

use crate::alphabets::{Alphabet, AlphabetType};
use crate::errors::PhyloError;
use crate::Result;

/// Site counts of two aligned sequences, over columns where both motifs are unambiguous states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairCounts {
    pub compared: usize,
    pub differences: usize,
    /// Purine-purine and pyrimidine-pyrimidine differences, DNA only.
    pub transitions: usize,
    pub transversions: usize,
    alphabet: Alphabet,
}

/// Counts identical and differing sites of two gapped sequences of equal length.
///
/// Columns with a gap, missing data or an ambiguity code in either sequence are skipped.
///
/// # Example
/// ```
/// use phyloml::alphabets::dna_alphabet;
/// use phyloml::distances::pairwise_counts;
/// let counts = pairwise_counts(b"ACGT-A", b"GCGTTN", &dna_alphabet()).unwrap();
/// assert_eq!(counts.compared, 4);
/// assert_eq!(counts.transitions, 1);
/// ```
pub fn pairwise_counts(x: &[u8], y: &[u8], alphabet: &Alphabet) -> Result<PairCounts> {
    if x.len() != y.len() {
        bail!(PhyloError::InvalidInput(format!(
            "Aligned sequences differ in length, {} and {}",
            x.len(),
            y.len()
        )));
    }
    let dna = alphabet.alphabet_type() == AlphabetType::DNA;
    let mut counts = PairCounts {
        compared: 0,
        differences: 0,
        transitions: 0,
        transversions: 0,
        alphabet: *alphabet,
    };
    let motif_len = alphabet.motif_len();
    for (a, b) in x.chunks(motif_len).zip(y.chunks(motif_len)) {
        let (Some(i), Some(j)) = (alphabet.index(a), alphabet.index(b)) else {
            continue;
        };
        counts.compared += 1;
        if i == j {
            continue;
        }
        counts.differences += 1;
        if dna {
            // TCAG order, pyrimidines first
            if i / 2 == j / 2 {
                counts.transitions += 1;
            } else {
                counts.transversions += 1;
            }
        }
    }
    Ok(counts)
}

impl PairCounts {
    /// Proportion of differing sites.
    pub fn p_distance(&self) -> Result<f64> {
        if self.compared == 0 {
            bail!(PhyloError::InvalidInput(
                "No comparable sites between the sequences".to_string()
            ));
        }
        Ok(self.differences as f64 / self.compared as f64)
    }

    /// Jukes-Cantor correction over the states of the alphabet, `-b ln(1 - p / b)` with
    /// `b = 1 - 1/n`. Fails with `SaturatedDistance` when `p >= b`.
    pub fn jc69_distance(&self) -> Result<f64> {
        let p = self.p_distance()?;
        let b = 1.0 - 1.0 / self.alphabet.n() as f64;
        if p >= b {
            bail!(PhyloError::SaturatedDistance {
                distance: f64::INFINITY
            });
        }
        Ok(-b * (1.0 - p / b).ln())
    }

    /// Kimura two-parameter distance from transition and transversion proportions.
    pub fn k80_distance(&self) -> Result<f64> {
        if self.alphabet.alphabet_type() != AlphabetType::DNA {
            bail!(PhyloError::InvalidInput(format!(
                "K80 distances need DNA sequences, got the {}",
                self.alphabet
            )));
        }
        self.p_distance()?;
        let p = self.transitions as f64 / self.compared as f64;
        let q = self.transversions as f64 / self.compared as f64;
        let (w1, w2) = (1.0 - 2.0 * p - q, 1.0 - 2.0 * q);
        if w1 <= 0.0 || w2 <= 0.0 {
            bail!(PhyloError::SaturatedDistance {
                distance: f64::INFINITY
            });
        }
        Ok(-0.5 * w1.ln() - 0.25 * w2.ln())
    }
}
