use std::fmt::Display;

use anyhow::bail;
use log::debug;

use crate::alignment::PairwiseAlignment;
use crate::alphabets::{Alphabet, GAP};
use crate::errors::PhyloError;
use crate::session::AnalysisSession;
use crate::substitution_models::{FreqVector, SubstMatrix, SubstitutionModel};
use crate::transition_probabilities::TransitionMatrix;
use crate::Result;

mod matrices;
mod partial_order;
pub use partial_order::PartialOrderGraph;

use matrices::AlignmentMatrices;

pub const DEFAULT_MATCH: f64 = 5.0;
pub const DEFAULT_MISMATCH: f64 = -4.0;
pub const DEFAULT_GAP_OPEN: f64 = 10.0;
pub const DEFAULT_GAP_EXTEND: f64 = 1.0;

/// Move of the traceback through the three DP states.
///
/// `GapInY` consumes a character of the first sequence against a gap in the second one,
/// `GapInX` the other way round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Matc,
    GapInY,
    GapInX,
}

/// Score of aligning two motifs against each other.
#[derive(Clone, Debug, PartialEq)]
pub enum SubstitutionScores {
    /// Case-insensitive identity of single characters.
    Simple { matching: f64, mismatching: f64 },
    /// Full score matrix indexed by the states of `alphabet`. Ambiguous motifs score the
    /// average over their compatible states.
    Matrix { alphabet: Alphabet, scores: SubstMatrix },
}

/// Substitution scores plus affine gap costs.
///
/// A gap of length `k` costs `gap_open + (k - 1) * gap_extend`, both costs are non-negative
/// and subtracted from the alignment score.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentScoring {
    substitution: SubstitutionScores,
    gap_open: f64,
    gap_extend: f64,
}

impl Default for AlignmentScoring {
    fn default() -> Self {
        AlignmentScoring {
            substitution: SubstitutionScores::Simple {
                matching: DEFAULT_MATCH,
                mismatching: DEFAULT_MISMATCH,
            },
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
        }
    }
}

impl Display for AlignmentScoring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.substitution {
            SubstitutionScores::Simple {
                matching,
                mismatching,
            } => write!(f, "match {}, mismatch {}", matching, mismatching)?,
            SubstitutionScores::Matrix { alphabet, .. } => {
                write!(f, "score matrix over the {}", alphabet)?
            }
        }
        write!(
            f,
            ", gap open {}, gap extend {}",
            self.gap_open, self.gap_extend
        )
    }
}

/// One motif of an input sequence resolved against the scoring scheme.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Symbol {
    Char(u8),
    /// Compatible states with their weights, summing to one.
    States(Vec<(usize, f64)>),
}

impl AlignmentScoring {
    /// Identity scores for single characters, any byte but the gap is accepted.
    ///
    /// # Example
    /// ```
    /// use phyloml::pairwise_alignment::{AlignmentScoring, PairwiseAligner};
    /// let scoring = AlignmentScoring::simple(5.0, -4.0, 10.0, 1.0).unwrap();
    /// let alignment = PairwiseAligner::new(scoring).align(b"ACGT", b"AGT").unwrap();
    /// assert_eq!(alignment.score, 5.0);
    /// ```
    pub fn simple(matching: f64, mismatching: f64, gap_open: f64, gap_extend: f64) -> Result<Self> {
        if !matching.is_finite() || !mismatching.is_finite() {
            bail!(PhyloError::InvalidParameter(format!(
                "Match and mismatch scores must be finite, got {} and {}",
                matching, mismatching
            )));
        }
        Self::with_gaps(
            SubstitutionScores::Simple {
                matching,
                mismatching,
            },
            gap_open,
            gap_extend,
        )
    }

    /// Scores from an `n x n` matrix over the states of `alphabet`.
    pub fn matrix(
        alphabet: Alphabet,
        scores: SubstMatrix,
        gap_open: f64,
        gap_extend: f64,
    ) -> Result<Self> {
        let n = alphabet.n();
        if scores.nrows() != n || scores.ncols() != n {
            bail!(PhyloError::InvalidParameter(format!(
                "Score matrix for the {} must be {}x{}, got {}x{}",
                alphabet,
                n,
                n,
                scores.nrows(),
                scores.ncols()
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            bail!(PhyloError::InvalidParameter(
                "Score matrix entries must be finite".to_string()
            ));
        }
        Self::with_gaps(
            SubstitutionScores::Matrix { alphabet, scores },
            gap_open,
            gap_extend,
        )
    }

    /// Log-odds scores `ln(P_ij / pi_j)` of a transition matrix against the equilibrium
    /// frequencies. Zero probabilities are floored at the smallest positive `f64`.
    pub fn log_odds(
        alphabet: Alphabet,
        p: &TransitionMatrix,
        freqs: &FreqVector,
        gap_open: f64,
        gap_extend: f64,
    ) -> Result<Self> {
        if freqs.len() != alphabet.n() || freqs.iter().any(|&f| !(f > 0.0)) {
            bail!(PhyloError::InvalidParameter(format!(
                "Log-odds scores need {} positive frequencies",
                alphabet.n()
            )));
        }
        if p.nrows() != freqs.len() || p.ncols() != freqs.len() {
            bail!(PhyloError::InvalidParameter(format!(
                "Transition matrix is {}x{}, expected {}x{}",
                p.nrows(),
                p.ncols(),
                freqs.len(),
                freqs.len()
            )));
        }
        let scores = SubstMatrix::from_fn(p.nrows(), p.ncols(), |i, j| {
            (p[(i, j)].max(f64::MIN_POSITIVE) / freqs[j]).ln()
        });
        Self::matrix(alphabet, scores, gap_open, gap_extend)
    }

    /// Log-odds scores of `model` over a branch of length `time`, with the transition matrix
    /// taken from the session cache.
    pub fn from_model(
        model: &SubstitutionModel,
        time: f64,
        session: &AnalysisSession,
        gap_open: f64,
        gap_extend: f64,
    ) -> Result<Self> {
        let rate_matrix = model.rate_matrix()?;
        let p = session.transition_matrix(&rate_matrix, time)?;
        Self::log_odds(
            model.alphabet(),
            &p,
            rate_matrix.freqs(),
            gap_open,
            gap_extend,
        )
    }

    /// Default scores for sequences over `alphabet`. Single character alphabets use the
    /// simple scheme, longer motifs get an identity matrix over the states whose match,
    /// mismatch and gap extension scores are those of the motif's characters added up.
    ///
    /// # Example
    /// ```
    /// use phyloml::alphabets::codon_alphabet;
    /// use phyloml::pairwise_alignment::AlignmentScoring;
    /// let scoring = AlignmentScoring::for_alphabet(codon_alphabet());
    /// assert_eq!(scoring.motif_len(), 3);
    /// assert_eq!(scoring.gap_extend(), 3.0);
    /// ```
    pub fn for_alphabet(alphabet: Alphabet) -> Self {
        let motif_len = alphabet.motif_len();
        if motif_len == 1 {
            return Self::default();
        }
        let scale = motif_len as f64;
        let n = alphabet.n();
        let scores = SubstMatrix::from_fn(n, n, |i, j| {
            if i == j {
                DEFAULT_MATCH * scale
            } else {
                DEFAULT_MISMATCH * scale
            }
        });
        AlignmentScoring {
            substitution: SubstitutionScores::Matrix { alphabet, scores },
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND * scale,
        }
    }

    fn with_gaps(substitution: SubstitutionScores, gap_open: f64, gap_extend: f64) -> Result<Self> {
        if !(gap_open >= 0.0 && gap_open.is_finite() && gap_extend >= 0.0 && gap_extend.is_finite())
        {
            bail!(PhyloError::InvalidParameter(format!(
                "Gap costs must be non-negative and finite, got open {} and extend {}",
                gap_open, gap_extend
            )));
        }
        Ok(AlignmentScoring {
            substitution,
            gap_open,
            gap_extend,
        })
    }

    pub fn substitution(&self) -> &SubstitutionScores {
        &self.substitution
    }

    pub fn gap_open(&self) -> f64 {
        self.gap_open
    }

    pub fn gap_extend(&self) -> f64 {
        self.gap_extend
    }

    /// Number of sequence characters aligned as one unit.
    pub fn motif_len(&self) -> usize {
        match &self.substitution {
            SubstitutionScores::Simple { .. } => 1,
            SubstitutionScores::Matrix { alphabet, .. } => alphabet.motif_len(),
        }
    }

    /// Splits an ungapped sequence into motifs and resolves them.
    pub(crate) fn symbols(&self, seq: &[u8]) -> Result<Vec<Symbol>> {
        if seq.is_empty() {
            bail!(PhyloError::EmptySequence);
        }
        if seq.contains(&GAP) {
            bail!(PhyloError::InvalidInput(format!(
                "Cannot align the gapped sequence {}",
                String::from_utf8_lossy(seq)
            )));
        }
        if seq.len() % self.motif_len() != 0 {
            bail!(PhyloError::InvalidInput(format!(
                "Sequence length {} is not a multiple of the motif length {}",
                seq.len(),
                self.motif_len()
            )));
        }
        seq.chunks(self.motif_len())
            .map(|motif| self.symbol(motif))
            .collect()
    }

    pub(crate) fn symbol(&self, motif: &[u8]) -> Result<Symbol> {
        Ok(match &self.substitution {
            SubstitutionScores::Simple { .. } => Symbol::Char(motif[0].to_ascii_uppercase()),
            SubstitutionScores::Matrix { alphabet, .. } => {
                let states = alphabet.compatible_states(motif)?;
                let total = states.sum();
                Symbol::States(
                    states
                        .iter()
                        .enumerate()
                        .filter(|(_, w)| **w > 0.0)
                        .map(|(i, &w)| (i, w / total))
                        .collect(),
                )
            }
        })
    }

    pub(crate) fn score(&self, a: &Symbol, b: &Symbol) -> f64 {
        match (&self.substitution, a, b) {
            (
                SubstitutionScores::Simple {
                    matching,
                    mismatching,
                },
                Symbol::Char(a),
                Symbol::Char(b),
            ) => {
                if a == b {
                    *matching
                } else {
                    *mismatching
                }
            }
            (SubstitutionScores::Matrix { scores, .. }, Symbol::States(a), Symbol::States(b)) => a
                .iter()
                .map(|&(i, wa)| b.iter().map(|&(j, wb)| wa * wb * scores[(i, j)]).sum::<f64>())
                .sum(),
            _ => f64::NEG_INFINITY,
        }
    }
}

/// Global pairwise aligner with affine gaps.
///
/// Ties between optimal paths are broken the same way every time: a match is preferred over a
/// gap in the first sequence, which is preferred over a gap in the second sequence.
#[derive(Clone, Debug, Default)]
pub struct PairwiseAligner {
    scoring: AlignmentScoring,
}

impl PairwiseAligner {
    pub fn new(scoring: AlignmentScoring) -> Self {
        PairwiseAligner { scoring }
    }

    pub fn scoring(&self) -> &AlignmentScoring {
        &self.scoring
    }

    /// Aligns two ungapped sequences. The mappings index motifs, not characters.
    ///
    /// Fails with `EmptySequence` if either sequence is empty.
    pub fn align(&self, seq_a: &[u8], seq_b: &[u8]) -> Result<PairwiseAlignment> {
        let x = self.scoring.symbols(seq_a)?;
        let y = self.scoring.symbols(seq_b)?;
        let mut matrices = AlignmentMatrices::new(&x, &y, &self.scoring);
        matrices.fill_matrices();
        let alignment = matrices.traceback();
        debug!(
            "Aligned {} and {} motifs into {} columns, score {}",
            x.len(),
            y.len(),
            alignment.len(),
            alignment.score
        );
        Ok(alignment)
    }

    /// Aligns a sequence to a partial order graph.
    ///
    /// In the result `map_x` holds graph node indices along the chosen path and `map_y` the
    /// sequence positions.
    pub fn align_to_graph(&self, graph: &PartialOrderGraph, seq: &[u8]) -> Result<PairwiseAlignment> {
        graph.align(seq, &self.scoring)
    }
}
