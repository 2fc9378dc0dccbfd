use std::error::Error;
use std::fmt;

/// Failure kinds raised by the likelihood engine and the aligner.
///
/// Errors are raised through `anyhow` with `bail!(PhyloError::...)` and can be recovered by
/// callers with `err.downcast_ref::<PhyloError>()`.
#[derive(Clone, PartialEq)]
pub enum PhyloError {
    /// Negative or non-finite rate, malformed frequencies, negative branch length, bad bounds.
    InvalidParameter(String),
    /// Transition probabilities that leave the probability simplex beyond tolerance.
    NumericalInstability(String),
    /// A column whose likelihood under the current parameters is exactly zero.
    DegenerateLikelihood { column: usize },
    /// Alignment requested with an empty input sequence.
    EmptySequence,
    /// Distance estimate pinned to the upper bound with the likelihood still increasing.
    SaturatedDistance { distance: f64 },
    /// Tree, alignment and model that do not describe the same data.
    InvalidInput(String),
}

impl fmt::Display for PhyloError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhyloError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PhyloError::NumericalInstability(msg) => write!(f, "Numerical instability: {}", msg),
            PhyloError::DegenerateLikelihood { column } => {
                write!(f, "Zero likelihood for alignment column {}", column)
            }
            PhyloError::EmptySequence => write!(f, "Cannot align an empty sequence"),
            PhyloError::SaturatedDistance { distance } => write!(
                f,
                "Distance is saturated, likelihood still increasing at {}",
                distance
            ),
            PhyloError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl fmt::Debug for PhyloError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for PhyloError {}

impl PhyloError {
    /// True for failures that an optimiser treats as a rejected point rather than a hard error.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            PhyloError::NumericalInstability(_) | PhyloError::DegenerateLikelihood { .. }
        )
    }
}

/// Returns the `PhyloError` carried by an `anyhow::Error`, if any.
pub fn phylo_error(err: &anyhow::Error) -> Option<&PhyloError> {
    err.downcast_ref::<PhyloError>()
}
