use crate::evolutionary_models::{DNAModelType, ModelType};
use crate::substitution_models::dna_models::is_transition;
use crate::substitution_models::{RateMatrix, SubstMatrix};

/// Closed-form transition probabilities for the models that have them.
///
/// Returns `None` for every other family, the caller then goes through the eigen
/// decomposition or the matrix exponential.
pub(crate) fn solved_p(rate_matrix: &RateMatrix, time: f64) -> Option<SubstMatrix> {
    match rate_matrix.model_type() {
        ModelType::DNA(DNAModelType::JC69) | ModelType::DNA(DNAModelType::F81) => {
            Some(f81_p(rate_matrix, time))
        }
        ModelType::DNA(DNAModelType::K80) => Some(k80_p(rate_matrix, time)),
        _ => None,
    }
}

/// `P_ij(t) = pi_j + (delta_ij - pi_j) * exp(-beta t)` with `beta = 1 / (1 - sum pi^2)`
/// for a normalised generator.
fn f81_p(rate_matrix: &RateMatrix, time: f64) -> SubstMatrix {
    let pi = rate_matrix.freqs();
    let beta = 1.0 / (1.0 - pi.iter().map(|p| p * p).sum::<f64>());
    let decay = (-beta * time).exp();
    SubstMatrix::from_fn(pi.len(), pi.len(), |i, j| {
        let delta = if i == j { 1.0 } else { 0.0 };
        pi[j] + (delta - pi[j]) * decay
    })
}

/// Kimura two-parameter solution, with the transition rate `alpha` and the transversion rate
/// `beta` read off the normalised generator.
fn k80_p(rate_matrix: &RateMatrix, time: f64) -> SubstMatrix {
    let alpha = rate_matrix.rate(0, 1);
    let beta = rate_matrix.rate(0, 2);
    let e1 = (-4.0 * beta * time).exp();
    let e2 = (-2.0 * (alpha + beta) * time).exp();
    SubstMatrix::from_fn(4, 4, |i, j| {
        if i == j {
            0.25 + 0.25 * e1 + 0.5 * e2
        } else if is_transition(i, j) {
            0.25 + 0.25 * e1 - 0.5 * e2
        } else {
            0.25 - 0.25 * e1
        }
    })
}
