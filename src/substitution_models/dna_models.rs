use crate::evolutionary_models::DNAModelType::{self, *};
use crate::substitution_models::{ParamDefinition, SubstMatrix};

const GTR_RATES: [&str; 6] = ["rtc", "rta", "rtg", "rca", "rcg", "rag"];

/// Off-diagonal rates of UNREST in row-major order, states ordered TCAG.
const UNREST_RATES: [&str; 12] = [
    "rtc", "rta", "rtg", "rct", "rca", "rcg", "rat", "rac", "rag", "rgt", "rgc", "rga",
];

pub(crate) fn dna_definitions(model: DNAModelType) -> Vec<ParamDefinition> {
    match model {
        JC69 | F81 => Vec::new(),
        K80 | HKY => vec![ParamDefinition::rate("kappa", 2.0)],
        TN93 => vec![
            ParamDefinition::rate("kappa_r", 2.0),
            ParamDefinition::rate("kappa_y", 2.0),
        ],
        GTR => GTR_RATES
            .iter()
            .map(|name| ParamDefinition::rate(name, 1.0))
            .collect(),
        UNREST => UNREST_RATES
            .iter()
            .map(|name| ParamDefinition::rate(name, 1.0))
            .collect(),
    }
}

/// Exchangeabilities between nucleotides in TCAG order.
///
/// Transitions are T<->C and A<->G. For UNREST the matrix holds the raw asymmetric rates.
pub(crate) fn dna_rates(model: DNAModelType, params: &[f64]) -> SubstMatrix {
    match model {
        JC69 | F81 => symmetric_rates(&[1.0; 6]),
        K80 | HKY => symmetric_rates(&[params[0], 1.0, 1.0, 1.0, 1.0, params[0]]),
        TN93 => symmetric_rates(&[params[1], 1.0, 1.0, 1.0, 1.0, params[0]]),
        GTR => symmetric_rates(params),
        UNREST => {
            let mut rates = SubstMatrix::zeros(4, 4);
            let mut values = params.iter();
            for i in 0..4 {
                for j in 0..4 {
                    if i != j {
                        rates[(i, j)] = *values.next().unwrap_or(&0.0);
                    }
                }
            }
            rates
        }
    }
}

/// Builds a symmetric matrix from rates ordered as `[rtc, rta, rtg, rca, rcg, rag]`.
fn symmetric_rates(r: &[f64]) -> SubstMatrix {
    SubstMatrix::from_row_slice(
        4,
        4,
        &[
            0.0, r[0], r[1], r[2], //
            r[0], 0.0, r[3], r[4], //
            r[1], r[3], 0.0, r[5], //
            r[2], r[4], r[5], 0.0,
        ],
    )
}

/// Whether a change between two nucleotide indices (TCAG) is a transition.
pub(crate) fn is_transition(i: usize, j: usize) -> bool {
    i != j && (i ^ 1) == j
}
