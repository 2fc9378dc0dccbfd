use crate::alphabets::{translate, NUCLEOTIDES, SENSE_CODONS};
use crate::substitution_models::dna_models::is_transition;
use crate::substitution_models::{ParamDefinition, SubstMatrix};

pub(crate) fn gy94_definitions() -> Vec<ParamDefinition> {
    vec![
        ParamDefinition::rate("kappa", 2.0),
        ParamDefinition::new("omega", 1e-6, 20.0, 0.5),
    ]
}

/// Goldman & Yang (1994) exchangeabilities between sense codons.
///
/// Codons that differ at more than one position do not exchange directly. A single change is
/// scaled by `kappa` when it is a transition and by `omega` when it changes the amino acid.
pub(crate) fn gy94_rates(kappa: f64, omega: f64) -> SubstMatrix {
    let n = SENSE_CODONS.len();
    let mut rates = SubstMatrix::zeros(n, n);
    for (i, from) in SENSE_CODONS.iter().enumerate() {
        for (j, to) in SENSE_CODONS.iter().enumerate() {
            let diffs = from
                .iter()
                .zip(to.iter())
                .filter(|(a, b)| a != b)
                .collect::<Vec<_>>();
            if diffs.len() != 1 {
                continue;
            }
            let (a, b) = diffs[0];
            let mut rate = 1.0;
            if is_transition(nucleotide(*a), nucleotide(*b)) {
                rate *= kappa;
            }
            if translate(from) != translate(to) {
                rate *= omega;
            }
            rates[(i, j)] = rate;
        }
    }
    rates
}

fn nucleotide(char: u8) -> usize {
    NUCLEOTIDES.iter().position(|&c| c == char).unwrap_or(0)
}
