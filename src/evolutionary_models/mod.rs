use std::fmt::Display;

use anyhow::bail;

use crate::alphabets::{codon_alphabet, dna_alphabet, protein_alphabet, Alphabet};
use crate::errors::PhyloError;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FrequencyOptimisation {
    /// Frequencies observed in the alignment.
    Empirical,
    /// Not available yet, falls back to empirical frequencies.
    Estimated,
    /// Keep the model's frequencies.
    #[default]
    Fixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum ModelType {
    DNA(DNAModelType),
    Protein(ProteinModelType),
    Codon(CodonModelType),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum DNAModelType {
    JC69,
    K80,
    F81,
    HKY,
    TN93,
    GTR,
    UNREST,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum ProteinModelType {
    Poisson,
    WAG,
    LG,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum CodonModelType {
    GY94,
}

impl Display for DNAModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DNAModelType::JC69 => write!(f, "JC69"),
            DNAModelType::K80 => write!(f, "K80"),
            DNAModelType::F81 => write!(f, "F81"),
            DNAModelType::HKY => write!(f, "HKY"),
            DNAModelType::TN93 => write!(f, "TN93"),
            DNAModelType::GTR => write!(f, "GTR"),
            DNAModelType::UNREST => write!(f, "UNREST"),
        }
    }
}

impl Display for ProteinModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProteinModelType::Poisson => write!(f, "Poisson"),
            ProteinModelType::WAG => write!(f, "WAG"),
            ProteinModelType::LG => write!(f, "LG"),
        }
    }
}

impl Display for CodonModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodonModelType::GY94 => write!(f, "GY94"),
        }
    }
}

impl Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::DNA(m) => write!(f, "{}", m),
            ModelType::Protein(m) => write!(f, "{}", m),
            ModelType::Codon(m) => write!(f, "{}", m),
        }
    }
}

impl ModelType {
    /// Looks a model up by its name, ignoring case.
    pub fn from_name(model_name: &str) -> Result<Self> {
        use ModelType::*;
        let model = match model_name.to_uppercase().as_str() {
            "JC69" => DNA(DNAModelType::JC69),
            "K80" => DNA(DNAModelType::K80),
            "F81" => DNA(DNAModelType::F81),
            "HKY" | "HKY85" => DNA(DNAModelType::HKY),
            "TN93" => DNA(DNAModelType::TN93),
            "GTR" => DNA(DNAModelType::GTR),
            "UNREST" => DNA(DNAModelType::UNREST),
            "POISSON" => Protein(ProteinModelType::Poisson),
            "WAG" => Protein(ProteinModelType::WAG),
            "LG" => Protein(ProteinModelType::LG),
            "GY94" => Codon(CodonModelType::GY94),
            _ => bail!(PhyloError::InvalidParameter(format!(
                "Unknown substitution model {}",
                model_name
            ))),
        };
        Ok(model)
    }

    pub fn alphabet(&self) -> Alphabet {
        match self {
            ModelType::DNA(_) => dna_alphabet(),
            ModelType::Protein(_) => protein_alphabet(),
            ModelType::Codon(_) => codon_alphabet(),
        }
    }

    /// Models whose equilibrium frequencies are fixed by definition.
    pub fn has_fixed_freqs(&self) -> bool {
        matches!(
            self,
            ModelType::DNA(DNAModelType::JC69)
                | ModelType::DNA(DNAModelType::K80)
                | ModelType::DNA(DNAModelType::UNREST)
        )
    }

    /// Only UNREST drops detailed balance.
    pub fn is_reversible(&self) -> bool {
        !matches!(self, ModelType::DNA(DNAModelType::UNREST))
    }
}

#[cfg(test)]
mod tests;
