use assert_matches::assert_matches;
use rstest::*;

use crate::alphabets::AlphabetType;
use crate::errors::PhyloError;
use crate::evolutionary_models::{
    CodonModelType, DNAModelType, ModelType, ModelType::*, ProteinModelType,
};

#[rstest]
#[case::jc69("jc69", DNA(DNAModelType::JC69))]
#[case::hky("HKY85", DNA(DNAModelType::HKY))]
#[case::gtr("GTR", DNA(DNAModelType::GTR))]
#[case::unrest("unrest", DNA(DNAModelType::UNREST))]
#[case::wag("wag", Protein(ProteinModelType::WAG))]
#[case::lg("LG", Protein(ProteinModelType::LG))]
#[case::gy94("gy94", Codon(CodonModelType::GY94))]
fn model_names(#[case] name: &str, #[case] expected: ModelType) {
    assert_eq!(ModelType::from_name(name).unwrap(), expected);
}

#[test]
fn unknown_model_name() {
    let err = ModelType::from_name("BLOSUM").unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidParameter(_))
    );
}

#[test]
fn model_display_round_trips_names() {
    for model in [
        DNA(DNAModelType::F81),
        DNA(DNAModelType::TN93),
        Protein(ProteinModelType::Poisson),
        Codon(CodonModelType::GY94),
    ] {
        assert_eq!(ModelType::from_name(&model.to_string()).unwrap(), model);
    }
}

#[test]
fn model_alphabets() {
    assert_eq!(
        DNA(DNAModelType::K80).alphabet().alphabet_type(),
        AlphabetType::DNA
    );
    assert_eq!(
        Protein(ProteinModelType::WAG).alphabet().alphabet_type(),
        AlphabetType::Protein
    );
    assert_eq!(
        Codon(CodonModelType::GY94).alphabet().alphabet_type(),
        AlphabetType::Codon
    );
    assert!(!DNA(DNAModelType::UNREST).is_reversible());
    assert!(DNA(DNAModelType::GTR).is_reversible());
    assert!(DNA(DNAModelType::JC69).has_fixed_freqs());
    assert!(!DNA(DNAModelType::HKY).has_fixed_freqs());
}
