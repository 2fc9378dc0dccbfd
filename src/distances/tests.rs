use approx::assert_relative_eq;
use assert_matches::assert_matches;
use rstest::*;

use crate::alphabets::{dna_alphabet, protein_alphabet};
use crate::distances::{pairwise_counts, DistanceEstimator};
use crate::errors::PhyloError;
use crate::evolutionary_models::{
    CodonModelType::GY94,
    DNAModelType::{JC69, K80},
    ModelType::{self, Codon, DNA},
};
use crate::optimisers::OptimisationStatus;
use crate::pairwise_alignment::AlignmentScoring;
use crate::substitution_models::SubstitutionModel;

fn estimator(model_type: ModelType) -> DistanceEstimator {
    DistanceEstimator::new(SubstitutionModel::new(model_type, &[]).unwrap())
}

/// Mismatches are cheaper than gaps, unrelated sequences stay ungapped.
fn mismatch_scoring() -> AlignmentScoring {
    AlignmentScoring::simple(1.0, -1.0, 10.0, 1.0).unwrap()
}

#[test]
fn identical_sequences_zero_distance() {
    let estimate = estimator(DNA(JC69))
        .estimate(b"ACGTACGTAC", b"ACGTACGTAC")
        .unwrap();
    assert_eq!(estimate.distance, 0.0);
    assert_relative_eq!(
        estimate.log_likelihood,
        10.0 * 0.25f64.ln(),
        epsilon = 1e-12
    );
    assert_eq!(estimate.alignment.gaps(), 0);
    assert_eq!(estimate.status, OptimisationStatus::Converged);
}

#[test]
fn jukes_cantor_distance_matches_closed_form() {
    let x = b"ACGTACGTACGTACGTACGT";
    let y = b"ACGTTCGTACCTACGAACGA";
    let estimate = estimator(DNA(JC69)).estimate(x, y).unwrap();
    assert_eq!(estimate.alignment.gaps(), 0);
    let closed_form = pairwise_counts(x, y, &dna_alphabet())
        .unwrap()
        .jc69_distance()
        .unwrap();
    let p: f64 = 4.0 / 20.0;
    assert_relative_eq!(closed_form, -0.75 * (1.0 - 4.0 / 3.0 * p).ln(), epsilon = 1e-12);
    assert_relative_eq!(estimate.distance, closed_form, epsilon = 1e-4);
}

#[test]
#[cfg_attr(feature = "ci_coverage", ignore)]
fn joint_estimate_fits_kappa() {
    let x = b"ACGTACGTACGTACGTACGT";
    let y = b"GCGTACATAAGTGCGTACGC";
    let fixed = estimator(DNA(K80)).estimate(x, y).unwrap();
    let joint = estimator(DNA(K80)).joint(true).estimate(x, y).unwrap();
    assert_eq!(fixed.model.params(), &[2.0]);
    assert!(joint.model.params()[0] > 5.0);
    assert!(joint.log_likelihood >= fixed.log_likelihood - 1e-6);

    let k80 = pairwise_counts(x, y, &dna_alphabet())
        .unwrap()
        .k80_distance()
        .unwrap();
    assert_relative_eq!(joint.distance, k80, epsilon = 1e-2);
}

#[test]
fn unrelated_sequences_saturate() {
    let err = estimator(DNA(JC69))
        .with_scoring(mismatch_scoring())
        .max_distance(2.0)
        .estimate(b"AAAAAAAAAA", b"CCCCCCCCCC")
        .unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::SaturatedDistance { distance }) if *distance == 2.0
    );
}

#[test]
fn distance_matrix_substitutes_saturated_pairs() {
    let records = vec![
        record_wo_desc!("a", b"AAAAAAAAAA"),
        record_wo_desc!("b", b"AAAAAAAAAA"),
        record_wo_desc!("c", b"CCCCCCCCCC"),
    ];
    let matrix = estimator(DNA(JC69))
        .with_scoring(mismatch_scoring())
        .max_distance(2.0)
        .distance_matrix(&records)
        .unwrap();
    assert_eq!(matrix.len(), 3);
    assert_eq!(matrix.ids, vec!["a", "b", "c"]);
    assert_eq!(matrix.get(0, 1), 0.0);
    assert_eq!(matrix.get(0, 2), 2.0);
    assert_eq!(matrix.get(2, 1), 2.0);
    assert_eq!(matrix.distances, matrix.distances.transpose());
    assert!((0..3).all(|i| matrix.get(i, i) == 0.0));
    assert_eq!(matrix.saturated, vec![(0, 2), (1, 2)]);
    let output = matrix.to_string();
    assert_eq!(
        output.lines().next().unwrap(),
        "a\t0.000000\t0.000000\t2.000000"
    );
}

#[test]
fn distance_matrix_propagates_other_errors() {
    let records = vec![record_wo_desc!("a", b"ACGT"), record_wo_desc!("b", b"")];
    let err = estimator(DNA(JC69)).distance_matrix(&records).unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::EmptySequence)
    );
}

#[test]
fn empty_distance_matrix() {
    let matrix = estimator(DNA(JC69)).distance_matrix(&[]).unwrap();
    assert!(matrix.is_empty());
    assert!(matrix.saturated.is_empty());
}

#[rstest]
#[case::zero(0.0)]
#[case::negative(-1.0)]
#[case::infinite(f64::INFINITY)]
fn invalid_max_distance(#[case] max_distance: f64) {
    let err = estimator(DNA(JC69))
        .max_distance(max_distance)
        .estimate(b"ACGT", b"ACGT")
        .unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidParameter(_))
    );
}

#[test]
fn scoring_must_fit_the_alphabet() {
    let err = estimator(Codon(GY94))
        .with_scoring(AlignmentScoring::default())
        .estimate(b"ATGAAA", b"ATGAAG")
        .unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidInput(_))
    );
}

#[test]
fn codon_distance_with_default_scoring() {
    let estimator = estimator(Codon(GY94));
    assert_eq!(estimator.aligner.scoring().motif_len(), 3);
    let estimate = estimator.estimate(b"ATGAAACCC", b"ATGAAGCCC").unwrap();
    assert_eq!(estimate.alignment.len(), 3);
    assert_eq!(estimate.alignment.gaps(), 0);
    assert!(estimate.distance > 0.0);
    assert!(estimate.distance < 5.0);
    assert!(estimate.log_likelihood.is_finite());
}

/// 20 sites, `mismatches` of them differing, never worth a gap.
fn pair_with_mismatches(mismatches: usize) -> (Vec<u8>, Vec<u8>) {
    let x = b"ACGTACGTACGTACGTACGT".to_vec();
    let y = b"AAAAAAAAAAAAAAAAAAAA".to_vec();
    let counts = pairwise_counts(&x, &y, &dna_alphabet()).unwrap();
    assert_eq!(counts.differences, 15);
    let mut y = y;
    for i in (0..x.len()).filter(|i| i % 4 != 0).take(15 - mismatches) {
        y[i] = x[i];
    }
    (x, y)
}

#[rstest]
#[case::at_saturation(15)]
#[case::beyond_saturation(16)]
fn flat_likelihood_is_saturated(#[case] mismatches: usize) {
    let (x, mut y) = pair_with_mismatches(15.min(mismatches));
    if mismatches > 15 {
        y[0] = b'C';
    }
    let closed_form = pairwise_counts(&x, &y, &dna_alphabet()).unwrap();
    assert_eq!(closed_form.differences, mismatches);
    assert_matches!(
        closed_form.jc69_distance().unwrap_err().downcast_ref::<PhyloError>(),
        Some(PhyloError::SaturatedDistance { .. })
    );
    let err = estimator(DNA(JC69))
        .with_scoring(AlignmentScoring::simple(1.0, -1.0, 100.0, 1.0).unwrap())
        .estimate(&x, &y)
        .unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::SaturatedDistance { distance }) if *distance == 20.0
    );
}

#[test]
fn distance_below_saturation_is_finite() {
    let (x, y) = pair_with_mismatches(14);
    let estimate = estimator(DNA(JC69))
        .with_scoring(AlignmentScoring::simple(1.0, -1.0, 100.0, 1.0).unwrap())
        .estimate(&x, &y)
        .unwrap();
    assert_eq!(estimate.alignment.gaps(), 0);
    let closed_form = pairwise_counts(&x, &y, &dna_alphabet())
        .unwrap()
        .jc69_distance()
        .unwrap();
    assert_relative_eq!(closed_form, -0.75 * (1.0 - 4.0 / 3.0 * 0.7f64).ln(), epsilon = 1e-12);
    assert_relative_eq!(estimate.distance, closed_form, epsilon = 1e-3);
}

#[test]
fn counts_skip_gaps_and_ambiguity() {
    let counts = pairwise_counts(b"ACGTACGTAC", b"GCGTACCTAN", &dna_alphabet()).unwrap();
    assert_eq!(counts.compared, 9);
    assert_eq!(counts.differences, 2);
    assert_eq!(counts.transitions, 1);
    assert_eq!(counts.transversions, 1);
    assert_relative_eq!(counts.p_distance().unwrap(), 2.0 / 9.0);
    let p: f64 = 1.0 / 9.0;
    assert_relative_eq!(
        counts.k80_distance().unwrap(),
        -0.5 * (1.0 - 3.0 * p).ln() - 0.25 * (1.0 - 2.0 * p).ln(),
        epsilon = 1e-12
    );

    let gapped = pairwise_counts(b"AC-T", b"ACGT", &dna_alphabet()).unwrap();
    assert_eq!(gapped.compared, 3);
    assert_eq!(gapped.p_distance().unwrap(), 0.0);
    assert_eq!(gapped.jc69_distance().unwrap(), 0.0);
}

#[test]
fn protein_jukes_cantor() {
    let counts = pairwise_counts(b"ARND", b"ARNE", &protein_alphabet()).unwrap();
    let b: f64 = 19.0 / 20.0;
    assert_relative_eq!(
        counts.jc69_distance().unwrap(),
        -b * (1.0 - 0.25 / b).ln(),
        epsilon = 1e-12
    );
    assert_matches!(
        counts.k80_distance().unwrap_err().downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidInput(_))
    );
}

#[rstest]
#[case::saturated(b"AAAA", b"CCCC")]
#[case::transversions(b"AAAA", b"CCTT")]
fn closed_form_saturation(#[case] x: &[u8], #[case] y: &[u8]) {
    let counts = pairwise_counts(x, y, &dna_alphabet()).unwrap();
    assert_matches!(
        counts.jc69_distance().unwrap_err().downcast_ref::<PhyloError>(),
        Some(PhyloError::SaturatedDistance { .. })
    );
    assert_matches!(
        counts.k80_distance().unwrap_err().downcast_ref::<PhyloError>(),
        Some(PhyloError::SaturatedDistance { .. })
    );
}

#[test]
fn closed_form_errors() {
    assert!(pairwise_counts(b"ACGT", b"ACG", &dna_alphabet()).is_err());
    let counts = pairwise_counts(b"NN--", b"ACGT", &dna_alphabet()).unwrap();
    assert_eq!(counts.compared, 0);
    assert_matches!(
        counts.p_distance().unwrap_err().downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidInput(_))
    );
}
