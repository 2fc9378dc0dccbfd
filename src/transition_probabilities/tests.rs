use std::sync::{Arc, Barrier};
use std::thread;

use approx::assert_relative_eq;
use assert_matches::assert_matches;
use rstest::*;

use crate::errors::PhyloError;
use crate::evolutionary_models::{
    CodonModelType, DNAModelType::*, ModelType, ModelType::*, ProteinModelType,
};
use crate::substitution_models::solved_models::solved_p;
use crate::substitution_models::{RateMatrix, SubstMatrix, SubstitutionModel};
use crate::transition_probabilities::{
    validate_p, EigenSolution, TransitionProbabilityCache, DEFAULT_BRANCH_LENGTH_CAPACITY,
};

fn rate_matrix(model_type: ModelType, params: &[f64], freqs: Option<&[f64]>) -> RateMatrix {
    let mut model = SubstitutionModel::new(model_type, params).unwrap();
    if let Some(freqs) = freqs {
        model = model.with_freqs(freqs).unwrap();
    }
    model.rate_matrix().unwrap()
}

fn assert_matrices_eq(actual: &SubstMatrix, expected: &SubstMatrix, epsilon: f64) {
    assert_eq!(actual.shape(), expected.shape());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert_relative_eq!(a, e, epsilon = epsilon);
    }
}

#[test]
fn zero_branch_length_gives_identity() {
    let cache = TransitionProbabilityCache::default();
    let q = rate_matrix(DNA(GTR), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], None);
    let p = cache.get(&q, 0.0).unwrap();
    assert_matrices_eq(&p, &SubstMatrix::identity(4, 4), 1e-9);
    assert_eq!(cache.computations(), 0);
}

#[rstest]
#[case::jc69(DNA(JC69), &[], 0.1)]
#[case::k80(DNA(K80), &[3.0], 0.5)]
#[case::hky(DNA(HKY), &[3.0], 1.5)]
#[case::gtr(DNA(GTR), &[1.0, 2.0, 0.5, 0.8, 3.0, 1.2], 0.01)]
#[case::unrest(DNA(UNREST), &[1.0, 2.0, 0.5, 0.3, 1.0, 2.5, 0.1, 0.8, 1.2, 0.9, 0.4, 3.0], 0.7)]
#[case::wag(Protein(ProteinModelType::WAG), &[], 0.3)]
#[case::lg(Protein(ProteinModelType::LG), &[], 2.0)]
#[case::gy94(Codon(CodonModelType::GY94), &[2.0, 0.4], 0.2)]
fn transition_rows_sum_to_one(
    #[case] model_type: ModelType,
    #[case] params: &[f64],
    #[case] time: f64,
) {
    let cache = TransitionProbabilityCache::default();
    let p = cache
        .get(&rate_matrix(model_type, params, None), time)
        .unwrap();
    for row in p.row_iter() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-6);
        assert!(row.iter().all(|&x| x >= 0.0));
    }
}

#[rstest]
#[case::jc69(DNA(JC69), &[], None)]
#[case::k80(DNA(K80), &[4.0], None)]
#[case::f81(DNA(F81), &[], Some(&[0.1, 0.2, 0.3, 0.4][..]))]
fn closed_form_matches_eigen_solution(
    #[case] model_type: ModelType,
    #[case] params: &[f64],
    #[case] freqs: Option<&[f64]>,
) {
    let q = rate_matrix(model_type, params, freqs);
    let eigen = EigenSolution::new(&q).unwrap();
    for time in [0.01, 0.2, 1.0, 5.0] {
        let solved = solved_p(&q, time).unwrap();
        assert_matrices_eq(&solved, &eigen.p(time), 1e-10);
    }
}

#[rstest]
#[case::hky(DNA(HKY), &[2.5], Some(&[0.1, 0.2, 0.3, 0.4][..]))]
#[case::tn93(DNA(TN93), &[3.0, 0.5], Some(&[0.22, 0.26, 0.33, 0.19][..]))]
#[case::gtr(DNA(GTR), &[5.0, 1.0, 1.0, 1.0, 1.0, 5.0], None)]
#[case::wag(Protein(ProteinModelType::WAG), &[], None)]
fn eigen_solution_matches_matrix_exponential(
    #[case] model_type: ModelType,
    #[case] params: &[f64],
    #[case] freqs: Option<&[f64]>,
) {
    let q = rate_matrix(model_type, params, freqs);
    let eigen = EigenSolution::new(&q).unwrap();
    for time in [0.05, 0.5, 2.0] {
        let pade = (q.q() * time).exp();
        assert_matrices_eq(&eigen.p(time), &pade, 1e-8);
    }
}

#[test]
fn non_reversible_model_has_no_eigen_solution() {
    let q = rate_matrix(
        DNA(UNREST),
        &[1.0, 2.0, 0.5, 0.3, 1.0, 2.5, 0.1, 0.8, 1.2, 0.9, 0.4, 3.0],
        None,
    );
    assert!(EigenSolution::new(&q).is_none());
    let cache = TransitionProbabilityCache::default();
    let p = cache.get(&q, 0.4).unwrap();
    assert_matrices_eq(&p, &(q.q() * 0.4).exp(), 1e-12);
}

#[test]
fn zero_frequency_falls_back_to_matrix_exponential() {
    let q = rate_matrix(DNA(HKY), &[2.0], Some(&[0.0, 0.3, 0.3, 0.4]));
    assert!(EigenSolution::new(&q).is_none());
    let cache = TransitionProbabilityCache::default();
    let p = cache.get(&q, 0.3).unwrap();
    for row in p.row_iter() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn long_branches_converge_to_equilibrium() {
    let freqs = [0.1, 0.2, 0.3, 0.4];
    let q = rate_matrix(DNA(HKY), &[2.0], Some(&freqs));
    let cache = TransitionProbabilityCache::default();
    let p = cache.get(&q, 200.0).unwrap();
    for row in p.row_iter() {
        for (x, pi) in row.iter().zip(freqs.iter()) {
            assert_relative_eq!(x, pi, epsilon = 1e-8);
        }
    }
}

#[test]
fn chapman_kolmogorov() {
    let q = rate_matrix(DNA(TN93), &[3.0, 0.5], Some(&[0.22, 0.26, 0.33, 0.19]));
    let cache = TransitionProbabilityCache::default();
    let p1 = cache.get(&q, 0.3).unwrap();
    let p2 = cache.get(&q, 0.4).unwrap();
    let p12 = cache.get(&q, 0.7).unwrap();
    assert_matrices_eq(&(p1.as_ref() * p2.as_ref()), &p12, 1e-10);
}

#[rstest]
#[case::negative(-0.1)]
#[case::nan(f64::NAN)]
#[case::infinite(f64::INFINITY)]
fn invalid_branch_length(#[case] time: f64) {
    let cache = TransitionProbabilityCache::default();
    let q = rate_matrix(DNA(JC69), &[], None);
    let err = cache.get(&q, time).unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::InvalidParameter(_))
    );
}

#[test]
fn repeated_requests_hit_the_cache() {
    let cache = TransitionProbabilityCache::default();
    let q = rate_matrix(DNA(HKY), &[2.0], None);
    let first = cache.get(&q, 0.25).unwrap();
    let second = cache.get(&q, 0.25).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.computations(), 1);
    cache.get(&q, 0.5).unwrap();
    assert_eq!(cache.computations(), 2);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&q));
}

#[test]
fn concurrent_misses_compute_once() {
    let cache = TransitionProbabilityCache::default();
    let q = rate_matrix(Protein(ProteinModelType::LG), &[], None);
    let threads = 16;
    let barrier = Barrier::new(threads);
    let (barrier, shared_cache, q) = (&barrier, &cache, &q);
    let results = thread::scope(|s| {
        let handles = (0..threads)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    shared_cache.get(q, 0.123).unwrap()
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });
    assert_eq!(cache.computations(), 1);
    assert!(results.iter().all(|p| Arc::ptr_eq(p, &results[0])));
}

#[test]
fn oldest_rate_matrices_are_evicted() {
    let cache = TransitionProbabilityCache::new(2);
    let models = [1.0, 2.0, 3.0]
        .iter()
        .map(|&kappa| rate_matrix(DNA(K80), &[kappa], None))
        .collect::<Vec<_>>();
    for q in &models {
        cache.get(q, 0.1).unwrap();
    }
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&models[0]));
    assert!(cache.contains(&models[1]));
    assert!(cache.contains(&models[2]));

    cache.get(&models[0], 0.1).unwrap();
    assert_eq!(cache.computations(), 4);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn oldest_branch_lengths_are_evicted() {
    let cache = TransitionProbabilityCache::new(1).with_branch_length_capacity(100);
    let q = rate_matrix(DNA(HKY), &[], None);
    for i in 1..=2000 {
        cache.get(&q, i as f64 * 1e-3).unwrap();
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.cached_matrices(), 100);
    assert_eq!(cache.computations(), 2000);

    cache.get(&q, 2000.0 * 1e-3).unwrap();
    assert_eq!(cache.computations(), 2000);
    cache.get(&q, 1e-3).unwrap();
    assert_eq!(cache.computations(), 2001);
    assert_eq!(cache.cached_matrices(), 100);
}

#[test]
fn default_cache_bounds_branch_lengths() {
    let cache = TransitionProbabilityCache::default();
    let q = rate_matrix(DNA(K80), &[2.0], None);
    for i in 1..=(DEFAULT_BRANCH_LENGTH_CAPACITY + 10) {
        cache.get(&q, i as f64 * 1e-4).unwrap();
    }
    assert_eq!(cache.cached_matrices(), DEFAULT_BRANCH_LENGTH_CAPACITY);
}

#[test]
fn out_of_simplex_matrix_rejected() {
    let p = SubstMatrix::from_row_slice(2, 2, &[1.1, -0.1, 0.5, 0.5]);
    let err = validate_p(p, 1.0).unwrap_err();
    assert_matches!(
        err.downcast_ref::<PhyloError>(),
        Some(PhyloError::NumericalInstability(_))
    );

    let p = SubstMatrix::from_row_slice(2, 2, &[0.9, 0.2, 0.5, 0.5]);
    assert!(validate_p(p, 1.0).is_err());
}

#[test]
fn round_off_negatives_clamped() {
    let p = SubstMatrix::from_row_slice(2, 2, &[1.0 + 1e-10, -1e-10, 0.5, 0.5]);
    let p = validate_p(p, 1.0).unwrap();
    assert_eq!(p[(0, 1)], 0.0);
}
