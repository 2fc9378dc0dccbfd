use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use phyloml::pairwise_alignment::{PairwiseAligner, PartialOrderGraph};

mod helpers;
use helpers::{mutate, random_sequence, NUCLEOTIDES, SEED};

const LENGTHS: [usize; 3] = [100, 500, 2000];

fn sequence_pair(len: usize) -> (Vec<u8>, Vec<u8>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let x = random_sequence(&mut rng, NUCLEOTIDES, len);
    let y = mutate(&mut rng, &x, NUCLEOTIDES, 0.1, 0.02);
    (x, y)
}

fn pairwise(criterion: &mut Criterion) {
    let aligner = PairwiseAligner::default();
    let mut group = criterion.benchmark_group("Pairwise alignment");
    for len in LENGTHS {
        let pair = sequence_pair(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &pair, |bench, (x, y)| {
            bench.iter(|| black_box(aligner.align(x, y)))
        });
    }
    group.finish();
}

fn partial_order(criterion: &mut Criterion) {
    let aligner = PairwiseAligner::default();
    let mut group = criterion.benchmark_group("Partial order alignment");
    for len in LENGTHS {
        let mut rng = StdRng::seed_from_u64(SEED);
        let ancestor = random_sequence(&mut rng, NUCLEOTIDES, len);
        let mut graph =
            PartialOrderGraph::from_sequence(&ancestor, 1).expect("random sequence is not empty");
        for _ in 0..4 {
            let seq = mutate(&mut rng, &ancestor, NUCLEOTIDES, 0.1, 0.02);
            graph
                .add_sequence(&aligner, &seq)
                .expect("random sequence fits the graph");
        }
        let query = mutate(&mut rng, &ancestor, NUCLEOTIDES, 0.1, 0.02);
        group.bench_with_input(BenchmarkId::from_parameter(len), &query, |bench, query| {
            bench.iter(|| black_box(aligner.align_to_graph(&graph, query)))
        });
    }
    group.finish();
}

criterion_group! {
name = aligner;
config = helpers::setup_suite();
targets = pairwise, partial_order,
}
criterion_main!(aligner);
