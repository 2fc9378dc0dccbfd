#![allow(dead_code)]
/// Random inputs shared by the benchmarks, dev-dependencies are only available here and in tests
use std::time::Duration;

use bio::io::fasta::Record;
use criterion::Criterion;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SEED: u64 = 0x5eed;
pub const NUCLEOTIDES: &[u8] = b"TCAG";
pub const AMINOACIDS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";

pub fn random_sequence(rng: &mut StdRng, chars: &[u8], len: usize) -> Vec<u8> {
    (0..len)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}

/// Copy of `seq` with point substitutions at rate `sub_rate` and single character indels at
/// rate `indel_rate`.
pub fn mutate(rng: &mut StdRng, seq: &[u8], chars: &[u8], sub_rate: f64, indel_rate: f64) -> Vec<u8> {
    let mut mutated = Vec::with_capacity(seq.len());
    for &c in seq {
        if rng.gen_bool(indel_rate) {
            if rng.gen_bool(0.5) {
                continue;
            }
            mutated.push(chars[rng.gen_range(0..chars.len())]);
        }
        if rng.gen_bool(sub_rate) {
            mutated.push(chars[rng.gen_range(0..chars.len())]);
        } else {
            mutated.push(c);
        }
    }
    mutated
}

/// Ungapped alignment of `n` sequences evolved from a common random ancestor.
pub fn random_alignment(n: usize, len: usize, chars: &[u8]) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let ancestor = random_sequence(&mut rng, chars, len);
    (0..n)
        .map(|i| {
            let seq = mutate(&mut rng, &ancestor, chars, 0.2, 0.0);
            Record::with_attrs(&format!("s{}", i), None, &seq)
        })
        .collect()
}

pub fn setup_suite() -> Criterion {
    Criterion::default().measurement_time(Duration::from_secs(20))
}

/// empty on purpose, there are no benches here but the crate still needs
/// to be runnable otherwise criterion crashes
fn main() {}
