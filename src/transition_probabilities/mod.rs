use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock};

use anyhow::bail;
use hashbrown::HashMap;
use log::{debug, warn};
use nalgebra::SymmetricEigen;

use crate::errors::PhyloError;
use crate::substitution_models::solved_models::solved_p;
use crate::substitution_models::{FreqVector, RateMatrix, RateMatrixId, SubstMatrix};
use crate::{f64_h, Result};

/// `exp(Q t)` for one rate matrix and branch length.
pub type TransitionMatrix = SubstMatrix;

pub const DEFAULT_CACHE_CAPACITY: usize = 256;
/// Branch lengths kept per rate matrix before the oldest ones are dropped.
pub const DEFAULT_BRANCH_LENGTH_CAPACITY: usize = 1024;

const NEGATIVE_TOLERANCE: f64 = 1e-8;
const ROW_SUM_TOLERANCE: f64 = 1e-6;
const RECONSTRUCTION_TOLERANCE: f64 = 1e-8;

type CachedMatrix = std::result::Result<Arc<TransitionMatrix>, PhyloError>;

/// Eigen decomposition of a reversible generator, `Q = U diag(lambda) U^-1`.
#[derive(Debug)]
pub(crate) struct EigenSolution {
    u: SubstMatrix,
    u_inv: SubstMatrix,
    eigenvalues: FreqVector,
}

impl EigenSolution {
    /// Decomposes the symmetrised generator `S = Pi^1/2 Q Pi^-1/2`.
    /// Returns `None` when the frequencies are not all positive or the decomposition does not
    /// reproduce `Q`.
    pub(crate) fn new(rate_matrix: &RateMatrix) -> Option<Self> {
        let q = rate_matrix.q();
        let pi = rate_matrix.freqs();
        if !rate_matrix.is_reversible() || pi.iter().any(|&p| p <= 0.0) {
            return None;
        }
        let sqrt_pi = pi.map(f64::sqrt);
        let n = q.nrows();
        let s = SubstMatrix::from_fn(n, n, |i, j| sqrt_pi[i] * q[(i, j)] / sqrt_pi[j]);
        let s = (&s + s.transpose()) * 0.5;
        let eigen = SymmetricEigen::new(s);
        let v = eigen.eigenvectors;
        let u = SubstMatrix::from_fn(n, n, |i, j| v[(i, j)] / sqrt_pi[i]);
        let u_inv = SubstMatrix::from_fn(n, n, |i, j| v[(j, i)] * sqrt_pi[j]);
        let solution = EigenSolution {
            u,
            u_inv,
            eigenvalues: eigen.eigenvalues,
        };
        let reconstructed = solution.reconstruct();
        let error = (&reconstructed - q).amax();
        if !(error <= RECONSTRUCTION_TOLERANCE) {
            debug!(
                "Eigen decomposition of {} off by {}, using the matrix exponential",
                rate_matrix.model_type(),
                error
            );
            return None;
        }
        Some(solution)
    }

    fn reconstruct(&self) -> SubstMatrix {
        let mut scaled = self.u.clone();
        for (j, &lambda) in self.eigenvalues.iter().enumerate() {
            scaled.column_mut(j).scale_mut(lambda);
        }
        scaled * &self.u_inv
    }

    pub(crate) fn p(&self, time: f64) -> TransitionMatrix {
        let mut scaled = self.u.clone();
        for (j, &lambda) in self.eigenvalues.iter().enumerate() {
            scaled.column_mut(j).scale_mut((lambda * time).exp());
        }
        scaled * &self.u_inv
    }
}

#[derive(Default)]
struct BranchLengthEntries {
    order: VecDeque<f64_h>,
    cells: HashMap<f64_h, Arc<OnceLock<CachedMatrix>>>,
}

struct RateMatrixEntry {
    rate_matrix: RateMatrix,
    eigen: OnceLock<Option<Arc<EigenSolution>>>,
    by_blen: RwLock<BranchLengthEntries>,
    blen_capacity: usize,
}

impl RateMatrixEntry {
    fn new(rate_matrix: &RateMatrix, blen_capacity: usize) -> Self {
        RateMatrixEntry {
            rate_matrix: rate_matrix.clone(),
            eigen: OnceLock::new(),
            by_blen: RwLock::new(BranchLengthEntries::default()),
            blen_capacity,
        }
    }

    /// Cell of one branch length. Cells handed out before an eviction stay valid for their
    /// holders, later requests for an evicted branch length compute it again.
    fn cell(&self, time: f64) -> Arc<OnceLock<CachedMatrix>> {
        let key = f64_h::from(time);
        if let Some(cell) = self
            .by_blen
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .cells
            .get(&key)
        {
            return cell.clone();
        }
        let mut by_blen = self.by_blen.write().unwrap_or_else(|e| e.into_inner());
        if let Some(cell) = by_blen.cells.get(&key) {
            return cell.clone();
        }
        let cell = Arc::new(OnceLock::new());
        by_blen.cells.insert(key, cell.clone());
        by_blen.order.push_back(key);
        while by_blen.order.len() > self.blen_capacity {
            if let Some(evicted) = by_blen.order.pop_front() {
                by_blen.cells.remove(&evicted);
            }
        }
        cell
    }

    fn len(&self) -> usize {
        self.by_blen
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .len()
    }
}

#[derive(Default)]
struct CacheEntries {
    order: VecDeque<RateMatrixId>,
    by_id: HashMap<RateMatrixId, Arc<RateMatrixEntry>>,
}

/// Memoised transition probability matrices keyed by rate matrix identity and branch length.
///
/// Lookups take a shared lock. A miss computes the matrix exactly once, concurrent requests
/// for the same key wait for that computation. Entries are grouped per rate matrix and the
/// oldest group is evicted once more than `capacity` rate matrices are cached. Within a group
/// the oldest branch length is dropped once more than `blen_capacity` are cached.
pub struct TransitionProbabilityCache {
    capacity: usize,
    blen_capacity: usize,
    entries: RwLock<CacheEntries>,
    computations: AtomicUsize,
}

impl Default for TransitionProbabilityCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TransitionProbabilityCache {
    pub fn new(capacity: usize) -> Self {
        TransitionProbabilityCache {
            capacity: capacity.max(1),
            blen_capacity: DEFAULT_BRANCH_LENGTH_CAPACITY,
            entries: RwLock::new(CacheEntries::default()),
            computations: AtomicUsize::new(0),
        }
    }

    pub fn with_branch_length_capacity(mut self, blen_capacity: usize) -> Self {
        self.blen_capacity = blen_capacity.max(1);
        self
    }

    /// Transition probabilities `P(t) = exp(Q t)`.
    ///
    /// Fails with `InvalidParameter` for a negative or non-finite branch length and with
    /// `NumericalInstability` when the result leaves the probability simplex.
    pub fn get(&self, rate_matrix: &RateMatrix, time: f64) -> Result<Arc<TransitionMatrix>> {
        if !time.is_finite() || time < 0.0 {
            bail!(PhyloError::InvalidParameter(format!(
                "Branch length must be a non-negative number, got {}",
                time
            )));
        }
        if time == 0.0 {
            return Ok(Arc::new(TransitionMatrix::identity(
                rate_matrix.n(),
                rate_matrix.n(),
            )));
        }
        let entry = self.entry(rate_matrix);
        if entry.rate_matrix != *rate_matrix {
            warn!("Rate matrix identity clash, computing transition matrix without caching");
            self.computations.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::new(compute_p(
                &RateMatrixEntry::new(rate_matrix, 1),
                time,
            )?));
        }
        let cell = entry.cell(time);
        let result = cell.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::Relaxed);
            compute_p(&entry, time)
                .map(Arc::new)
                .map_err(|e| match e.downcast::<PhyloError>() {
                    Ok(err) => err,
                    Err(other) => PhyloError::NumericalInstability(other.to_string()),
                })
        });
        match result {
            Ok(p) => Ok(p.clone()),
            Err(err) => bail!(err.clone()),
        }
    }

    /// Number of transition matrices computed so far, cache hits excluded.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    /// Number of rate matrices with cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .order
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cached transition matrices over all rate matrices.
    pub fn cached_matrices(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .values()
            .map(|entry| entry.len())
            .sum()
    }

    pub fn contains(&self, rate_matrix: &RateMatrix) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .contains_key(&rate_matrix.id())
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.order.clear();
        entries.by_id.clear();
    }

    fn entry(&self, rate_matrix: &RateMatrix) -> Arc<RateMatrixEntry> {
        let id = rate_matrix.id();
        if let Some(entry) = self
            .entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .get(&id)
        {
            return entry.clone();
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.by_id.get(&id) {
            return entry.clone();
        }
        let entry = Arc::new(RateMatrixEntry::new(rate_matrix, self.blen_capacity));
        entries.by_id.insert(id, entry.clone());
        entries.order.push_back(id);
        while entries.order.len() > self.capacity {
            if let Some(evicted) = entries.order.pop_front() {
                debug!("Evicting transition matrices of rate matrix {:?}", evicted);
                entries.by_id.remove(&evicted);
            }
        }
        entry
    }
}

fn compute_p(entry: &RateMatrixEntry, time: f64) -> Result<TransitionMatrix> {
    let rate_matrix = &entry.rate_matrix;
    let p = if let Some(p) = solved_p(rate_matrix, time) {
        p
    } else {
        let eigen = entry
            .eigen
            .get_or_init(|| EigenSolution::new(rate_matrix).map(Arc::new));
        match eigen {
            Some(eigen) => eigen.p(time),
            None => (rate_matrix.q() * time).exp(),
        }
    };
    validate_p(p, time)
}

/// Clamps round-off negatives and checks that every row is a probability distribution.
pub(crate) fn validate_p(mut p: TransitionMatrix, time: f64) -> Result<TransitionMatrix> {
    if let Some(bad) = p
        .iter()
        .find(|&&x| !x.is_finite() || x < -NEGATIVE_TOLERANCE)
    {
        bail!(PhyloError::NumericalInstability(format!(
            "Transition probability {} for branch length {}",
            bad, time
        )));
    }
    p.iter_mut().for_each(|x| *x = x.max(0.0));
    for (i, row) in p.row_iter().enumerate() {
        let sum = row.sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            bail!(PhyloError::NumericalInstability(format!(
                "Row {} of the transition matrix for branch length {} sums to {}",
                i, time, sum
            )));
        }
    }
    Ok(p)
}

#[cfg(test)]
mod tests;
