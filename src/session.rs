use std::sync::Arc;

use log::info;

use crate::substitution_models::RateMatrix;
use crate::transition_probabilities::{
    TransitionMatrix, TransitionProbabilityCache, DEFAULT_CACHE_CAPACITY,
};
use crate::Result;

/// State shared by every evaluation of one analysis.
///
/// A session owns the transition probability cache. It is created by the caller, shared by
/// `Arc` between likelihood trees and optimisers, and everything cached goes away with it.
pub struct AnalysisSession {
    cache: TransitionProbabilityCache,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::with_cache_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl AnalysisSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_cache_capacity(capacity: usize) -> Self {
        info!(
            "Starting analysis session, caching transition matrices for up to {} rate matrices",
            capacity
        );
        AnalysisSession {
            cache: TransitionProbabilityCache::new(capacity),
        }
    }

    pub fn cache(&self) -> &TransitionProbabilityCache {
        &self.cache
    }

    pub fn transition_matrix(
        &self,
        rate_matrix: &RateMatrix,
        time: f64,
    ) -> Result<Arc<TransitionMatrix>> {
        self.cache.get(rate_matrix, time)
    }
}
