use std::fmt::Display;

use crate::likelihood::Evaluation;
use crate::Result;

mod coordinate_optimiser;
mod likelihood_objective;
pub use coordinate_optimiser::*;
pub use likelihood_objective::*;

pub const DEFAULT_EPSILON: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Function maximised by the optimiser. Rejected evaluations count as negative infinity.
pub trait Objective {
    fn evaluate(&self, params: &[f64]) -> Result<Evaluation>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimiserConfig {
    /// Minimum log-likelihood gain of a full sweep over all coordinates to keep going.
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Objective evaluation budget, checked between line searches.
    pub max_evaluations: Option<usize>,
    /// Iteration limit of a single Brent line search.
    pub line_search_iterations: u64,
}

impl Default for OptimiserConfig {
    fn default() -> Self {
        OptimiserConfig {
            epsilon: DEFAULT_EPSILON,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_evaluations: None,
            line_search_iterations: 100,
        }
    }
}

impl OptimiserConfig {
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisationStatus {
    Converged,
    /// Iteration limit reached, the best point so far is returned.
    DidNotConverge,
    /// Evaluation budget spent, the best point so far is returned.
    BudgetExhausted,
}

impl Display for OptimisationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimisationStatus::Converged => write!(f, "converged"),
            OptimisationStatus::DidNotConverge => write!(f, "did not converge"),
            OptimisationStatus::BudgetExhausted => write!(f, "evaluation budget exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationResult {
    pub params: Vec<f64>,
    pub initial_logl: f64,
    pub final_logl: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub status: OptimisationStatus,
}

impl OptimisationResult {
    pub fn converged(&self) -> bool {
        self.status == OptimisationStatus::Converged
    }
}
