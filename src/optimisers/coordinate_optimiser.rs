use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use argmin::core::{CostFunction, Executor, State};
use argmin::solver::brent::BrentOpt;
use log::{debug, info, warn};

use crate::errors::PhyloError;
use crate::optimisers::{Objective, OptimisationResult, OptimisationStatus, OptimiserConfig};
use crate::Result;

/// Cost handed to the line search for rejected points.
pub(crate) const REJECTION_PENALTY: f64 = 1e300;

struct CountingObjective<'a, O: Objective> {
    objective: &'a O,
    evaluations: AtomicUsize,
}

impl<'a, O: Objective> CountingObjective<'a, O> {
    fn new(objective: &'a O) -> Self {
        CountingObjective {
            objective,
            evaluations: AtomicUsize::new(0),
        }
    }

    fn logl(&self, params: &[f64]) -> Result<f64> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        Ok(self.objective.evaluate(params)?.log_likelihood())
    }

    fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}

struct SingleCoordinateCost<'a, O: Objective> {
    objective: &'a CountingObjective<'a, O>,
    point: &'a [f64],
    coordinate: usize,
}

impl<O: Objective> CostFunction for SingleCoordinateCost<'_, O> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, value: &f64) -> Result<f64> {
        let mut params = self.point.to_vec();
        params[self.coordinate] = *value;
        let logl = self.objective.logl(&params)?;
        Ok(if logl.is_finite() {
            -logl
        } else {
            REJECTION_PENALTY
        })
    }
}

/// Cyclic coordinate ascent: every coordinate in turn is maximised by a bounded Brent line
/// search, with both bounds evaluated explicitly so that optima on the boundary are hit exactly.
pub struct Optimiser {
    config: OptimiserConfig,
}

impl Optimiser {
    pub fn new(config: OptimiserConfig) -> Self {
        Optimiser { config }
    }

    pub fn config(&self) -> &OptimiserConfig {
        &self.config
    }

    /// Maximises `objective` from `initial` within `bounds`, one `(lower, upper)` pair per
    /// parameter. Coordinates with equal bounds stay fixed.
    pub fn run<O: Objective>(
        &self,
        objective: &O,
        initial: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<OptimisationResult> {
        validate_bounds(initial, bounds)?;
        let objective = CountingObjective::new(objective);
        let mut params = initial.to_vec();
        let initial_logl = objective.logl(&params)?;
        info!("Initial logl: {}.", initial_logl);

        let mut curr_logl = initial_logl;
        let mut iterations = 0;
        let status = 'sweeps: loop {
            if iterations >= self.config.max_iterations {
                warn!(
                    "Optimisation did not converge in {} iteration(s), logl {}",
                    iterations, curr_logl
                );
                break OptimisationStatus::DidNotConverge;
            }
            iterations += 1;
            debug!("Iteration: {}", iterations);
            let prev_logl = curr_logl;
            for (coordinate, &(lower, upper)) in bounds.iter().enumerate() {
                if self.budget_spent(objective.evaluations()) {
                    warn!(
                        "Evaluation budget spent after {} evaluations, logl {}",
                        objective.evaluations(),
                        curr_logl
                    );
                    break 'sweeps OptimisationStatus::BudgetExhausted;
                }
                if lower == upper {
                    continue;
                }
                let (logl, value) =
                    self.line_search(&objective, &params, coordinate, (lower, upper))?;
                if logl > curr_logl {
                    curr_logl = logl;
                    params[coordinate] = value;
                    debug!(
                        "Optimised parameter {} to value {:.5} with logl {:.5}",
                        coordinate, value, curr_logl
                    );
                }
            }
            if curr_logl.is_finite() && curr_logl - prev_logl <= self.config.epsilon {
                break OptimisationStatus::Converged;
            }
        };
        info!(
            "Final logl: {}, achieved in {} iteration(s), {}.",
            curr_logl, iterations, status
        );
        Ok(OptimisationResult {
            params,
            initial_logl,
            final_logl: curr_logl,
            iterations,
            evaluations: objective.evaluations(),
            status,
        })
    }

    fn budget_spent(&self, evaluations: usize) -> bool {
        self.config
            .max_evaluations
            .is_some_and(|max| evaluations >= max)
    }

    /// Best value of one coordinate within `(lower, upper)` with all others fixed, returned
    /// with its log-likelihood.
    fn line_search<O: Objective>(
        &self,
        objective: &CountingObjective<'_, O>,
        point: &[f64],
        coordinate: usize,
        (lower, upper): (f64, f64),
    ) -> Result<(f64, f64)> {
        let start = point[coordinate];
        let cost = SingleCoordinateCost {
            objective,
            point,
            coordinate,
        };
        let brent = BrentOpt::new(lower, upper);
        let res = Executor::new(cost, brent)
            .configure(|state| {
                state
                    .param(start)
                    .max_iters(self.config.line_search_iterations)
            })
            .run()?;
        let state = res.state();
        let mut best = (
            cost_to_logl(state.get_best_cost()),
            state.get_best_param().copied().unwrap_or(start),
        );
        for bound in [lower, upper] {
            let mut params = point.to_vec();
            params[coordinate] = bound;
            let logl = objective.logl(&params)?;
            if logl > best.0 {
                best = (logl, bound);
            }
        }
        Ok(best)
    }
}

fn cost_to_logl(cost: f64) -> f64 {
    if cost >= REJECTION_PENALTY || !cost.is_finite() {
        f64::NEG_INFINITY
    } else {
        -cost
    }
}

fn validate_bounds(initial: &[f64], bounds: &[(f64, f64)]) -> Result<()> {
    if initial.len() != bounds.len() {
        bail!(PhyloError::InvalidParameter(format!(
            "Got {} starting values for {} bounds",
            initial.len(),
            bounds.len()
        )));
    }
    for (i, (&value, &(lower, upper))) in initial.iter().zip(bounds).enumerate() {
        if !lower.is_finite() || !upper.is_finite() || lower > upper {
            bail!(PhyloError::InvalidParameter(format!(
                "Invalid bounds [{}, {}] for parameter {}",
                lower, upper, i
            )));
        }
        if !value.is_finite() || value < lower || value > upper {
            bail!(PhyloError::InvalidParameter(format!(
                "Starting value {} of parameter {} is outside [{}, {}]",
                value, i, lower, upper
            )));
        }
    }
    Ok(())
}
