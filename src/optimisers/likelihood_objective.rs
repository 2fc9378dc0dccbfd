use anyhow::bail;
use log::{debug, info, warn};

use crate::errors::PhyloError;
use crate::evolutionary_models::FrequencyOptimisation;
use crate::likelihood::{Evaluation, LikelihoodTree, TreeParameters};
use crate::optimisers::{Objective, OptimisationStatus, Optimiser, OptimiserConfig};
use crate::substitution_models::{FreqVector, SubstitutionModel};
use crate::tree::{NodeIdx, Tree};
use crate::Result;

/// Upper bound of a branch length during fitting.
pub const MAX_BRANCH_LENGTH: f64 = 20.0;

/// Log-likelihood of a `LikelihoodTree` as a function of a flat parameter vector.
///
/// The layout is the lengths of all branches in node order followed by the free parameters of
/// the model. Either group can be fixed, it then keeps the values stored in the tree and model
/// and disappears from the vector.
pub struct LikelihoodObjective<'a> {
    tree: &'a LikelihoodTree,
    branches: Vec<NodeIdx>,
    optimise_blens: bool,
    optimise_model: bool,
    max_blen: f64,
    freqs: FreqVector,
}

impl<'a> LikelihoodObjective<'a> {
    pub fn new(tree: &'a LikelihoodTree) -> Self {
        LikelihoodObjective {
            branches: tree.tree().branches(),
            optimise_blens: true,
            optimise_model: true,
            max_blen: MAX_BRANCH_LENGTH,
            freqs: tree.model().freqs().clone(),
            tree,
        }
    }

    pub fn fix_branch_lengths(mut self) -> Self {
        self.optimise_blens = false;
        self
    }

    pub fn fix_model(mut self) -> Self {
        self.optimise_model = false;
        self
    }

    pub fn max_branch_length(mut self, max_blen: f64) -> Self {
        self.max_blen = max_blen;
        self
    }

    /// Equilibrium frequencies used instead of the model's own.
    pub fn with_freqs(mut self, freqs: FreqVector) -> Result<Self> {
        let model = self.tree.model();
        model.build_rate_matrix(model.params(), &freqs)?;
        self.freqs = freqs;
        Ok(self)
    }

    pub fn freqs(&self) -> &FreqVector {
        &self.freqs
    }

    fn blen_count(&self) -> usize {
        if self.optimise_blens {
            self.branches.len()
        } else {
            0
        }
    }

    fn model_param_count(&self) -> usize {
        if self.optimise_model {
            self.tree.model().params().len()
        } else {
            0
        }
    }

    pub fn len(&self) -> usize {
        self.blen_count() + self.model_param_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current values from the tree and the model, moved inside the bounds.
    pub fn initial(&self) -> Vec<f64> {
        let tree = self.tree.tree();
        let blens = self
            .branches
            .iter()
            .map(|branch| tree.blen(branch))
            .take(self.blen_count());
        let model_params = self
            .tree
            .model()
            .params()
            .iter()
            .copied()
            .take(self.model_param_count());
        blens
            .chain(model_params)
            .zip(self.bounds())
            .map(|(value, (lower, upper))| value.clamp(lower, upper))
            .collect()
    }

    pub fn bounds(&self) -> Vec<(f64, f64)> {
        let blen_bounds = std::iter::repeat((0.0, self.max_blen)).take(self.blen_count());
        let model_bounds = self
            .tree
            .model()
            .parameter_bounds()
            .into_iter()
            .take(self.model_param_count());
        blen_bounds.chain(model_bounds).collect()
    }

    /// Full evaluation parameters for a point of the flat vector.
    pub fn parameters(&self, params: &[f64]) -> Result<TreeParameters> {
        if params.len() != self.len() {
            bail!(PhyloError::InvalidParameter(format!(
                "Expected {} parameters, got {}",
                self.len(),
                params.len()
            )));
        }
        let mut tree_params = self.tree.parameters();
        tree_params.freqs = self.freqs.clone();
        let (blens, model_params) = params.split_at(self.blen_count());
        for (branch, blen) in self.branches.iter().zip(blens) {
            tree_params.blens[usize::from(branch)] = *blen;
        }
        if self.optimise_model {
            tree_params.model_params = model_params.to_vec();
        }
        Ok(tree_params)
    }
}

impl Objective for LikelihoodObjective<'_> {
    fn evaluate(&self, params: &[f64]) -> Result<Evaluation> {
        self.tree.evaluate(self.parameters(params)?)
    }
}

/// Maximum likelihood branch lengths and model parameters.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub model: SubstitutionModel,
    pub tree: Tree,
    pub log_likelihood: f64,
    pub status: OptimisationStatus,
    pub iterations: usize,
}

/// Fits branch lengths and model parameters of `tree` jointly, with frequencies chosen by
/// `freq_opt`.
pub fn fit_model(
    tree: &LikelihoodTree,
    config: OptimiserConfig,
    freq_opt: FrequencyOptimisation,
) -> Result<FittedModel> {
    let model_type = tree.model().model_type();
    info!("Fitting {} on {} leaves.", model_type, tree.tree().n());
    let freqs = match freq_opt {
        FrequencyOptimisation::Fixed => tree.model().freqs().clone(),
        _ if model_type.has_fixed_freqs() => {
            debug!("{} has fixed frequencies, ignoring {:?}", model_type, freq_opt);
            tree.model().freqs().clone()
        }
        FrequencyOptimisation::Empirical => tree.info().freqs(),
        FrequencyOptimisation::Estimated => {
            warn!("Frequency estimation is not available, using empirical frequencies");
            tree.info().freqs()
        }
    };
    let objective = LikelihoodObjective::new(tree).with_freqs(freqs)?;
    let result =
        Optimiser::new(config).run(&objective, &objective.initial(), &objective.bounds())?;

    let params = objective.parameters(&result.params)?;
    let mut fitted_tree = tree.tree().clone();
    for branch in fitted_tree.branches() {
        fitted_tree.set_blen(&branch, params.blens[usize::from(branch)])?;
    }
    let model = SubstitutionModel::new(model_type, &params.model_params)?
        .with_freqs(params.freqs.as_slice())?;
    info!("Fitted {}", model);
    Ok(FittedModel {
        model,
        tree: fitted_tree,
        log_likelihood: result.final_logl,
        status: result.status,
        iterations: result.iterations,
    })
}
