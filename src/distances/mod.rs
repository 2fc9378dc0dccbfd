use std::fmt::Display;
use std::sync::Arc;

use anyhow::bail;
use bio::io::fasta::Record;
use log::{debug, info, warn};
use nalgebra::DMatrix;

use crate::alignment::{Alignment, PairwiseAlignment};
use crate::errors::PhyloError;
use crate::likelihood::LikelihoodTree;
use crate::optimisers::{
    LikelihoodObjective, Objective, OptimisationStatus, Optimiser, OptimiserConfig,
};
use crate::pairwise_alignment::{AlignmentScoring, PairwiseAligner};
use crate::phylo_info::PhyloInfo;
use crate::session::AnalysisSession;
use crate::substitution_models::SubstitutionModel;
use crate::tree::Tree;
use crate::Result;

mod closed_form;
pub use closed_form::*;

/// Default upper bound of a distance estimate, in expected substitutions per site.
pub const DEFAULT_MAX_DISTANCE: f64 = 20.0;
/// An estimate this close to the upper bound, relatively, is checked for saturation.
const SATURATION_TOLERANCE: f64 = 1e-3;
/// Relative step below the upper bound used to see whether the likelihood still increases.
const SATURATION_STEP: f64 = 1e-6;
const INITIAL_DISTANCE: f64 = 0.1;

const FIRST: &str = "a";
const SECOND: &str = "b";

/// Maximum likelihood distance of two sequences.
#[derive(Clone, Debug)]
pub struct DistanceEstimate {
    pub distance: f64,
    pub log_likelihood: f64,
    /// Alignment the distance was estimated on.
    pub alignment: PairwiseAlignment,
    /// Model with the fitted parameters when estimated jointly, the input model otherwise.
    pub model: SubstitutionModel,
    pub status: OptimisationStatus,
}

/// Symmetric matrix of pairwise distances with a zero diagonal.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceMatrix {
    pub ids: Vec<String>,
    pub distances: DMatrix<f64>,
    /// Pairs whose estimate was saturated and replaced by the maximum distance.
    pub saturated: Vec<(usize, usize)>,
}

impl DistanceMatrix {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.distances[(i, j)]
    }
}

impl Display for DistanceMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, id) in self.ids.iter().enumerate() {
            write!(f, "{}", id)?;
            for j in 0..self.len() {
                write!(f, "\t{:.6}", self.distances[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Pairwise evolutionary distances under a substitution model.
///
/// Each pair of sequences is aligned, placed on a two-leaf tree and the length of the single
/// path between them is fitted by maximum likelihood in `[0, max_distance]`. Model parameters
/// stay fixed unless `joint` is set.
#[derive(Clone)]
pub struct DistanceEstimator {
    model: SubstitutionModel,
    aligner: PairwiseAligner,
    max_distance: f64,
    joint: bool,
    config: OptimiserConfig,
    session: Arc<AnalysisSession>,
}

impl DistanceEstimator {
    /// Estimator with the default alignment scores for the model's alphabet.
    pub fn new(model: SubstitutionModel) -> Self {
        DistanceEstimator {
            aligner: PairwiseAligner::new(AlignmentScoring::for_alphabet(model.alphabet())),
            model,
            max_distance: DEFAULT_MAX_DISTANCE,
            joint: false,
            config: OptimiserConfig::default(),
            session: AnalysisSession::new(),
        }
    }

    pub fn with_scoring(mut self, scoring: AlignmentScoring) -> Self {
        self.aligner = PairwiseAligner::new(scoring);
        self
    }

    pub fn max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// Fit the model parameters together with the distance.
    pub fn joint(mut self, joint: bool) -> Self {
        self.joint = joint;
        self
    }

    pub fn optimiser_config(mut self, config: OptimiserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_session(mut self, session: Arc<AnalysisSession>) -> Self {
        self.session = session;
        self
    }

    pub fn model(&self) -> &SubstitutionModel {
        &self.model
    }

    pub fn session(&self) -> &Arc<AnalysisSession> {
        &self.session
    }

    fn validate(&self) -> Result<()> {
        if !(self.max_distance > 0.0 && self.max_distance.is_finite()) {
            bail!(PhyloError::InvalidParameter(format!(
                "Maximum distance must be positive and finite, got {}",
                self.max_distance
            )));
        }
        let motif_len = self.model.alphabet().motif_len();
        if self.aligner.scoring().motif_len() != motif_len {
            bail!(PhyloError::InvalidInput(format!(
                "Alignment scoring works on motifs of length {}, the {} needs {}",
                self.aligner.scoring().motif_len(),
                self.model.alphabet(),
                motif_len
            )));
        }
        Ok(())
    }

    /// Aligns two ungapped sequences and estimates their distance.
    ///
    /// Fails with `EmptySequence` for empty input and with `SaturatedDistance` when the
    /// likelihood is still increasing at the maximum distance.
    pub fn estimate(&self, seq_a: &[u8], seq_b: &[u8]) -> Result<DistanceEstimate> {
        self.validate()?;
        let alignment = self.aligner.align(seq_a, seq_b)?;
        let (gapped_a, gapped_b) =
            alignment.gapped_sequences(seq_a, seq_b, self.model.alphabet().motif_len());
        let msa = Alignment::new(
            vec![
                Record::with_attrs(FIRST, None, &gapped_a),
                Record::with_attrs(SECOND, None, &gapped_b),
            ],
            self.model.alphabet(),
        )?;
        let tree = Tree::pair(FIRST, SECOND, INITIAL_DISTANCE.min(self.max_distance))?;
        let info = PhyloInfo::new(tree, Arc::new(msa))?;
        let likelihood_tree = LikelihoodTree::new(info, self.model.clone(), self.session.clone())?;
        self.fit(&likelihood_tree, alignment)
    }

    fn fit(&self, tree: &LikelihoodTree, alignment: PairwiseAlignment) -> Result<DistanceEstimate> {
        let mut objective = LikelihoodObjective::new(tree).max_branch_length(self.max_distance);
        if !self.joint {
            objective = objective.fix_model();
        }
        let branches = tree.tree().branches();
        let first = tree.tree().idx(FIRST)?;
        let second = tree.tree().idx(SECOND)?;
        let position = |idx| branches.iter().position(|branch| *branch == idx);
        let (Some(first), Some(second)) = (position(first), position(second)) else {
            bail!(PhyloError::InvalidInput(
                "Pair tree is missing a leaf branch".to_string()
            ));
        };
        // the whole path sits on the first branch
        let mut bounds = objective.bounds();
        bounds[second] = (0.0, 0.0);
        let mut initial = objective.initial();
        initial[second] = 0.0;

        let result = Optimiser::new(self.config).run(&objective, &initial, &bounds)?;
        if !result.final_logl.is_finite() {
            bail!(PhyloError::NumericalInstability(format!(
                "No finite likelihood for any distance up to {}",
                self.max_distance
            )));
        }
        let distance = result.params[first];
        if self.is_saturated(&objective, &result.params, first, result.final_logl)? {
            bail!(PhyloError::SaturatedDistance {
                distance: self.max_distance
            });
        }

        let params = objective.parameters(&result.params)?;
        let model = if self.joint {
            SubstitutionModel::new(self.model.model_type(), &params.model_params)?
                .with_freqs(self.model.freqs().as_slice())?
        } else {
            self.model.clone()
        };
        debug!(
            "Distance {:.6} with logl {:.6}, {}",
            distance, result.final_logl, result.status
        );
        Ok(DistanceEstimate {
            distance,
            log_likelihood: result.final_logl,
            alignment,
            model,
            status: result.status,
        })
    }

    /// The likelihood at the maximum distance is as good as the fitted one, or the fit sits at
    /// the bound with the likelihood still increasing towards it.
    fn is_saturated(
        &self,
        objective: &LikelihoodObjective<'_>,
        params: &[f64],
        first: usize,
        final_logl: f64,
    ) -> Result<bool> {
        let with_distance = |distance: f64| -> Result<f64> {
            let mut params = params.to_vec();
            params[first] = distance;
            Ok(objective.evaluate(&params)?.log_likelihood())
        };
        let at_bound = with_distance(self.max_distance)?;
        // near saturation the likelihood only changes below f64 resolution
        if at_bound >= final_logl - self.config.epsilon {
            return Ok(true);
        }
        if params[first] < self.max_distance * (1.0 - SATURATION_TOLERANCE) {
            return Ok(false);
        }
        let below = with_distance(self.max_distance * (1.0 - SATURATION_STEP))?;
        Ok(at_bound >= below)
    }

    /// Distances between all pairs of records.
    ///
    /// Saturated pairs get the maximum distance and are listed in `saturated`, every other
    /// failure aborts the whole matrix.
    pub fn distance_matrix(&self, records: &[Record]) -> Result<DistanceMatrix> {
        self.validate()?;
        let n = records.len();
        info!(
            "Estimating {} pairwise distances under {}",
            n * n.saturating_sub(1) / 2,
            self.model
        );
        let pairs = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .collect::<Vec<_>>();
        let estimate_pair = |&(i, j): &(usize, usize)| -> Result<Option<f64>> {
            match self.estimate(records[i].seq(), records[j].seq()) {
                Ok(estimate) => Ok(Some(estimate.distance)),
                Err(err) => match err.downcast_ref::<PhyloError>() {
                    Some(PhyloError::SaturatedDistance { .. }) => Ok(None),
                    _ => Err(err),
                },
            }
        };
        cfg_if::cfg_if! {
        if #[cfg(feature = "parallel")] {
            use rayon::prelude::*;
            let estimates = pairs.par_iter().map(estimate_pair).collect::<Vec<_>>();
        } else {
            let estimates = pairs.iter().map(estimate_pair).collect::<Vec<_>>();
        }
        }

        let mut distances = DMatrix::zeros(n, n);
        let mut saturated = Vec::new();
        for (&(i, j), estimate) in pairs.iter().zip(estimates) {
            let distance = match estimate? {
                Some(distance) => distance,
                None => {
                    warn!(
                        "Distance between {} and {} is saturated, using {}",
                        records[i].id(),
                        records[j].id(),
                        self.max_distance
                    );
                    saturated.push((i, j));
                    self.max_distance
                }
            };
            distances[(i, j)] = distance;
            distances[(j, i)] = distance;
        }
        Ok(DistanceMatrix {
            ids: records.iter().map(|rec| rec.id().to_string()).collect(),
            distances,
            saturated,
        })
    }
}

#[cfg(test)]
mod tests;
