use std::f64::consts::LN_2;
use std::fmt::Display;
use std::ops::Range;
use std::sync::Arc;

use anyhow::bail;
use log::debug;
use nalgebra::DMatrix;

use crate::errors::{phylo_error, PhyloError};
use crate::phylo_info::PhyloInfo;
use crate::session::AnalysisSession;
use crate::substitution_models::{FreqVector, RateMatrix, SubstitutionModel};
use crate::transition_probabilities::TransitionMatrix;
use crate::tree::{check_blen, NodeIdx::Leaf, Tree};
use crate::Result;

/// Partial likelihoods are rescaled by 2^SCALE_EXPONENT once a column maximum falls below
/// 2^-SCALE_EXPONENT.
pub const SCALE_EXPONENT: i32 = 256;

pub const DEFAULT_CHUNK_SIZE: usize = 512;

/// Everything a likelihood evaluation depends on that can change between evaluations.
///
/// Branch lengths are indexed by node, the root entry is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParameters {
    pub blens: Vec<f64>,
    pub model_params: Vec<f64>,
    pub freqs: FreqVector,
}

impl TreeParameters {
    pub fn new(tree: &Tree, model: &SubstitutionModel) -> Self {
        TreeParameters {
            blens: tree.iter().map(|node| node.blen).collect(),
            model_params: model.params().to_vec(),
            freqs: model.freqs().clone(),
        }
    }
}

/// Why an evaluation produced no finite log-likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    Numerical,
    Degenerate { column: usize },
}

/// Outcome of an evaluation. Rejected points have a log-likelihood of negative infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    Finite(f64),
    Rejected(Rejection),
}

impl Evaluation {
    pub fn log_likelihood(&self) -> f64 {
        match self {
            Evaluation::Finite(logl) => *logl,
            Evaluation::Rejected(_) => f64::NEG_INFINITY,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Evaluation::Rejected(_))
    }
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Evaluation::Finite(logl) => write!(f, "{}", logl),
            Evaluation::Rejected(Rejection::Numerical) => write!(f, "rejected (numerical)"),
            Evaluation::Rejected(Rejection::Degenerate { column }) => {
                write!(f, "rejected (zero likelihood at column {})", column)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LikelihoodOptions {
    /// Number of alignment columns evaluated together, and the unit of parallel work.
    pub chunk_size: usize,
}

impl Default for LikelihoodOptions {
    fn default() -> Self {
        LikelihoodOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl LikelihoodOptions {
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

/// Felsenstein pruning over a fixed tree and alignment.
///
/// The tree topology, the alignment and the leaf encodings are fixed at construction, branch
/// lengths and model parameters come with every evaluation. Transition matrices are taken from
/// the session cache, so evaluations that share branch lengths share the work.
#[derive(Clone)]
pub struct LikelihoodTree {
    info: PhyloInfo,
    model: SubstitutionModel,
    session: Arc<AnalysisSession>,
    options: LikelihoodOptions,
}

impl LikelihoodTree {
    /// Fails with `InvalidInput` if the model and the alignment use different alphabets.
    pub fn new(
        info: PhyloInfo,
        model: SubstitutionModel,
        session: Arc<AnalysisSession>,
    ) -> Result<Self> {
        if model.alphabet().alphabet_type() != info.alphabet().alphabet_type() {
            bail!(PhyloError::InvalidInput(format!(
                "{} model cannot be used with a {}",
                model.model_type(),
                info.alphabet()
            )));
        }
        Ok(LikelihoodTree {
            info,
            model,
            session,
            options: LikelihoodOptions::default(),
        })
    }

    pub fn with_options(mut self, options: LikelihoodOptions) -> Self {
        self.options = options;
        self
    }

    pub fn info(&self) -> &PhyloInfo {
        &self.info
    }

    pub fn tree(&self) -> &Tree {
        &self.info.tree
    }

    pub fn model(&self) -> &SubstitutionModel {
        &self.model
    }

    pub fn session(&self) -> &Arc<AnalysisSession> {
        &self.session
    }

    /// Parameters currently stored in the tree and the model.
    pub fn parameters(&self) -> TreeParameters {
        TreeParameters::new(&self.info.tree, &self.model)
    }

    /// Log-likelihood of the alignment, all errors are returned.
    pub fn log_likelihood(&self, params: TreeParameters) -> Result<f64> {
        let logl = self.per_column_log_likelihoods(params)?.iter().sum();
        debug!("Log-likelihood {}", logl);
        Ok(logl)
    }

    /// Evaluates the log-likelihood, turning numerical failures into a rejected evaluation.
    /// Structural errors such as invalid parameters are still returned as errors.
    pub fn evaluate(&self, params: TreeParameters) -> Result<Evaluation> {
        match self.log_likelihood(params) {
            Ok(logl) if logl.is_nan() || logl == f64::INFINITY => {
                Ok(Evaluation::Rejected(Rejection::Numerical))
            }
            Ok(logl) => Ok(Evaluation::Finite(logl)),
            Err(err) => match phylo_error(&err) {
                Some(PhyloError::DegenerateLikelihood { column }) => {
                    debug!("Rejected evaluation, {}", err);
                    Ok(Evaluation::Rejected(Rejection::Degenerate { column: *column }))
                }
                Some(PhyloError::NumericalInstability(_)) => {
                    debug!("Rejected evaluation, {}", err);
                    Ok(Evaluation::Rejected(Rejection::Numerical))
                }
                _ => Err(err),
            },
        }
    }

    /// Log-likelihood of every alignment column. The root distribution is the stationary
    /// distribution of the rate matrix.
    pub fn per_column_log_likelihoods(&self, params: TreeParameters) -> Result<Vec<f64>> {
        let rate_matrix = self
            .model
            .build_rate_matrix(&params.model_params, &params.freqs)?;
        let transitions = self.transition_matrices(&rate_matrix, &params.blens)?;
        let freqs = rate_matrix.freqs();
        let msa_len = self.info.msa_length();
        let chunk_size = self.options.chunk_size;
        let chunks = (0..msa_len)
            .step_by(chunk_size)
            .map(|start| start..(start + chunk_size).min(msa_len))
            .collect::<Vec<_>>();

        cfg_if::cfg_if! {
        if #[cfg(feature = "parallel")] {
            use rayon::prelude::*;
            let per_chunk = chunks
                .into_par_iter()
                .map(|range| self.chunk_log_likelihoods(&transitions, freqs, range))
                .collect::<Vec<_>>();
        } else {
            let per_chunk = chunks
                .into_iter()
                .map(|range| self.chunk_log_likelihoods(&transitions, freqs, range))
                .collect::<Vec<_>>();
        }
        }

        let mut per_column = Vec::with_capacity(msa_len);
        for chunk in per_chunk {
            per_column.extend(chunk?);
        }
        Ok(per_column)
    }

    /// Transition matrix of every branch, indexed by node. The root has none.
    fn transition_matrices(
        &self,
        rate_matrix: &RateMatrix,
        blens: &[f64],
    ) -> Result<Vec<Option<Arc<TransitionMatrix>>>> {
        let tree = &self.info.tree;
        if blens.len() != tree.len() {
            bail!(PhyloError::InvalidParameter(format!(
                "Expected {} branch lengths, got {}",
                tree.len(),
                blens.len()
            )));
        }
        tree.iter()
            .map(|node| {
                if node.idx == tree.root {
                    return Ok(None);
                }
                let blen = blens[usize::from(node.idx)];
                check_blen(blen)?;
                Ok(Some(self.session.transition_matrix(rate_matrix, blen)?))
            })
            .collect()
    }

    fn chunk_log_likelihoods(
        &self,
        transitions: &[Option<Arc<TransitionMatrix>>],
        freqs: &FreqVector,
        range: Range<usize>,
    ) -> Result<Vec<f64>> {
        let tree = &self.info.tree;
        let n = self.model.n();
        let width = range.len();
        let mut node_info: Vec<Option<DMatrix<f64>>> = vec![None; tree.len()];
        let mut scale_counts = vec![0u32; width];

        for node_idx in tree.postorder() {
            let idx = usize::from(node_idx);
            let partial = match node_idx {
                Leaf(_) => self
                    .info
                    .leaf_encoding(node_idx)?
                    .columns(range.start, width)
                    .into_owned(),
                _ => {
                    let mut partial = DMatrix::from_element(n, width, 1.0);
                    for child in tree.children(node_idx) {
                        if let Some(child_info) = node_info[usize::from(child)].take() {
                            partial.component_mul_assign(&child_info);
                            rescale(&mut partial, &mut scale_counts);
                        }
                    }
                    partial
                }
            };
            node_info[idx] = Some(match &transitions[idx] {
                Some(p) => p.as_ref() * partial,
                None => partial,
            });
        }

        let Some(root_info) = node_info[usize::from(tree.root)].take() else {
            bail!(PhyloError::InvalidInput("Tree has no root".to_string()));
        };
        let likelihood = freqs.transpose() * root_info;
        let log_scale = SCALE_EXPONENT as f64 * LN_2;
        likelihood
            .iter()
            .zip(scale_counts)
            .enumerate()
            .map(|(j, (&lik, count))| {
                if lik == 0.0 {
                    bail!(PhyloError::DegenerateLikelihood {
                        column: range.start + j
                    });
                }
                if !lik.is_finite() || lik < 0.0 {
                    bail!(PhyloError::NumericalInstability(format!(
                        "Likelihood {} at column {}",
                        lik,
                        range.start + j
                    )));
                }
                Ok(lik.ln() - count as f64 * log_scale)
            })
            .collect()
    }
}

/// Scales up every column whose largest entry underflows the threshold, counting how often.
fn rescale(partial: &mut DMatrix<f64>, scale_counts: &mut [u32]) {
    let factor = 2f64.powi(SCALE_EXPONENT);
    let threshold = 2f64.powi(-SCALE_EXPONENT);
    for (mut column, count) in partial.column_iter_mut().zip(scale_counts.iter_mut()) {
        let mut max = column.max();
        while max > 0.0 && max < threshold {
            column *= factor;
            max *= factor;
            *count += 1;
        }
    }
}
