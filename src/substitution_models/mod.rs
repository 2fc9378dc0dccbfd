use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::ops::Div;

use anyhow::bail;
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::alphabets::Alphabet;
use crate::errors::PhyloError;
use crate::evolutionary_models::{DNAModelType, ModelType};
use crate::Result;

pub mod codon_models;
pub mod dna_models;
pub mod protein_models;
pub(crate) mod solved_models;

pub type SubstMatrix = DMatrix<f64>;
pub type FreqVector = DVector<f64>;

#[macro_export]
macro_rules! frequencies {
    ($slice:expr) => {
        FreqVector::from_column_slice($slice)
    };
}

const FREQ_TOLERANCE: f64 = 1e-6;

/// Free parameter of a substitution model with its optimisation bounds.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamDefinition {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub default: f64,
}

impl ParamDefinition {
    pub(crate) fn new(name: &str, lower: f64, upper: f64, default: f64) -> Self {
        Self {
            name: name.to_string(),
            lower,
            upper,
            default,
        }
    }

    pub(crate) fn rate(name: &str, default: f64) -> Self {
        Self::new(name, 1e-6, 100.0, default)
    }
}

/// Content-derived identity of a rate matrix, used as the transition probability cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateMatrixId(u64);

/// Normalised instantaneous rate matrix together with its equilibrium frequencies.
///
/// Off-diagonal entries are non-negative, rows sum to zero and the mean rate at equilibrium is
/// one, so branch lengths are measured in expected substitutions per site.
#[derive(Clone, Debug)]
pub struct RateMatrix {
    model_type: ModelType,
    q: SubstMatrix,
    freqs: FreqVector,
    id: RateMatrixId,
}

impl PartialEq for RateMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.model_type == other.model_type && self.q == other.q && self.freqs == other.freqs
    }
}

impl RateMatrix {
    fn new(model_type: ModelType, q: SubstMatrix, freqs: FreqVector) -> Self {
        let mut hasher = DefaultHasher::new();
        model_type.hash(&mut hasher);
        q.nrows().hash(&mut hasher);
        for value in q.iter().chain(freqs.iter()) {
            value.to_bits().hash(&mut hasher);
        }
        let id = RateMatrixId(hasher.finish());
        RateMatrix {
            model_type,
            q,
            freqs,
            id,
        }
    }

    pub fn q(&self) -> &SubstMatrix {
        &self.q
    }

    pub fn freqs(&self) -> &FreqVector {
        &self.freqs
    }

    pub fn id(&self) -> RateMatrixId {
        self.id
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn n(&self) -> usize {
        self.q.nrows()
    }

    pub fn is_reversible(&self) -> bool {
        self.model_type.is_reversible()
    }

    pub fn rate(&self, i: usize, j: usize) -> f64 {
        self.q[(i, j)]
    }
}

/// A substitution model family with its current parameter values and frequencies.
#[derive(Clone, Debug, PartialEq)]
pub struct SubstitutionModel {
    model_type: ModelType,
    params: Vec<f64>,
    freqs: FreqVector,
}

impl Display for SubstitutionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.model_type)?;
        let definitions = self.parameter_definitions();
        if !definitions.is_empty() {
            let params = definitions
                .iter()
                .zip(self.params.iter())
                .map(|(def, value)| format!("{} = {:.5}", def.name, value))
                .collect::<Vec<_>>();
            write!(f, " with [{}]", params.join(", "))?;
        }
        write!(f, ", frequencies {:?}", self.freqs.as_slice())
    }
}

impl SubstitutionModel {
    /// Creates a model, an empty parameter slice selects the default values.
    ///
    /// # Example
    /// ```
    /// use phyloml::evolutionary_models::{DNAModelType, ModelType};
    /// use phyloml::substitution_models::SubstitutionModel;
    /// let model = SubstitutionModel::new(ModelType::DNA(DNAModelType::K80), &[3.0]).unwrap();
    /// let q = model.rate_matrix().unwrap();
    /// assert!((q.q().row(0).sum()).abs() < 1e-12);
    /// ```
    pub fn new(model_type: ModelType, params: &[f64]) -> Result<Self> {
        let definitions = parameter_definitions(model_type);
        let params = if params.is_empty() {
            definitions.iter().map(|def| def.default).collect()
        } else {
            params.to_vec()
        };
        let model = SubstitutionModel {
            model_type,
            params,
            freqs: default_freqs(model_type),
        };
        model.rate_matrix()?;
        Ok(model)
    }

    pub fn with_freqs(mut self, freqs: &[f64]) -> Result<Self> {
        self.set_freqs(&FreqVector::from_column_slice(freqs))?;
        Ok(self)
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn alphabet(&self) -> Alphabet {
        self.model_type.alphabet()
    }

    pub fn n(&self) -> usize {
        self.alphabet().n()
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    pub fn freqs(&self) -> &FreqVector {
        &self.freqs
    }

    pub fn parameter_definitions(&self) -> Vec<ParamDefinition> {
        parameter_definitions(self.model_type)
    }

    /// Lower and upper bound of every free parameter, in parameter order.
    pub fn parameter_bounds(&self) -> Vec<(f64, f64)> {
        self.parameter_definitions()
            .iter()
            .map(|def| (def.lower, def.upper))
            .collect()
    }

    pub fn set_params(&mut self, params: &[f64]) -> Result<()> {
        self.build_rate_matrix(params, &self.freqs)?;
        self.params = params.to_vec();
        Ok(())
    }

    pub fn set_freqs(&mut self, freqs: &FreqVector) -> Result<()> {
        self.build_rate_matrix(&self.params, freqs)?;
        self.freqs = freqs.clone();
        Ok(())
    }

    /// Rate matrix for the model's current parameters and frequencies.
    pub fn rate_matrix(&self) -> Result<RateMatrix> {
        self.build_rate_matrix(&self.params, &self.freqs)
    }

    /// Builds the normalised rate matrix for the given free parameters and frequencies.
    ///
    /// Fails with `InvalidParameter` for a wrong number of parameters, negative or non-finite
    /// rates, malformed frequencies, or a matrix without any substitution.
    pub fn build_rate_matrix(&self, params: &[f64], freqs: &FreqVector) -> Result<RateMatrix> {
        let n = self.n();
        let definitions = self.parameter_definitions();
        if params.len() != definitions.len() {
            bail!(PhyloError::InvalidParameter(format!(
                "{} takes {} parameter(s), got {}",
                self.model_type,
                definitions.len(),
                params.len()
            )));
        }
        if let Some((def, value)) = definitions
            .iter()
            .zip(params)
            .find(|(_, value)| !value.is_finite() || **value < 0.0)
        {
            bail!(PhyloError::InvalidParameter(format!(
                "Parameter {} must be a non-negative number, got {}",
                def.name, value
            )));
        }
        validate_freqs(freqs, n)?;
        if self.model_type.has_fixed_freqs()
            && self.model_type != ModelType::DNA(DNAModelType::UNREST)
            && freqs.iter().any(|&f| (f - 1.0 / n as f64).abs() > FREQ_TOLERANCE)
        {
            bail!(PhyloError::InvalidParameter(format!(
                "{} requires equal equilibrium frequencies",
                self.model_type
            )));
        }

        let rates = match self.model_type {
            ModelType::DNA(model) => dna_models::dna_rates(model, params),
            ModelType::Protein(model) => protein_models::protein_rates(model),
            ModelType::Codon(_) => codon_models::gy94_rates(params[0], params[1]),
        };
        let freqs = if self.model_type.is_reversible() {
            freqs.clone()
        } else {
            stationary_distribution(&rates)?
        };
        let q = rates_to_q(&rates, &freqs, self.model_type.is_reversible());
        let total = -(0..n).map(|i| freqs[i] * q[(i, i)]).sum::<f64>();
        if !(total.is_finite() && total > 0.0) {
            bail!(PhyloError::InvalidParameter(format!(
                "{} has no substitutions at equilibrium",
                self.model_type
            )));
        }
        debug!("Built {} rate matrix with scaling {}", self.model_type, total);
        Ok(RateMatrix::new(self.model_type, q.div(total), freqs))
    }
}

fn validate_freqs(freqs: &FreqVector, n: usize) -> Result<()> {
    if freqs.len() != n {
        bail!(PhyloError::InvalidParameter(format!(
            "Expected {} equilibrium frequencies, got {}",
            n,
            freqs.len()
        )));
    }
    if freqs.iter().any(|f| !f.is_finite() || *f < 0.0) {
        bail!(PhyloError::InvalidParameter(
            "Equilibrium frequencies must be non-negative".to_string()
        ));
    }
    if (freqs.sum() - 1.0).abs() > FREQ_TOLERANCE {
        bail!(PhyloError::InvalidParameter(format!(
            "Equilibrium frequencies must sum to 1, got {}",
            freqs.sum()
        )));
    }
    Ok(())
}

/// Unnormalised generator: `Q_ij = R_ij * pi_j` for reversible families, `Q_ij = R_ij`
/// otherwise, diagonal set so that rows sum to zero.
fn rates_to_q(rates: &SubstMatrix, freqs: &FreqVector, reversible: bool) -> SubstMatrix {
    let n = rates.nrows();
    let mut q = SubstMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                q[(i, j)] = if reversible {
                    rates[(i, j)] * freqs[j]
                } else {
                    rates[(i, j)]
                };
            }
        }
        q[(i, i)] = -q.row(i).sum();
    }
    q
}

/// Solves `pi Q = 0` with `sum(pi) = 1`.
pub(crate) fn stationary_distribution(rates: &SubstMatrix) -> Result<FreqVector> {
    let n = rates.nrows();
    let q = rates_to_q(rates, &FreqVector::from_element(n, 1.0), false);
    let mut system = q.transpose();
    system.row_mut(n - 1).fill(1.0);
    let mut rhs = FreqVector::zeros(n);
    rhs[n - 1] = 1.0;
    let Some(mut pi) = system.lu().solve(&rhs) else {
        bail!(PhyloError::InvalidParameter(
            "Rate matrix has no unique stationary distribution".to_string()
        ));
    };
    if pi.iter().any(|p| !p.is_finite() || *p < -FREQ_TOLERANCE) {
        bail!(PhyloError::InvalidParameter(
            "Rate matrix has no valid stationary distribution".to_string()
        ));
    }
    pi.iter_mut().for_each(|p| *p = p.max(0.0));
    let total = pi.sum();
    Ok(pi.div(total))
}

pub(crate) fn parameter_definitions(model_type: ModelType) -> Vec<ParamDefinition> {
    match model_type {
        ModelType::DNA(model) => dna_models::dna_definitions(model),
        ModelType::Protein(_) => Vec::new(),
        ModelType::Codon(_) => codon_models::gy94_definitions(),
    }
}

fn default_freqs(model_type: ModelType) -> FreqVector {
    match model_type {
        ModelType::Protein(model) => protein_models::protein_freqs(model),
        _ => model_type.alphabet().uniform_freqs(),
    }
}
