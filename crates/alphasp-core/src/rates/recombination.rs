use super::RecombinationError;
use super::integrand::RecombinationIntegrand;
use crate::common::config::RecombinationConfig;
use crate::common::constants::{ALPHA_SP_CONSTANT, ALPHA_SP_REL_TOL};
use crate::numerics::cross_section::{CrossSectionGrid, NormalizationBranch, PhotoionizationTable};
use crate::numerics::quadrature::{IntegrationResult, QuadratureStrategy, integrate};
use serde::{Deserialize, Serialize};

/// Statistical weights `g` of the atomic levels, indexed by level.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct LevelWeights(Vec<f64>);

impl LevelWeights {
    pub fn new(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn weight(&self, role: &'static str, index: usize) -> Result<f64, RecombinationError> {
        let weight = *self
            .0
            .get(index)
            .ok_or(RecombinationError::WeightIndexOutOfRange {
                role,
                index,
                len: self.0.len(),
            })?;
        if !weight.is_finite() || weight <= 0.0 {
            return Err(RecombinationError::NonPositiveWeight { index, weight });
        }
        Ok(weight)
    }
}

impl From<Vec<f64>> for LevelWeights {
    fn from(weights: Vec<f64>) -> Self {
        Self::new(weights)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationBounds {
    pub lower: f64,
    pub upper: f64,
    /// `upper` was pulled in from the last tabulated frequency because the
    /// Boltzmann factor had already decayed past `exp(-numax_limit)`.
    pub clamped: bool,
}

/// Frequency range of the recombination integral.
///
/// The range starts at the ionization threshold. It ends at the last
/// tabulated frequency unless `h/k (ν_max - ν₀) / T` exceeds the configured
/// limit, in which case it ends where that exponent equals the limit.
pub fn integration_bounds(
    grid: &CrossSectionGrid,
    temperature: f64,
    config: &RecombinationConfig,
) -> IntegrationBounds {
    let lower = grid.threshold_frequency();
    let upper = grid.last_frequency();
    if config.planck_over_boltzmann * (upper - lower) / temperature > config.numax_limit {
        IntegrationBounds {
            lower,
            upper: lower + temperature * config.numax_limit / config.planck_over_boltzmann,
            clamped: true,
        }
    } else {
        IntegrationBounds {
            lower,
            upper,
            clamped: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecombinationReport {
    /// Recombination coefficient in cm³ s⁻¹.
    pub coefficient: f64,
    pub temperature: f64,
    pub bounds: IntegrationBounds,
    pub highest_sampled_frequency: Option<f64>,
    /// Weight ratio applied to the integral.
    pub weight_ratio: f64,
    pub integral: IntegrationResult,
}

pub fn compute(
    table: &mut PhotoionizationTable,
    weights: &LevelWeights,
    temperature: f64,
    strategy: QuadratureStrategy,
    config: &RecombinationConfig,
) -> Result<f64, RecombinationError> {
    compute_detailed(table, weights, temperature, strategy, config).map(|report| report.coefficient)
}

pub fn compute_detailed(
    table: &mut PhotoionizationTable,
    weights: &LevelWeights,
    temperature: f64,
    strategy: QuadratureStrategy,
    config: &RecombinationConfig,
) -> Result<RecombinationReport, RecombinationError> {
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(RecombinationError::InvalidTemperature { temperature });
    }
    let weight_ratio = weight_ratio(table, weights)?;

    let bounds = integration_bounds(table.grid(), temperature, config);
    if bounds.clamped {
        tracing::debug!(
            temperature,
            last_frequency = table.grid().last_frequency(),
            upper = bounds.upper,
            "recombination integral truncated at the numax limit"
        );
    }

    let mut integrand = RecombinationIntegrand::new(table, temperature, config.planck_over_boltzmann);
    let integral = integrate(
        strategy,
        &mut integrand,
        bounds.lower,
        bounds.upper,
        ALPHA_SP_REL_TOL,
    );
    let highest_sampled_frequency = integrand.highest_sampled();

    let coefficient = integral.value * weight_ratio * temperature.powf(-1.5) * ALPHA_SP_CONSTANT;
    Ok(RecombinationReport {
        coefficient,
        temperature,
        bounds,
        highest_sampled_frequency,
        weight_ratio,
        integral,
    })
}

fn weight_ratio(
    table: &PhotoionizationTable,
    weights: &LevelWeights,
) -> Result<f64, RecombinationError> {
    let levels = table.levels();
    let lower = weights.weight("lower", levels.lower)?;
    let reference = match table.normalization_branch() {
        NormalizationBranch::UpperLevel => weights.weight("upper", levels.upper)?,
        NormalizationBranch::IonGround => weights.weight("ion ground", levels.ion_ground)?,
    };
    Ok(lower / reference)
}
