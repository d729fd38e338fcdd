//! Spontaneous recombination coefficients built on the quadrature engine.

pub mod dataset;
pub mod integrand;
pub mod recombination;

pub use dataset::{
    AtomicDataset, DatasetError, TransitionRate, TransitionRecord, compute_dataset,
    load_atomic_dataset,
};
pub use integrand::RecombinationIntegrand;
pub use recombination::{
    IntegrationBounds, LevelWeights, RecombinationReport, compute, compute_detailed,
    integration_bounds,
};

/// Precondition failures of a coefficient evaluation. Numerical trouble in
/// the integral is never reported here; it surfaces as diagnostics on the
/// integration result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecombinationError {
    #[error("temperature must be finite and > 0, got {temperature}")]
    InvalidTemperature { temperature: f64 },
    #[error("{role} level index {index} is outside the weight table (len={len})")]
    WeightIndexOutOfRange {
        role: &'static str,
        index: usize,
        len: usize,
    },
    #[error("statistical weight of level {index} must be finite and > 0, got {weight}")]
    NonPositiveWeight { index: usize, weight: f64 },
}
