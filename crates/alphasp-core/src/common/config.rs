//! Run configuration for recombination-rate evaluation.
//!
//! The physical constants are supplied here rather than hard-wired into the
//! kernels so a host simulation can keep them consistent with its own tables.

use super::constants::{NUMAX_LIMIT, PLANCK_OVER_BOLTZMANN};
use crate::numerics::quadrature::QuadratureStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RecombinationConfig {
    #[serde(default = "default_planck_over_boltzmann")]
    pub planck_over_boltzmann: f64,
    #[serde(default = "default_numax_limit")]
    pub numax_limit: f64,
    #[serde(default)]
    pub strategy: QuadratureStrategy,
}

impl Default for RecombinationConfig {
    fn default() -> Self {
        Self {
            planck_over_boltzmann: PLANCK_OVER_BOLTZMANN,
            numax_limit: NUMAX_LIMIT,
            strategy: QuadratureStrategy::default(),
        }
    }
}

impl RecombinationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("planckOverBoltzmann", self.planck_over_boltzmann),
            ("numaxLimit", self.numax_limit),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidConstant { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read recombination config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse recombination config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("config constant '{field}' must be finite and > 0, got {value}")]
    InvalidConstant { field: &'static str, value: f64 },
}

pub fn load_recombination_config(
    config_path: impl AsRef<Path>,
) -> Result<RecombinationConfig, ConfigError> {
    let config_path = config_path.as_ref();
    let source = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
        path: config_path.to_path_buf(),
        source,
    })?;
    let config: RecombinationConfig =
        serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

fn default_planck_over_boltzmann() -> f64 {
    PLANCK_OVER_BOLTZMANN
}

fn default_numax_limit() -> f64 {
    NUMAX_LIMIT
}
