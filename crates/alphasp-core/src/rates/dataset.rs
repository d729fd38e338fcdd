//! JSON description of a set of bound-free transitions and the batch driver
//! that evaluates every one of them at a single temperature.

use super::RecombinationError;
use super::recombination::{LevelWeights, RecombinationReport, compute_detailed};
use crate::common::config::RecombinationConfig;
use crate::numerics::cross_section::{
    PhotoionizationTable, SpeciesFlags, TableError, TransitionLevels,
};
use crate::numerics::quadrature::QuadratureStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AtomicDataset {
    /// Treat macro species with the simplified two-level scheme.
    #[serde(default)]
    pub macro_simple: bool,
    pub level_weights: LevelWeights,
    pub transitions: Vec<TransitionRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransitionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub lower_level: usize,
    pub upper_level: usize,
    pub ion_ground_level: usize,
    #[serde(default)]
    pub is_macro_species: bool,
    pub frequency: Vec<f64>,
    pub cross_section: Vec<f64>,
}

impl TransitionRecord {
    pub fn levels(&self) -> TransitionLevels {
        TransitionLevels {
            lower: self.lower_level,
            upper: self.upper_level,
            ion_ground: self.ion_ground_level,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read atomic dataset '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse atomic dataset '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("transition {index}: {source}")]
    Table { index: usize, source: TableError },
    #[error("transition {index}: {source}")]
    Recombination {
        index: usize,
        source: RecombinationError,
    },
}

impl DatasetError {
    pub fn transition_index(&self) -> Option<usize> {
        match self {
            Self::Table { index, .. } | Self::Recombination { index, .. } => Some(*index),
            Self::Read { .. } | Self::Parse { .. } => None,
        }
    }
}

pub fn load_atomic_dataset(path: impl AsRef<Path>) -> Result<AtomicDataset, DatasetError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&source).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl AtomicDataset {
    pub fn species_flags(&self, record: &TransitionRecord) -> SpeciesFlags {
        SpeciesFlags {
            is_macro_species: record.is_macro_species,
            uses_full_macro_treatment: record.is_macro_species && !self.macro_simple,
        }
    }

    /// Build one validated table per transition, in dataset order.
    pub fn tables(&self) -> Result<Vec<PhotoionizationTable>, DatasetError> {
        self.transitions
            .iter()
            .enumerate()
            .map(|(index, record)| {
                PhotoionizationTable::from_samples(
                    record.frequency.clone(),
                    record.cross_section.clone(),
                    record.levels(),
                    self.species_flags(record),
                )
                .map_err(|source| DatasetError::Table { index, source })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRate {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub report: RecombinationReport,
    pub elapsed_seconds: f64,
}

/// Recombination coefficient of every transition in `dataset` at
/// `temperature`, in dataset order. Stops at the first transition whose table
/// or weights are invalid.
pub fn compute_dataset(
    dataset: &AtomicDataset,
    temperature: f64,
    strategy: QuadratureStrategy,
    config: &RecombinationConfig,
) -> Result<Vec<TransitionRate>, DatasetError> {
    let tables = dataset.tables()?;
    let mut rates = Vec::with_capacity(tables.len());

    for (index, (mut table, record)) in tables.into_iter().zip(&dataset.transitions).enumerate() {
        let started = Instant::now();
        let report = compute_detailed(
            &mut table,
            &dataset.level_weights,
            temperature,
            strategy,
            config,
        )
        .map_err(|source| DatasetError::Recombination { index, source })?;
        let elapsed_seconds = started.elapsed().as_secs_f64();

        tracing::debug!(
            index,
            coefficient = report.coefficient,
            status = ?report.integral.status,
            evaluations = report.integral.evaluations,
            "transition complete"
        );
        rates.push(TransitionRate {
            index,
            label: record.label.clone(),
            report,
            elapsed_seconds,
        });
    }

    Ok(rates)
}
