//! Tabulated photoionization cross-sections with a last-bin lookup cache.
//!
//! Cross-sections are interpolated linearly in `log(sigma)` against
//! `log(nu)`. A quadrature run samples frequencies that stay local or move
//! monotonically, so the cache remembers the bin of the previous lookup and
//! the previous sample itself; most queries then skip the bin search.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("photoionization table requires at least 2 frequency points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("photoionization table length mismatch: frequency={frequency}, cross_section={cross_section}")]
    LengthMismatch {
        frequency: usize,
        cross_section: usize,
    },
    #[error("frequency must be finite and > 0 at index {index}, got {value}")]
    InvalidFrequency { index: usize, value: f64 },
    #[error(
        "frequency grid must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasingFrequency {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("cross-section must be finite and >= 0 at index {index}, got {value}")]
    InvalidCrossSection { index: usize, value: f64 },
    #[error("full macro-atom treatment requested for a species that is not a macro species")]
    InconsistentMacroFlags,
}

/// Immutable frequency / cross-section samples and their logarithms.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSectionGrid {
    frequency: Vec<f64>,
    cross_section: Vec<f64>,
    log_frequency: Vec<f64>,
    log_cross_section: Vec<f64>,
}

impl CrossSectionGrid {
    pub fn new(frequency: Vec<f64>, cross_section: Vec<f64>) -> Result<Self, TableError> {
        if frequency.len() != cross_section.len() {
            return Err(TableError::LengthMismatch {
                frequency: frequency.len(),
                cross_section: cross_section.len(),
            });
        }
        if frequency.len() < 2 {
            return Err(TableError::InsufficientPoints {
                actual: frequency.len(),
            });
        }

        for (index, value) in frequency.iter().copied().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(TableError::InvalidFrequency { index, value });
            }
            if index > 0 {
                let previous = frequency[index - 1];
                if value <= previous {
                    return Err(TableError::NonIncreasingFrequency {
                        index,
                        previous,
                        current: value,
                    });
                }
            }
        }
        for (index, value) in cross_section.iter().copied().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(TableError::InvalidCrossSection { index, value });
            }
        }

        let log_frequency = frequency.iter().map(|value| value.ln()).collect();
        // ln(0) = -inf, handled explicitly by `log_interpolate`.
        let log_cross_section = cross_section.iter().map(|value| value.ln()).collect();

        Ok(Self {
            frequency,
            cross_section,
            log_frequency,
            log_cross_section,
        })
    }

    pub fn len(&self) -> usize {
        self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequency.is_empty()
    }

    pub fn frequency(&self) -> &[f64] {
        &self.frequency
    }

    pub fn cross_section(&self) -> &[f64] {
        &self.cross_section
    }

    /// Ionization threshold, the first tabulated frequency.
    pub fn threshold_frequency(&self) -> f64 {
        self.frequency[0]
    }

    pub fn last_frequency(&self) -> f64 {
        self.frequency[self.frequency.len() - 1]
    }

    /// Cache-free evaluation. Safe to call through a shared reference from
    /// any number of threads.
    pub fn interpolate(&self, frequency: f64) -> f64 {
        if frequency < self.threshold_frequency() {
            return 0.0;
        }
        match self.locate(frequency) {
            Lookup::Bin { bin, log_frequency } => self.interpolate_in_bin(bin, log_frequency),
            Lookup::AboveGrid => self.cross_section[self.cross_section.len() - 1],
        }
    }

    fn locate(&self, frequency: f64) -> Lookup {
        let log_frequency = frequency.ln();
        let last = self.log_frequency.len() - 1;
        if log_frequency > self.log_frequency[last] {
            return Lookup::AboveGrid;
        }

        let at_or_below = self
            .log_frequency
            .partition_point(|point| *point <= log_frequency);
        let bin = at_or_below.saturating_sub(1).min(last - 1);
        Lookup::Bin { bin, log_frequency }
    }

    fn interpolate_in_bin(&self, bin: usize, log_frequency: f64) -> f64 {
        let lower = self.log_frequency[bin];
        let upper = self.log_frequency[bin + 1];
        let fraction = (log_frequency - lower) / (upper - lower);
        log_interpolate(
            fraction,
            self.log_cross_section[bin],
            self.log_cross_section[bin + 1],
        )
    }

    fn strictly_inside_bin(&self, bin: usize, frequency: f64) -> bool {
        self.frequency[bin] < frequency && frequency < self.frequency[bin + 1]
    }
}

enum Lookup {
    Bin { bin: usize, log_frequency: f64 },
    AboveGrid,
}

fn log_interpolate(fraction: f64, lower: f64, upper: f64) -> f64 {
    if lower == f64::NEG_INFINITY || upper == f64::NEG_INFINITY {
        if fraction <= 0.0 {
            return lower.exp();
        }
        if fraction >= 1.0 {
            return upper.exp();
        }
        return 0.0;
    }
    ((1.0 - fraction) * lower + fraction * upper).exp()
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedSample {
    frequency: f64,
    value: f64,
}

/// Last-lookup memo for one [`CrossSectionGrid`].
///
/// `evaluate` takes `&mut self`, so a cache has exactly one writer at a time.
/// Workers that share a grid either clone the owning table or call
/// [`CrossSectionGrid::interpolate`] directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrossSectionCache {
    bin: Option<usize>,
    last: Option<CachedSample>,
}

impl CrossSectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_bin(&self) -> Option<usize> {
        self.bin
    }

    pub fn cached_frequency(&self) -> Option<f64> {
        self.last.map(|sample| sample.frequency)
    }

    pub fn cached_value(&self) -> Option<f64> {
        self.last.map(|sample| sample.value)
    }

    pub fn evaluate(&mut self, grid: &CrossSectionGrid, frequency: f64) -> f64 {
        if frequency < grid.threshold_frequency() {
            return 0.0;
        }
        if let Some(sample) = self.last
            && sample.frequency == frequency
        {
            return sample.value;
        }

        if let Some(bin) = self.bin
            && grid.strictly_inside_bin(bin, frequency)
        {
            let value = grid.interpolate_in_bin(bin, frequency.ln());
            self.last = Some(CachedSample { frequency, value });
            return value;
        }

        let value = match grid.locate(frequency) {
            Lookup::Bin { bin, log_frequency } => {
                self.bin = Some(bin);
                grid.interpolate_in_bin(bin, log_frequency)
            }
            // Clamped samples lie outside every bin.
            Lookup::AboveGrid => {
                self.bin = None;
                grid.cross_section[grid.cross_section.len() - 1]
            }
        };
        self.last = Some(CachedSample { frequency, value });
        value
    }
}

/// Level indices into an external statistical-weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLevels {
    /// Bound level the electron recombines into.
    pub lower: usize,
    /// Upper (continuum) level used under full macro-atom treatment.
    pub upper: usize,
    /// Ground state of the next ionization stage.
    pub ion_ground: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesFlags {
    pub is_macro_species: bool,
    pub uses_full_macro_treatment: bool,
}

/// Which weight ratio normalizes the recombination integral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationBranch {
    /// `g_lower / g_upper`, macro species under full macro-atom treatment.
    UpperLevel,
    /// `g_lower / g_ion_ground`, every other species.
    IonGround,
}

/// One photoionization transition: its cross-section grid, the lookup cache
/// paired with that grid, and the level bookkeeping needed to normalize a
/// recombination rate.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoionizationTable {
    grid: CrossSectionGrid,
    cache: CrossSectionCache,
    levels: TransitionLevels,
    flags: SpeciesFlags,
}

impl PhotoionizationTable {
    pub fn new(
        grid: CrossSectionGrid,
        levels: TransitionLevels,
        flags: SpeciesFlags,
    ) -> Result<Self, TableError> {
        if flags.uses_full_macro_treatment && !flags.is_macro_species {
            return Err(TableError::InconsistentMacroFlags);
        }
        Ok(Self {
            grid,
            cache: CrossSectionCache::new(),
            levels,
            flags,
        })
    }

    pub fn from_samples(
        frequency: Vec<f64>,
        cross_section: Vec<f64>,
        levels: TransitionLevels,
        flags: SpeciesFlags,
    ) -> Result<Self, TableError> {
        Self::new(CrossSectionGrid::new(frequency, cross_section)?, levels, flags)
    }

    pub fn grid(&self) -> &CrossSectionGrid {
        &self.grid
    }

    pub fn cache(&self) -> &CrossSectionCache {
        &self.cache
    }

    pub fn levels(&self) -> TransitionLevels {
        self.levels
    }

    pub fn flags(&self) -> SpeciesFlags {
        self.flags
    }

    pub fn normalization_branch(&self) -> NormalizationBranch {
        if self.flags.is_macro_species && self.flags.uses_full_macro_treatment {
            NormalizationBranch::UpperLevel
        } else {
            NormalizationBranch::IonGround
        }
    }

    /// Cross-section at `frequency`, updating this table's cache.
    pub fn evaluate(&mut self, frequency: f64) -> f64 {
        self.cache.evaluate(&self.grid, frequency)
    }
}
