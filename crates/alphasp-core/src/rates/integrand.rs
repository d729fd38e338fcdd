use crate::numerics::cross_section::PhotoionizationTable;
use crate::numerics::quadrature::Integrand;

/// `σ(ν) ν² exp(h/k (ν₀ - ν) / T)` for one transition at one temperature.
///
/// Borrows the table mutably for its lifetime so the cross-section cache has
/// a single writer while the quadrature rule samples it.
#[derive(Debug)]
pub struct RecombinationIntegrand<'a> {
    table: &'a mut PhotoionizationTable,
    temperature: f64,
    threshold: f64,
    planck_over_boltzmann: f64,
    highest_sampled: Option<f64>,
}

impl<'a> RecombinationIntegrand<'a> {
    pub fn new(
        table: &'a mut PhotoionizationTable,
        temperature: f64,
        planck_over_boltzmann: f64,
    ) -> Self {
        let threshold = table.grid().threshold_frequency();
        Self {
            table,
            temperature,
            threshold,
            planck_over_boltzmann,
            highest_sampled: None,
        }
    }

    /// Largest frequency the quadrature rule has asked for so far.
    pub fn highest_sampled(&self) -> Option<f64> {
        self.highest_sampled
    }
}

impl Integrand for RecombinationIntegrand<'_> {
    fn evaluate(&mut self, frequency: f64) -> f64 {
        self.highest_sampled = Some(match self.highest_sampled {
            Some(highest) => highest.max(frequency),
            None => frequency,
        });
        if frequency < self.threshold {
            return 0.0;
        }

        let cross_section = self.table.evaluate(frequency);
        let boltzmann =
            (self.planck_over_boltzmann * (self.threshold - frequency) / self.temperature).exp();
        cross_section * frequency * frequency * boltzmann
    }
}
