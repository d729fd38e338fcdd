//! Interchangeable one-dimensional quadrature strategies.
//!
//! Every strategy approximates `∫ f(x) dx` over `[lower, upper]` to a relative
//! tolerance (absolute tolerance is always zero) and always hands back a
//! finite estimate. Failures are recorded as [`QuadratureFailure`]
//! diagnostics on the [`IntegrationResult`] and logged through `tracing`;
//! they are never returned as errors.
//!
//! | Strategy | Algorithm | Work bound |
//! |----------|-----------|------------|
//! | [`QuadratureStrategy::AdaptiveGlobal`] | 21-point Gauss–Kronrod bisection with epsilon extrapolation, Romberg fallback on round-off | 1000 subintervals |
//! | [`QuadratureStrategy::RombergExtrapolation`] | trapezoid halving + Richardson | 30 levels |
//! | [`QuadratureStrategy::FixedOrderGaussian`] | 31-point Gauss–Kronrod bisection | 1000 subintervals |
//! | [`QuadratureStrategy::AdaptiveSmall`] | as `AdaptiveGlobal` | 100 subintervals |
//! | [`QuadratureStrategy::FixedStepTrapezoid`] | composite trapezoid, optionally self-terminating | 100 doublings or 2^22 panels |
//! | [`QuadratureStrategy::CompositeSimpson`] | composite Simpson, even count | fixed |

mod adaptive;
mod epsilon;
mod gauss_kronrod;
mod newton_cotes;
mod romberg;

pub use gauss_kronrod::{GAUSS_KRONROD_21, GAUSS_KRONROD_31, GaussKronrodRule, RuleEstimate};

use adaptive::{AdaptiveFailure, AdaptiveSettings, integrate_adaptive, integrate_extrapolated};
use newton_cotes::{composite_simpson, fixed_trapezoid, self_terminating_trapezoid};
use romberg::integrate_romberg;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const ADAPTIVE_GLOBAL_LIMIT: usize = 1000;
pub const ADAPTIVE_SMALL_LIMIT: usize = 100;
pub const FIXED_ORDER_LIMIT: usize = 1000;
pub const ROMBERG_MAX_LEVELS: usize = 30;
pub const TRAPEZOID_SUBINTERVALS: usize = 750;
pub const TRAPEZOID_MAX_ITERATIONS: usize = 100;
pub const TRAPEZOID_MAX_SUBINTERVALS: usize = newton_cotes::MAX_TRAPEZOID_SUBINTERVALS;
pub const SIMPSON_SUBINTERVALS: usize = 700;

/// A scalar function sampled by the quadrature rules.
///
/// Any `FnMut(f64) -> f64` closure is an integrand; stateful adapters that
/// carry their own context implement the trait directly.
pub trait Integrand {
    fn evaluate(&mut self, x: f64) -> f64;
}

impl<F> Integrand for F
where
    F: FnMut(f64) -> f64,
{
    fn evaluate(&mut self, x: f64) -> f64 {
        self(x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum QuadratureStrategy {
    #[default]
    AdaptiveGlobal,
    RombergExtrapolation,
    FixedOrderGaussian,
    AdaptiveSmall,
    FixedStepTrapezoid {
        subintervals: usize,
        self_terminating: bool,
    },
    CompositeSimpson {
        subintervals: usize,
    },
}

impl QuadratureStrategy {
    /// Every strategy with its reference parameters.
    pub const REFERENCE_SET: [Self; 7] = [
        Self::AdaptiveGlobal,
        Self::RombergExtrapolation,
        Self::FixedOrderGaussian,
        Self::AdaptiveSmall,
        Self::fixed_step_trapezoid(),
        Self::self_terminating_trapezoid(),
        Self::composite_simpson(),
    ];

    pub const fn fixed_step_trapezoid() -> Self {
        Self::FixedStepTrapezoid {
            subintervals: TRAPEZOID_SUBINTERVALS,
            self_terminating: false,
        }
    }

    pub const fn self_terminating_trapezoid() -> Self {
        Self::FixedStepTrapezoid {
            subintervals: newton_cotes::SELF_TERMINATING_START,
            self_terminating: true,
        }
    }

    pub const fn composite_simpson() -> Self {
        Self::CompositeSimpson {
            subintervals: SIMPSON_SUBINTERVALS,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdaptiveGlobal => "adaptive-global",
            Self::RombergExtrapolation => "romberg-extrapolation",
            Self::FixedOrderGaussian => "fixed-order-gaussian",
            Self::AdaptiveSmall => "adaptive-small",
            Self::FixedStepTrapezoid {
                self_terminating: false,
                ..
            } => "fixed-step-trapezoid",
            Self::FixedStepTrapezoid {
                self_terminating: true,
                ..
            } => "self-terminating-trapezoid",
            Self::CompositeSimpson { .. } => "composite-simpson",
        }
    }
}

impl Display for QuadratureStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quadrature strategy '{0}'")]
pub struct UnknownStrategy(pub String);

impl FromStr for QuadratureStrategy {
    type Err = UnknownStrategy;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        Self::REFERENCE_SET
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| UnknownStrategy(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegrationStatus {
    Converged,
    /// The primary rule hit its round-off floor; the value comes from the
    /// Romberg fallback.
    DegradedFallback,
    /// The tolerance was not demonstrably met; the value is the best estimate
    /// available when the rule stopped.
    BestEffort,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum QuadratureFailure {
    #[error("round-off error prevents the adaptive rule from reaching the requested tolerance")]
    RoundoffLimited,
    #[error("composite Simpson rule needs a positive even number of subintervals, got {subintervals}")]
    OddSubintervalCount { subintervals: usize },
    #[error("maximum number of subintervals ({limit}) reached before convergence")]
    SubdivisionLimit { limit: usize },
    #[error("integrand behaves badly: subinterval at {at} cannot be bisected further")]
    SingularIntegrand { at: f64 },
    #[error("no convergence after {iterations} refinement levels")]
    IterationLimit { iterations: usize },
    #[error("integral appears divergent or converges too slowly to extrapolate")]
    Divergent,
    #[error("integrand returned {count} non-finite samples, replaced with 0")]
    NonFiniteSamples { count: usize },
    #[error("quadrature produced a non-finite estimate, replaced with 0")]
    NonFiniteResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResult {
    pub value: f64,
    /// Absolute error estimate; `None` for fixed-count rules.
    pub abs_error: Option<f64>,
    pub evaluations: usize,
    pub status: IntegrationStatus,
    /// Strategy whose estimate is reported (the fallback rule after a
    /// round-off failure).
    pub strategy: QuadratureStrategy,
    pub diagnostics: Vec<QuadratureFailure>,
}

impl IntegrationResult {
    pub fn is_converged(&self) -> bool {
        self.status == IntegrationStatus::Converged
    }
}

/// Integrate `integrand` over `[lower, upper]` with the chosen strategy.
pub fn integrate<I>(
    strategy: QuadratureStrategy,
    integrand: &mut I,
    lower: f64,
    upper: f64,
    rel_tol: f64,
) -> IntegrationResult
where
    I: Integrand + ?Sized,
{
    let mut run = QuadratureRun::new(strategy, integrand);
    if lower == upper {
        return run.finish(0.0, Some(0.0));
    }

    match strategy {
        QuadratureStrategy::AdaptiveGlobal => {
            run.adaptive_with_fallback(lower, upper, rel_tol, ADAPTIVE_GLOBAL_LIMIT)
        }
        QuadratureStrategy::AdaptiveSmall => {
            run.adaptive_with_fallback(lower, upper, rel_tol, ADAPTIVE_SMALL_LIMIT)
        }
        QuadratureStrategy::FixedOrderGaussian => {
            let settings = AdaptiveSettings::fixed_order(FIXED_ORDER_LIMIT);
            let outcome = integrate_adaptive(&mut run.sampler, lower, upper, rel_tol, settings);
            if let Some(failure) = outcome.failure {
                run.report(adaptive_failure(failure, settings.limit));
            }
            run.finish(outcome.value, Some(outcome.abs_error))
        }
        QuadratureStrategy::RombergExtrapolation => run.romberg(lower, upper, rel_tol),
        QuadratureStrategy::FixedStepTrapezoid {
            subintervals,
            self_terminating: false,
        } => {
            let value = fixed_trapezoid(&mut run.sampler, lower, upper, subintervals);
            run.finish(value, None)
        }
        QuadratureStrategy::FixedStepTrapezoid {
            subintervals,
            self_terminating: true,
        } => {
            let outcome = self_terminating_trapezoid(
                &mut run.sampler,
                lower,
                upper,
                rel_tol,
                subintervals,
                TRAPEZOID_MAX_ITERATIONS,
            );
            if !outcome.converged {
                run.report(if outcome.subintervals >= TRAPEZOID_MAX_SUBINTERVALS {
                    QuadratureFailure::SubdivisionLimit {
                        limit: TRAPEZOID_MAX_SUBINTERVALS,
                    }
                } else {
                    QuadratureFailure::IterationLimit {
                        iterations: outcome.iterations,
                    }
                });
            }
            run.finish(outcome.value, Some(outcome.abs_error))
        }
        QuadratureStrategy::CompositeSimpson { subintervals } => {
            match composite_simpson(&mut run.sampler, lower, upper, subintervals) {
                Some(value) => run.finish(value, None),
                None => {
                    run.report(QuadratureFailure::OddSubintervalCount { subintervals });
                    run.finish(0.0, None)
                }
            }
        }
    }
}

fn adaptive_failure(failure: AdaptiveFailure, limit: usize) -> QuadratureFailure {
    match failure {
        AdaptiveFailure::Roundoff => QuadratureFailure::RoundoffLimited,
        AdaptiveFailure::SubdivisionLimit => QuadratureFailure::SubdivisionLimit { limit },
        AdaptiveFailure::Singular { at } => QuadratureFailure::SingularIntegrand { at },
        AdaptiveFailure::Divergent => QuadratureFailure::Divergent,
    }
}

/// Counts samples and zeroes non-finite ones so every rule stays finite.
struct Sampler<'a, I: ?Sized> {
    integrand: &'a mut I,
    evaluations: usize,
    non_finite: usize,
}

impl<I> Integrand for Sampler<'_, I>
where
    I: Integrand + ?Sized,
{
    fn evaluate(&mut self, x: f64) -> f64 {
        self.evaluations += 1;
        let value = self.integrand.evaluate(x);
        if value.is_finite() {
            value
        } else {
            self.non_finite += 1;
            0.0
        }
    }
}

struct QuadratureRun<'a, I: ?Sized> {
    sampler: Sampler<'a, I>,
    strategy: QuadratureStrategy,
    fallback_used: bool,
    diagnostics: Vec<QuadratureFailure>,
}

impl<'a, I> QuadratureRun<'a, I>
where
    I: Integrand + ?Sized,
{
    fn new(strategy: QuadratureStrategy, integrand: &'a mut I) -> Self {
        Self {
            sampler: Sampler {
                integrand,
                evaluations: 0,
                non_finite: 0,
            },
            strategy,
            fallback_used: false,
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, failure: QuadratureFailure) {
        tracing::warn!(strategy = %self.strategy, "numerical integration error: {failure}");
        self.diagnostics.push(failure);
    }

    fn adaptive_with_fallback(
        mut self,
        lower: f64,
        upper: f64,
        rel_tol: f64,
        limit: usize,
    ) -> IntegrationResult {
        let settings = AdaptiveSettings::extrapolating(limit);
        let outcome = integrate_extrapolated(&mut self.sampler, lower, upper, rel_tol, settings);
        match outcome.failure {
            None => self.finish(outcome.value, Some(outcome.abs_error)),
            Some(AdaptiveFailure::Roundoff) => {
                tracing::info!(
                    strategy = %self.strategy,
                    abs_error = outcome.abs_error,
                    "round-off limited, falling back to Romberg extrapolation"
                );
                self.diagnostics.push(QuadratureFailure::RoundoffLimited);
                self.fallback_used = true;
                self.strategy = QuadratureStrategy::RombergExtrapolation;
                self.romberg(lower, upper, rel_tol)
            }
            Some(failure) => {
                self.report(adaptive_failure(failure, settings.limit));
                self.finish(outcome.value, Some(outcome.abs_error))
            }
        }
    }

    fn romberg(mut self, lower: f64, upper: f64, rel_tol: f64) -> IntegrationResult {
        let outcome = integrate_romberg(&mut self.sampler, lower, upper, rel_tol, ROMBERG_MAX_LEVELS);
        if !outcome.converged {
            self.report(QuadratureFailure::IterationLimit {
                iterations: outcome.levels,
            });
        }
        self.finish(outcome.value, Some(outcome.abs_error))
    }

    fn finish(mut self, value: f64, abs_error: Option<f64>) -> IntegrationResult {
        if self.sampler.non_finite > 0 {
            self.report(QuadratureFailure::NonFiniteSamples {
                count: self.sampler.non_finite,
            });
        }
        let value = if value.is_finite() {
            value
        } else {
            self.report(QuadratureFailure::NonFiniteResult);
            0.0
        };

        let status = if self.diagnostics.is_empty() {
            IntegrationStatus::Converged
        } else if self.fallback_used
            && self
                .diagnostics
                .iter()
                .all(|failure| *failure == QuadratureFailure::RoundoffLimited)
        {
            IntegrationStatus::DegradedFallback
        } else {
            IntegrationStatus::BestEffort
        };

        IntegrationResult {
            value,
            abs_error,
            evaluations: self.sampler.evaluations,
            status,
            strategy: self.strategy,
            diagnostics: self.diagnostics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        IntegrationStatus, QuadratureFailure, QuadratureStrategy, TRAPEZOID_MAX_SUBINTERVALS,
        TRAPEZOID_SUBINTERVALS, integrate,
    };

    fn assert_relative_close(label: &str, expected: f64, actual: f64, rel_tol: f64) {
        let rel_diff = (actual - expected).abs() / expected.abs().max(f64::MIN_POSITIVE);
        assert!(
            rel_diff <= rel_tol,
            "{label} expected={expected:.15e} actual={actual:.15e} rel_diff={rel_diff:.3e} rel_tol={rel_tol:.3e}"
        );
    }

    #[test]
    fn zero_width_interval_is_zero_for_every_strategy() {
        for strategy in QuadratureStrategy::REFERENCE_SET {
            let mut integrand = |x: f64| x * x + 1.0;
            let result = integrate(strategy, &mut integrand, 2.5, 2.5, 1.0e-6);
            assert_eq!(result.value, 0.0, "{strategy}");
            assert_eq!(result.evaluations, 0, "{strategy}");
            assert_eq!(result.status, IntegrationStatus::Converged, "{strategy}");
        }
    }

    #[test]
    fn constant_integrand_matches_interval_width_for_every_strategy() {
        let rel_tol = 1.0e-6;
        for strategy in QuadratureStrategy::REFERENCE_SET {
            let mut integrand = |_x: f64| 1.0;
            let result = integrate(strategy, &mut integrand, -1.5, 4.0, rel_tol);
            assert_relative_close(strategy.as_str(), 5.5, result.value, rel_tol);
            assert!(result.diagnostics.is_empty(), "{strategy}: {:?}", result.diagnostics);
        }
    }

    #[test]
    fn linear_integrand_is_exact_for_polynomial_rules() {
        let rel_tol = 1.0e-8;
        for strategy in [
            QuadratureStrategy::AdaptiveGlobal,
            QuadratureStrategy::RombergExtrapolation,
            QuadratureStrategy::composite_simpson(),
        ] {
            let mut integrand = |x: f64| x;
            let result = integrate(strategy, &mut integrand, 0.0, 10.0, rel_tol);
            assert_relative_close(strategy.as_str(), 50.0, result.value, rel_tol);
            assert_eq!(result.status, IntegrationStatus::Converged);
        }
    }

    #[test]
    fn adaptive_rules_resolve_a_sharp_peak() {
        let expected = (10.0_f64).atan() * 2.0 / 10.0;
        for strategy in [
            QuadratureStrategy::AdaptiveGlobal,
            QuadratureStrategy::FixedOrderGaussian,
            QuadratureStrategy::AdaptiveSmall,
        ] {
            let mut integrand = |x: f64| 1.0 / (1.0 + 100.0 * x * x);
            let result = integrate(strategy, &mut integrand, -1.0, 1.0, 1.0e-8);
            assert_relative_close(strategy.as_str(), expected, result.value, 1.0e-8);
            assert!(result.is_converged());
            assert!(result.abs_error.expect("adaptive error estimate") <= 1.1e-8 * expected);
        }
    }

    #[test]
    fn odd_simpson_count_returns_sentinel_with_one_diagnostic() {
        let mut calls = 0_usize;
        let mut integrand = |x: f64| {
            calls += 1;
            x
        };
        let result = integrate(
            QuadratureStrategy::CompositeSimpson { subintervals: 701 },
            &mut integrand,
            0.0,
            10.0,
            1.0e-4,
        );
        assert_eq!(result.value, 0.0);
        assert_eq!(
            result.diagnostics,
            vec![QuadratureFailure::OddSubintervalCount { subintervals: 701 }]
        );
        assert_eq!(result.status, IntegrationStatus::BestEffort);
        assert_eq!(calls, 0);
    }

    #[test]
    fn small_budget_converges_on_an_integrable_endpoint_singularity() {
        for strategy in [
            QuadratureStrategy::AdaptiveSmall,
            QuadratureStrategy::AdaptiveGlobal,
        ] {
            let mut integrand = |x: f64| x.powf(-0.9);
            let result = integrate(strategy, &mut integrand, 0.0, 1.0, 1.0e-6);
            assert_eq!(result.status, IntegrationStatus::Converged, "{strategy}");
            assert!(result.diagnostics.is_empty(), "{strategy}: {:?}", result.diagnostics);
            assert_relative_close(strategy.as_str(), 10.0, result.value, 1.0e-6);
            assert!(result.evaluations < 21 * super::ADAPTIVE_SMALL_LIMIT, "{strategy}");
        }
    }

    #[test]
    fn zero_simpson_count_is_rejected_like_an_odd_one() {
        let mut integrand = |x: f64| x;
        let result = integrate(
            QuadratureStrategy::CompositeSimpson { subintervals: 0 },
            &mut integrand,
            0.0,
            10.0,
            1.0e-4,
        );
        assert_eq!(result.value, 0.0);
        assert_eq!(result.evaluations, 0);
        assert_eq!(
            result.diagnostics,
            vec![QuadratureFailure::OddSubintervalCount { subintervals: 0 }]
        );
    }

    #[test]
    fn self_terminating_trapezoid_reports_its_panel_cap() {
        let mut integrand = |x: f64| (1.0 / x).sin();
        let result = integrate(
            QuadratureStrategy::self_terminating_trapezoid(),
            &mut integrand,
            1.0e-3,
            1.0,
            1.0e-14,
        );
        assert_eq!(result.status, IntegrationStatus::BestEffort);
        assert_eq!(
            result.diagnostics,
            vec![QuadratureFailure::SubdivisionLimit {
                limit: TRAPEZOID_MAX_SUBINTERVALS,
            }]
        );
        assert_eq!(result.evaluations, TRAPEZOID_MAX_SUBINTERVALS + 1);
    }

    #[test]
    fn roundoff_limited_adaptive_run_falls_back_to_romberg() {
        // The 21-point rule's error floor (50 eps |I|) sits above a 1e-15
        // relative tolerance, so the first pass is round-off limited.
        let rel_tol = 1.0e-15;
        let mut integrand = |x: f64| x * x * x + 1.0;
        let adaptive = integrate(
            QuadratureStrategy::AdaptiveGlobal,
            &mut integrand,
            0.0,
            1.0,
            rel_tol,
        );
        let mut integrand = |x: f64| x * x * x + 1.0;
        let romberg = integrate(
            QuadratureStrategy::RombergExtrapolation,
            &mut integrand,
            0.0,
            1.0,
            rel_tol,
        );

        assert_eq!(adaptive.status, IntegrationStatus::DegradedFallback);
        assert_eq!(adaptive.strategy, QuadratureStrategy::RombergExtrapolation);
        assert_eq!(
            adaptive.diagnostics,
            vec![QuadratureFailure::RoundoffLimited]
        );
        assert_eq!(adaptive.value, romberg.value);
        assert_relative_close("fallback", 1.25, adaptive.value, 1.0e-14);
    }

    #[test]
    fn unresolved_oscillation_is_best_effort() {
        let mut integrand = |x: f64| (1.0 / x).sin();
        let result = integrate(
            QuadratureStrategy::FixedOrderGaussian,
            &mut integrand,
            1.0e-6,
            1.0,
            1.0e-12,
        );
        assert_eq!(result.status, IntegrationStatus::BestEffort);
        assert!(result.value.is_finite());
        assert!(!result.diagnostics.is_empty());
        assert!(result.evaluations <= 31 * (2 * super::FIXED_ORDER_LIMIT));
    }

    #[test]
    fn non_finite_samples_are_reported_and_zeroed() {
        let mut integrand = |x: f64| if x > 0.5 { f64::NAN } else { 1.0 };
        let result = integrate(
            QuadratureStrategy::fixed_step_trapezoid(),
            &mut integrand,
            0.0,
            1.0,
            1.0e-4,
        );
        assert!(result.value.is_finite());
        assert_eq!(result.status, IntegrationStatus::BestEffort);
        assert!(matches!(
            result.diagnostics.as_slice(),
            [QuadratureFailure::NonFiniteSamples { .. }]
        ));
        assert_eq!(result.evaluations, TRAPEZOID_SUBINTERVALS + 1);
    }

    #[test]
    fn strategy_names_round_trip_through_from_str() {
        for strategy in QuadratureStrategy::REFERENCE_SET {
            let parsed: QuadratureStrategy = strategy.as_str().parse().expect("known name");
            assert_eq!(parsed, strategy);
        }
        assert_eq!(
            "ROMBERG_EXTRAPOLATION".parse::<QuadratureStrategy>(),
            Ok(QuadratureStrategy::RombergExtrapolation)
        );
        assert!("gauss-legendre".parse::<QuadratureStrategy>().is_err());
    }

    #[test]
    fn strategy_serializes_with_kind_tag() {
        let json = serde_json::to_string(&QuadratureStrategy::fixed_step_trapezoid())
            .expect("strategy should serialize");
        assert_eq!(
            json,
            r#"{"kind":"fixed-step-trapezoid","subintervals":750,"selfTerminating":false}"#
        );
        let parsed: QuadratureStrategy =
            serde_json::from_str(r#"{"kind":"adaptive-small"}"#).expect("strategy should parse");
        assert_eq!(parsed, QuadratureStrategy::AdaptiveSmall);
    }
}
