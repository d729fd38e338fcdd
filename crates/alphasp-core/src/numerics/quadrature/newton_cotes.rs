//! Composite trapezoid and Simpson rules on uniform grids.

use super::Integrand;

/// Initial subinterval count of the self-terminating trapezoid rule.
pub(super) const SELF_TERMINATING_START: usize = 16;

/// Refinement stops once the grid reaches this many subintervals (18
/// doublings from [`SELF_TERMINATING_START`]), whichever iteration cap the
/// caller asked for.
pub(super) const MAX_TRAPEZOID_SUBINTERVALS: usize = 1 << 22;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct TrapezoidOutcome {
    pub(super) value: f64,
    pub(super) abs_error: f64,
    pub(super) converged: bool,
    pub(super) iterations: usize,
    /// Panel count of the final estimate.
    pub(super) subintervals: usize,
}

/// Composite trapezoid rule with `subintervals` panels (`subintervals + 1`
/// samples). A count of zero is treated as one.
pub(super) fn fixed_trapezoid<I>(integrand: &mut I, lower: f64, upper: f64, subintervals: usize) -> f64
where
    I: Integrand + ?Sized,
{
    let n = subintervals.max(1);
    let h = (upper - lower) / n as f64;
    let mut sum = 0.5 * (integrand.evaluate(lower) + integrand.evaluate(upper));
    for i in 1..n {
        sum += integrand.evaluate(lower + i as f64 * h);
    }
    sum * h
}

/// Trapezoid rule that doubles its panel count, reusing previous samples,
/// until two successive estimates agree to `rel_tol`.
pub(super) fn self_terminating_trapezoid<I>(
    integrand: &mut I,
    lower: f64,
    upper: f64,
    rel_tol: f64,
    start: usize,
    max_iterations: usize,
) -> TrapezoidOutcome
where
    I: Integrand + ?Sized,
{
    let mut n = start.max(1);
    let mut estimate = fixed_trapezoid(integrand, lower, upper, n);
    let mut outcome = TrapezoidOutcome {
        value: estimate,
        abs_error: f64::INFINITY,
        converged: false,
        iterations: 0,
        subintervals: n,
    };

    for iteration in 1..=max_iterations {
        if n >= MAX_TRAPEZOID_SUBINTERVALS {
            break;
        }
        let h = (upper - lower) / (2 * n) as f64;
        let mut midpoint_sum = 0.0;
        for k in 0..n {
            midpoint_sum += integrand.evaluate(lower + (2 * k + 1) as f64 * h);
        }
        let refined = 0.5 * estimate + h * midpoint_sum;
        let change = (refined - estimate).abs();
        n *= 2;
        estimate = refined;
        outcome = TrapezoidOutcome {
            value: refined,
            abs_error: change,
            converged: change <= rel_tol * refined.abs(),
            iterations: iteration,
            subintervals: n,
        };
        if outcome.converged || !refined.is_finite() {
            break;
        }
    }

    outcome
}

/// Composite Simpson rule; `None` when `subintervals` is odd or zero.
pub(super) fn composite_simpson<I>(
    integrand: &mut I,
    lower: f64,
    upper: f64,
    subintervals: usize,
) -> Option<f64>
where
    I: Integrand + ?Sized,
{
    if subintervals == 0 || subintervals % 2 == 1 {
        return None;
    }
    let n = subintervals;
    let h = (upper - lower) / n as f64;
    let mut odd = 0.0;
    let mut even = 0.0;
    for i in 1..n {
        let value = integrand.evaluate(lower + i as f64 * h);
        if i % 2 == 1 {
            odd += value;
        } else {
            even += value;
        }
    }
    let ends = integrand.evaluate(lower) + integrand.evaluate(upper);
    Some(h / 3.0 * (ends + 4.0 * odd + 2.0 * even))
}

#[cfg(test)]
mod tests {
    use super::{
        MAX_TRAPEZOID_SUBINTERVALS, composite_simpson, fixed_trapezoid,
        self_terminating_trapezoid,
    };

    #[test]
    fn trapezoid_samples_every_grid_point_once() {
        let mut calls = 0_usize;
        let mut integrand = |x: f64| {
            calls += 1;
            2.0 * x + 1.0
        };
        let value = fixed_trapezoid(&mut integrand, 0.0, 3.0, 750);
        assert!((value - 12.0).abs() <= 1.0e-12);
        assert_eq!(calls, 751);
    }

    #[test]
    fn trapezoid_error_shrinks_quadratically() {
        let exact = 1.0 / 3.0;
        let mut square = |x: f64| x * x;
        let coarse = (fixed_trapezoid(&mut square, 0.0, 1.0, 10) - exact).abs();
        let fine = (fixed_trapezoid(&mut square, 0.0, 1.0, 20) - exact).abs();
        let ratio = coarse / fine;
        assert!((ratio - 4.0).abs() < 1.0e-6, "ratio {ratio}");
    }

    #[test]
    fn self_terminating_rule_stops_when_estimates_agree() {
        let mut integrand = |x: f64| x.sin();
        let outcome =
            self_terminating_trapezoid(&mut integrand, 0.0, std::f64::consts::PI, 1.0e-6, 16, 100);
        assert!(outcome.converged);
        assert!(outcome.iterations > 1);
        assert!((outcome.value - 2.0).abs() <= 1.0e-5);
        assert!(outcome.abs_error <= 1.0e-6 * outcome.value.abs());
    }

    #[test]
    fn self_terminating_rule_respects_iteration_cap() {
        let mut integrand = |x: f64| x.sin();
        let outcome =
            self_terminating_trapezoid(&mut integrand, 0.0, std::f64::consts::PI, 1.0e-14, 16, 2);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.subintervals, 64);
    }

    #[test]
    fn self_terminating_rule_stops_at_the_panel_cap() {
        let mut calls = 0_usize;
        let mut integrand = |x: f64| {
            calls += 1;
            (1.0 / x).sin()
        };
        let outcome = self_terminating_trapezoid(&mut integrand, 1.0e-3, 1.0, 1.0e-14, 16, 100);
        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 18);
        assert_eq!(outcome.subintervals, MAX_TRAPEZOID_SUBINTERVALS);
        assert_eq!(calls, MAX_TRAPEZOID_SUBINTERVALS + 1);
    }

    #[test]
    fn simpson_is_exact_for_cubics() {
        let mut integrand = |x: f64| x * x * x - x;
        let value = composite_simpson(&mut integrand, 0.0, 2.0, 8).expect("even count");
        assert!((value - 2.0).abs() <= 1.0e-13);
    }

    #[test]
    fn simpson_rejects_odd_counts_without_sampling() {
        let mut calls = 0_usize;
        let mut integrand = |x: f64| {
            calls += 1;
            x
        };
        assert_eq!(composite_simpson(&mut integrand, 0.0, 1.0, 7), None);
        assert_eq!(composite_simpson(&mut integrand, 0.0, 1.0, 0), None);
        assert_eq!(calls, 0);
    }
}
