//! Romberg integration: trapezoid halving with Richardson extrapolation.

use super::Integrand;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct RombergOutcome {
    pub(super) value: f64,
    /// Difference between the last two diagonal entries.
    pub(super) abs_error: f64,
    pub(super) converged: bool,
    /// Number of tableau rows computed.
    pub(super) levels: usize,
}

pub(super) fn integrate_romberg<I>(
    integrand: &mut I,
    lower: f64,
    upper: f64,
    rel_tol: f64,
    max_levels: usize,
) -> RombergOutcome
where
    I: Integrand + ?Sized,
{
    let max_levels = max_levels.max(1);
    let mut previous = Vec::with_capacity(max_levels);
    let mut current = Vec::with_capacity(max_levels);

    let mut h = upper - lower;
    previous.push(0.5 * h * (integrand.evaluate(lower) + integrand.evaluate(upper)));
    let mut outcome = RombergOutcome {
        value: previous[0],
        abs_error: f64::INFINITY,
        converged: false,
        levels: 1,
    };

    let mut new_points = 1_usize;
    for level in 1..max_levels {
        h *= 0.5;
        let mut midpoint_sum = 0.0;
        for k in 0..new_points {
            midpoint_sum += integrand.evaluate(lower + (2 * k + 1) as f64 * h);
        }
        new_points *= 2;

        current.clear();
        current.push(0.5 * previous[0] + h * midpoint_sum);
        let mut four_j = 1.0;
        for j in 1..=level {
            four_j *= 4.0;
            let refined = current[j - 1] + (current[j - 1] - previous[j - 1]) / (four_j - 1.0);
            current.push(refined);
        }

        let estimate = current[level];
        let error = (estimate - previous[level - 1]).abs();
        outcome = RombergOutcome {
            value: estimate,
            abs_error: error,
            converged: false,
            levels: level + 1,
        };

        if !estimate.is_finite() {
            break;
        }
        if error <= rel_tol * estimate.abs() {
            outcome.converged = true;
            break;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::integrate_romberg;

    #[test]
    fn cubic_converges_after_two_halvings() {
        let mut calls = 0_usize;
        let mut integrand = |x: f64| {
            calls += 1;
            x * x * x + 1.0
        };
        let outcome = integrate_romberg(&mut integrand, 0.0, 1.0, 1.0e-15, 30);
        assert!(outcome.converged);
        assert_eq!(outcome.levels, 3);
        assert_eq!(outcome.value, 1.25);
        assert_eq!(outcome.abs_error, 0.0);
        assert_eq!(calls, 5);
    }

    #[test]
    fn smooth_integrand_meets_relative_tolerance() {
        let mut integrand = |x: f64| (-x * x).exp();
        let outcome = integrate_romberg(&mut integrand, 0.0, 2.0, 1.0e-10, 30);
        assert!(outcome.converged);
        // ∫_0^2 exp(-x²) dx = √π/2 · erf(2)
        let expected = 0.882_081_390_762_421_4;
        assert!((outcome.value - expected).abs() <= 1.0e-9);
    }

    #[test]
    fn level_cap_stops_without_convergence() {
        let mut integrand = |x: f64| x.sqrt();
        let outcome = integrate_romberg(&mut integrand, 0.0, 1.0, 1.0e-14, 4);
        assert!(!outcome.converged);
        assert_eq!(outcome.levels, 4);
        assert!((outcome.value - 2.0 / 3.0).abs() < 1.0e-2);
    }

    #[test]
    fn zero_integrand_converges_immediately() {
        let mut integrand = |_x: f64| 0.0;
        let outcome = integrate_romberg(&mut integrand, 0.0, 1.0, 1.0e-4, 30);
        assert!(outcome.converged);
        assert_eq!(outcome.levels, 2);
        assert_eq!(outcome.value, 0.0);
    }
}
