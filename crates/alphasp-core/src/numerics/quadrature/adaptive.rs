//! Globally adaptive bisection over a Gauss–Kronrod rule.
//!
//! Each step bisects the subinterval with the largest error estimate until
//! the summed error meets the relative tolerance, the subinterval budget is
//! spent, or the error stops shrinking for round-off reasons.
//!
//! [`integrate_adaptive`] is plain bisection (QUADPACK `qage`).
//! [`integrate_extrapolated`] adds the `qagse` scheme: once the interval due
//! for bisection is also the smallest one, the partial areas are fed to a
//! Wynn epsilon table, which lets integrable endpoint singularities converge
//! within a small subinterval budget.

use super::Integrand;
use super::epsilon::EpsilonTable;
use super::gauss_kronrod::{GAUSS_KRONROD_21, GAUSS_KRONROD_31, GaussKronrodRule, RuleEstimate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct AdaptiveSettings {
    pub(super) rule: GaussKronrodRule,
    pub(super) limit: usize,
    /// First-pass round-off floor, in units of `eps * ∫|f|`.
    pub(super) first_pass_roundoff: f64,
}

impl AdaptiveSettings {
    /// 21-point rule with epsilon extrapolation.
    pub(super) const fn extrapolating(limit: usize) -> Self {
        Self {
            rule: GAUSS_KRONROD_21,
            limit,
            first_pass_roundoff: 100.0,
        }
    }

    /// 31-point rule, plain bisection.
    pub(super) const fn fixed_order(limit: usize) -> Self {
        Self {
            rule: GAUSS_KRONROD_31,
            limit,
            first_pass_roundoff: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum AdaptiveFailure {
    Roundoff,
    SubdivisionLimit,
    Singular { at: f64 },
    Divergent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct AdaptiveOutcome {
    pub(super) value: f64,
    pub(super) abs_error: f64,
    pub(super) failure: Option<AdaptiveFailure>,
}

impl AdaptiveOutcome {
    fn single_rule(estimate: RuleEstimate, failure: Option<AdaptiveFailure>) -> Self {
        Self {
            value: estimate.value,
            abs_error: estimate.abs_error,
            failure,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Subinterval {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
    /// Number of bisections that produced this subinterval.
    level: usize,
}

impl Subinterval {
    fn new(lower: f64, upper: f64, estimate: RuleEstimate, level: usize) -> Self {
        Self {
            lower,
            upper,
            value: estimate.value,
            error: estimate.abs_error,
            level,
        }
    }
}

const ROUNDOFF_TYPE1_LIMIT: usize = 6;
const ROUNDOFF_TYPE2_LIMIT: usize = 20;

/// Checks shared by both integrators before any bisection.
fn first_pass(
    first: RuleEstimate,
    rel_tol: f64,
    settings: AdaptiveSettings,
) -> Option<AdaptiveOutcome> {
    let tolerance = rel_tol * first.value.abs();
    let round_off = settings.first_pass_roundoff * f64::EPSILON * first.abs_integral;

    if first.abs_error <= round_off && first.abs_error > tolerance {
        return Some(AdaptiveOutcome::single_rule(first, Some(AdaptiveFailure::Roundoff)));
    }
    if (first.abs_error <= tolerance && first.abs_error != first.asc_integral)
        || first.abs_error == 0.0
    {
        return Some(AdaptiveOutcome::single_rule(first, None));
    }
    if settings.limit <= 1 {
        return Some(AdaptiveOutcome::single_rule(
            first,
            Some(AdaptiveFailure::SubdivisionLimit),
        ));
    }
    None
}

pub(super) fn integrate_adaptive<I>(
    integrand: &mut I,
    lower: f64,
    upper: f64,
    rel_tol: f64,
    settings: AdaptiveSettings,
) -> AdaptiveOutcome
where
    I: Integrand + ?Sized,
{
    let rule = settings.rule;
    let first = rule.apply(integrand, lower, upper);
    if let Some(outcome) = first_pass(first, rel_tol, settings) {
        return outcome;
    }

    let mut intervals = Vec::with_capacity(settings.limit);
    intervals.push(Subinterval::new(lower, upper, first, 0));
    let mut area = first.value;
    let mut error_sum = first.abs_error;
    let mut tolerance = rel_tol * area.abs();
    let mut roundoff_type1 = 0_usize;
    let mut roundoff_type2 = 0_usize;
    let mut failure = None;

    while intervals.len() < settings.limit {
        let index = largest_error_index(&intervals);
        let parent = intervals[index];
        let midpoint = 0.5 * (parent.lower + parent.upper);

        let left = rule.apply(integrand, parent.lower, midpoint);
        let right = rule.apply(integrand, midpoint, parent.upper);
        let area12 = left.value + right.value;
        let error12 = left.abs_error + right.abs_error;

        error_sum += error12 - parent.error;
        area += area12 - parent.value;

        if left.asc_integral != left.abs_error && right.asc_integral != right.abs_error {
            let delta = parent.value - area12;
            if delta.abs() <= 1.0e-5 * area12.abs() && error12 >= 0.99 * parent.error {
                roundoff_type1 += 1;
            }
            if intervals.len() >= 10 && error12 > parent.error {
                roundoff_type2 += 1;
            }
        }

        tolerance = rel_tol * area.abs();
        let level = parent.level + 1;
        intervals[index] = Subinterval::new(parent.lower, midpoint, left, level);
        intervals.push(Subinterval::new(midpoint, parent.upper, right, level));

        if error_sum <= tolerance {
            break;
        }
        if roundoff_type1 >= ROUNDOFF_TYPE1_LIMIT || roundoff_type2 >= ROUNDOFF_TYPE2_LIMIT {
            failure = Some(AdaptiveFailure::Roundoff);
            break;
        }
        if subinterval_too_small(parent.lower, midpoint, parent.upper) {
            failure = Some(AdaptiveFailure::Singular { at: midpoint });
            break;
        }
    }

    let value = intervals.iter().map(|interval| interval.value).sum();
    if failure.is_none() && error_sum > tolerance {
        failure = Some(AdaptiveFailure::SubdivisionLimit);
    }

    AdaptiveOutcome {
        value,
        abs_error: error_sum,
        failure,
    }
}

/// Subintervals kept in descending error order, with a cursor (`nrmax`)
/// that skips over intervals already at the deepest bisection level while
/// the extrapolating integrator works on the larger ones.
struct Workspace {
    intervals: Vec<Subinterval>,
    order: Vec<usize>,
    nrmax: usize,
    maximum_level: usize,
    limit: usize,
}

impl Workspace {
    fn new(lower: f64, upper: f64, first: RuleEstimate, limit: usize) -> Self {
        let mut intervals = Vec::with_capacity(limit);
        intervals.push(Subinterval::new(lower, upper, first, 0));
        let mut order = Vec::with_capacity(limit);
        order.push(0);
        Self {
            intervals,
            order,
            nrmax: 0,
            maximum_level: 0,
            limit,
        }
    }

    fn current_index(&self) -> usize {
        self.order[self.nrmax.min(self.order.len() - 1)]
    }

    fn current(&self) -> Subinterval {
        self.intervals[self.current_index()]
    }

    /// Replace the current interval by its two halves.
    fn bisect(&mut self, left: Subinterval, right: Subinterval) {
        let index = self.current_index();
        let (larger, smaller) = if right.error > left.error {
            (right, left)
        } else {
            (left, right)
        };
        self.intervals[index] = larger;
        self.intervals.push(smaller);
        self.order.push(self.intervals.len() - 1);
        self.maximum_level = self.maximum_level.max(left.level);

        let intervals = &self.intervals;
        self.order
            .sort_by(|a, b| intervals[*b].error.total_cmp(&intervals[*a].error));
        let rank = self
            .order
            .iter()
            .position(|candidate| *candidate == index)
            .unwrap_or(0);
        self.nrmax = self.nrmax.min(rank);
    }

    fn current_is_large(&self) -> bool {
        self.current().level < self.maximum_level
    }

    /// Move the cursor to the next interval that can still be bisected
    /// before extrapolating; `false` when none is left in range.
    fn advance_to_large_interval(&mut self) -> bool {
        let last = self.intervals.len() - 1;
        let upper_bound = if last > 1 + self.limit / 2 {
            self.limit + 1 - last
        } else {
            last
        };
        for _ in self.nrmax..=upper_bound {
            match self.order.get(self.nrmax) {
                Some(index) if self.intervals[*index].level < self.maximum_level => return true,
                Some(_) => self.nrmax += 1,
                None => break,
            }
        }
        false
    }

    fn reset_cursor(&mut self) {
        self.nrmax = 0;
    }

    fn sum(&self) -> f64 {
        self.intervals.iter().map(|interval| interval.value).sum()
    }
}

/// Why the extrapolating loop stopped early.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Stop {
    IterationLimit,
    Roundoff,
    TooSmall { at: f64 },
    /// The epsilon table stopped improving on the bisection error.
    ExtrapolationStalled,
    /// Only the round-off counter of the extrapolation phase fired.
    ExtrapolationRoundoff,
    Divergent,
}

impl Stop {
    fn failure(self) -> AdaptiveFailure {
        match self {
            Self::IterationLimit => AdaptiveFailure::SubdivisionLimit,
            Self::Roundoff | Self::ExtrapolationStalled | Self::ExtrapolationRoundoff => {
                AdaptiveFailure::Roundoff
            }
            Self::TooSmall { at } => AdaptiveFailure::Singular { at },
            Self::Divergent => AdaptiveFailure::Divergent,
        }
    }
}

const EXTRAPOLATED_ROUNDOFF_LIMIT: usize = 10;
const EXTRAPOLATED_GROWTH_LIMIT: usize = 20;
const EXTRAPOLATION_ROUNDOFF_TRIGGER: usize = 5;

pub(super) fn integrate_extrapolated<I>(
    integrand: &mut I,
    lower: f64,
    upper: f64,
    rel_tol: f64,
    settings: AdaptiveSettings,
) -> AdaptiveOutcome
where
    I: Integrand + ?Sized,
{
    let rule = settings.rule;
    let first = rule.apply(integrand, lower, upper);
    if let Some(outcome) = first_pass(first, rel_tol, settings) {
        return outcome;
    }

    let mut workspace = Workspace::new(lower, upper, first, settings.limit);
    let mut table = EpsilonTable::new(first.value);
    let positive_integrand = first.value.abs() >= (1.0 - 50.0 * f64::EPSILON) * first.abs_integral;

    let mut area = first.value;
    let mut error_sum = first.abs_error;
    let mut extrapolated = first.value;
    let mut extrapolated_error = f64::MAX;
    let mut correction = 0.0;
    let mut large_interval_error = 0.0;
    let mut extrapolation_tolerance = 0.0;
    let mut stalled_extrapolations = 0_usize;
    let mut roundoff_type1 = 0_usize;
    let mut roundoff_type2 = 0_usize;
    let mut roundoff_type3 = 0_usize;
    let mut stop: Option<Stop> = None;
    let mut extrapolation_roundoff = false;
    let mut extrapolate = false;
    let mut disallow_extrapolation = false;
    let mut bisection_converged = false;
    let mut iteration = 1;

    while iteration < settings.limit {
        let parent = workspace.current();
        let level = parent.level + 1;
        let midpoint = 0.5 * (parent.lower + parent.upper);
        iteration += 1;

        let left = rule.apply(integrand, parent.lower, midpoint);
        let right = rule.apply(integrand, midpoint, parent.upper);
        let area12 = left.value + right.value;
        let error12 = left.abs_error + right.abs_error;

        error_sum += error12 - parent.error;
        area += area12 - parent.value;
        let tolerance = rel_tol * area.abs();

        if left.asc_integral != left.abs_error && right.asc_integral != right.abs_error {
            let delta = parent.value - area12;
            if delta.abs() <= 1.0e-5 * area12.abs() && error12 >= 0.99 * parent.error {
                if extrapolate {
                    roundoff_type2 += 1;
                } else {
                    roundoff_type1 += 1;
                }
            }
            if iteration > 10 && error12 > parent.error {
                roundoff_type3 += 1;
            }
        }

        if roundoff_type1 + roundoff_type2 >= EXTRAPOLATED_ROUNDOFF_LIMIT
            || roundoff_type3 >= EXTRAPOLATED_GROWTH_LIMIT
        {
            stop = Some(Stop::Roundoff);
        }
        if roundoff_type2 >= EXTRAPOLATION_ROUNDOFF_TRIGGER {
            extrapolation_roundoff = true;
        }
        if subinterval_too_small(parent.lower, midpoint, parent.upper) {
            stop = Some(Stop::TooSmall { at: midpoint });
        }

        workspace.bisect(
            Subinterval::new(parent.lower, midpoint, left, level),
            Subinterval::new(midpoint, parent.upper, right, level),
        );

        if error_sum <= tolerance {
            bisection_converged = true;
            break;
        }
        if stop.is_some() {
            break;
        }
        if iteration >= settings.limit - 1 {
            stop = Some(Stop::IterationLimit);
            break;
        }
        if iteration == 2 {
            large_interval_error = error_sum;
            extrapolation_tolerance = tolerance;
            table.push(area);
            continue;
        }
        if disallow_extrapolation {
            continue;
        }

        large_interval_error -= parent.error;
        if level < workspace.maximum_level {
            large_interval_error += error12;
        }

        if !extrapolate {
            // Keep bisecting until the interval due next is also a smallest one.
            if workspace.current_is_large() {
                continue;
            }
            extrapolate = true;
            workspace.nrmax = 1;
        }

        if !extrapolation_roundoff
            && large_interval_error > extrapolation_tolerance
            && workspace.advance_to_large_interval()
        {
            continue;
        }

        table.push(area);
        let (candidate, candidate_error) = table.extrapolate();
        stalled_extrapolations += 1;
        if stalled_extrapolations > 5 && extrapolated_error < 1.0e-3 * error_sum {
            stop = Some(Stop::ExtrapolationStalled);
        }
        if candidate_error < extrapolated_error {
            stalled_extrapolations = 0;
            extrapolated_error = candidate_error;
            extrapolated = candidate;
            correction = large_interval_error;
            extrapolation_tolerance = rel_tol * candidate.abs();
            if extrapolated_error <= extrapolation_tolerance {
                break;
            }
        }

        if table.len() == 1 {
            disallow_extrapolation = true;
        }
        if stop == Some(Stop::ExtrapolationStalled) {
            break;
        }

        workspace.reset_cursor();
        extrapolate = false;
        large_interval_error = error_sum;
    }

    let bisection = |stop: Option<Stop>| AdaptiveOutcome {
        value: workspace.sum(),
        abs_error: error_sum,
        failure: stop.map(Stop::failure),
    };

    if bisection_converged || extrapolated_error == f64::MAX {
        return bisection(stop);
    }

    if stop.is_some() || extrapolation_roundoff {
        if extrapolation_roundoff {
            extrapolated_error += correction;
        }
        let stop = stop.unwrap_or(Stop::ExtrapolationRoundoff);
        if extrapolated != 0.0 && area != 0.0 {
            if extrapolated_error / extrapolated.abs() > error_sum / area.abs() {
                return bisection(Some(stop));
            }
        } else if extrapolated_error > error_sum {
            return bisection(Some(stop));
        } else if area == 0.0 {
            return AdaptiveOutcome {
                value: extrapolated,
                abs_error: extrapolated_error,
                failure: Some(stop.failure()),
            };
        }
        return extrapolated_outcome(
            extrapolated,
            extrapolated_error,
            area,
            error_sum,
            positive_integrand,
            first.abs_integral,
            Some(stop),
        );
    }

    extrapolated_outcome(
        extrapolated,
        extrapolated_error,
        area,
        error_sum,
        positive_integrand,
        first.abs_integral,
        None,
    )
}

/// Final divergence test on an extrapolated estimate.
fn extrapolated_outcome(
    value: f64,
    abs_error: f64,
    area: f64,
    error_sum: f64,
    positive_integrand: bool,
    abs_integral: f64,
    stop: Option<Stop>,
) -> AdaptiveOutcome {
    let mut stop = stop;
    let max_area = value.abs().max(area.abs());
    if positive_integrand || max_area >= 0.01 * abs_integral {
        let ratio = value / area;
        if !(0.01..=100.0).contains(&ratio) || error_sum > area.abs() {
            stop = Some(Stop::Divergent);
        }
    }
    AdaptiveOutcome {
        value,
        abs_error,
        failure: stop.map(Stop::failure),
    }
}

fn largest_error_index(intervals: &[Subinterval]) -> usize {
    intervals
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.error.total_cmp(&b.error))
        .map_or(0, |(index, _)| index)
}

fn subinterval_too_small(lower: f64, midpoint: f64, upper: f64) -> bool {
    let limit = (1.0 + 100.0 * f64::EPSILON) * (midpoint.abs() + 1000.0 * f64::MIN_POSITIVE);
    lower.abs() <= limit && upper.abs() <= limit
}
