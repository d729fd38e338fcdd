use alphasp_core::common::RecombinationConfig;
use alphasp_core::common::constants::{ALPHA_SP_CONSTANT, PLANCK_OVER_BOLTZMANN};
use alphasp_core::numerics::quadrature::{IntegrationStatus, QuadratureStrategy, integrate};
use alphasp_core::numerics::{PhotoionizationTable, SpeciesFlags, TransitionLevels};
use alphasp_core::rates::{LevelWeights, compute, compute_detailed, integration_bounds};
use serde::Deserialize;

const THRESHOLD: f64 = 3.288e15;
const SIGMA_THRESHOLD: f64 = 6.3e-18;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConstantSigmaCase {
    id: String,
    temperature: f64,
    last_frequency: f64,
    expect_clamp: bool,
}

const CONSTANT_SIGMA_CASES: &str = r#"[
    { "id": "cool-narrow", "temperature": 5.0e3, "lastFrequency": 4.0e15, "expectClamp": false },
    { "id": "cool-wide", "temperature": 5.0e3, "lastFrequency": 1.0e16, "expectClamp": true },
    { "id": "warm-narrow", "temperature": 2.0e4, "lastFrequency": 6.0e15, "expectClamp": false },
    { "id": "hot-narrow", "temperature": 4.0e4, "lastFrequency": 1.0e16, "expectClamp": false },
    { "id": "hot-wide", "temperature": 4.0e4, "lastFrequency": 1.0e17, "expectClamp": true },
    { "id": "very-hot-wide", "temperature": 1.0e5, "lastFrequency": 1.0e17, "expectClamp": true }
]"#;

fn assert_scalar_close(label: &str, expected: f64, actual: f64, rel_tol: f64) {
    let rel_diff = (actual - expected).abs() / expected.abs().max(f64::MIN_POSITIVE);
    assert!(
        rel_diff <= rel_tol,
        "{label} expected={expected:.15e} actual={actual:.15e} rel_diff={rel_diff:.3e} rel_tol={rel_tol:.3e}"
    );
}

fn ground_state_levels() -> TransitionLevels {
    TransitionLevels {
        lower: 0,
        upper: 1,
        ion_ground: 1,
    }
}

fn hydrogen_weights() -> LevelWeights {
    LevelWeights::new(vec![2.0, 1.0])
}

/// Kramers-like `σ ∝ ν⁻³` on a logarithmic grid; log-log interpolation
/// reproduces it exactly between grid points.
fn kramers_table(points: usize, last_frequency: f64) -> PhotoionizationTable {
    let ratio = (last_frequency / THRESHOLD).powf(1.0 / (points - 1) as f64);
    let frequency: Vec<f64> = (0..points)
        .map(|i| {
            if i == points - 1 {
                last_frequency
            } else {
                THRESHOLD * ratio.powi(i as i32)
            }
        })
        .collect();
    let cross_section = frequency
        .iter()
        .map(|nu| SIGMA_THRESHOLD * (THRESHOLD / nu).powi(3))
        .collect();
    PhotoionizationTable::from_samples(
        frequency,
        cross_section,
        ground_state_levels(),
        SpeciesFlags::default(),
    )
    .expect("kramers table should be valid")
}

fn constant_table(last_frequency: f64) -> PhotoionizationTable {
    PhotoionizationTable::from_samples(
        vec![THRESHOLD, 0.5 * (THRESHOLD + last_frequency), last_frequency],
        vec![SIGMA_THRESHOLD; 3],
        ground_state_levels(),
        SpeciesFlags::default(),
    )
    .expect("constant table should be valid")
}

fn constant_sigma_integral(lower: f64, upper: f64, a: f64) -> f64 {
    let terms = |nu: f64| nu * nu + 2.0 * nu / a + 2.0 / (a * a);
    SIGMA_THRESHOLD * (terms(lower) - (a * (lower - upper)).exp() * terms(upper)) / a
}

#[test]
fn constant_cross_section_cases_match_closed_form() {
    let cases: Vec<ConstantSigmaCase> =
        serde_json::from_str(CONSTANT_SIGMA_CASES).expect("cases should parse");
    let config = RecombinationConfig::default();

    for case in cases {
        let mut table = constant_table(case.last_frequency);
        let report = compute_detailed(
            &mut table,
            &hydrogen_weights(),
            case.temperature,
            QuadratureStrategy::AdaptiveGlobal,
            &config,
        )
        .unwrap_or_else(|error| panic!("{}: {error}", case.id));

        assert_eq!(report.bounds.clamped, case.expect_clamp, "{}", case.id);
        let a = PLANCK_OVER_BOLTZMANN / case.temperature;
        let expected = constant_sigma_integral(report.bounds.lower, report.bounds.upper, a)
            * 2.0
            * case.temperature.powf(-1.5)
            * ALPHA_SP_CONSTANT;
        assert_scalar_close(&case.id, expected, report.coefficient, 1.0e-4);
    }
}

#[test]
fn cached_evaluation_matches_cache_free_reference() {
    let temperature = 1.5e4;
    let config = RecombinationConfig::default();
    let mut table = kramers_table(40, 5.0e16);

    let report = compute_detailed(
        &mut table,
        &hydrogen_weights(),
        temperature,
        QuadratureStrategy::AdaptiveGlobal,
        &config,
    )
    .expect("coefficient should be computed");

    let grid = table.grid().clone();
    let bounds = integration_bounds(&grid, temperature, &config);
    let mut reference_integrand = |nu: f64| {
        grid.interpolate(nu)
            * nu
            * nu
            * (PLANCK_OVER_BOLTZMANN * (bounds.lower - nu) / temperature).exp()
    };
    let reference = integrate(
        QuadratureStrategy::AdaptiveGlobal,
        &mut reference_integrand,
        bounds.lower,
        bounds.upper,
        1.0e-10,
    );
    assert_eq!(reference.status, IntegrationStatus::Converged);

    let expected = reference.value * 2.0 * temperature.powf(-1.5) * ALPHA_SP_CONSTANT;
    assert_scalar_close("kramers", expected, report.coefficient, 1.0e-4);
}

#[test]
fn all_strategies_agree_on_a_tabulated_transition() {
    let temperature = 2.5e4;
    let config = RecombinationConfig::default();
    let mut reference_table = kramers_table(60, 3.0e16);
    let reference = compute(
        &mut reference_table,
        &hydrogen_weights(),
        temperature,
        QuadratureStrategy::AdaptiveGlobal,
        &config,
    )
    .expect("reference coefficient");

    for strategy in QuadratureStrategy::REFERENCE_SET {
        let mut table = kramers_table(60, 3.0e16);
        let report = compute_detailed(&mut table, &hydrogen_weights(), temperature, strategy, &config)
            .expect("coefficient should be computed");
        assert_scalar_close(strategy.as_str(), reference, report.coefficient, 2.0e-3);
        assert!(
            report
                .highest_sampled_frequency
                .is_some_and(|highest| highest <= report.bounds.upper),
            "{strategy} sampled above the upper bound"
        );
    }
}

#[test]
fn repeated_and_cloned_evaluations_are_bit_identical() {
    let temperature = 3.0e4;
    let config = RecombinationConfig::default();
    let mut table = kramers_table(25, 2.0e16);
    let pristine = table.clone();

    let first = compute(
        &mut table,
        &hydrogen_weights(),
        temperature,
        QuadratureStrategy::AdaptiveGlobal,
        &config,
    )
    .expect("first evaluation");
    let second = compute(
        &mut table,
        &hydrogen_weights(),
        temperature,
        QuadratureStrategy::AdaptiveGlobal,
        &config,
    )
    .expect("second evaluation with a warm cache");
    assert_eq!(first.to_bits(), second.to_bits());

    let from_thread = std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let mut table = pristine;
                compute(
                    &mut table,
                    &hydrogen_weights(),
                    temperature,
                    QuadratureStrategy::AdaptiveGlobal,
                    &config,
                )
            })
            .join()
            .expect("worker should not panic")
    })
    .expect("worker evaluation");
    assert_eq!(first.to_bits(), from_thread.to_bits());
}

#[test]
fn coefficient_scales_with_weight_ratio_and_temperature_power() {
    let config = RecombinationConfig::default();
    let strategy = QuadratureStrategy::RombergExtrapolation;
    let temperature = 2.0e4;

    let mut table = kramers_table(30, 2.0e16);
    let report = compute_detailed(&mut table, &hydrogen_weights(), temperature, strategy, &config)
        .expect("coefficient should be computed");

    let normalization = report.weight_ratio * temperature.powf(-1.5) * ALPHA_SP_CONSTANT;
    assert_scalar_close(
        "normalization",
        report.integral.value * normalization,
        report.coefficient,
        1.0e-14,
    );

    let mut heavier = kramers_table(30, 2.0e16);
    let doubled = compute(
        &mut heavier,
        &LevelWeights::new(vec![4.0, 1.0]),
        temperature,
        strategy,
        &config,
    )
    .expect("coefficient should be computed");
    assert_scalar_close("weight ratio", 2.0 * report.coefficient, doubled, 1.0e-14);
}
