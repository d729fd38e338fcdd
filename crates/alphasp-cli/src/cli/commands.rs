use super::CliError;
use alphasp_core::common::{RecombinationConfig, load_recombination_config};
use alphasp_core::numerics::quadrature::{IntegrationStatus, QuadratureFailure, QuadratureStrategy};
use alphasp_core::rates::{TransitionRate, compute_dataset, load_atomic_dataset};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct ComputeArgs {
    /// Atomic dataset (JSON: levelWeights, transitions, optional macroSimple)
    #[arg(long)]
    dataset: PathBuf,

    /// Electron temperature in kelvin
    #[arg(long)]
    temperature: f64,

    /// Quadrature strategy name; overrides the config file
    #[arg(long)]
    strategy: Option<QuadratureStrategy>,

    /// Recombination config (JSON); reference constants when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include per-transition wall-clock time in the report
    #[arg(long)]
    timing: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComputeReport<'a> {
    temperature: f64,
    strategy: QuadratureStrategy,
    transitions: Vec<TransitionSummary<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransitionSummary<'a> {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    coefficient: f64,
    status: IntegrationStatus,
    strategy: QuadratureStrategy,
    evaluations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    abs_error: Option<f64>,
    clamped: bool,
    upper_frequency: f64,
    #[serde(skip_serializing_if = "no_diagnostics")]
    diagnostics: &'a [QuadratureFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_seconds: Option<f64>,
}

impl<'a> TransitionSummary<'a> {
    fn new(rate: &'a TransitionRate, timing: bool) -> Self {
        let integral = &rate.report.integral;
        Self {
            index: rate.index,
            label: rate.label.as_deref(),
            coefficient: rate.report.coefficient,
            status: integral.status,
            strategy: integral.strategy,
            evaluations: integral.evaluations,
            abs_error: integral.abs_error,
            clamped: rate.report.bounds.clamped,
            upper_frequency: rate.report.bounds.upper,
            diagnostics: &integral.diagnostics,
            elapsed_seconds: timing.then_some(rate.elapsed_seconds),
        }
    }
}

fn no_diagnostics(diagnostics: &&[QuadratureFailure]) -> bool {
    diagnostics.is_empty()
}

pub(super) fn run_compute_command(args: ComputeArgs) -> Result<i32, CliError> {
    if !args.temperature.is_finite() || args.temperature <= 0.0 {
        return Err(CliError::Usage(format!(
            "--temperature must be finite and > 0, got {}",
            args.temperature
        )));
    }

    let config = match &args.config {
        Some(path) => load_recombination_config(path).map_err(|error| CliError::Compute(error.into()))?,
        None => RecombinationConfig::default(),
    };
    let strategy = args.strategy.unwrap_or(config.strategy);
    let dataset =
        load_atomic_dataset(&args.dataset).map_err(|error| CliError::Compute(error.into()))?;

    tracing::info!(
        transitions = dataset.transitions.len(),
        temperature = args.temperature,
        %strategy,
        "computing recombination coefficients"
    );
    let rates = compute_dataset(&dataset, args.temperature, strategy, &config)
        .map_err(|error| CliError::Compute(error.into()))?;

    let report = ComputeReport {
        temperature: args.temperature,
        strategy,
        transitions: rates
            .iter()
            .map(|rate| TransitionSummary::new(rate, args.timing))
            .collect(),
    };
    let rendered =
        serde_json::to_string_pretty(&report).context("failed to serialize compute report")?;

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create report directory '{}'", parent.display())
                })?;
            }
            fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("failed to write report '{}'", path.display()))?;
        }
        None => println!("{rendered}"),
    }

    Ok(0)
}

pub(super) fn run_strategies_command() -> Result<i32, CliError> {
    for strategy in QuadratureStrategy::REFERENCE_SET {
        let parameters =
            serde_json::to_string(&strategy).context("failed to serialize strategy")?;
        println!("{:<28} {}", strategy.as_str(), parameters);
    }
    Ok(0)
}
