//! Shared "evaluate pipeline" logic used by the CLI and the integration tests.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! simulate -> build grid -> score each parameter set against the same data
//!
//! The CLI can then focus on presentation (text vs JSON).

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::info;

use crate::data::{DatasetStats, compute_stats, simulate};
use crate::density::{DensityGrid, build_from_settings};
use crate::domain::{ModelParameters, RunConfig, SimulationSettings, Trial};
use crate::error::AppError;
use crate::likelihood::trial_log_densities;

/// A simulated dataset with its summary.
#[derive(Debug, Clone, Serialize)]
pub struct SampleData {
    pub trials: Vec<Trial>,
    pub stats: DatasetStats,
}

/// Score of one parameter set against the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub label: String,
    pub parameters: ModelParameters,
    pub log_likelihood: f64,
    /// `log_likelihood / n`, comparable across dataset sizes.
    pub mean_log_density: f64,
    /// Trials whose density was positive.
    pub supported_trials: usize,
}

/// All computed outputs of a single `cdm evaluate` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub config: RunConfig,
    pub grid_shape: (usize, usize),
    pub grid_seconds: f64,
    pub sample: SampleData,
    pub evaluations: Vec<Evaluation>,
}

/// Simulate a seeded dataset.
pub fn simulate_sample(
    parameters: &ModelParameters,
    settings: &SimulationSettings,
) -> Result<SampleData, AppError> {
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let trials = simulate(parameters, settings.time_step, settings.trial_count, &mut rng)?;
    let stats = compute_stats(&trials)
        .ok_or_else(|| AppError::numeric("Failed to compute dataset stats."))?;
    Ok(SampleData { trials, stats })
}

/// Score one parameter set.
pub fn evaluate(
    label: impl Into<String>,
    parameters: &ModelParameters,
    trials: &[Trial],
    grid: &DensityGrid,
) -> Evaluation {
    let per_trial = trial_log_densities(parameters, trials, grid);
    let log_likelihood = per_trial.iter().fold(0.0, |total, v| total + v);
    let supported_trials = per_trial.iter().filter(|v| v.is_finite()).count();
    Evaluation {
        label: label.into(),
        parameters: *parameters,
        log_likelihood,
        mean_log_density: if trials.is_empty() {
            0.0
        } else {
            log_likelihood / trials.len() as f64
        },
        supported_trials,
    }
}

/// Execute the full pipeline and return the computed outputs.
pub fn run_evaluate(config: &RunConfig) -> Result<RunOutput, AppError> {
    // 1) Simulate data at the generating parameters.
    let sample = simulate_sample(&config.parameters, &config.simulation)?;

    // 2) Build the density grid once.
    let started = Instant::now();
    let grid = build_from_settings(&config.grid)?;
    let grid_seconds = started.elapsed().as_secs_f64();

    // 3) Score every parameter set against the same data and grid.
    let mut evaluations = Vec::with_capacity(1 + config.compare.len());
    evaluations.push(evaluate("generating", &config.parameters, &sample.trials, &grid));
    for (i, parameters) in config.compare.iter().enumerate() {
        evaluations.push(evaluate(
            format!("compare-{}", i + 1),
            parameters,
            &sample.trials,
            &grid,
        ));
    }
    for e in &evaluations {
        info!(label = %e.label, log_likelihood = e.log_likelihood, "scored parameters");
    }

    Ok(RunOutput {
        config: config.clone(),
        grid_shape: grid.shape(),
        grid_seconds,
        sample,
        evaluations,
    })
}
