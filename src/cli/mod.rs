//! Command-line parsing for the `cdm` binary.
//!
//! The goal of this module is to keep **argument parsing** separate from grid
//! construction and likelihood evaluation. Flags are turned into validated
//! domain settings by `app`.

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelParameters;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cdm", version, about = "Circular diffusion model: likelihood and simulation")]
pub struct Cli {
    /// Debug-level logging (the `CDM_LOG` filter takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Simulate a dataset and print summary statistics.
    Simulate(SimulateArgs),
    /// Build a density grid, simulate a dataset and score parameter sets against it.
    Evaluate(EvaluateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub simulation: SimulationArgs,

    /// Number of trials to list after the summary.
    #[arg(long, default_value_t = 10)]
    pub show: usize,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub simulation: SimulationArgs,

    #[command(flatten)]
    pub grid: GridArgs,

    /// Extra parameter set to score against the same data (repeatable).
    #[arg(long, value_parser = parse_parameters, allow_hyphen_values = true)]
    pub compare: Vec<ModelParameters>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Model parameters: a,sa_mult,v,bias,eta1_mult,eta2_mult,t0,st.
    #[arg(
        long,
        value_parser = parse_parameters,
        default_value = "1.5,0.2,1.0,0.0,0.2,0.2,0.2,0.1",
        allow_hyphen_values = true
    )]
    pub params: ModelParameters,
}

#[derive(Debug, Args, Clone)]
pub struct SimulationArgs {
    /// Random-walk time step.
    #[arg(long, default_value_t = 0.001)]
    pub dt: f64,

    /// Number of simulated trials.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub trials: usize,

    /// Random seed for the simulator.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Debug, Args, Clone)]
pub struct GridArgs {
    /// Lower bound of the boundary-radius axis.
    #[arg(long, default_value_t = 0.5)]
    pub radius_min: f64,

    /// Upper bound (exclusive) of the boundary-radius axis.
    #[arg(long, default_value_t = 3.0)]
    pub radius_max: f64,

    /// Boundary-radius step.
    #[arg(long, default_value_t = 0.1)]
    pub radius_step: f64,

    /// Lower bound of the time axis.
    #[arg(long, default_value_t = 0.0)]
    pub time_min: f64,

    /// Upper bound (exclusive) of the time axis.
    #[arg(long, default_value_t = 5.0)]
    pub time_max: f64,

    /// Time step of the grid.
    #[arg(long, default_value_t = 0.01)]
    pub time_step: f64,

    /// Maximum number of series terms (and Bessel zeros).
    #[arg(long, default_value_t = 500)]
    pub terms: usize,

    /// Early-exit tolerance on |term / sum|.
    #[arg(long, default_value_t = 1e-30)]
    pub tolerance: f64,

    /// Decimal digits of working precision for the series.
    #[arg(long, default_value_t = 30)]
    pub digits: u32,
}

/// Parse `a,sa_mult,v,bias,eta1_mult,eta2_mult,t0,st`.
pub fn parse_parameters(raw: &str) -> Result<ModelParameters, String> {
    let values = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|e| format!("invalid number '{part}': {e}"))
        })
        .collect::<Result<Vec<f64>, String>>()?;
    ModelParameters::from_slice(&values).map_err(|e| e.to_string())
}
