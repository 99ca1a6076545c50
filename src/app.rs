//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the tracing subscriber
//! - parses CLI arguments into validated settings
//! - runs simulation or the evaluate pipeline
//! - prints text or JSON reports

use clap::Parser;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::cli::{Command, EvaluateArgs, GridArgs, SimulateArgs};
use crate::domain::{GridAxis, GridSettings, RunConfig, SimulationSettings};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable holding the log filter (`EnvFilter` syntax).
pub const LOG_ENV: &str = "CDM_LOG";

/// Entry point for the `cdm` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Simulate(args) => handle_simulate(args),
        Command::Evaluate(args) => handle_evaluate(args),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let settings = SimulationSettings::new(
        args.simulation.dt,
        args.simulation.trials,
        args.simulation.seed,
    )?;
    let sample = pipeline::simulate_sample(&args.model.params, &settings)?;

    if args.json {
        println!("{}", crate::report::to_json(&sample)?);
    } else {
        println!(
            "{}",
            crate::report::format_simulation(&args.model.params, &settings, &sample, args.show)
        );
    }
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args)?;
    let run = pipeline::run_evaluate(&config)?;

    if args.json {
        println!("{}", crate::report::to_json(&run)?);
    } else {
        println!("{}", crate::report::format_run_summary(&run));
    }
    Ok(())
}

pub fn grid_settings_from_args(args: &GridArgs) -> Result<GridSettings, AppError> {
    GridSettings::new(
        GridAxis::new(args.radius_min, args.radius_max, args.radius_step)?,
        GridAxis::new(args.time_min, args.time_max, args.time_step)?,
        args.terms,
        args.tolerance,
        args.digits,
    )
}

pub fn run_config_from_args(args: &EvaluateArgs) -> Result<RunConfig, AppError> {
    Ok(RunConfig {
        grid: grid_settings_from_args(&args.grid)?,
        parameters: args.model.params,
        compare: args.compare.clone(),
        simulation: SimulationSettings::new(
            args.simulation.dt,
            args.simulation.trials,
            args.simulation.seed,
        )?,
    })
}
