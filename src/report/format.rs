//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the numerical code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{Evaluation, RunOutput, SampleData};
use crate::domain::{GridAxis, ModelParameters, SimulationSettings};

/// Format the full evaluate summary (grid, dataset stats, scores).
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();
    let config = &run.config;

    out.push_str("=== cdm - Circular Diffusion Model likelihood ===\n");
    out.push_str(&format!("Generating params: {}\n", fmt_params(&config.parameters)));
    out.push_str(&format!("Radius axis: {}\n", fmt_axis(&config.grid.radius_axis)));
    out.push_str(&format!("Time axis  : {}\n", fmt_axis(&config.grid.time_axis)));
    out.push_str(&format!(
        "Series: N={} | r={:e} | {} digits\n",
        config.grid.max_terms, config.grid.relative_tolerance, config.grid.decimal_precision
    ));
    out.push_str(&format!(
        "Grid: {}x{} cells in {:.2}s\n",
        run.grid_shape.0, run.grid_shape.1, run.grid_seconds
    ));
    out.push_str(&format_sample_stats(&run.sample, &config.simulation));

    out.push_str("\nScores:\n");
    out.push_str(&format_evaluations(&run.evaluations));
    out
}

/// Format a simulated dataset: settings, summary statistics and the first
/// `show` trials.
pub fn format_simulation(
    parameters: &ModelParameters,
    settings: &SimulationSettings,
    sample: &SampleData,
    show: usize,
) -> String {
    let mut out = String::new();
    out.push_str("=== cdm - simulated dataset ===\n");
    out.push_str(&format!("Params: {}\n", fmt_params(parameters)));
    out.push_str(&format_sample_stats(sample, settings));

    if show > 0 {
        out.push('\n');
        out.push_str(&format!("{:>6} {:>10} {:>10}\n", "trial", "angle", "rt"));
        out.push_str(&format!("{:-<6} {:-<10} {:-<10}\n", "", "", ""));
        for (i, t) in sample.trials.iter().take(show).enumerate() {
            out.push_str(&format!("{:>6} {:>10.4} {:>10.4}\n", i + 1, t.angle, t.response_time));
        }
        if sample.trials.len() > show {
            out.push_str(&format!("  ... {} more\n", sample.trials.len() - show));
        }
    }
    out
}

fn format_sample_stats(sample: &SampleData, settings: &SimulationSettings) -> String {
    let s = &sample.stats;
    let mut out = String::new();
    out.push_str(&format!(
        "Sample: n={} | dt={} | seed={}\n",
        s.trial_count, settings.time_step, settings.seed
    ));
    out.push_str(&format!(
        "RT: [{:.3}, {:.3}] mean={:.3} | angle mean={:.3} R={:.3}\n",
        s.rt_min, s.rt_max, s.rt_mean, s.angle_mean, s.angle_concentration
    ));
    out
}

fn format_evaluations(evaluations: &[Evaluation]) -> String {
    let best = evaluations
        .iter()
        .map(|e| e.log_likelihood)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut out = String::new();
    out.push_str(&format!(
        "  {:<12} {:>14} {:>12} {:>9}  params\n",
        "label", "loglik", "per-trial", "support"
    ));
    for e in evaluations {
        let marker = if e.log_likelihood == best && best.is_finite() { "*" } else { " " };
        out.push_str(&format!(
            "{marker} {:<12} {:>14} {:>12} {:>9}  {}\n",
            e.label,
            fmt_loglik(e.log_likelihood, 3),
            fmt_loglik(e.mean_log_density, 4),
            e.supported_trials,
            fmt_params(&e.parameters)
        ));
    }
    out
}

fn fmt_loglik(v: f64, decimals: usize) -> String {
    if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{v:.decimals$}")
    }
}

fn fmt_axis(axis: &GridAxis) -> String {
    format!(
        "[{}, {}) step {} ({} samples)",
        axis.lower(),
        axis.upper(),
        axis.step(),
        axis.len()
    )
}

fn fmt_params(p: &ModelParameters) -> String {
    let parts: Vec<String> = p.to_array().iter().map(|x| format!("{x}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DatasetStats;
    use crate::domain::Trial;

    fn sample() -> SampleData {
        SampleData {
            trials: vec![Trial::new(0.1, 0.5), Trial::new(-0.2, 0.7), Trial::new(0.0, 0.9)],
            stats: DatasetStats {
                trial_count: 3,
                rt_min: 0.5,
                rt_max: 0.9,
                rt_mean: 0.7,
                angle_mean: 0.0,
                angle_concentration: 0.98,
            },
        }
    }

    #[test]
    fn simulation_report_lists_requested_trials() {
        let p = ModelParameters::from_slice(&[1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]).unwrap();
        let settings = SimulationSettings::new(0.001, 3, 42).unwrap();
        let text = format_simulation(&p, &settings, &sample(), 2);
        assert!(text.contains("Sample: n=3 | dt=0.001 | seed=42"));
        assert!(text.contains("... 1 more"));
        assert_eq!(text.lines().filter(|l| l.trim_start().starts_with('1')).count(), 1);
    }

    #[test]
    fn scores_mark_the_best_finite_entry_and_print_neg_inf() {
        let p = ModelParameters::from_slice(&[1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]).unwrap();
        let evaluations = vec![
            Evaluation {
                label: "generating".to_string(),
                parameters: p,
                log_likelihood: -12.5,
                mean_log_density: -0.125,
                supported_trials: 100,
            },
            Evaluation {
                label: "compare-1".to_string(),
                parameters: p.with_radius_scaled(5.0),
                log_likelihood: f64::NEG_INFINITY,
                mean_log_density: f64::NEG_INFINITY,
                supported_trials: 0,
            },
        ];
        let text = format_evaluations(&evaluations);
        assert!(text.contains("* generating"));
        assert!(text.contains("-inf"));
        assert!(!text.contains("* compare-1"));
    }
}
