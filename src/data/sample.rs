//! Synthetic CDM trials from an explicit time-stepped random walk.
//!
//! Per trial:
//!
//! - boundary radius `A ~ U(a - sa/2, a + sa/2)`
//! - drift `(d1, d2) ~ N((v, 0), (eta1, eta2))`, rotated by the bias angle
//! - non-decision time `T ~ U(t0 - st/2, t0 + st/2)`
//!
//! The walk starts at the origin and steps `x += N(V dt, sqrt(dt))` per
//! coordinate until `|x|^2 >= A^2`. The trial records the exit angle and
//! `t + T`.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::domain::{ModelParameters, Trial};
use crate::error::AppError;

/// Walks that have not exited after this many steps are reported as errors.
const MAX_STEPS_PER_TRIAL: u64 = 100_000_000;

pub fn simulate<R: Rng + ?Sized>(
    parameters: &ModelParameters,
    time_step: f64,
    trial_count: usize,
    rng: &mut R,
) -> Result<Vec<Trial>, AppError> {
    if !(time_step.is_finite() && time_step > 0.0) {
        return Err(AppError::invalid(format!(
            "Invalid time step {time_step} (must be finite and > 0)."
        )));
    }
    if trial_count == 0 {
        return Err(AppError::invalid("Trial count must be > 0."));
    }
    if !parameters.is_finite() {
        return Err(AppError::invalid("Model parameters must be finite to simulate."));
    }

    let d = parameters.derived();
    if d.eta_radial < 0.0 || d.eta_tangential < 0.0 {
        return Err(AppError::invalid(format!(
            "Drift variability must be >= 0 (radial {}, tangential {}).",
            d.eta_radial, d.eta_tangential
        )));
    }
    let radial = Normal::new(d.drift_length, d.eta_radial)
        .map_err(|e| AppError::invalid(format!("Radial drift distribution error: {e}")))?;
    let tangential = Normal::new(0.0, d.eta_tangential)
        .map_err(|e| AppError::invalid(format!("Tangential drift distribution error: {e}")))?;
    let noise = Normal::new(0.0, time_step.sqrt())
        .map_err(|e| AppError::invalid(format!("Diffusion noise distribution error: {e}")))?;
    let (bias_sin, bias_cos) = d.bias.sin_cos();

    let mut trials = Vec::with_capacity(trial_count);
    for _ in 0..trial_count {
        let boundary = uniform(rng, d.radius - d.radius_half_range, d.radius + d.radius_half_range);
        let boundary_sq = boundary * boundary;

        let d1 = radial.sample(rng);
        let d2 = tangential.sample(rng);
        let drift = (d1 * bias_cos - d2 * bias_sin, d1 * bias_sin + d2 * bias_cos);
        let non_decision = uniform(rng, d.non_decision_lower(), d.non_decision_upper());

        let (mut x1, mut x2) = (0.0_f64, 0.0_f64);
        let mut t = 0.0;
        let mut steps: u64 = 0;
        loop {
            x1 += drift.0 * time_step + noise.sample(rng);
            x2 += drift.1 * time_step + noise.sample(rng);
            t += time_step;
            steps += 1;
            if x1 * x1 + x2 * x2 >= boundary_sq {
                break;
            }
            if steps >= MAX_STEPS_PER_TRIAL {
                return Err(AppError::numeric(format!(
                    "Random walk did not reach radius {boundary} within {MAX_STEPS_PER_TRIAL} steps."
                )));
            }
        }
        trials.push(Trial::new(x2.atan2(x1), t + non_decision));
    }

    Ok(trials)
}

/// `U(lower, upper)`; degenerate ranges return the midpoint.
fn uniform<R: Rng + ?Sized>(rng: &mut R, lower: f64, upper: f64) -> f64 {
    if upper > lower {
        rng.gen_range(lower..upper)
    } else {
        (lower + upper) / 2.0
    }
}

/// Summary of a simulated dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub trial_count: usize,
    pub rt_min: f64,
    pub rt_max: f64,
    pub rt_mean: f64,
    /// Direction of the mean resultant vector of the exit angles.
    pub angle_mean: f64,
    /// Length of the mean resultant vector, in `[0, 1]`.
    pub angle_concentration: f64,
}

pub fn compute_stats(trials: &[Trial]) -> Option<DatasetStats> {
    if trials.is_empty() {
        return None;
    }
    let n = trials.len() as f64;

    let mut rt_min = f64::INFINITY;
    let mut rt_max = f64::NEG_INFINITY;
    let mut rt_sum = 0.0;
    let mut cos_sum = 0.0;
    let mut sin_sum = 0.0;
    for trial in trials {
        rt_min = rt_min.min(trial.response_time);
        rt_max = rt_max.max(trial.response_time);
        rt_sum += trial.response_time;
        cos_sum += trial.angle.cos();
        sin_sum += trial.angle.sin();
    }

    if !(rt_min.is_finite() && rt_max.is_finite()) {
        return None;
    }

    Some(DatasetStats {
        trial_count: trials.len(),
        rt_min,
        rt_max,
        rt_mean: rt_sum / n,
        angle_mean: sin_sum.atan2(cos_sum),
        angle_concentration: (cos_sum * cos_sum + sin_sum * sin_sum).sqrt() / n,
    })
}
