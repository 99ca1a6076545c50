//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed by value between the grid builder, the evaluator and the simulator
//! - handed to an external fitting driver as plain numbers
//! - printed as part of the JSON run report

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A sampled real-valued range `[lower, upper)` with a fixed step.
///
/// Sample `i` sits at `lower + i * step`; there are `floor((upper - lower) / step)`
/// samples. Continuous values map to indices by truncating `(v - lower) / step`
/// toward zero, so offsets below `lower` produce negative indices that callers
/// clip or interpret themselves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    lower: f64,
    upper: f64,
    step: f64,
}

impl GridAxis {
    pub fn new(lower: f64, upper: f64, step: f64) -> Result<Self, AppError> {
        if !(lower.is_finite() && upper.is_finite() && step.is_finite()) {
            return Err(AppError::invalid(format!(
                "Invalid grid axis: lower={lower}, upper={upper}, step={step} (must be finite)."
            )));
        }
        if step <= 0.0 {
            return Err(AppError::invalid(format!("Invalid grid axis: step={step} (must be > 0).")));
        }
        if upper <= lower {
            return Err(AppError::invalid(format!(
                "Invalid grid axis: upper={upper} must be > lower={lower}."
            )));
        }
        let axis = Self { lower, upper, step };
        if axis.len() == 0 {
            return Err(AppError::invalid(format!(
                "Invalid grid axis: range {lower}..{upper} holds no sample at step {step}."
            )));
        }
        Ok(axis)
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Number of samples on the axis.
    pub fn len(&self) -> usize {
        ((self.upper - self.lower) / self.step).floor() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of sample `i`.
    pub fn value(&self, i: usize) -> f64 {
        self.lower + i as f64 * self.step
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }

    /// Index of a continuous value, truncated toward zero (may be negative or
    /// beyond the last sample).
    pub fn index_of(&self, v: f64) -> isize {
        ((v - self.lower) / self.step) as isize
    }
}

/// One observed decision: exit angle (radians) and response time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub angle: f64,
    pub response_time: f64,
}

impl Trial {
    pub fn new(angle: f64, response_time: f64) -> Self {
        Self { angle, response_time }
    }
}

/// The eight CDM parameters, in the order a fitting driver passes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Mean boundary radius `a`.
    pub mean_radius: f64,
    /// Boundary range as a multiple of `a` (uniform prior width).
    pub radius_range_multiplier: f64,
    /// Drift vector length `v`.
    pub drift_length: f64,
    /// Drift vector angle (radians).
    pub drift_angle_bias: f64,
    /// Radial drift SD as a multiple of `v`.
    pub radial_drift_sd_multiplier: f64,
    /// Tangential drift SD as a multiple of `v`.
    pub tangential_drift_sd_multiplier: f64,
    /// Mean non-decision time `t0`.
    pub mean_non_decision_time: f64,
    /// Full width of the uniform non-decision time prior.
    pub non_decision_time_range: f64,
}

impl ModelParameters {
    pub const LEN: usize = 8;

    /// Build from `[a, sa_mult, v, bias, eta1_mult, eta2_mult, t0, st]`.
    pub fn from_slice(values: &[f64]) -> Result<Self, AppError> {
        let [a, sa, v, bias, e1, e2, t0, st] = <[f64; Self::LEN]>::try_from(values).map_err(|_| {
            AppError::invalid(format!(
                "Expected {} model parameters, got {}.",
                Self::LEN,
                values.len()
            ))
        })?;
        Ok(Self {
            mean_radius: a,
            radius_range_multiplier: sa,
            drift_length: v,
            drift_angle_bias: bias,
            radial_drift_sd_multiplier: e1,
            tangential_drift_sd_multiplier: e2,
            mean_non_decision_time: t0,
            non_decision_time_range: st,
        })
    }

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.mean_radius,
            self.radius_range_multiplier,
            self.drift_length,
            self.drift_angle_bias,
            self.radial_drift_sd_multiplier,
            self.tangential_drift_sd_multiplier,
            self.mean_non_decision_time,
            self.non_decision_time_range,
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    pub fn derived(&self) -> DerivedParameters {
        let sa = self.radius_range_multiplier * self.mean_radius;
        DerivedParameters {
            radius: self.mean_radius,
            radius_half_range: sa / 2.0,
            drift_length: self.drift_length,
            bias: self.drift_angle_bias,
            eta_radial: self.radial_drift_sd_multiplier * self.drift_length,
            eta_tangential: self.tangential_drift_sd_multiplier * self.drift_length,
            non_decision_time: self.mean_non_decision_time,
            non_decision_half_range: self.non_decision_time_range / 2.0,
        }
    }

    /// Copy with the mean radius multiplied by `factor`.
    pub fn with_radius_scaled(&self, factor: f64) -> Self {
        Self {
            mean_radius: self.mean_radius * factor,
            ..*self
        }
    }
}

/// Quantities both the evaluator and the simulator work in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    pub radius: f64,
    pub radius_half_range: f64,
    pub drift_length: f64,
    pub bias: f64,
    pub eta_radial: f64,
    pub eta_tangential: f64,
    pub non_decision_time: f64,
    pub non_decision_half_range: f64,
}

impl DerivedParameters {
    /// Lower edge of the non-decision time window.
    pub fn non_decision_lower(&self) -> f64 {
        self.non_decision_time - self.non_decision_half_range
    }

    /// Upper edge of the non-decision time window.
    pub fn non_decision_upper(&self) -> f64 {
        self.non_decision_time + self.non_decision_half_range
    }
}

/// Everything that determines a density grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub radius_axis: GridAxis,
    pub time_axis: GridAxis,
    /// Term cap `N` for the series (and size of the Bessel table).
    pub max_terms: usize,
    /// Early-exit threshold on `|term / sum|`.
    pub relative_tolerance: f64,
    /// Decimal digits of working precision.
    pub decimal_precision: u32,
}

impl GridSettings {
    pub fn new(
        radius_axis: GridAxis,
        time_axis: GridAxis,
        max_terms: usize,
        relative_tolerance: f64,
        decimal_precision: u32,
    ) -> Result<Self, AppError> {
        if max_terms == 0 {
            return Err(AppError::invalid("Series term cap must be >= 1."));
        }
        if !(relative_tolerance.is_finite() && relative_tolerance > 0.0) {
            return Err(AppError::invalid(format!(
                "Invalid relative tolerance {relative_tolerance} (must be finite and > 0)."
            )));
        }
        if decimal_precision == 0 {
            return Err(AppError::invalid("Decimal precision must be >= 1 digit."));
        }
        Ok(Self {
            radius_axis,
            time_axis,
            max_terms,
            relative_tolerance,
            decimal_precision,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.radius_axis.len() * self.time_axis.len()
    }
}

/// How a synthetic dataset is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub time_step: f64,
    pub trial_count: usize,
    pub seed: u64,
}

impl SimulationSettings {
    pub fn new(time_step: f64, trial_count: usize, seed: u64) -> Result<Self, AppError> {
        if !(time_step.is_finite() && time_step > 0.0) {
            return Err(AppError::invalid(format!(
                "Invalid time step {time_step} (must be finite and > 0)."
            )));
        }
        if trial_count == 0 {
            return Err(AppError::invalid("Trial count must be > 0."));
        }
        Ok(Self {
            time_step,
            trial_count,
            seed,
        })
    }
}

/// Validated settings for one `cdm evaluate` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub grid: GridSettings,
    /// Parameters the dataset is simulated from (and scored at).
    pub parameters: ModelParameters,
    /// Additional parameter sets scored against the same dataset.
    pub compare: Vec<ModelParameters>,
    pub simulation: SimulationSettings,
}
