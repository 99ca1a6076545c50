//! Log-likelihood of a dataset under the circular diffusion model.
//!
//! Each trial averages `Z(a, t) * P(a, t)` over its grid window, where `P` is
//! the precomputed first-passage density and `Z` the closed-form factor that
//! integrates out drift variability for the observed exit angle.
//!
//! Trials are independent and evaluated with rayon; the log-densities are
//! collected in dataset order and summed sequentially.

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::debug;

use crate::density::DensityGrid;
use crate::domain::{DerivedParameters, ModelParameters, Trial};
use crate::likelihood::window::TrialWindow;

/// Total log-likelihood of `trials`.
///
/// `0.0` for an empty dataset, `-inf` when the parameters cannot produce the
/// data (see [`trial_log_densities`]).
pub fn log_likelihood(parameters: &ModelParameters, trials: &[Trial], grid: &DensityGrid) -> f64 {
    trial_log_densities(parameters, trials, grid)
        .into_iter()
        .fold(0.0, |total, value| total + value)
}

/// Per-trial log-densities, in dataset order.
///
/// Every entry is `-inf` when a parameter is non-finite or when the earliest
/// response, shifted back to the non-decision lower edge (`t0 - st/2`), does
/// not reach past the first time sample.
pub fn trial_log_densities(
    parameters: &ModelParameters,
    trials: &[Trial],
    grid: &DensityGrid,
) -> Vec<f64> {
    if trials.is_empty() {
        return Vec::new();
    }
    if !parameters.is_finite() {
        debug!("non-finite parameters");
        return vec![f64::NEG_INFINITY; trials.len()];
    }

    let derived = parameters.derived();
    let earliest = trials
        .iter()
        .map(|t| t.response_time)
        .fold(f64::INFINITY, f64::min);
    let earliest_index = grid
        .time_axis()
        .index_of(earliest - derived.non_decision_time + derived.non_decision_half_range);
    if earliest_index <= 0 {
        debug!(earliest, earliest_index, "earliest response precedes non-decision time");
        return vec![f64::NEG_INFINITY; trials.len()];
    }

    trials
        .par_iter()
        .map(|trial| trial_density(&derived, trial, grid).ln())
        .collect()
}

/// Marginal density of one trial: `mean(Z * P)` over its window times `mT`.
pub fn trial_density(derived: &DerivedParameters, trial: &Trial, grid: &DensityGrid) -> f64 {
    let window = TrialWindow::select(
        derived,
        trial.response_time,
        grid.radius_axis(),
        grid.time_axis(),
    );
    if window.is_empty() {
        return 0.0;
    }

    let block = grid.values().view(
        (window.radius.start, window.time.start),
        (window.radius.len(), window.time.len()),
    );
    let angle = trial.angle - derived.bias;
    let (sin, cos) = (angle.sin(), angle.cos());

    let z = DMatrix::from_fn(block.nrows(), block.ncols(), |i, j| {
        if block[(i, j)] == 0.0 {
            return 0.0;
        }
        let radius = grid.radius_axis().value(window.radius.start + i);
        let time = grid.time_axis().value(window.time.start + j);
        directional_factor(derived, cos, sin, radius, time)
    });
    z.component_mul(&block).mean() * window.multiplicity
}

/// `Z(a, t)` for an exit direction with the given `cos`/`sin` relative to the
/// drift bias. The operation order is fixed so results are reproducible
/// bit-for-bit.
pub fn directional_factor(d: &DerivedParameters, cos: f64, sin: f64, radius: f64, time: f64) -> f64 {
    let v = d.drift_length;
    let eta1_sq = d.eta_radial * d.eta_radial;
    let eta2_sq = d.eta_tangential * d.eta_tangential;
    let radius_sq = radius * radius;
    let radial = eta1_sq * time + 1.0;
    let tangential = eta2_sq * time + 1.0;

    let exponent = (-(v * v) * time + radius_sq * (cos * cos) * eta1_sq + 2.0 * v * radius * cos)
        / radial
        / 2.0
        + radius_sq * (sin * sin) * eta2_sq / tangential / 2.0;
    exponent.exp() / radial.sqrt() / tangential.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GridAxis;
    use approx::assert_relative_eq;

    fn flat_grid(value: f64) -> DensityGrid {
        let ra = GridAxis::new(0.5, 3.0, 0.1).unwrap();
        let ta = GridAxis::new(0.0, 5.0, 0.01).unwrap();
        DensityGrid::from_values(ra, ta, DMatrix::from_element(ra.len(), ta.len(), value)).unwrap()
    }

    fn params(raw: [f64; 8]) -> ModelParameters {
        ModelParameters::from_slice(&raw).unwrap()
    }

    #[test]
    fn empty_dataset_scores_zero() {
        let grid = flat_grid(0.1);
        let p = params([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert_eq!(log_likelihood(&p, &[], &grid), 0.0);
        assert!(trial_log_densities(&p, &[], &grid).is_empty());
    }

    #[test]
    fn responses_before_non_decision_time_short_circuit() {
        let grid = flat_grid(0.1);
        let p = params([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5, 0.0]);
        let trials = [Trial::new(0.0, 0.4), Trial::new(0.1, 1.2)];
        assert_eq!(log_likelihood(&p, &trials, &grid), f64::NEG_INFINITY);
        assert!(
            trial_log_densities(&p, &trials, &grid)
                .iter()
                .all(|v| *v == f64::NEG_INFINITY)
        );
    }

    #[test]
    fn non_finite_parameters_short_circuit() {
        let grid = flat_grid(0.1);
        let p = params([1.5, 0.0, f64::NAN, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert_eq!(log_likelihood(&p, &[Trial::new(0.0, 0.8)], &grid), f64::NEG_INFINITY);
    }

    #[test]
    fn zero_variability_factor_is_the_drift_exponential() {
        let d = params([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]).derived();
        let z = directional_factor(&d, 1.0, 0.0, 1.5, 0.6);
        assert_relative_eq!(z, (-0.6f64 / 2.0 + 1.5).exp(), max_relative = 1e-15);
    }

    #[test]
    fn single_cell_window_multiplies_factor_and_density() {
        let grid = flat_grid(0.25);
        let p = params([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        let d = p.derived();
        let density = trial_density(&d, &Trial::new(0.0, 0.8), &grid);
        let t = grid.time_axis().value(60);
        let expected = directional_factor(&d, 1.0, 0.0, grid.radius_axis().value(10), t) * 0.25;
        assert_relative_eq!(density, expected, max_relative = 1e-15);
    }

    #[test]
    fn zero_density_cells_are_masked() {
        let ra = GridAxis::new(0.5, 3.0, 0.1).unwrap();
        let ta = GridAxis::new(0.0, 5.0, 0.01).unwrap();
        let grid = DensityGrid::from_values(ra, ta, DMatrix::zeros(ra.len(), ta.len())).unwrap();
        let p = params([1.5, 0.2, 1.0, 0.0, 0.5, 0.5, 0.2, 0.1]);
        let ll = log_likelihood(&p, &[Trial::new(0.3, 0.8)], &grid);
        assert_eq!(ll, f64::NEG_INFINITY);
    }

    #[test]
    fn window_outside_grid_contributes_zero_density() {
        let grid = flat_grid(0.1);
        let p = params([10.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        let values = trial_log_densities(&p, &[Trial::new(0.0, 0.8)], &grid);
        assert_eq!(values, vec![f64::NEG_INFINITY]);
    }

    #[test]
    fn early_response_scales_window_mean_by_kept_fraction() {
        let grid = flat_grid(0.25);
        let p = params([1.5, 0.0, 1.0, 0.4, 0.0, 0.0, 0.3, 0.2]);
        let d = p.derived();
        let trial = Trial::new(0.2, 0.35);
        let window = TrialWindow::select(&d, trial.response_time, grid.radius_axis(), grid.time_axis());
        assert_eq!(window.time.start, 0);
        assert!(window.multiplicity < 1.0);

        let angle = trial.angle - d.bias;
        let (sin, cos) = (angle.sin(), angle.cos());
        let radius = grid.radius_axis().value(window.radius.start);
        let mut total = 0.0;
        for j in window.time.clone() {
            total += directional_factor(&d, cos, sin, radius, grid.time_axis().value(j)) * 0.25;
        }
        let expected = total / window.cell_count() as f64 * window.multiplicity;

        let density = trial_density(&d, &trial, &grid);
        assert_relative_eq!(density, expected, max_relative = 1e-12);
        assert_relative_eq!(
            trial_log_densities(&p, &[trial], &grid)[0],
            expected.ln(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn far_off_grid_values_score_neg_infinity() {
        let grid = flat_grid(0.1);
        let huge_radius = params([1e300, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert_eq!(
            log_likelihood(&huge_radius, &[Trial::new(0.0, 0.8)], &grid),
            f64::NEG_INFINITY
        );
        let p = params([1.5, 0.0, 1.0, 0.0, 0.0, 0.0, 0.2, 0.0]);
        assert_eq!(log_likelihood(&p, &[Trial::new(0.0, 1e300)], &grid), f64::NEG_INFINITY);
    }
}
