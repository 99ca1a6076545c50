//! Precomputed first-passage density over a `(radius, time)` grid.
//!
//! Construction is the expensive step of the whole crate: every cell evaluates
//! up to `N` big-float exponentials. Cells are independent, so they are
//! evaluated in parallel with rayon and written back in row-major order.

use std::time::Instant;

use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::density::series::{CellOutcome, SeriesCoefficients, first_passage_density};
use crate::domain::{GridAxis, GridSettings};
use crate::error::AppError;
use crate::math::precision::{HighPrecision, Precision, Real};
use crate::math::SpecialFunctionTable;

/// Density values `P[i, j]` at `radius_axis.value(i)`, `time_axis.value(j)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    radius_axis: GridAxis,
    time_axis: GridAxis,
    values: DMatrix<f64>,
}

impl DensityGrid {
    /// Wrap externally computed values; shape must match the axes and every
    /// entry must be finite and non-negative.
    pub fn from_values(
        radius_axis: GridAxis,
        time_axis: GridAxis,
        values: DMatrix<f64>,
    ) -> Result<Self, AppError> {
        let expected = (radius_axis.len(), time_axis.len());
        if values.shape() != expected {
            return Err(AppError::invalid(format!(
                "Density grid shape {:?} does not match axes {:?}.",
                values.shape(),
                expected
            )));
        }
        if let Some(bad) = values.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(AppError::invalid(format!(
                "Density grid holds invalid value {bad} (must be finite and >= 0)."
            )));
        }
        Ok(Self {
            radius_axis,
            time_axis,
            values,
        })
    }

    pub fn radius_axis(&self) -> &GridAxis {
        &self.radius_axis
    }

    pub fn time_axis(&self) -> &GridAxis {
        &self.time_axis
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// `(radius samples, time samples)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn get(&self, radius_index: usize, time_index: usize) -> f64 {
        self.values[(radius_index, time_index)]
    }
}

/// Counters gathered while filling a grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridBuildStats {
    pub cells: usize,
    /// Cells that hit the term cap before the tolerance exit.
    pub capped: usize,
    /// Cells whose elevated-precision value was negative.
    pub clamped: usize,
    pub terms: usize,
}

impl GridBuildStats {
    fn from_outcomes(outcomes: &[CellOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            acc.cells += 1;
            acc.terms += o.terms_used;
            if !o.converged {
                acc.capped += 1;
            }
            if o.clamped {
                acc.clamped += 1;
            }
            acc
        })
    }
}

/// Build the density grid from raw settings.
///
/// Computes the Bessel table at `decimal_precision` digits and evaluates the
/// series at every grid cell.
pub fn build_density_grid(
    radius_axis: GridAxis,
    time_axis: GridAxis,
    max_terms: usize,
    relative_tolerance: f64,
    decimal_precision: u32,
) -> Result<DensityGrid, AppError> {
    let settings = GridSettings::new(
        radius_axis,
        time_axis,
        max_terms,
        relative_tolerance,
        decimal_precision,
    )?;
    build_from_settings(&settings)
}

pub fn build_from_settings(settings: &GridSettings) -> Result<DensityGrid, AppError> {
    let hp = HighPrecision::new(Precision::from_digits(settings.decimal_precision)?);
    let started = Instant::now();
    let table = SpecialFunctionTable::compute(&hp, settings.max_terms)?;
    debug!(
        terms = settings.max_terms,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Bessel table ready"
    );
    build_with_table(settings, &hp, &table)
}

/// Build the grid reusing a precomputed table.
///
/// The table must hold at least `max_terms` entries at the precision `hp`
/// works in.
pub fn build_with_table(
    settings: &GridSettings,
    hp: &HighPrecision,
    table: &SpecialFunctionTable,
) -> Result<DensityGrid, AppError> {
    if table.precision() != hp.precision() {
        return Err(AppError::invalid(format!(
            "Bessel table was computed at {} digits, grid requests {}.",
            table.precision().digits(),
            hp.precision().digits()
        )));
    }
    if table.len() < settings.max_terms {
        return Err(AppError::invalid(format!(
            "Bessel table holds {} zeros, series needs {}.",
            table.len(),
            settings.max_terms
        )));
    }

    let started = Instant::now();
    let coefficients = SeriesCoefficients::from_table(table, settings.max_terms);
    let radii = lift_axis(hp, &settings.radius_axis)?;
    let times = lift_axis(hp, &settings.time_axis)?;
    let tolerance = hp.lift(settings.relative_tolerance)?;

    let (rows, cols) = (radii.len(), times.len());
    let outcomes: Vec<CellOutcome> = (0..rows * cols)
        .into_par_iter()
        .map(|cell| {
            let (i, j) = (cell / cols, cell % cols);
            first_passage_density(hp, &coefficients, &radii[i], &times[j], &tolerance)
        })
        .collect();

    let stats = GridBuildStats::from_outcomes(&outcomes);
    info!(
        rows,
        cols,
        capped = stats.capped,
        clamped = stats.clamped,
        mean_terms = stats.terms as f64 / stats.cells.max(1) as f64,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "density grid built"
    );

    let densities: Vec<f64> = outcomes.iter().map(|o| o.density).collect();
    DensityGrid::from_values(
        settings.radius_axis,
        settings.time_axis,
        DMatrix::from_row_slice(rows, cols, &densities),
    )
}

fn lift_axis(hp: &HighPrecision, axis: &GridAxis) -> Result<Vec<Real>, AppError> {
    axis.values().into_iter().map(|v| hp.lift(v)).collect()
}
