//! First-passage time density of the circular diffusion model.
//!
//! - `series`: the truncated Bessel series at one `(a, t)` cell
//! - `grid`: the precomputed `(radius, time)` grid the evaluator reads from

pub mod grid;
pub mod series;

pub use grid::{DensityGrid, GridBuildStats, build_density_grid, build_from_settings, build_with_table};
