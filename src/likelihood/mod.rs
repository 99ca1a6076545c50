//! Log-likelihood evaluation against a precomputed density grid.
//!
//! - `window`: per-trial grid sub-region and the time multiplicity factor
//! - `evaluator`: the directional factor, per-trial densities and the total

pub mod evaluator;
pub mod window;

pub use evaluator::{directional_factor, log_likelihood, trial_density, trial_log_densities};
pub use window::TrialWindow;
