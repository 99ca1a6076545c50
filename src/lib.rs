//! `cdm-likelihood` library crate.
//!
//! Likelihood evaluation for the circular diffusion model (CDM) of continuous
//! report decisions. The binary (`cdm`) is a thin wrapper around this library
//! so that:
//!
//! - the grid builder and evaluator are testable without spawning processes
//! - a fitting driver can link the library and call `log_likelihood` directly
//!
//! Typical use: build one [`density::DensityGrid`], then call
//! [`likelihood::log_likelihood`] for each candidate parameter vector.

pub mod app;
pub mod cli;
pub mod data;
pub mod density;
pub mod domain;
pub mod error;
pub mod likelihood;
pub mod math;
pub mod report;
