//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - grid descriptors (`GridAxis`, `GridSettings`)
//! - observations (`Trial`)
//! - the CDM parameter vector (`ModelParameters`) and its derived quantities
//! - run configuration (`SimulationSettings`, `RunConfig`)

pub mod types;

pub use types::*;
