//! Numerical building blocks at elevated precision.
//!
//! - `precision`: the big-float context (`exp`, `sin`/`cos`, `pi`, lifting and demotion)
//! - `bessel`: `J0`/`J1`, the zeros of `J0`, and the precomputed table

pub mod bessel;
pub mod precision;

pub use bessel::SpecialFunctionTable;
pub use precision::{HighPrecision, Precision, Real};
