//! Synthetic datasets.

pub mod sample;

pub use sample::{DatasetStats, compute_stats, simulate};
