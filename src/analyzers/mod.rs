//! Admission-statistics aggregation.
//!
//! Per-major time series with derived metrics, and cross-major aggregates
//! (average cutoff per year, highest cutoffs, average trend).

pub mod cross_major;
pub mod series;
pub mod trend;
pub mod types;
pub mod utility;
