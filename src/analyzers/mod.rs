//! Time bucketing and statistical aggregation of vehicle observations.
//!
//! Observations are grouped into fixed-length buckets, summarized per bucket,
//! then folded across days into one row per time of day.

pub mod aggregate;
pub mod analyzer;
pub mod bucket;
pub mod filter;
pub mod histogram;
pub mod utility;
