use std::collections::BTreeMap;

use crate::stats::BucketStatistics;

/// Width of each speed bin, in mph.
pub const BIN_WIDTH: u32 = 5;

/// Counts speeds in `BIN_WIDTH` wide bins labelled `"20-25"` (20 inclusive, 25 exclusive).
///
/// Only bins with at least one speed appear.
pub fn speed_histogram(speeds: &[f64]) -> BTreeMap<String, usize> {
    let mut bins = BTreeMap::new();
    for &speed in speeds {
        let low = (speed.max(0.0) as u32 / BIN_WIDTH) * BIN_WIDTH;
        *bins.entry(format!("{}-{}", low, low + BIN_WIDTH)).or_insert(0) += 1;
    }
    bins
}

/// Replaces each group's summary with a histogram of its speeds.
pub fn detail_statistics(
    stats: &BTreeMap<String, BucketStatistics>,
) -> BTreeMap<String, BTreeMap<String, usize>> {
    stats
        .iter()
        .map(|(when, s)| (when.clone(), speed_histogram(&s.speeds)))
        .collect()
}
