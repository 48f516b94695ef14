use std::collections::BTreeMap;

use tracing::debug;

use crate::stats::BucketStatistics;

/// Keeps only groups with more than `min_count` observations. `0` keeps everything.
pub fn filter_statistics(
    stats: BTreeMap<String, BucketStatistics>,
    min_count: usize,
) -> BTreeMap<String, BucketStatistics> {
    let before = stats.len();
    let kept: BTreeMap<_, _> = stats
        .into_iter()
        .filter(|(_, s)| s.count > min_count)
        .collect();

    if kept.len() < before {
        debug!(
            min_count,
            dropped = before - kept.len(),
            "Dropped low sample time periods"
        );
    }
    kept
}
