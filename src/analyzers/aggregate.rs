use crate::analyzers::utility::mean;
use crate::config::PercentileMode;
use crate::stats::{BucketStatistics, percentile};
use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use tracing::warn;

/// Formats the time of day of a bucket start as `HH:MM:00`.
pub fn time_of_day_key(anchor: &NaiveDateTime) -> String {
    format!("{:02}:{:02}:00", anchor.hour(), anchor.minute())
}

/// Regroups per-bucket statistics by time of day and combines the days of each group.
///
/// Days are combined in chronological order, so the first day's speed limit wins.
pub fn group_statistics(
    stats: &BTreeMap<NaiveDateTime, BucketStatistics>,
    mode: PercentileMode,
) -> BTreeMap<String, BucketStatistics> {
    let mut by_time: BTreeMap<String, Vec<&BucketStatistics>> = BTreeMap::new();
    for (anchor, s) in stats {
        by_time.entry(time_of_day_key(anchor)).or_default().push(s);
    }

    by_time
        .into_iter()
        .filter_map(|(when, days)| {
            if days.iter().any(|d| d.limit != days[0].limit) {
                warn!(when = %when, "Speed limit differs between days, using the first");
            }
            combine_statistics(&days, mode).map(|s| (when, s))
        })
        .collect()
}

/// Merges the statistics of several days into one.
///
/// Counts, legality, min and max are exact. The mean and percentiles are
/// either the plain average of each day's value or, in pooled mode,
/// recomputed from all speeds together.
pub fn combine_statistics(
    days: &[&BucketStatistics],
    mode: PercentileMode,
) -> Option<BucketStatistics> {
    let first = days.first()?;

    let count: usize = days.iter().map(|d| d.count).sum();
    let count_legal: usize = days.iter().map(|d| d.count_legal).sum();
    let min = days.iter().map(|d| d.min).fold(f64::INFINITY, f64::min);
    let max = days.iter().map(|d| d.max).fold(f64::NEG_INFINITY, f64::max);

    let mut speeds: Vec<f64> = days.iter().flat_map(|d| d.speeds.iter().copied()).collect();
    speeds.sort_by(f64::total_cmp);

    let (p50, p85, p99, avg) = match mode {
        PercentileMode::Averaged => {
            let average = |value: fn(&BucketStatistics) -> f64| {
                mean(&days.iter().map(|d| value(d)).collect::<Vec<_>>())
            };
            (
                average(|d| d.p50),
                average(|d| d.p85),
                average(|d| d.p99),
                average(|d| d.mean),
            )
        }
        PercentileMode::Pooled => (
            percentile(&speeds, 0.50),
            percentile(&speeds, 0.85),
            percentile(&speeds, 0.99),
            mean(&speeds),
        ),
    };

    Some(BucketStatistics {
        limit: first.limit,
        count,
        count_legal,
        pct_legal: BucketStatistics::pct(count_legal, count),
        min,
        max,
        p50,
        p85,
        p99,
        diff: max - min,
        mean: avg,
        speeds,
    })
}
