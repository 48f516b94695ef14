use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::warn;

use crate::analyzers::utility::mean;
use crate::observation::Observation;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BucketStatistics {
    pub limit: f64,
    pub count: usize,
    pub count_legal: usize,
    #[serde(rename = "%legal")]
    pub pct_legal: f64,

    // order statistics
    pub min: f64,
    pub max: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "85%")]
    pub p85: f64,
    #[serde(rename = "99%")]
    pub p99: f64,
    pub diff: f64,
    pub mean: f64,

    /// Sorted raw speeds, kept for combining days and for histograms.
    #[serde(rename = "_speeds")]
    pub speeds: Vec<f64>,
}

impl BucketStatistics {
    /// Summarizes a set of speeds against a posted limit. `None` when there are no speeds.
    pub fn from_speeds(mut speeds: Vec<f64>, limit: f64) -> Option<Self> {
        if speeds.is_empty() {
            return None;
        }
        speeds.sort_by(f64::total_cmp);

        let count = speeds.len();
        let count_legal = speeds.iter().filter(|&&s| s <= limit).count();
        let min = speeds[0];
        let max = speeds[count - 1];

        Some(BucketStatistics {
            limit,
            count,
            count_legal,
            pct_legal: Self::pct(count_legal, count),
            min,
            max,
            p50: percentile(&speeds, 0.50),
            p85: percentile(&speeds, 0.85),
            p99: percentile(&speeds, 0.99),
            diff: max - min,
            mean: mean(&speeds),
            speeds,
        })
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

/// Nearest-rank percentile: the element at `floor((n - 1) * p)` of sorted data.
/// Returns 0.0 for empty input.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Computes statistics for every non-empty bucket.
///
/// The speed limit is the one recorded with the bucket's first observation.
pub fn compute_statistics(
    buckets: &BTreeMap<NaiveDateTime, Vec<&Observation>>,
) -> BTreeMap<NaiveDateTime, BucketStatistics> {
    let mut stats = BTreeMap::new();

    for (anchor, observations) in buckets {
        let Some(first) = observations.first() else {
            continue;
        };
        let limit = first.speed_limit();

        if let Some(other) = observations.iter().find(|o| o.speed_limit() != limit) {
            warn!(
                bucket = %anchor,
                limit,
                other_limit = other.speed_limit(),
                other_file = %other.metadata.filename,
                "Bucket mixes speed limits, using the first"
            );
        }

        let speeds = observations.iter().map(|o| o.speed as f64).collect();
        if let Some(s) = BucketStatistics::from_speeds(speeds, limit) {
            stats.insert(*anchor, s);
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::tests::{metadata, observation};
    use chrono::{NaiveDate, NaiveTime};

    fn anchor(time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2016-01-01 {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn stats_for(speeds: &[u32]) -> BucketStatistics {
        let observations: Vec<_> = speeds
            .iter()
            .map(|&s| observation(s, "2016-01-01", "05:00:00"))
            .collect();
        let buckets: BTreeMap<NaiveDateTime, Vec<&Observation>> =
            BTreeMap::from([(anchor("05:00:00"), observations.iter().collect())]);
        compute_statistics(&buckets).remove(&anchor("05:00:00")).unwrap()
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(BucketStatistics::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(BucketStatistics::pct(50, 100), 50.0);
        assert_eq!(BucketStatistics::pct(1, 4), 25.0);
    }

    #[test]
    fn test_compute_statistics_small_buckets() {
        let mixed = stats_for(&[30, 20]);
        assert_eq!(mixed.max, 30.0);
        assert_eq!(mixed.min, 20.0);
        assert_eq!(mixed.count_legal, 1);
        assert_eq!(mixed.diff, 10.0);
        assert_eq!(mixed.mean, 25.0);
        assert_eq!(mixed.count, 2);
        assert_eq!(mixed.speeds, vec![20.0, 30.0]);

        let fast = stats_for(&[30, 30]);
        assert_eq!(fast.count_legal, 0);
        assert_eq!(fast.pct_legal, 0.0);
        assert_eq!(fast.diff, 0.0);
        assert_eq!(fast.mean, 30.0);

        let slow = stats_for(&[20, 20]);
        assert_eq!(slow.max, 20.0);
        assert_eq!(slow.min, 20.0);
        assert_eq!(slow.count_legal, 2);
        assert_eq!(slow.pct_legal, 100.0);
        assert_eq!(slow.mean, 20.0);
    }

    #[test]
    fn test_compute_statistics_nearest_rank_percentiles() {
        let s = stats_for(&[29, 28, 27, 26, 25, 24, 23, 22, 21, 20]);
        assert_eq!(s.p50, 24.0);
        assert_eq!(s.p85, 27.0);
        assert_eq!(s.p99, 28.0);
        assert_eq!(s.limit, 25.0);
        assert_eq!(s.count_legal, 6);
        assert_eq!(s.pct_legal, 60.0);
    }

    #[test]
    fn test_compute_statistics_skips_empty_bucket() {
        let buckets: BTreeMap<NaiveDateTime, Vec<&Observation>> =
            BTreeMap::from([(anchor("05:00:00"), Vec::new())]);
        assert!(compute_statistics(&buckets).is_empty());
    }

    #[test]
    fn test_compute_statistics_mixed_limits_uses_first() {
        let date = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let time = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        let observations = [
            Observation::new("1", time, 28, metadata(date, 30.0)),
            Observation::new("2", time, 28, metadata(date, 25.0)),
        ];
        let buckets: BTreeMap<NaiveDateTime, Vec<&Observation>> =
            BTreeMap::from([(anchor("05:00:00"), observations.iter().collect())]);

        let s = &compute_statistics(&buckets)[&anchor("05:00:00")];
        assert_eq!(s.limit, 30.0);
        assert_eq!(s.count_legal, 2);
    }

    #[test]
    fn test_percentile_single_value_and_empty() {
        assert_eq!(percentile(&[42.0], 0.99), 42.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_from_speeds_empty_is_none() {
        assert!(BucketStatistics::from_speeds(Vec::new(), 25.0).is_none());
    }
}
