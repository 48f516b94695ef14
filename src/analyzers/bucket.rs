use std::collections::BTreeMap;

use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::error::{Result, StudyError};
use crate::observation::Observation;

/// Splits observations into fixed-length buckets keyed by the bucket start.
///
/// Buckets are counted from the top of the hour of the earliest observation,
/// so with 15 minute buckets an observation at 05:14:59 lands in 05:00 and one
/// at 05:15:00 in 05:15. Observations keep their input order within a bucket
/// and empty buckets are never created.
///
/// # Errors
///
/// [`StudyError::EmptyInput`] with no observations, [`StudyError::InvalidInterval`]
/// unless `duration` is at least one second.
pub fn bucket_observations(
    observations: &[Observation],
    duration: TimeDelta,
) -> Result<BTreeMap<NaiveDateTime, Vec<&Observation>>> {
    let seconds = duration.num_seconds();
    if seconds <= 0 {
        return Err(StudyError::InvalidInterval(seconds));
    }

    let earliest = observations
        .iter()
        .map(|o| o.timestamp)
        .min()
        .ok_or(StudyError::EmptyInput)?;
    let min_anchor = truncate_to_hour(earliest);

    let mut buckets: BTreeMap<NaiveDateTime, Vec<&Observation>> = BTreeMap::new();
    for obs in observations {
        let elapsed = (obs.timestamp - min_anchor).num_seconds();
        let anchor = min_anchor + TimeDelta::seconds(elapsed.div_euclid(seconds) * seconds);
        buckets.entry(anchor).or_default().push(obs);
    }

    Ok(buckets)
}

fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    NaiveTime::from_hms_opt(ts.hour(), 0, 0).map_or(ts, |hour| ts.date().and_time(hour))
}
