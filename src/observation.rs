//! Core records produced by the CSV extraction step.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::sync::Arc;

/// Slowest speed accepted as a real reading; anything lower is a data entry error.
pub const MINIMUM_SPEED: u32 = 10;
/// Fastest speed accepted as a real reading.
pub const MAXIMUM_SPEED: u32 = 99;

/// Metadata about one speed study sheet: who recorded it, where, and when.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub filename: String,
    pub name: String,
    pub date: NaiveDate,
    pub location: String,
    pub direction: String,
    pub weather: String,
    pub speed_limit: f64,
}

/// A single validated vehicle reading.
///
/// Every observation from the same file shares one [`FileMetadata`].
#[derive(Debug, Clone)]
pub struct Observation {
    pub vehicle_id: String,
    pub time_of_day: NaiveTime,
    pub speed: u32,
    pub metadata: Arc<FileMetadata>,
    pub timestamp: NaiveDateTime,
}

impl Observation {
    pub fn new(
        vehicle_id: &str,
        time_of_day: NaiveTime,
        speed: u32,
        metadata: Arc<FileMetadata>,
    ) -> Self {
        let timestamp = metadata.date.and_time(time_of_day);
        Observation {
            vehicle_id: vehicle_id.to_string(),
            time_of_day,
            speed,
            metadata,
            timestamp,
        }
    }

    pub fn speed_limit(&self) -> f64 {
        self.metadata.speed_limit
    }
}

/// Flattened view of an [`Observation`], one CSV row per vehicle.
#[derive(Debug, Serialize)]
pub struct ObservationRecord<'a> {
    pub filename: &'a str,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub vehicle: &'a str,
    pub speed: u32,
    pub speed_limit: f64,
    pub location: &'a str,
    pub direction: &'a str,
    pub weather: &'a str,
    pub name: &'a str,
}

impl<'a> From<&'a Observation> for ObservationRecord<'a> {
    fn from(obs: &'a Observation) -> Self {
        let meta = obs.metadata.as_ref();
        ObservationRecord {
            filename: &meta.filename,
            date: meta.date,
            time: obs.time_of_day,
            vehicle: &obs.vehicle_id,
            speed: obs.speed,
            speed_limit: meta.speed_limit,
            location: &meta.location,
            direction: &meta.direction,
            weather: &meta.weather,
            name: &meta.name,
        }
    }
}
