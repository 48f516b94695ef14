//! Extraction of vehicle readings from the repeating `Vehicle, Time, Speed` blocks.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{debug, warn};

use crate::observation::{FileMetadata, Observation, MAXIMUM_SPEED, MINIMUM_SPEED};
use crate::parser::RawRow;

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%I:%M%p"];

/// One column of a vehicle triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleField {
    Vehicle,
    Time,
    Speed,
}

impl VehicleField {
    pub const ALL: [VehicleField; 3] = [
        VehicleField::Vehicle,
        VehicleField::Time,
        VehicleField::Speed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VehicleField::Vehicle => "vehicle",
            VehicleField::Time => "time",
            VehicleField::Speed => "speed",
        }
    }

    /// True when the cell reads like this field's column label.
    pub fn matches(self, cell: &str) -> bool {
        cell.to_lowercase().starts_with(self.name())
    }
}

/// Column index to the field found in that column.
pub type ColumnMap = BTreeMap<usize, VehicleField>;

/// Builds a column map from a sub-header row, or `None` if the row names no fields.
pub fn extract_header_info(row: &[String]) -> Option<ColumnMap> {
    let mut columns = ColumnMap::new();
    for field in VehicleField::ALL {
        for (idx, cell) in row.iter().enumerate() {
            if !cell.is_empty() && field.matches(cell) {
                columns.insert(idx, field);
            }
        }
    }
    (!columns.is_empty()).then_some(columns)
}

/// Cells collected for one vehicle while walking a data row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PartialVehicle {
    pub vehicle: Option<String>,
    pub time: Option<String>,
    pub speed: Option<String>,
}

impl PartialVehicle {
    pub fn new(vehicle: &str, time: &str, speed: &str) -> Self {
        PartialVehicle {
            vehicle: Some(vehicle.to_string()),
            time: Some(time.to_string()),
            speed: Some(speed.to_string()),
        }
    }

    fn set(&mut self, field: VehicleField, value: &str) {
        let slot = match field {
            VehicleField::Vehicle => &mut self.vehicle,
            VehicleField::Time => &mut self.time,
            VehicleField::Speed => &mut self.speed,
        };
        *slot = Some(value.to_string());
    }

    fn is_complete(&self) -> bool {
        self.vehicle.is_some() && self.time.is_some() && self.speed.is_some()
    }

    fn get(&self, field: VehicleField) -> &str {
        let slot = match field {
            VehicleField::Vehicle => &self.vehicle,
            VehicleField::Time => &self.time,
            VehicleField::Speed => &self.speed,
        };
        slot.as_deref().unwrap_or("")
    }
}

/// A blank entry, or a repeated sub-header caught mid-data.
///
/// A field is null when it is empty or reads like its own column label.
pub fn is_null_vehicle(cur: &PartialVehicle) -> bool {
    VehicleField::ALL.iter().any(|&field| {
        let value = cur.get(field);
        value.is_empty() || field.matches(value)
    })
}

/// An entry worth keeping: numeric vehicle number and a plausible speed.
pub fn is_valid_vehicle(cur: &PartialVehicle) -> bool {
    if is_null_vehicle(cur) {
        return false;
    }
    if !is_all_digits(cur.get(VehicleField::Vehicle)) {
        return false;
    }
    let speed = cur.get(VehicleField::Speed);
    is_all_digits(speed)
        && speed
            .parse::<u32>()
            .is_ok_and(|s| (MINIMUM_SPEED..=MAXIMUM_SPEED).contains(&s))
}

fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a time of day as written on the sheet: `6:56`, `06:56:10`, `7:05 PM`.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let text = text.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

enum ExtractState {
    SeekingSubHeader,
    Accumulating(ColumnMap),
}

/// Reads all vehicle blocks following a sheet's header.
///
/// Rows are data while a sub-header is active. A row that yields no vehicles
/// and parses as a sub-header replaces the active column layout, so blocks
/// with different layouts can follow each other.
pub fn read_vehicle_data<'a, I>(metadata: Arc<FileMetadata>, rows: I) -> Vec<Observation>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut state = ExtractState::SeekingSubHeader;
    let mut data = Vec::new();

    for row in rows {
        if let ExtractState::Accumulating(columns) = &state {
            let row_data = extract_data_row(&metadata, columns, row);
            if !row_data.is_empty() {
                data.extend(row_data);
                continue;
            }
        }

        if let Some(columns) = extract_header_info(&row.cells) {
            debug!(line = row.line, columns = columns.len(), "Vehicle sub-header found");
            state = ExtractState::Accumulating(columns);
        }
    }

    data
}

/// Extracts every vehicle in one data row.
///
/// Invalid entries are logged and dropped, blank and header entries are dropped silently.
pub fn extract_data_row(
    metadata: &Arc<FileMetadata>,
    columns: &ColumnMap,
    row: &RawRow,
) -> Vec<Observation> {
    let mut data = Vec::new();
    let mut cur = PartialVehicle::default();

    for (idx, cell) in row.cells.iter().enumerate() {
        if let Some(&field) = columns.get(&idx) {
            cur.set(field, cell);
        }
        if !cur.is_complete() {
            continue;
        }

        if is_valid_vehicle(&cur) {
            let vehicle = cur.get(VehicleField::Vehicle);
            let speed = cur.get(VehicleField::Speed).parse::<u32>();
            match (parse_time(cur.get(VehicleField::Time)), speed) {
                (Some(time), Ok(speed)) => {
                    data.push(Observation::new(vehicle, time, speed, Arc::clone(metadata)));
                }
                _ => log_invalid(metadata, row.line, &cur),
            }
        } else if !is_null_vehicle(&cur) {
            log_invalid(metadata, row.line, &cur);
        }
        cur = PartialVehicle::default();
    }

    data
}

fn log_invalid(metadata: &FileMetadata, line: u64, cur: &PartialVehicle) {
    warn!(
        file = %metadata.filename,
        line,
        vehicle = cur.get(VehicleField::Vehicle),
        time = cur.get(VehicleField::Time),
        speed = cur.get(VehicleField::Speed),
        "Invalid vehicle"
    );
}
