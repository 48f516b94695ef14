//! CSV parser for hand-transcribed speed study sheets.
//!
//! Each sheet starts with a block of metadata rows (`Name`, `Date`, `Speed Limit`, ...)
//! followed by one or more blocks of vehicle data laid out as repeating
//! `Vehicle, Time, Speed` column triads.

pub mod header;
pub mod vehicles;

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, Trim};
use tracing::{debug, error, info};

use crate::error::{Result, StudyError};
use crate::observation::Observation;

pub use header::read_file_header;
pub use vehicles::read_vehicle_data;

/// One physical CSV row with the line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: u64,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn new(line: u64, cells: &[&str]) -> Self {
        RawRow {
            line,
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Reads every row of a sheet. Rows may have differing widths and cells are trimmed.
/// Invalid UTF-8 is replaced, not rejected.
pub fn read_rows<R: Read>(reader: R, path: &Path) -> Result<Vec<RawRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result.map_err(|source| StudyError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line());
        let cells = record
            .iter()
            .map(|cell| {
                String::from_utf8_lossy(cell)
                    .trim_start_matches('\u{feff}')
                    .to_string()
            })
            .collect();
        rows.push(RawRow { line, cells });
    }

    Ok(rows)
}

/// Reads a single sheet: its header block, then all of its vehicle data.
#[tracing::instrument(skip(path), fields(file = %path.display()))]
pub fn read_data_file(path: &Path) -> Result<Vec<Observation>> {
    let file = File::open(path).map_err(|source| StudyError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_rows(file, path)?;
    let filename = path.display().to_string();

    let mut rows = rows.iter();
    let metadata = read_file_header(&filename, &mut rows)?;
    debug!(
        date = %metadata.date,
        location = %metadata.location,
        speed_limit = metadata.speed_limit,
        "Header parsed"
    );

    let observations = read_vehicle_data(Arc::new(metadata), rows);
    debug!(count = observations.len(), "Vehicle data extracted");
    Ok(observations)
}

/// Reads every sheet directly inside `dir`, in file name order.
///
/// Sub-directories and dot-files are skipped. The first file that fails to
/// read or parse aborts the whole directory.
pub fn read_data_directory(dir: &Path) -> Result<Vec<Observation>> {
    let io_err = |source| StudyError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_file() && !hidden {
            paths.push(path);
        }
    }
    paths.sort();

    let mut data = Vec::new();
    for path in &paths {
        match read_data_file(path) {
            Ok(observations) => data.extend(observations),
            Err(e) => {
                error!(file = %path.display(), error = %e, "Failed reading speed study file");
                return Err(e);
            }
        }
    }

    info!(
        files = paths.len(),
        observations = data.len(),
        "Input directory read"
    );
    Ok(data)
}
