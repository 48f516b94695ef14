use crate::analyzers::aggregate::group_statistics;
use crate::analyzers::bucket::bucket_observations;
use crate::analyzers::filter::filter_statistics;
use crate::analyzers::histogram::detail_statistics;
use crate::config::ReportSettings;
use crate::error::Result;
use crate::observation::Observation;
use crate::output::write_table;
use crate::parser::read_data_directory;
use crate::stats::{BucketStatistics, compute_statistics};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{debug, info};

/// Final table, keyed by time of day (`HH:MM:00`).
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    Summary(BTreeMap<String, BucketStatistics>),
    Detail(BTreeMap<String, BTreeMap<String, usize>>),
}

impl Report {
    pub fn len(&self) -> usize {
        match self {
            Report::Summary(rows) => rows.len(),
            Report::Detail(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the report as CSV with a leading `when` column.
    pub fn write_csv<W: Write>(&self, out: W) -> anyhow::Result<()> {
        match self {
            Report::Summary(rows) => write_table(out, rows),
            Report::Detail(rows) => write_table(out, rows),
        }
    }
}

/// Buckets observations, computes per-bucket statistics and folds them into
/// one row per time of day.
pub fn build_report(observations: &[Observation], settings: &ReportSettings) -> Result<Report> {
    debug!(interval_minutes = settings.interval_minutes, "Bucketing data");
    let buckets = bucket_observations(observations, settings.interval())?;

    debug!(buckets = buckets.len(), "Computing statistics");
    let stats = compute_statistics(&buckets);

    debug!(mode = ?settings.percentiles, "Grouping statistics");
    let grouped = group_statistics(&stats, settings.percentiles);
    let filtered = filter_statistics(grouped, settings.min_count);

    Ok(if settings.detail {
        Report::Detail(detail_statistics(&filtered))
    } else {
        Report::Summary(filtered)
    })
}

/// Reads every sheet in the input directory and writes the report to `out`.
#[tracing::instrument(skip(out), fields(input = %settings.input.display()))]
pub fn run_report<W: Write>(settings: &ReportSettings, out: W) -> anyhow::Result<Report> {
    debug!("Reading in data");
    let observations = read_data_directory(&settings.input)?;

    let report = build_report(&observations, settings)?;
    info!(rows = report.len(), detail = settings.detail, "Report built");

    report.write_csv(out)?;
    Ok(report)
}
