//! Report settings, from command line flags and an optional JSON file.

use anyhow::{Context, Result, anyhow};
use chrono::TimeDelta;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How percentiles and the mean are combined across days for one time of day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PercentileMode {
    /// Unweighted mean of each day's value.
    #[default]
    Averaged,
    /// Recomputed from every day's speeds pooled together.
    Pooled,
}

/// Partial settings: every field optional so sources can be layered.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "input": "sample_data",
///   "interval": 30,
///   "min_count": 5,
///   "percentiles": "pooled"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub input: Option<PathBuf>,
    pub interval: Option<u32>,
    pub min_count: Option<usize>,
    pub detail: Option<bool>,
    pub percentiles: Option<PercentileMode>,
}

impl SettingsFile {
    /// Loads settings from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        let settings = serde_json::from_str(&content)
            .with_context(|| format!("parsing settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Fills any field missing here from `fallback`.
    pub fn or(self, fallback: SettingsFile) -> SettingsFile {
        SettingsFile {
            input: self.input.or(fallback.input),
            interval: self.interval.or(fallback.interval),
            min_count: self.min_count.or(fallback.min_count),
            detail: self.detail.or(fallback.detail),
            percentiles: self.percentiles.or(fallback.percentiles),
        }
    }
}

/// Fully resolved settings for one report run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub input: PathBuf,
    pub interval_minutes: u32,
    pub min_count: usize,
    pub detail: bool,
    pub percentiles: PercentileMode,
}

impl ReportSettings {
    pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

    pub fn new(input: impl Into<PathBuf>) -> Self {
        ReportSettings {
            input: input.into(),
            interval_minutes: Self::DEFAULT_INTERVAL_MINUTES,
            min_count: 0,
            detail: false,
            percentiles: PercentileMode::default(),
        }
    }

    /// Applies defaults to layered settings. The input directory has no default.
    pub fn resolve(settings: SettingsFile) -> Result<Self> {
        let input = settings
            .input
            .ok_or_else(|| anyhow!("an input directory is required"))?;
        let defaults = ReportSettings::new(input);

        Ok(ReportSettings {
            interval_minutes: settings.interval.unwrap_or(defaults.interval_minutes),
            min_count: settings.min_count.unwrap_or(defaults.min_count),
            detail: settings.detail.unwrap_or(defaults.detail),
            percentiles: settings.percentiles.unwrap_or(defaults.percentiles),
            ..defaults
        })
    }

    pub fn interval(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.interval_minutes))
    }
}
