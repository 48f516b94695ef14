//! CLI entry point for the speed study tool.
//!
//! Reads a directory of hand-transcribed speed study sheets and writes a
//! CSV report of speed statistics per time of day, combining all days found.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speed_study::analyzers::analyzer::run_report;
use speed_study::config::{PercentileMode, ReportSettings, SettingsFile};
use speed_study::output::write_observations;
use speed_study::parser::read_data_directory;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "speed_study")]
#[command(about = "Speed statistics from hand-transcribed speed study sheets", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report speed statistics per time of day, combining all days
    Report {
        /// Directory containing input CSV files
        #[arg(short, long, value_name = "INPUT_DIRECTORY")]
        input: Option<PathBuf>,

        /// Sampling interval in minutes [default: 15]
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        interval: Option<u32>,

        /// Only report time periods with more than this many vehicles [default: 0]
        #[arg(long)]
        min_count: Option<usize>,

        /// Report a 5 mph speed breakdown instead of summary statistics
        #[arg(long)]
        detail: bool,

        /// How percentiles and means are combined across days [default: averaged]
        #[arg(long, value_enum)]
        percentiles: Option<PercentileMode>,

        /// JSON settings file; flags given on the command line take precedence
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the CSV here instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List every valid vehicle read from the input files
    Observations {
        /// Directory containing input CSV files
        #[arg(short, long, value_name = "INPUT_DIRECTORY")]
        input: PathBuf,

        /// Write the CSV here instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = init_logging(cli.debug);

    match cli.command {
        Commands::Report {
            input,
            interval,
            min_count,
            detail,
            percentiles,
            config,
            output,
        } => {
            let flags = SettingsFile {
                input,
                interval,
                min_count,
                detail: detail.then_some(true),
                percentiles,
            };
            let file_settings = match &config {
                Some(path) => SettingsFile::load(path)?,
                None => SettingsFile::default(),
            };
            let settings = ReportSettings::resolve(flags.or(file_settings))?;
            debug!(?settings, "Settings resolved");

            let out = open_output(output.as_deref())?;
            run_report(&settings, out)
                .with_context(|| format!("building report for {}", settings.input.display()))?;
        }
        Commands::Observations { input, output } => {
            let observations = read_data_directory(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            info!(count = observations.len(), "Observations read");

            let out = open_output(output.as_deref())?;
            write_observations(out, &observations)?;
        }
    }

    debug!("done");
    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// The returned guard flushes the file writer when dropped and must be held
/// until the program exits.
fn init_logging(debug: bool) -> WorkerGuard {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/speed_study.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("speed_study.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref(), stderr_level));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(log_filter(
            std::env::var("RUST_LOG_JSON").ok().as_deref(),
            LevelFilter::DEBUG,
        ));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    guard
}

/// Filter from `RUST_LOG`-style directives, falling back to `default` when none are given.
fn log_filter(directives: Option<&str>, default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    })
}
