#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the Tombo incident dashboard.
//!
//! `tombo summary` prints the dashboard views as JSON, `tombo types` lists
//! the report types in the data, and `tombo serve` starts the API server.
//! Data comes from a JSON export (`--input`), a TOML backend config
//! (`--config`), or the `TOMBO_*` environment variables, in that order.
//!
//! Uses `indicatif-log-bridge` (via [`tombo_cli_utils::init_logger`]) so
//! log lines and the load spinner never fight for the terminal.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use tombo_analytics::distinct_types;
use tombo_report_models::{FilterCriteria, TypeFilter};
use tombo_server::Zone;
use tombo_source::config::{BackendConfig, DEFAULT_RECENT_LIMIT};
use tombo_source::progress::LogProgress;
use tombo_source::{DataSource, LoadState, SourceError};

#[derive(Parser)]
#[command(name = "tombo", version, about = "Incident report dashboard")]
struct Cli {
    /// Backend settings file (TOML). Ignored when `--input` is given.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the dashboard views as JSON
    Summary {
        /// JSON export to read instead of the backend
        #[arg(long)]
        input: Option<PathBuf>,
        /// Only reports of this type
        #[arg(long = "type")]
        report_type: Option<String>,
        /// First calendar day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,
        /// Last calendar day to include (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,
        /// UTC offset for calendar grouping, e.g. -5 or +05:30
        #[arg(long, value_parser = parse_offset, allow_hyphen_values = true)]
        utc_offset: Option<FixedOffset>,
    },
    /// List the report types present in the data
    Types {
        /// JSON export to read instead of the backend
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Start the API server
    Serve {
        /// JSON export to serve instead of the backend
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{s}': {e}"))
}

fn parse_offset(s: &str) -> Result<FixedOffset, String> {
    tombo_server::parse_utc_offset(s).ok_or_else(|| format!("invalid UTC offset '{s}'"))
}

fn resolve_source(config: Option<&Path>, input: Option<PathBuf>) -> Result<DataSource, SourceError> {
    if let Some(path) = input {
        return Ok(DataSource::Export {
            path,
            recent_limit: DEFAULT_RECENT_LIMIT as usize,
        });
    }
    match config {
        Some(path) => Ok(DataSource::Backend(BackendConfig::load(path)?)),
        None => DataSource::from_env(),
    }
}

/// Loads the data behind a spinner. A failed load leaves an empty record
/// set and is reported back as an error once the caller has used it.
async fn load_with_spinner(
    multi: &tombo_cli_utils::MultiProgress,
    source: Result<DataSource, SourceError>,
) -> LoadState {
    let progress = tombo_cli_utils::IndicatifProgress::load_spinner(multi, "Loading reports");
    let outcome = match source {
        Ok(source) => tombo_source::load(&source, &progress).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &outcome {
        progress.abandon(format!("Load failed: {e}"));
    }
    LoadState::Loading.finish(outcome)
}

fn into_result(state: &LoadState) -> Result<(), Box<dyn std::error::Error>> {
    match state {
        LoadState::Failed(message) => Err(message.clone().into()),
        LoadState::Loading | LoadState::Ready(_) => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = tombo_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Summary {
            input,
            report_type,
            from,
            to,
            utc_offset,
        } => {
            let state = load_with_spinner(&multi, resolve_source(config, input)).await;
            let criteria = FilterCriteria {
                report_type: report_type.map(TypeFilter::from).unwrap_or_default(),
                date_from: from,
                date_to: to,
            };
            let zone = utc_offset.map_or(Zone::Local, Zone::Fixed);
            log::debug!("Summarizing {} reports in {zone}", state.records().len());
            let (recent, counts) = state
                .data()
                .map(|data| (data.recent.clone(), data.counts))
                .unwrap_or_default();

            let snapshot = zone.dashboard(state.records(), &recent, counts, &criteria);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            into_result(&state)?;
        }
        Command::Types { input } => {
            let state = load_with_spinner(&multi, resolve_source(config, input)).await;
            for report_type in distinct_types(state.records()) {
                println!("{report_type}");
            }
            into_result(&state)?;
        }
        Command::Serve { input } => {
            let source = resolve_source(config, input);
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(tombo_server::run_server(async move {
                    tombo_source::load(&source?, &LogProgress).await
                }))
            })
            .await??;
        }
    }

    Ok(())
}
