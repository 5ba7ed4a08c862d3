#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the Tombo incident dashboard.
//!
//! The dataset is loaded once, in the background, when the server starts.
//! Until the load settles every endpoint answers from an empty record set,
//! and `/api/status` reports where the load stands. Aggregation runs per
//! request over the loaded records with the filters given in the query
//! string.

mod handlers;

use std::future::Future;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, ResponseError, middleware, web};
use chrono::{FixedOffset, Local};
use tokio::sync::RwLock;
use tombo_analytics::{apply_filters, build_dashboard};
use tombo_analytics_models::{DashboardSnapshot, TableCounts};
use tombo_report_models::{FilterCriteria, IncidentRecord};
use tombo_server_models::ApiError;
use tombo_source::{DashboardData, LoadState, SourceError};

/// Environment variable fixing the UTC offset used for calendar grouping,
/// e.g. `-5` or `+05:30`. Defaults to the machine's local time zone.
pub const UTC_OFFSET_VAR: &str = "TOMBO_UTC_OFFSET";

/// Errors caused by invalid requests.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A date query parameter is not a `YYYY-MM-DD` calendar date.
    #[error("Invalid {param} '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        /// Name of the query parameter.
        param: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiError {
            error: self.to_string(),
        })
    }
}

/// Time zone that places reports on local calendar days and hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// The machine's zone, including its daylight-saving rules.
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl Zone {
    /// Reads [`UTC_OFFSET_VAR`], falling back to [`Zone::Local`].
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(UTC_OFFSET_VAR) {
            Ok(value) => parse_utc_offset(&value).map_or_else(
                || {
                    log::warn!("Ignoring invalid {UTC_OFFSET_VAR} '{value}', using local time");
                    Self::Local
                },
                Self::Fixed,
            ),
            Err(_) => Self::Local,
        }
    }

    /// Computes the dashboard in this zone.
    #[must_use]
    pub fn dashboard(
        &self,
        records: &[IncidentRecord],
        recent: &[IncidentRecord],
        table_counts: TableCounts,
        criteria: &FilterCriteria,
    ) -> DashboardSnapshot {
        match self {
            Self::Local => build_dashboard(records, recent, table_counts, criteria, &Local),
            Self::Fixed(tz) => build_dashboard(records, recent, table_counts, criteria, tz),
        }
    }

    /// Filters `records` with date bounds read in this zone.
    #[must_use]
    pub fn filter(
        &self,
        records: &[IncidentRecord],
        criteria: &FilterCriteria,
    ) -> Vec<IncidentRecord> {
        match self {
            Self::Local => apply_filters(records, criteria, &Local),
            Self::Fixed(tz) => apply_filters(records, criteria, tz),
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => f.write_str("local time"),
            Self::Fixed(tz) => write!(f, "UTC{tz}"),
        }
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The dataset load, written once by the loader task.
    pub load: Arc<RwLock<LoadState>>,
    /// Zone used to place reports on local calendar days.
    pub zone: Zone,
}

impl AppState {
    /// Creates state with the load still in flight.
    #[must_use]
    pub fn new(zone: Zone) -> Self {
        Self {
            load: Arc::new(RwLock::new(LoadState::Loading)),
            zone,
        }
    }

    /// Records the outcome of the load.
    pub async fn apply(&self, outcome: Result<DashboardData, SourceError>) {
        let mut load = self.load.write().await;
        let current = std::mem::take(&mut *load);
        *load = current.finish(outcome);
    }
}

/// Parses a UTC offset given in hours, optionally with minutes: `-5`,
/// `+3`, `5:30`, `-03:00`.
#[must_use]
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits = |part: &str| {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        part.parse::<i32>().ok()
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (digits(h)?, digits(m)?),
        None => (digits(rest)?, 0),
    };
    if !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/status", web::get().to(handlers::status))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/reports", web::get().to(handlers::reports))
            .route("/types", web::get().to(handlers::types)),
    );
}

/// Starts the dashboard API server.
///
/// `load` produces the dataset; it runs in the background while the
/// server already answers requests. Binds `BIND_ADDR`:`PORT` (defaults
/// `127.0.0.1:8080`). The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server<F>(load: F) -> std::io::Result<()>
where
    F: Future<Output = Result<DashboardData, SourceError>> + 'static,
{
    let zone = Zone::from_env();
    log::info!("Grouping reports by calendar day in {zone}");

    let state = AppState::new(zone);
    let loader = state.clone();
    actix_web::rt::spawn(async move {
        loader.apply(load.await).await;
    });
    let state = web::Data::new(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
