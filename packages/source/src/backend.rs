//! Client for the hosted backend's REST interface.
//!
//! The backend follows `PostgREST` conventions: each table is exposed at
//! `{url}/rest/v1/{table}`, rows are filtered and ordered through query
//! parameters, and an exact row count is requested with
//! `Prefer: count=exact` and read back from the `Content-Range` header.

use std::time::Duration;

use tombo_report_models::IncidentRecord;

use crate::SourceError;
use crate::config::BackendConfig;
use crate::retry::{self, RetryPolicy};

/// Table holding the incident reports.
pub const REPORTS_TABLE: &str = "reports";

/// Rows requested per page when fetching every report.
const PAGE_SIZE: usize = 1000;

/// Talks to the backend on behalf of the loader.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    config: BackendConfig,
    retry: RetryPolicy,
}

impl BackendClient {
    /// Creates a client for the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tombo/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            config,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the retry policy used for every request.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Connection settings this client was built with.
    #[must_use]
    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.config.url.trim_end_matches('/'))
    }

    fn get(&self, table: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.table_url(table))
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    /// Fetches every report row.
    ///
    /// Rows are requested in pages of [`PAGE_SIZE`] ordered by `id`. The
    /// backend may cap a page below that size, so the first page asks for
    /// the exact row count and paging continues until that many rows have
    /// arrived. Without a count, paging stops at the first empty page.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a request fails or a page is not a JSON
    /// array of rows.
    pub async fn fetch_reports(&self) -> Result<Vec<IncidentRecord>, SourceError> {
        let mut reports = Vec::new();
        let mut total = None;

        loop {
            let first = reports.is_empty();
            let offset = reports.len().to_string();
            let limit = PAGE_SIZE.to_string();
            let response = retry::send(
                || {
                    let request = self.get(REPORTS_TABLE).query(&[
                        ("select", "*"),
                        ("order", "id.asc"),
                        ("limit", limit.as_str()),
                        ("offset", offset.as_str()),
                    ]);
                    if first {
                        request.header("Prefer", "count=exact")
                    } else {
                        request
                    }
                },
                &self.retry,
            )
            .await?;

            if first {
                total = response
                    .headers()
                    .get(reqwest::header::CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range);
                match total {
                    Some(total) => log::debug!("Backend reports {total} report rows"),
                    None => log::warn!("No report count from backend, paging until an empty page"),
                }
            }

            let page: Vec<IncidentRecord> = retry::read_json(response).await?;
            let page_len = page.len();
            reports.extend(page);
            log::debug!("Fetched {page_len} reports ({} total)", reports.len());

            if page_len == 0 || total.is_some_and(|total| reports.len() as u64 >= total) {
                break;
            }
        }

        Ok(reports)
    }

    /// Fetches the `limit` newest reports, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the body is not a
    /// JSON array of rows.
    pub async fn fetch_recent_reports(
        &self,
        limit: u32,
    ) -> Result<Vec<IncidentRecord>, SourceError> {
        let limit = limit.to_string();
        retry::send_json(
            || {
                self.get(REPORTS_TABLE).query(&[
                    ("select", "*"),
                    ("order", "created_at.desc"),
                    ("limit", limit.as_str()),
                ])
            },
            &self.retry,
        )
        .await
    }

    /// Returns the exact number of rows in `table`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Backend`] if the response carries no usable
    /// `Content-Range` header, or [`SourceError`] if the request fails.
    pub async fn count_rows(&self, table: &str) -> Result<u64, SourceError> {
        let response = retry::send(
            || {
                self.get(table)
                    .query(&[("select", "id"), ("limit", "1")])
                    .header("Prefer", "count=exact")
            },
            &self.retry,
        )
        .await?;

        let header = response
            .headers()
            .get(reqwest::header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| SourceError::Backend {
                message: format!("count of '{table}' returned no Content-Range header"),
            })?;

        let count = parse_content_range(header).ok_or_else(|| SourceError::Backend {
            message: format!("count of '{table}' returned unusable Content-Range '{header}'"),
        })?;
        log::debug!("Table '{table}' has {count} rows");
        Ok(count)
    }
}

/// Reads the total from a `Content-Range` value such as `0-0/42` or `*/0`.
///
/// Returns `None` when the total is unknown (`0-0/*`) or malformed.
#[must_use]
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().rsplit_once('/')?;
    total.parse().ok()
}
