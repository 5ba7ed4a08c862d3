//! HTTP handler functions for the dashboard API.

use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use tombo_analytics::distinct_types;
use tombo_analytics_models::TableCounts;
use tombo_report_models::{FilterCriteria, IncidentRecord, ReportType, TypeFilter};
use tombo_server_models::{ApiHealth, ApiStatus, ApiTypes, DashboardQueryParams};
use tombo_source::LoadState;

use crate::{AppState, ServerError};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/status`
///
/// Reports whether the dataset is still loading, loaded, or failed.
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let status = match &*state.load.read().await {
        LoadState::Loading => ApiStatus::Loading,
        LoadState::Ready(data) => ApiStatus::Ready {
            reports: data.counts.reports,
            comments: data.counts.comments,
            points: data.counts.points,
        },
        LoadState::Failed(message) => ApiStatus::Failed {
            message: message.clone(),
        },
    };
    HttpResponse::Ok().json(status)
}

/// `GET /api/dashboard`
///
/// Computes every dashboard view over the reports passing the filters.
pub async fn dashboard(
    state: web::Data<AppState>,
    params: web::Query<DashboardQueryParams>,
) -> Result<HttpResponse, ServerError> {
    let criteria = criteria(&params)?;
    let load = state.load.read().await;

    let (recent, counts): (&[IncidentRecord], TableCounts) = match load.data() {
        Some(data) => (data.recent.as_slice(), data.counts),
        None => (&[][..], TableCounts::default()),
    };
    let snapshot = state.zone.dashboard(load.records(), recent, counts, &criteria);

    Ok(HttpResponse::Ok().json(snapshot))
}

/// `GET /api/reports`
///
/// Returns the reports passing the filters, in load order.
pub async fn reports(
    state: web::Data<AppState>,
    params: web::Query<DashboardQueryParams>,
) -> Result<HttpResponse, ServerError> {
    let criteria = criteria(&params)?;
    let load = state.load.read().await;
    Ok(HttpResponse::Ok().json(state.zone.filter(load.records(), &criteria)))
}

/// `GET /api/types`
///
/// Lists the report types present in the data and the known taxonomy.
pub async fn types(state: web::Data<AppState>) -> HttpResponse {
    let load = state.load.read().await;
    HttpResponse::Ok().json(ApiTypes {
        present: distinct_types(load.records()).into_iter().collect(),
        known: ReportType::all().iter().map(ToString::to_string).collect(),
    })
}

fn criteria(params: &DashboardQueryParams) -> Result<FilterCriteria, ServerError> {
    Ok(FilterCriteria {
        report_type: params
            .report_type
            .clone()
            .map(TypeFilter::from)
            .unwrap_or_default(),
        date_from: parse_date("dateFrom", params.date_from.as_deref())?,
        date_to: parse_date("dateTo", params.date_to.as_deref())?,
    })
}

/// Parses an optional `YYYY-MM-DD` parameter. Empty means unset.
fn parse_date(param: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ServerError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ServerError::InvalidDate {
                param,
                value: value.to_string(),
            }),
    }
}
