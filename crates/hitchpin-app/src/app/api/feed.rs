//! Calendar feed endpoint.

use chrono::NaiveDate;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use tracing::error;
use uuid::Uuid;

use hitchpin_db::db::enums::JobStatus;
use hitchpin_service::feed::service::{FeedParams, build_feed};

use super::{render_bad_request, render_internal_error, render_service_error};
use crate::config::get_config_from_depot;
use crate::db_handler::get_db_from_depot;

fn parse_date_param(req: &Request, name: &str) -> Result<NaiveDate, String> {
    let raw = req
        .query::<String>(name)
        .ok_or_else(|| format!("query parameter '{name}' is required (YYYY-MM-DD)"))?;
    raw.parse::<NaiveDate>()
        .map_err(|_err| format!("query parameter '{name}' is not a valid date: {raw}"))
}

fn parse_calendar_ids(raw: Option<String>) -> Result<Option<Vec<Uuid>>, String> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let ids = raw
        .split(',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            Uuid::parse_str(part.trim())
                .map_err(|_err| format!("invalid calendar id in 'calendars': {part}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(if ids.is_empty() { None } else { Some(ids) })
}

/// ## Summary
/// GET /api/feed - The merged calendar feed for a date window.
///
/// Query parameters: `start` and `end` (inclusive local dates, required),
/// `calendars` (comma-separated calendar ids), `status` (exact job status),
/// `q` (case-insensitive substring search).
///
/// ## Errors
/// Returns HTTP 400 for missing/malformed parameters
/// Returns HTTP 500 if database operations fail
#[handler]
async fn feed_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing feed request");

    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };

    let start = match parse_date_param(req, "start") {
        Ok(date) => date,
        Err(message) => {
            render_bad_request(res, &message);
            return;
        }
    };
    let end = match parse_date_param(req, "end") {
        Ok(date) => date,
        Err(message) => {
            render_bad_request(res, &message);
            return;
        }
    };
    let calendar_ids = match parse_calendar_ids(req.query::<String>("calendars")) {
        Ok(ids) => ids,
        Err(message) => {
            render_bad_request(res, &message);
            return;
        }
    };
    let status = match req.query::<String>("status") {
        Some(raw) => match raw.parse::<JobStatus>() {
            Ok(status) => Some(status),
            Err(err) => {
                render_bad_request(res, &err.to_string());
                return;
            }
        },
        None => None,
    };
    let search = req
        .query::<String>("q")
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty());

    let provider = match get_db_from_depot(depot) {
        Ok(provider) => provider,
        Err(e) => {
            error!(error = ?e, "Failed to get database provider");
            render_internal_error(res, "database provider missing from depot");
            return;
        }
    };
    let mut conn = match provider.get_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = ?e, "Failed to get database connection");
            res.status_code(StatusCode::SERVICE_UNAVAILABLE);
            res.render(Json(super::ErrorResponse {
                error: "Database unavailable".to_owned(),
            }));
            return;
        }
    };

    let params = FeedParams {
        start,
        end,
        calendar_ids,
        status,
        search,
    };
    match build_feed(&mut conn, &config.scheduling, params).await {
        Ok(events) => {
            res.render(Json(events));
        }
        Err(err) => render_service_error(res, &err),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(hitchpin_core::constants::FEED_ROUTE_COMPONENT).get(feed_handler)
}
