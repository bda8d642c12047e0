//! Job endpoints: create, scoped update/delete, recurrence cancellation,
//! occurrence materialization, and series preview.

use chrono::NaiveDate;
use chrono_tz::Tz;
use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use hitchpin_core::types::{RecurrenceRule, SeriesScope};
use hitchpin_db::db::enums::JobStatus;
use hitchpin_db::model::job::Job;
use hitchpin_service::job::materialize::materialize;
use hitchpin_service::job::service::{
    CreateJobRequest, UpdateJobRequest, cancel_future_recurrences, create_job, delete_job,
    preview_series, update_job,
};
use hitchpin_service::scheduling::datetime::{display_instant, parse_datetime};
use hitchpin_service::scheduling::validate::validate_call_reminder;

use super::{render_bad_request, render_internal_error, render_service_error};
use crate::config::get_config_from_depot;
use crate::db_handler::get_db_from_depot;

/// ## Summary
/// Job representation returned by every job endpoint.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub status: JobStatus,
    pub business_name: String,
    pub contact_name: String,
    pub phone: String,
    pub address: String,
    pub trailer_details: String,
    pub repair_notes: String,
    pub quote: Option<f64>,
    pub start: String,
    pub end: String,
    pub all_day: bool,
    pub recurrence: Option<RecurrenceRule>,
    pub recurrence_parent_id: Option<Uuid>,
    pub recurrence_original_start: Option<String>,
    pub end_recurrence_date: Option<NaiveDate>,
    pub has_call_reminder: bool,
    pub call_reminder_weeks_prior: Option<i32>,
    pub call_reminder_completed: bool,
}

fn job_response(job: &Job, tz: Tz) -> JobResponse {
    JobResponse {
        id: job.id,
        calendar_id: job.calendar_id,
        status: job.status,
        business_name: job.business_name.clone(),
        contact_name: job.contact_name.clone(),
        phone: job.phone.clone(),
        address: job.address.clone(),
        trailer_details: job.trailer_details.clone(),
        repair_notes: job.repair_notes.clone(),
        quote: job.quote,
        start: display_instant(job.start_dt, job.all_day, tz),
        end: display_instant(job.end_dt, job.all_day, tz),
        all_day: job.all_day,
        recurrence: job.rule(),
        recurrence_parent_id: job.recurrence_parent_id,
        recurrence_original_start: job
            .recurrence_original_start
            .map(|start| display_instant(start, false, tz)),
        end_recurrence_date: job.end_recurrence_date,
        has_call_reminder: job.has_call_reminder,
        call_reminder_weeks_prior: job.call_reminder_weeks_prior,
        call_reminder_completed: job.call_reminder_completed,
    }
}

#[derive(Debug, Serialize)]
struct CreateJobResponse {
    job: JobResponse,
    recurrence_created: bool,
    instances_created: usize,
}

#[derive(Debug, Serialize)]
struct UpdateJobResponse {
    job: JobResponse,
    instances_updated: usize,
    update_scope: SeriesScope,
}

#[derive(Debug, Deserialize)]
struct DeleteJobRequest {
    delete_scope: Option<SeriesScope>,
}

#[derive(Debug, Serialize)]
struct DeleteJobResponse {
    deleted_count: usize,
    scope: SeriesScope,
}

#[derive(Debug, Deserialize)]
struct CancelRecurrencesRequest {
    from_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct CancelRecurrencesResponse {
    canceled_count: usize,
    end_recurrence_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct MaterializeRequest {
    original_start: String,
}

#[derive(Debug, Serialize)]
struct MaterializeResponse {
    job_id: Uuid,
    created: bool,
    job: JobResponse,
}

fn path_job_id(req: &Request, res: &mut Response) -> Option<Uuid> {
    let Some(raw) = req.param::<String>("id") else {
        render_bad_request(res, "Job ID required");
        return None;
    };
    match Uuid::parse_str(&raw) {
        Ok(id) => Some(id),
        Err(_err) => {
            render_bad_request(res, "Invalid job ID format");
            None
        }
    }
}

/// ## Summary
/// POST /api/jobs - Create a job, possibly with a recurrence rule.
///
/// A bounded rule persists every occurrence (and paired reminders) in the
/// same transaction; a forever rule persists only the parent.
///
/// ## Errors
/// Returns HTTP 400 for validation failures (bad dates, year range, span,
/// weeks_prior, rule shape, unknown calendar)
/// Returns HTTP 500 if database operations fail
#[handler]
async fn create_job_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing create job request");

    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };
    let Ok(tz) = config.scheduling.timezone() else {
        render_internal_error(res, "configured timezone is invalid");
        return;
    };

    let request: CreateJobRequest = match req.parse_json().await {
        Ok(request) => request,
        Err(e) => {
            error!(error = ?e, "Failed to parse create job request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };

    // Also enforced at the service layer.
    if let Err(err) = validate_call_reminder(
        request.has_call_reminder,
        request.call_reminder_weeks_prior,
    ) {
        render_service_error(res, &err);
        return;
    }

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

    match create_job(&mut conn, &config.scheduling, request).await {
        Ok(outcome) => {
            res.status_code(StatusCode::CREATED);
            res.render(Json(CreateJobResponse {
                job: job_response(&outcome.job, tz),
                recurrence_created: outcome.recurrence_created,
                instances_created: outcome.instances_created,
            }));
        }
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// PATCH /`api/jobs/{id}` - Update a job with series scope.
///
/// `this_and_future` and `all` propagate descriptive fields to sibling
/// instances; start/end changes always stay on the targeted job.
///
/// ## Errors
/// Returns HTTP 400 for validation failures
/// Returns HTTP 404 if the job does not exist or is deleted
/// Returns HTTP 500 if database operations fail
#[handler]
async fn update_job_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing update job request");

    let Some(id) = path_job_id(req, res) else {
        return;
    };
    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };
    let Ok(tz) = config.scheduling.timezone() else {
        render_internal_error(res, "configured timezone is invalid");
        return;
    };

    let request: UpdateJobRequest = match req.parse_json().await {
        Ok(request) => request,
        Err(e) => {
            error!(error = ?e, "Failed to parse update job request");
            render_bad_request(res, "Invalid request body");
            return;
        }
    };

    if let Some(weeks) = request.call_reminder_weeks_prior {
        if let Err(err) = validate_call_reminder(true, Some(weeks)) {
            render_service_error(res, &err);
            return;
        }
    }

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

    match update_job(&mut conn, &config.scheduling, id, request).await {
        Ok(outcome) => {
            res.render(Json(UpdateJobResponse {
                job: job_response(&outcome.job, tz),
                instances_updated: outcome.instances_updated,
                update_scope: outcome.scope,
            }));
        }
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// DELETE /`api/jobs/{id}` - Soft-delete a job with series scope.
///
/// `this_only` on a parent with live instances is rejected with HTTP 409 so
/// a series is never orphaned.
///
/// ## Errors
/// Returns HTTP 404 if the job does not exist or is deleted
/// Returns HTTP 409 for the orphaning case
/// Returns HTTP 500 if database operations fail
#[handler]
async fn delete_job_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing delete job request");

    let Some(id) = path_job_id(req, res) else {
        return;
    };
    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };

    let scope = match req.parse_json::<DeleteJobRequest>().await {
        Ok(request) => request.delete_scope.unwrap_or(SeriesScope::ThisOnly),
        // An empty body means the default scope.
        Err(_err) => SeriesScope::ThisOnly,
    };

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

    match delete_job(&mut conn, &config.scheduling, id, scope).await {
        Ok(outcome) => {
            res.render(Json(DeleteJobResponse {
                deleted_count: outcome.deleted_count,
                scope: outcome.scope,
            }));
        }
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// POST /`api/jobs/{id}/cancel-recurrences` - Truncate a recurring series.
///
/// Soft-deletes instances starting at/after `from_date` and stops further
/// generation at that date.
///
/// ## Errors
/// Returns HTTP 404 if the job does not exist or is deleted
/// Returns HTTP 409 if the job is not a recurring parent
/// Returns HTTP 500 if database operations fail
#[handler]
async fn cancel_recurrences_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing cancel recurrences request");

    let Some(id) = path_job_id(req, res) else {
        return;
    };
    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };

    let request: CancelRecurrencesRequest = match req.parse_json().await {
        Ok(request) => request,
        Err(e) => {
            error!(error = ?e, "Failed to parse cancel recurrences request");
            render_bad_request(res, "Invalid request body: from_date is required");
            return;
        }
    };

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

    match cancel_future_recurrences(&mut conn, &config.scheduling, id, request.from_date).await {
        Ok(outcome) => {
            res.render(Json(CancelRecurrencesResponse {
                canceled_count: outcome.canceled_count,
                end_recurrence_date: outcome.end_recurrence_date,
            }));
        }
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// POST /`api/jobs/{id}/materialize` - Persist a virtual occurrence.
///
/// Idempotent: materializing the same `original_start` twice returns the
/// existing instance with `created = false`.
///
/// ## Errors
/// Returns HTTP 400 for an unparseable `original_start`
/// Returns HTTP 404 if the parent does not exist or is deleted
/// Returns HTTP 409 if the target is not a recurring parent
/// Returns HTTP 500 if database operations fail
#[handler]
async fn materialize_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing materialize occurrence request");

    let Some(id) = path_job_id(req, res) else {
        return;
    };
    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };
    let Ok(tz) = config.scheduling.timezone() else {
        render_internal_error(res, "configured timezone is invalid");
        return;
    };

    let request: MaterializeRequest = match req.parse_json().await {
        Ok(request) => request,
        Err(e) => {
            error!(error = ?e, "Failed to parse materialize request");
            render_bad_request(res, "Invalid request body: original_start is required");
            return;
        }
    };

    let original_start = match parse_datetime(&request.original_start, tz) {
        Ok(instant) => instant,
        Err(err) => {
            render_service_error(res, &err);
            return;
        }
    };

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

    match materialize(&mut conn, &config.scheduling, id, original_start).await {
        Ok(outcome) => {
            if outcome.created {
                res.status_code(StatusCode::CREATED);
            }
            res.render(Json(MaterializeResponse {
                job_id: outcome.job.id,
                created: outcome.created,
                job: job_response(&outcome.job, tz),
            }));
        }
        Err(err) => render_service_error(res, &err),
    }
}

/// ## Summary
/// GET /`api/jobs/{id}/occurrences?count=N` - Preview the next virtual
/// occurrences of a forever series without materializing them.
///
/// ## Errors
/// Returns HTTP 404 if the job does not exist or is deleted
/// Returns HTTP 409 if the job is not the parent of a forever series
/// Returns HTTP 500 if database operations fail
#[handler]
async fn preview_occurrences_handler(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    tracing::debug!("Processing preview occurrences request");

    let Some(id) = path_job_id(req, res) else {
        return;
    };
    let Ok(config) = get_config_from_depot(depot) else {
        render_internal_error(res, "configuration missing from depot");
        return;
    };

    let count = req.query::<usize>("count").unwrap_or(50);

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

    match preview_series(&mut conn, &config.scheduling, id, count).await {
        Ok(occurrences) => {
            res.render(Json(occurrences));
        }
        Err(err) => render_service_error(res, &err),
    }
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(hitchpin_core::constants::JOBS_ROUTE_COMPONENT)
        .post(create_job_handler)
        .push(
            Router::with_path("<id>")
                .patch(update_job_handler)
                .delete(delete_job_handler)
                .push(Router::with_path("cancel-recurrences").post(cancel_recurrences_handler))
                .push(Router::with_path("materialize").post(materialize_handler))
                .push(Router::with_path("occurrences").get(preview_occurrences_handler)),
        )
}
