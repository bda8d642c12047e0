mod feed;
mod healthcheck;
mod jobs;

use salvo::http::StatusCode;
use salvo::writing::Json;
use salvo::{Response, Router};
use serde::Serialize;

use hitchpin_core::error::CoreError;
use hitchpin_service::error::ServiceError;

// Re-export route constants from core
pub use hitchpin_core::constants::{
    API_ROUTE_COMPONENT, API_ROUTE_PREFIX, FEED_ROUTE_COMPONENT, FEED_ROUTE_PREFIX,
    JOBS_ROUTE_COMPONENT, JOBS_ROUTE_PREFIX,
};

/// ## Summary
/// Error response payload
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// ## Summary
/// Constructs the main API router.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .push(healthcheck::routes())
        .push(jobs::routes())
        .push(feed::routes())
}

/// ## Summary
/// Maps the service error taxonomy onto HTTP statuses and renders the
/// structured `{error}` body.
///
/// Validation and parse failures are 400, missing records 404, structural
/// conflicts 409; anything else logs at error level and renders a safe 500.
pub(crate) fn render_service_error(res: &mut Response, err: &ServiceError) {
    let (status, message) = match err {
        ServiceError::ValidationError(message)
        | ServiceError::ParseError(message)
        | ServiceError::CoreError(
            CoreError::ValidationError(message) | CoreError::ParseError(message),
        ) => (StatusCode::BAD_REQUEST, message.clone()),
        ServiceError::NotFound(message) | ServiceError::CoreError(CoreError::NotFound(message)) => {
            (StatusCode::NOT_FOUND, message.clone())
        }
        ServiceError::InvalidOperation(message)
        | ServiceError::CoreError(CoreError::InvalidOperation(message)) => {
            (StatusCode::CONFLICT, message.clone())
        }
        other => {
            tracing::error!(error = ?other, "unexpected service error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_owned(),
            )
        }
    };

    res.status_code(status);
    res.render(Json(ErrorResponse { error: message }));
}

/// Renders a 400 with the given message.
pub(crate) fn render_bad_request(res: &mut Response, message: &str) {
    res.status_code(StatusCode::BAD_REQUEST);
    res.render(Json(ErrorResponse {
        error: message.to_owned(),
    }));
}

/// Renders a 500 after logging; used for missing depot state.
pub(crate) fn render_internal_error(res: &mut Response, message: &str) {
    tracing::error!(message, "internal error");
    res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
    res.render(Json(ErrorResponse {
        error: "Internal server error".to_owned(),
    }));
}
