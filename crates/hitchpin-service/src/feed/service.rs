//! Feed read service: queries the window and hands rows to the pure
//! assembly in [`crate::feed::build`].

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use hitchpin_core::config::SchedulingConfig;
use hitchpin_db::db::connection::DbConnection;
use hitchpin_db::db::enums::JobStatus;
use hitchpin_db::db::query::{calendar, call_reminder, job};

use crate::error::{ServiceError, ServiceResult};
use crate::feed::build::{FeedContext, FeedEvent, assemble_feed};
use crate::scheduling::datetime::local_midnight_utc;

/// Parameters of one feed read.
#[derive(Debug, Clone)]
pub struct FeedParams {
    /// First local date of the window, inclusive.
    pub start: NaiveDate,
    /// Last local date of the window, inclusive.
    pub end: NaiveDate,
    pub calendar_ids: Option<Vec<Uuid>>,
    pub status: Option<JobStatus>,
    pub search: Option<String>,
}

/// ## Summary
/// Builds the merged feed for a window: overlapping jobs (expanded per day),
/// derived job reminders, and standalone reminders.
///
/// ## Errors
/// Returns a `ValidationError` for an inverted window and database errors
/// otherwise.
pub async fn build_feed(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    params: FeedParams,
) -> ServiceResult<Vec<FeedEvent>> {
    let tz = config.timezone()?;
    let FeedParams {
        start,
        end,
        calendar_ids,
        status,
        search,
    } = params;

    if end < start {
        return Err(ServiceError::ValidationError(format!(
            "feed window end {end} is before start {start}"
        )));
    }

    let upper_date = end.succ_opt().ok_or_else(|| {
        ServiceError::ValidationError(format!("feed window end {end} is out of range"))
    })?;
    let window = job::WindowFilter {
        lower: local_midnight_utc(start, tz)?,
        upper: local_midnight_utc(upper_date, tz)?,
        calendar_ids: calendar_ids.clone(),
        status,
        search,
    };

    let jobs = job::in_window(conn, &window).await?;
    let standalone =
        call_reminder::standalone_in_window(conn, start, end, calendar_ids.as_deref()).await?;
    let calendars: HashMap<Uuid, _> = calendar::list_all(conn)
        .await?
        .into_iter()
        .map(|cal| (cal.id, cal))
        .collect();

    let ctx = FeedContext {
        tz,
        window_start: start,
        window_end: end,
        max_expand_days: config.max_expand_days,
    };

    let events = assemble_feed(&jobs, &standalone, &calendars, &ctx);
    tracing::debug!(
        jobs = jobs.len(),
        standalone = standalone.len(),
        events = events.len(),
        "feed assembled"
    );
    Ok(events)
}
