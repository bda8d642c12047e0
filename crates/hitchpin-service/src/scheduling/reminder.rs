//! Call-reminder placement.
//!
//! Reminders always land on a Sunday: the Sunday of the job's own week,
//! shifted back by the configured number of weeks. The UI labels
//! `weeks_prior = 2` as "1 week prior" and `weeks_prior = 3` as "2 weeks
//! prior".

use chrono::{Datelike, NaiveDate, TimeDelta};

use crate::error::{ServiceError, ServiceResult};

/// Accepted values for `call_reminder_weeks_prior`.
pub const VALID_WEEKS_PRIOR: [i32; 2] = [2, 3];

/// ## Summary
/// Computes the Sunday a call reminder appears on for a job starting on the
/// given local date.
///
/// The Sunday on/before the job date is the job's week Sunday; the reminder
/// lands `weeks_prior - 1` weeks earlier. The result is a Sunday by
/// construction.
///
/// ## Errors
/// Returns a `ValidationError` if `weeks_prior` is not 2 or 3.
pub fn reminder_sunday(job_start: NaiveDate, weeks_prior: i32) -> ServiceResult<NaiveDate> {
    if !VALID_WEEKS_PRIOR.contains(&weeks_prior) {
        return Err(ServiceError::ValidationError(format!(
            "call_reminder_weeks_prior must be 2 or 3, got {weeks_prior}"
        )));
    }

    let days_since_sunday = i64::from(job_start.weekday().num_days_from_sunday());
    let job_week_sunday = job_start - TimeDelta::days(days_since_sunday);
    Ok(job_week_sunday - TimeDelta::weeks(i64::from(weeks_prior) - 1))
}

/// Whether a date falls on a Sunday.
#[must_use]
pub fn is_sunday(date: NaiveDate) -> bool {
    date.weekday() == chrono::Weekday::Sun
}
