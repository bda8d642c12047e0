//! Schedule invariant checks.
//!
//! These run at the service layer on every write path, and the API layer
//! re-checks the request-shaped subset, so the invariants hold regardless of
//! entry point.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use hitchpin_core::config::SchedulingConfig;

use crate::error::{ServiceError, ServiceResult};
use crate::scheduling::reminder::VALID_WEEKS_PRIOR;

/// ## Summary
/// Validates a normalized schedule against the configured limits: endpoint
/// ordering, local year bounds, and maximum span.
///
/// All-day ends are stored exclusive, so `end > start` holds for both kinds;
/// timed events additionally reject a zero-length window.
///
/// ## Errors
/// Returns a `ValidationError` describing the violated limit.
pub fn validate_schedule(
    start_utc: DateTime<Utc>,
    end_utc: DateTime<Utc>,
    all_day: bool,
    tz: Tz,
    config: &SchedulingConfig,
) -> ServiceResult<()> {
    if all_day {
        if end_utc < start_utc {
            return Err(ServiceError::ValidationError(
                "end date must not be before start date".to_owned(),
            ));
        }
    } else if end_utc <= start_utc {
        return Err(ServiceError::ValidationError(
            "end time must be after start time".to_owned(),
        ));
    }

    for (label, instant) in [("start", start_utc), ("end", end_utc)] {
        let year = instant.with_timezone(&tz).year();
        if year < config.min_valid_year || year > config.max_valid_year {
            return Err(ServiceError::ValidationError(format!(
                "{label} year {year} is outside the valid range {}..={}",
                config.min_valid_year, config.max_valid_year
            )));
        }
    }

    let span_days = (end_utc - start_utc).num_days();
    if span_days > config.max_job_span_days {
        return Err(ServiceError::ValidationError(format!(
            "job spans {span_days} days, more than the maximum of {} days",
            config.max_job_span_days
        )));
    }

    Ok(())
}

/// ## Summary
/// Validates the call-reminder field pair: an enabled reminder requires a
/// `weeks_prior` of 2 or 3.
///
/// ## Errors
/// Returns a `ValidationError` for a missing or out-of-range value.
pub fn validate_call_reminder(
    has_call_reminder: bool,
    weeks_prior: Option<i32>,
) -> ServiceResult<()> {
    if !has_call_reminder {
        return Ok(());
    }
    match weeks_prior {
        None => Err(ServiceError::ValidationError(
            "call_reminder_weeks_prior is required when the call reminder is enabled".to_owned(),
        )),
        Some(weeks) if !VALID_WEEKS_PRIOR.contains(&weeks) => {
            Err(ServiceError::ValidationError(format!(
                "call_reminder_weeks_prior must be 2 or 3, got {weeks}"
            )))
        }
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn config() -> SchedulingConfig {
        SchedulingConfig {
            timezone: "America/Chicago".to_owned(),
            min_valid_year: 2000,
            max_valid_year: 2100,
            max_job_span_days: 90,
            occurrence_safety_cap: 366,
            max_expand_days: 60,
            preview_occurrence_cap: 200,
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("valid test instant")
    }

    #[test]
    fn timed_requires_strictly_positive_span() {
        let start = utc(2026, 1, 16, 15);
        assert!(validate_schedule(start, start, false, Chicago, &config()).is_err());
        assert!(
            validate_schedule(start, utc(2026, 1, 16, 16), false, Chicago, &config()).is_ok()
        );
        assert!(
            validate_schedule(start, utc(2026, 1, 16, 14), false, Chicago, &config()).is_err()
        );
    }

    #[test]
    fn year_bounds_use_local_years() {
        let result = validate_schedule(
            utc(1999, 6, 1, 12),
            utc(1999, 6, 1, 13),
            false,
            Chicago,
            &config(),
        );
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));

        let result = validate_schedule(
            utc(2101, 6, 1, 12),
            utc(2101, 6, 1, 13),
            false,
            Chicago,
            &config(),
        );
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn span_limit_rejects_runaway_jobs() {
        let result = validate_schedule(
            utc(2026, 1, 1, 12),
            utc(2026, 5, 1, 12),
            false,
            Chicago,
            &config(),
        );
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));

        assert!(
            validate_schedule(
                utc(2026, 1, 1, 12),
                utc(2026, 3, 1, 12),
                false,
                Chicago,
                &config(),
            )
            .is_ok()
        );
    }

    #[test]
    fn call_reminder_fields_validate_as_a_pair() {
        assert!(validate_call_reminder(false, None).is_ok());
        assert!(validate_call_reminder(false, Some(7)).is_ok());
        assert!(validate_call_reminder(true, Some(2)).is_ok());
        assert!(validate_call_reminder(true, Some(3)).is_ok());
        assert!(validate_call_reminder(true, None).is_err());
        assert!(validate_call_reminder(true, Some(1)).is_err());
    }
}
