//! Datetime normalization for heterogeneous schedule inputs.
//!
//! Inputs arrive as date-only strings (`YYYY-MM-DD`), ISO-8601 datetimes with
//! or without a UTC offset, or values already resolved upstream. Storage is
//! always a UTC instant; display strings are shop-local and carry no offset
//! suffix so the calendar client never reinterprets them.
//!
//! All-day events discard the time component and anchor at local noon, which
//! sidesteps the nonexistent-midnight DST edge. The stored end is exclusive:
//! the inclusive input end date gains one day here, at the parsing boundary,
//! and every later layer renders the stored value as-is.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{ServiceError, ServiceResult};

/// Canonical result of normalizing a start/end input pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSchedule {
    /// Start instant, UTC.
    pub start_utc: DateTime<Utc>,
    /// End instant, UTC. Exclusive next-day anchor for all-day events.
    pub end_utc: DateTime<Utc>,
    /// API-facing start: `YYYY-MM-DD` or local ISO datetime without offset.
    pub start_display: String,
    /// API-facing end, same convention as the start.
    pub end_display: String,
    pub all_day: bool,
}

/// ## Summary
/// Normalizes raw start/end values into stored UTC instants and display
/// strings.
///
/// All-day: time-of-day is discarded, both dates anchor at local noon, the
/// inclusive input end becomes an exclusive stored end one day later, and a
/// missing end defaults to the start date. Timed: naive inputs resolve in the
/// shop timezone and a missing end defaults to the start instant.
///
/// ## Errors
/// Returns a `ParseError` naming the offending value for malformed input and
/// a `ValidationError` when the end date precedes the start date.
pub fn normalize(
    start_raw: &str,
    end_raw: Option<&str>,
    all_day: bool,
    tz: Tz,
) -> ServiceResult<NormalizedSchedule> {
    if all_day {
        normalize_all_day(start_raw, end_raw, tz)
    } else {
        normalize_timed(start_raw, end_raw, tz)
    }
}

fn normalize_all_day(
    start_raw: &str,
    end_raw: Option<&str>,
    tz: Tz,
) -> ServiceResult<NormalizedSchedule> {
    let start_date = parse_date_portion(start_raw)?;
    let end_date_inclusive = match end_raw {
        Some(raw) => parse_date_portion(raw)?,
        None => start_date,
    };

    if end_date_inclusive < start_date {
        return Err(ServiceError::ValidationError(format!(
            "end date {end_date_inclusive} is before start date {start_date}"
        )));
    }

    let end_date_exclusive = end_date_inclusive.succ_opt().ok_or_else(|| {
        ServiceError::ValidationError(format!("end date {end_date_inclusive} is out of range"))
    })?;

    Ok(NormalizedSchedule {
        start_utc: local_noon_utc(start_date, tz)?,
        end_utc: local_noon_utc(end_date_exclusive, tz)?,
        start_display: start_date.format("%Y-%m-%d").to_string(),
        end_display: end_date_exclusive.format("%Y-%m-%d").to_string(),
        all_day: true,
    })
}

fn normalize_timed(
    start_raw: &str,
    end_raw: Option<&str>,
    tz: Tz,
) -> ServiceResult<NormalizedSchedule> {
    let start_utc = parse_datetime(start_raw, tz)?;
    let end_utc = match end_raw {
        Some(raw) => parse_datetime(raw, tz)?,
        None => start_utc,
    };

    Ok(NormalizedSchedule {
        start_utc,
        end_utc,
        start_display: display_local_datetime(start_utc, tz),
        end_display: display_local_datetime(end_utc, tz),
        all_day: false,
    })
}

/// ## Summary
/// Parses an instant from a date-only string, a naive ISO datetime resolved
/// in the given timezone, or an ISO datetime carrying an explicit offset.
///
/// ## Errors
/// Returns a `ParseError` naming the offending value.
pub fn parse_datetime(raw: &str, tz: Tz) -> ServiceResult<DateTime<Utc>> {
    if let Ok(aware) = DateTime::parse_from_rfc3339(raw) {
        return Ok(aware.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_to_utc(naive, tz, raw);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return local_to_utc(date.and_time(NaiveTime::MIN), tz, raw);
    }

    Err(ServiceError::ParseError(format!(
        "unrecognized date/datetime value: {raw}"
    )))
}

/// ## Summary
/// Parses the calendar-date portion of a date or datetime string, discarding
/// any time component.
///
/// ## Errors
/// Returns a `ParseError` naming the offending value.
pub fn parse_date_portion(raw: &str) -> ServiceResult<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_err| {
        ServiceError::ParseError(format!("unrecognized date value: {raw}"))
    })
}

/// ## Summary
/// Renders a stored instant for the API: date-only for all-day events, local
/// ISO datetime without an offset suffix otherwise.
#[must_use]
pub fn display_instant(instant: DateTime<Utc>, all_day: bool, tz: Tz) -> String {
    if all_day {
        instant
            .with_timezone(&tz)
            .date_naive()
            .format("%Y-%m-%d")
            .to_string()
    } else {
        display_local_datetime(instant, tz)
    }
}

fn display_local_datetime(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// ## Summary
/// Anchors a local calendar date at noon and converts to UTC.
///
/// ## Errors
/// Returns a `ParseError` if the local noon does not exist, which no IANA
/// zone currently produces.
pub fn local_noon_utc(date: NaiveDate, tz: Tz) -> ServiceResult<DateTime<Utc>> {
    let noon = date.and_hms_opt(12, 0, 0).ok_or_else(|| {
        ServiceError::ParseError(format!("date {date} has no representable noon"))
    })?;
    local_to_utc(noon, tz, &date.to_string())
}

/// ## Summary
/// Converts a local midnight to UTC, used for window boundaries.
///
/// ## Errors
/// Returns a `ParseError` if the local midnight cannot be resolved.
pub fn local_midnight_utc(date: NaiveDate, tz: Tz) -> ServiceResult<DateTime<Utc>> {
    local_to_utc(date.and_time(NaiveTime::MIN), tz, &date.to_string())
}

/// ## Summary
/// Resolves a naive local datetime to UTC, shifting forward one hour across
/// spring-forward gaps.
///
/// ## Errors
/// Returns a `ParseError` if the local time cannot be resolved at all.
pub fn resolve_local_datetime(naive: NaiveDateTime, tz: Tz) -> ServiceResult<DateTime<Utc>> {
    local_to_utc(naive, tz, &naive.to_string())
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz, raw: &str) -> ServiceResult<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(local) | chrono::LocalResult::Ambiguous(local, _) => {
            Ok(local.with_timezone(&Utc))
        }
        chrono::LocalResult::None => {
            // Spring-forward gap: the wall-clock time never happened, shift
            // forward one hour.
            let shifted = naive + chrono::TimeDelta::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|local| local.with_timezone(&Utc))
                .ok_or_else(|| {
                    ServiceError::ParseError(format!("local time {raw} cannot be resolved"))
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::Chicago;

    #[test]
    fn all_day_same_day_round_trip() {
        let schedule =
            normalize("2025-10-16", Some("2025-10-16"), true, Chicago).expect("normalizes");

        assert!(schedule.all_day);
        assert_eq!(schedule.start_display, "2025-10-16");
        assert_eq!(schedule.end_display, "2025-10-17");

        let start_local = schedule.start_utc.with_timezone(&Chicago);
        let end_local = schedule.end_utc.with_timezone(&Chicago);
        assert_eq!(start_local.date_naive().to_string(), "2025-10-16");
        assert_eq!(end_local.date_naive().to_string(), "2025-10-17");
        assert_eq!(start_local.hour(), 12);
        assert_eq!(end_local.hour(), 12);
    }

    #[test]
    fn all_day_missing_end_defaults_to_start() {
        let schedule = normalize("2025-03-02", None, true, Chicago).expect("normalizes");
        assert_eq!(schedule.start_display, "2025-03-02");
        assert_eq!(schedule.end_display, "2025-03-03");
    }

    #[test]
    fn all_day_discards_time_component() {
        let schedule =
            normalize("2025-10-16T09:30:00", Some("2025-10-17T18:00:00"), true, Chicago)
                .expect("normalizes");
        assert_eq!(schedule.start_display, "2025-10-16");
        assert_eq!(schedule.end_display, "2025-10-18");
    }

    #[test]
    fn all_day_rejects_end_before_start() {
        let result = normalize("2025-10-16", Some("2025-10-15"), true, Chicago);
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn timed_naive_input_resolves_in_local_zone() {
        let schedule = normalize(
            "2025-10-16T10:00:00",
            Some("2025-10-16T14:30:00"),
            false,
            Chicago,
        )
        .expect("normalizes");

        // Chicago is UTC-5 in October (CDT).
        assert_eq!(
            schedule.start_utc,
            Utc.with_ymd_and_hms(2025, 10, 16, 15, 0, 0).single().expect("valid"),
        );
        assert_eq!(schedule.start_display, "2025-10-16T10:00:00");
        assert_eq!(schedule.end_display, "2025-10-16T14:30:00");
    }

    #[test]
    fn timed_offset_input_converts_to_utc() {
        let schedule = normalize("2025-10-16T10:00:00-05:00", None, false, Chicago)
            .expect("normalizes");
        assert_eq!(
            schedule.start_utc,
            Utc.with_ymd_and_hms(2025, 10, 16, 15, 0, 0).single().expect("valid"),
        );
        assert_eq!(schedule.end_utc, schedule.start_utc);
    }

    #[test]
    fn timed_display_has_no_offset_suffix() {
        let schedule =
            normalize("2025-06-01T08:15", None, false, Chicago).expect("normalizes");
        assert_eq!(schedule.start_display, "2025-06-01T08:15:00");
        assert!(!schedule.start_display.contains('+'));
        assert!(!schedule.start_display.ends_with('Z'));
    }

    #[test]
    fn malformed_input_names_the_value() {
        let err = normalize("10/16/2025", None, false, Chicago).expect_err("rejects");
        let message = err.to_string();
        assert!(message.contains("10/16/2025"), "unexpected message: {message}");
    }

    #[test]
    fn date_portion_handles_datetime_strings() {
        assert_eq!(
            parse_date_portion("2025-10-16T08:00:00").expect("parses"),
            NaiveDate::from_ymd_opt(2025, 10, 16).expect("valid date"),
        );
        assert!(parse_date_portion("not-a-date").is_err());
    }

    #[test]
    fn spring_forward_gap_shifts_forward() {
        // 2025-03-09 02:30 does not exist in Chicago; it resolves to 03:30 CDT.
        let instant = parse_datetime("2025-03-09T02:30:00", Chicago).expect("resolves");
        let local = instant.with_timezone(&Chicago);
        assert_eq!(local.hour(), 3);
        assert_eq!(local.minute(), 30);
    }
}
