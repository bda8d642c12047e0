//! Occurrence generation for recurring job series.
//!
//! Generation steps through the shop-local calendar so wall-clock times
//! survive DST transitions, then converts each occurrence back to UTC.
//! Monthly rules preserve nth-weekday-of-month semantics: a job anchored on
//! the 3rd Friday of January recurs on the 3rd Friday of February, never on
//! "the 16th". Months lacking the anchor's ordinal (a missing 5th weekday)
//! are skipped without consuming a count terminator.

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc, Weekday};
use chrono_tz::Tz;

use hitchpin_core::types::{Frequency, RecurrenceEnd, RecurrenceRule};

use crate::error::{ServiceError, ServiceResult};
use crate::scheduling::datetime::resolve_local_datetime;

/// A computed-but-not-persisted occurrence of a recurring series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualOccurrence {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    /// Whether this slot is the parent job's own occurrence.
    pub is_parent: bool,
}

/// The persisted parent occurrence a series grows from.
#[derive(Debug, Clone, Copy)]
pub struct SeriesAnchor {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    /// `end_recurrence_date` truncation: occurrences on/after this local date
    /// are never generated.
    pub truncation: Option<NaiveDate>,
}

impl SeriesAnchor {
    fn duration(&self) -> TimeDelta {
        self.end_utc - self.start_utc
    }
}

/// Ordered iterator over the occurrences following a series anchor.
///
/// The parent's own slot is not yielded; use [`occurrences_in_window`] when
/// the parent occurrence should participate.
pub struct SeriesIter {
    tz: Tz,
    anchor_date: NaiveDate,
    anchor_time: chrono::NaiveTime,
    anchor_weekday: Weekday,
    anchor_ordinal: u32,
    duration: TimeDelta,
    rule: RecurrenceRule,
    truncation: Option<NaiveDate>,
    step: i64,
    yielded: u32,
    done: bool,
}

impl SeriesIter {
    /// ## Summary
    /// Builds an iterator over the occurrences following the anchor.
    #[must_use]
    pub fn new(anchor: &SeriesAnchor, rule: RecurrenceRule, tz: Tz) -> Self {
        let local_start = anchor.start_utc.with_timezone(&tz).naive_local();
        let anchor_date = local_start.date();
        Self {
            tz,
            anchor_date,
            anchor_time: local_start.time(),
            anchor_weekday: anchor_date.weekday(),
            anchor_ordinal: weekday_ordinal(anchor_date),
            duration: anchor.duration(),
            rule,
            truncation: anchor.truncation,
            step: 0,
            yielded: 0,
            done: false,
        }
    }

    fn candidate_date(&self) -> Option<NaiveDate> {
        let units = self.step * i64::from(self.rule.interval);
        match self.rule.frequency {
            Frequency::Daily => self.anchor_date.checked_add_signed(TimeDelta::days(units)),
            Frequency::Weekly => self.anchor_date.checked_add_signed(TimeDelta::weeks(units)),
            Frequency::Monthly => {
                let (year, month) = add_months(self.anchor_date.year(), self.anchor_date.month(), units)?;
                nth_weekday_of_month(year, month, self.anchor_weekday, self.anchor_ordinal)
            }
            Frequency::Yearly => {
                let year = i32::try_from(i64::from(self.anchor_date.year()) + units).ok()?;
                let month = self.anchor_date.month();
                let day = self.anchor_date.day();
                NaiveDate::from_ymd_opt(year, month, day)
                    // Feb 29 anchors fall back to Feb 28 in non-leap years.
                    .or_else(|| NaiveDate::from_ymd_opt(year, month, day - 1))
            }
        }
    }
}

impl Iterator for SeriesIter {
    type Item = VirtualOccurrence;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let RecurrenceEnd::Count(count) = self.rule.end {
                if self.yielded >= count {
                    self.done = true;
                    return None;
                }
            }

            self.step += 1;
            let Some(date) = self.candidate_date() else {
                match self.rule.frequency {
                    // A month without the anchor's ordinal weekday is skipped.
                    Frequency::Monthly => continue,
                    _ => {
                        self.done = true;
                        return None;
                    }
                }
            };

            if let RecurrenceEnd::Until(until) = self.rule.end {
                if date > until {
                    self.done = true;
                    return None;
                }
            }
            if let Some(truncation) = self.truncation {
                if date >= truncation {
                    self.done = true;
                    return None;
                }
            }

            self.yielded += 1;
            let Ok(start_utc) = resolve_local_datetime(date.and_time(self.anchor_time), self.tz)
            else {
                tracing::warn!(date = %date, "skipping unresolvable occurrence time");
                continue;
            };
            return Some(VirtualOccurrence {
                start_utc,
                end_utc: start_utc + self.duration,
                is_parent: false,
            });
        }
    }
}

/// ## Summary
/// Generates the occurrences of a series overlapping `[window_start,
/// window_end)`, including the parent's own slot, capped at `safety_cap`
/// occurrences.
///
/// This is the lazy path used for forever series: nothing is persisted and
/// generation never runs past the window.
#[must_use]
pub fn occurrences_in_window(
    anchor: &SeriesAnchor,
    rule: RecurrenceRule,
    tz: Tz,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    safety_cap: usize,
) -> Vec<VirtualOccurrence> {
    let parent_slot = VirtualOccurrence {
        start_utc: anchor.start_utc,
        end_utc: anchor.end_utc,
        is_parent: true,
    };

    let mut out = Vec::new();
    for occurrence in std::iter::once(parent_slot).chain(SeriesIter::new(anchor, rule, tz)) {
        if out.len() >= safety_cap {
            break;
        }
        if occurrence.start_utc >= window_end {
            break;
        }
        if occurrence.end_utc < window_start {
            continue;
        }
        out.push(occurrence);
    }
    out
}

/// ## Summary
/// Generates every occurrence of a bounded (count/until) series for eager
/// materialization at creation time.
///
/// ## Errors
/// Returns an `InvalidOperation` for forever rules, which are never eager,
/// and a `ValidationError` if an until-terminated rule would generate more
/// than `cap` occurrences.
pub fn generate_bounded(
    anchor: &SeriesAnchor,
    rule: RecurrenceRule,
    tz: Tz,
    cap: usize,
) -> ServiceResult<Vec<VirtualOccurrence>> {
    if rule.is_forever() {
        return Err(ServiceError::InvalidOperation(
            "forever series generate occurrences lazily, not at creation".to_owned(),
        ));
    }

    let occurrences: Vec<_> = SeriesIter::new(anchor, rule, tz).take(cap + 1).collect();
    if occurrences.len() > cap {
        return Err(ServiceError::ValidationError(format!(
            "recurrence rule generates more than {cap} occurrences"
        )));
    }
    Ok(occurrences)
}

/// ## Summary
/// Returns the next `count` occurrences following the anchor, for preview of
/// a series without materializing anything.
#[must_use]
pub fn preview_occurrences(
    anchor: &SeriesAnchor,
    rule: RecurrenceRule,
    tz: Tz,
    count: usize,
) -> Vec<VirtualOccurrence> {
    SeriesIter::new(anchor, rule, tz).take(count).collect()
}

/// Ordinal position of a date's weekday within its month (1 = first).
#[must_use]
pub fn weekday_ordinal(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

/// ## Summary
/// Finds the date of the nth given weekday in a month, if the month has one.
#[must_use]
pub fn nth_weekday_of_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: u32,
) -> Option<NaiveDate> {
    if !(1..=5).contains(&ordinal) {
        return None;
    }
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (weekday.num_days_from_monday() + 7 - first.weekday().num_days_from_monday()) % 7;
    let day = 1 + offset + (ordinal - 1) * 7;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn add_months(year: i32, month: u32, delta: i64) -> Option<(i32, u32)> {
    let total = i64::from(year) * 12 + i64::from(month) - 1 + delta;
    let new_year = i32::try_from(total.div_euclid(12)).ok()?;
    let new_month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    Some((new_year, new_month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;
    use hitchpin_core::types::Frequency;

    fn anchor_at(local: &str, duration_hours: i64) -> SeriesAnchor {
        let naive = chrono::NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S")
            .expect("valid test datetime");
        let start_utc = Chicago
            .from_local_datetime(&naive)
            .single()
            .expect("unambiguous test datetime")
            .with_timezone(&Utc);
        SeriesAnchor {
            start_utc,
            end_utc: start_utc + TimeDelta::hours(duration_hours),
            truncation: None,
        }
    }

    fn rule(frequency: Frequency, interval: u32, end: RecurrenceEnd) -> RecurrenceRule {
        RecurrenceRule::new(frequency, interval, end).expect("valid test rule")
    }

    fn local_start(occurrence: &VirtualOccurrence) -> String {
        occurrence
            .start_utc
            .with_timezone(&Chicago)
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    }

    #[test]
    fn monthly_preserves_nth_weekday() {
        // 2026-01-16 is the 3rd Friday of January; the single generated
        // occurrence must land on the 3rd Friday of February, not the 16th.
        let anchor = anchor_at("2026-01-16T10:00:00", 2);
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Monthly, 1, RecurrenceEnd::Count(1)),
            Chicago,
        )
        .collect();

        assert_eq!(occurrences.len(), 1);
        assert_eq!(local_start(&occurrences[0]), "2026-02-20T10:00:00");
    }

    #[test]
    fn monthly_skips_months_missing_the_ordinal() {
        // 2026-01-30 is the 5th Friday of January. February 2026 has four
        // Fridays, so the next occurrence is the 5th Friday of May.
        let anchor = anchor_at("2026-01-30T09:00:00", 1);
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Monthly, 1, RecurrenceEnd::Count(2)),
            Chicago,
        )
        .collect();

        assert_eq!(occurrences.len(), 2);
        assert_eq!(local_start(&occurrences[0]), "2026-05-29T09:00:00");
        assert_eq!(local_start(&occurrences[1]), "2026-07-31T09:00:00");
    }

    #[test]
    fn daily_steps_by_interval_days() {
        let anchor = anchor_at("2026-03-01T08:00:00", 1);
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Daily, 3, RecurrenceEnd::Count(3)),
            Chicago,
        )
        .collect();

        let starts: Vec<_> = occurrences.iter().map(local_start).collect();
        assert_eq!(
            starts,
            [
                "2026-03-04T08:00:00",
                "2026-03-07T08:00:00",
                "2026-03-10T08:00:00",
            ]
        );
    }

    #[test]
    fn weekly_preserves_wall_clock_across_dst() {
        // Weekly series crossing the 2026-03-08 spring-forward keeps 10:00
        // local even though the UTC offset changes.
        let anchor = anchor_at("2026-03-03T10:00:00", 1);
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Weekly, 1, RecurrenceEnd::Count(2)),
            Chicago,
        )
        .collect();

        let starts: Vec<_> = occurrences.iter().map(local_start).collect();
        assert_eq!(starts, ["2026-03-10T10:00:00", "2026-03-17T10:00:00"]);
    }

    #[test]
    fn yearly_feb_29_falls_back_to_feb_28() {
        let anchor = anchor_at("2024-02-29T11:00:00", 1);
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Yearly, 1, RecurrenceEnd::Count(2)),
            Chicago,
        )
        .collect();

        let starts: Vec<_> = occurrences.iter().map(local_start).collect();
        assert_eq!(starts, ["2025-02-28T11:00:00", "2026-02-28T11:00:00"]);
    }

    #[test]
    fn until_terminator_is_inclusive() {
        let anchor = anchor_at("2026-01-05T09:00:00", 1);
        let until = NaiveDate::from_ymd_opt(2026, 1, 19).expect("valid date");
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Weekly, 1, RecurrenceEnd::Until(until)),
            Chicago,
        )
        .collect();

        let starts: Vec<_> = occurrences.iter().map(local_start).collect();
        assert_eq!(starts, ["2026-01-12T09:00:00", "2026-01-19T09:00:00"]);
    }

    #[test]
    fn truncation_stops_generation_at_the_boundary() {
        let mut anchor = anchor_at("2026-01-05T09:00:00", 1);
        anchor.truncation = NaiveDate::from_ymd_opt(2026, 1, 19);
        let occurrences: Vec<_> = SeriesIter::new(
            &anchor,
            rule(Frequency::Weekly, 1, RecurrenceEnd::Forever),
            Chicago,
        )
        .collect();

        // The 19th itself is truncated away.
        let starts: Vec<_> = occurrences.iter().map(local_start).collect();
        assert_eq!(starts, ["2026-01-12T09:00:00"]);
    }

    #[test]
    fn duration_is_preserved_on_every_occurrence() {
        let anchor = anchor_at("2026-01-16T10:00:00", 5);
        for occurrence in SeriesIter::new(
            &anchor,
            rule(Frequency::Monthly, 2, RecurrenceEnd::Count(6)),
            Chicago,
        ) {
            assert_eq!(occurrence.end_utc - occurrence.start_utc, TimeDelta::hours(5));
        }
    }

    #[test]
    fn window_generation_includes_parent_and_respects_cap() {
        let anchor = anchor_at("2026-01-01T09:00:00", 1);
        let daily = rule(Frequency::Daily, 1, RecurrenceEnd::Forever);
        let window_start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().expect("valid");
        let window_end = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).single().expect("valid");

        let occurrences =
            occurrences_in_window(&anchor, daily, Chicago, window_start, window_end, 10);
        assert_eq!(occurrences.len(), 10);
        assert!(occurrences[0].is_parent);
        assert!(occurrences[1..].iter().all(|o| !o.is_parent));

        let unbounded =
            occurrences_in_window(&anchor, daily, Chicago, window_start, window_end, 500);
        assert_eq!(unbounded.len(), 31);
    }

    #[test]
    fn window_generation_skips_occurrences_before_the_window() {
        let anchor = anchor_at("2026-01-01T09:00:00", 1);
        let weekly = rule(Frequency::Weekly, 1, RecurrenceEnd::Forever);
        let window_start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).single().expect("valid");
        let window_end = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).single().expect("valid");

        let occurrences =
            occurrences_in_window(&anchor, weekly, Chicago, window_start, window_end, 100);
        assert_eq!(occurrences.len(), 2);
        assert!(occurrences.iter().all(|o| !o.is_parent));
        assert_eq!(local_start(&occurrences[0]), "2026-03-05T09:00:00");
        assert_eq!(local_start(&occurrences[1]), "2026-03-12T09:00:00");
    }

    #[test]
    fn bounded_generation_rejects_forever_rules() {
        let anchor = anchor_at("2026-01-01T09:00:00", 1);
        let result = generate_bounded(
            &anchor,
            rule(Frequency::Daily, 1, RecurrenceEnd::Forever),
            Chicago,
            500,
        );
        assert!(matches!(result, Err(ServiceError::InvalidOperation(_))));
    }

    #[test]
    fn bounded_generation_rejects_oversized_until_ranges() {
        let anchor = anchor_at("2026-01-01T09:00:00", 1);
        let until = NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date");
        let result = generate_bounded(
            &anchor,
            rule(Frequency::Daily, 1, RecurrenceEnd::Until(until)),
            Chicago,
            500,
        );
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn preview_returns_the_requested_count() {
        let anchor = anchor_at("2026-01-16T10:00:00", 1);
        let occurrences = preview_occurrences(
            &anchor,
            rule(Frequency::Monthly, 1, RecurrenceEnd::Forever),
            Chicago,
            3,
        );
        let starts: Vec<_> = occurrences.iter().map(local_start).collect();
        assert_eq!(
            starts,
            [
                "2026-02-20T10:00:00",
                "2026-03-20T10:00:00",
                "2026-04-17T10:00:00",
            ]
        );
    }

    #[test]
    fn nth_weekday_of_month_matches_known_dates() {
        assert_eq!(
            nth_weekday_of_month(2026, 2, Weekday::Fri, 3),
            NaiveDate::from_ymd_opt(2026, 2, 20),
        );
        assert_eq!(
            nth_weekday_of_month(2026, 2, Weekday::Sun, 1),
            NaiveDate::from_ymd_opt(2026, 2, 1),
        );
        // February 2026 has no 5th Friday.
        assert_eq!(nth_weekday_of_month(2026, 2, Weekday::Fri, 5), None);
    }

    #[test]
    fn weekday_ordinal_counts_within_month() {
        assert_eq!(
            weekday_ordinal(NaiveDate::from_ymd_opt(2026, 1, 16).expect("valid date")),
            3
        );
        assert_eq!(
            weekday_ordinal(NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date")),
            1
        );
        assert_eq!(
            weekday_ordinal(NaiveDate::from_ymd_opt(2026, 1, 30).expect("valid date")),
            5
        );
    }
}
