use hitchpin_core::types::{Frequency, RecurrenceEnd};

pub struct RecurrenceCase {
    pub name: &'static str,
    /// Parent start as a shop-local datetime, `%Y-%m-%dT%H:%M:%S`.
    pub anchor_local: &'static str,
    pub duration_minutes: i64,
    pub frequency: Frequency,
    pub interval: u32,
    pub end: RecurrenceEnd,
    /// `end_recurrence_date` truncation, `%Y-%m-%d`.
    pub truncation: Option<&'static str>,
    /// Expected generated starts as shop-local datetimes, in order.
    pub expected: &'static [&'static str],
    /// Iterator take-limit; bounds forever cases.
    pub limit: usize,
}

fn until(date: &str) -> RecurrenceEnd {
    RecurrenceEnd::Until(date.parse().expect("valid until date in case table"))
}

#[expect(clippy::too_many_lines)]
pub fn recurrence_cases() -> Vec<RecurrenceCase> {
    vec![
        RecurrenceCase {
            name: "daily_count",
            anchor_local: "2026-03-02T09:00:00",
            duration_minutes: 60,
            frequency: Frequency::Daily,
            interval: 1,
            end: RecurrenceEnd::Count(3),
            truncation: None,
            expected: &[
                "2026-03-03T09:00:00",
                "2026-03-04T09:00:00",
                "2026-03-05T09:00:00",
            ],
            limit: 10,
        },
        RecurrenceCase {
            name: "daily_interval_skips_days",
            anchor_local: "2026-03-02T09:00:00",
            duration_minutes: 60,
            frequency: Frequency::Daily,
            interval: 4,
            end: RecurrenceEnd::Count(2),
            truncation: None,
            expected: &["2026-03-06T09:00:00", "2026-03-10T09:00:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "weekly_count",
            anchor_local: "2026-01-05T14:30:00",
            duration_minutes: 90,
            frequency: Frequency::Weekly,
            interval: 1,
            end: RecurrenceEnd::Count(2),
            truncation: None,
            expected: &["2026-01-12T14:30:00", "2026-01-19T14:30:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "biweekly_across_spring_forward",
            anchor_local: "2026-02-24T10:00:00",
            duration_minutes: 120,
            frequency: Frequency::Weekly,
            interval: 2,
            end: RecurrenceEnd::Count(2),
            truncation: None,
            // DST starts 2026-03-08; wall-clock time is preserved.
            expected: &["2026-03-10T10:00:00", "2026-03-24T10:00:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "monthly_third_friday",
            anchor_local: "2026-01-16T10:00:00",
            duration_minutes: 60,
            frequency: Frequency::Monthly,
            interval: 1,
            end: RecurrenceEnd::Count(1),
            truncation: None,
            // 3rd Friday of January recurs on the 3rd Friday of February.
            expected: &["2026-02-20T10:00:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "monthly_first_monday_over_a_year",
            anchor_local: "2026-01-05T08:00:00",
            duration_minutes: 30,
            frequency: Frequency::Monthly,
            interval: 3,
            end: RecurrenceEnd::Count(4),
            truncation: None,
            expected: &[
                "2026-04-06T08:00:00",
                "2026-07-06T08:00:00",
                "2026-10-05T08:00:00",
                "2027-01-04T08:00:00",
            ],
            limit: 10,
        },
        RecurrenceCase {
            name: "monthly_fifth_friday_skips_short_months",
            anchor_local: "2026-01-30T09:00:00",
            duration_minutes: 60,
            frequency: Frequency::Monthly,
            interval: 1,
            end: RecurrenceEnd::Count(3),
            truncation: None,
            expected: &[
                "2026-05-29T09:00:00",
                "2026-07-31T09:00:00",
                "2026-10-30T09:00:00",
            ],
            limit: 10,
        },
        RecurrenceCase {
            name: "yearly_count",
            anchor_local: "2026-06-15T12:00:00",
            duration_minutes: 45,
            frequency: Frequency::Yearly,
            interval: 1,
            end: RecurrenceEnd::Count(2),
            truncation: None,
            expected: &["2027-06-15T12:00:00", "2028-06-15T12:00:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "yearly_leap_day_falls_back",
            anchor_local: "2024-02-29T11:00:00",
            duration_minutes: 60,
            frequency: Frequency::Yearly,
            interval: 2,
            end: RecurrenceEnd::Count(3),
            truncation: None,
            expected: &[
                "2026-02-28T11:00:00",
                "2028-02-29T11:00:00",
                "2030-02-28T11:00:00",
            ],
            limit: 10,
        },
        RecurrenceCase {
            name: "until_is_inclusive",
            anchor_local: "2026-01-05T09:00:00",
            duration_minutes: 60,
            frequency: Frequency::Weekly,
            interval: 1,
            end: until("2026-01-19"),
            truncation: None,
            expected: &["2026-01-12T09:00:00", "2026-01-19T09:00:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "truncation_excludes_the_boundary_date",
            anchor_local: "2026-01-05T09:00:00",
            duration_minutes: 60,
            frequency: Frequency::Weekly,
            interval: 1,
            end: RecurrenceEnd::Forever,
            truncation: Some("2026-01-26"),
            expected: &["2026-01-12T09:00:00", "2026-01-19T09:00:00"],
            limit: 10,
        },
        RecurrenceCase {
            name: "forever_is_bounded_only_by_the_caller",
            anchor_local: "2026-01-01T07:00:00",
            duration_minutes: 60,
            frequency: Frequency::Daily,
            interval: 1,
            end: RecurrenceEnd::Forever,
            truncation: None,
            expected: &[
                "2026-01-02T07:00:00",
                "2026-01-03T07:00:00",
                "2026-01-04T07:00:00",
                "2026-01-05T07:00:00",
            ],
            limit: 4,
        },
    ]
}
