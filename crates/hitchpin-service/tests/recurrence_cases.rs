//! Table-driven recurrence generation cases.

mod recurrence_cases_data;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::America::Chicago;

use hitchpin_service::scheduling::recurrence::{SeriesAnchor, SeriesIter};
use hitchpin_core::types::RecurrenceRule;
use recurrence_cases_data::{RecurrenceCase, recurrence_cases};

fn assert_case(case: &RecurrenceCase) {
    let naive = NaiveDateTime::parse_from_str(case.anchor_local, "%Y-%m-%dT%H:%M:%S")
        .unwrap_or_else(|_| panic!("case {}: bad anchor", case.name));
    let start_utc = Chicago
        .from_local_datetime(&naive)
        .single()
        .unwrap_or_else(|| panic!("case {}: ambiguous anchor", case.name))
        .with_timezone(&Utc);
    let truncation = case.truncation.map(|raw| {
        raw.parse::<NaiveDate>()
            .unwrap_or_else(|_| panic!("case {}: bad truncation", case.name))
    });
    let anchor = SeriesAnchor {
        start_utc,
        end_utc: start_utc + TimeDelta::minutes(case.duration_minutes),
        truncation,
    };
    let rule = RecurrenceRule::new(case.frequency, case.interval, case.end)
        .unwrap_or_else(|err| panic!("case {}: invalid rule: {err}", case.name));

    let starts: Vec<String> = SeriesIter::new(&anchor, rule, Chicago)
        .take(case.limit)
        .map(|occurrence| {
            occurrence
                .start_utc
                .with_timezone(&Chicago)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string()
        })
        .collect();

    assert_eq!(starts, case.expected, "case {}", case.name);
}

#[test_log::test]
fn recurrence_case_table() {
    for case in recurrence_cases() {
        assert_case(&case);
    }
}
