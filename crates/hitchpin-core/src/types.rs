use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Scope selector for updates and deletes on recurring series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesScope {
    ThisOnly,
    ThisAndFuture,
    All,
}

impl SeriesScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ThisOnly => "this_only",
            Self::ThisAndFuture => "this_and_future",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for SeriesScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence frequency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence terminator: exactly one of count, until-date, or forever
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceEnd {
    /// Fixed number of generated occurrences (the parent is not counted).
    Count(u32),
    /// Generate occurrences up to and including this local date.
    Until(NaiveDate),
    /// Open-ended series; occurrences are computed lazily per window.
    Forever,
}

/// Largest count terminator accepted on a bounded rule.
pub const MAX_RECURRENCE_COUNT: u32 = 500;

/// Structured recurrence rule stored on a parent job.
///
/// Wire shape (JSONB column and API payloads):
/// `{"type": "weekly", "interval": 2, "count": 10}`,
/// `{"type": "monthly", "interval": 1, "until_date": "2026-06-01"}`, or
/// `{"type": "daily", "interval": 1, "forever": true}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub end: RecurrenceEnd,
}

impl RecurrenceRule {
    /// ## Summary
    /// Builds a validated rule from its parts.
    ///
    /// ## Errors
    /// Returns a `ValidationError` if the interval is zero or a count terminator
    /// is zero or above [`MAX_RECURRENCE_COUNT`].
    pub fn new(frequency: Frequency, interval: u32, end: RecurrenceEnd) -> CoreResult<Self> {
        if interval == 0 {
            return Err(CoreError::ValidationError(
                "recurrence interval must be a positive integer".to_owned(),
            ));
        }
        if let RecurrenceEnd::Count(count) = end {
            if count == 0 {
                return Err(CoreError::ValidationError(
                    "recurrence count must be a positive integer".to_owned(),
                ));
            }
            if count > MAX_RECURRENCE_COUNT {
                return Err(CoreError::ValidationError(format!(
                    "recurrence count {count} exceeds the maximum of {MAX_RECURRENCE_COUNT}"
                )));
            }
        }
        Ok(Self {
            frequency,
            interval,
            end,
        })
    }

    /// Whether this rule has no count or until-date terminator.
    #[must_use]
    pub const fn is_forever(self) -> bool {
        matches!(self.end, RecurrenceEnd::Forever)
    }
}

/// Serde wire representation for [`RecurrenceRule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleWire {
    #[serde(rename = "type")]
    frequency: Frequency,
    interval: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    until_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    forever: Option<bool>,
}

impl Serialize for RecurrenceRule {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self.end {
            RecurrenceEnd::Count(count) => RuleWire {
                frequency: self.frequency,
                interval: self.interval,
                count: Some(count),
                until_date: None,
                forever: None,
            },
            RecurrenceEnd::Until(date) => RuleWire {
                frequency: self.frequency,
                interval: self.interval,
                count: None,
                until_date: Some(date),
                forever: None,
            },
            RecurrenceEnd::Forever => RuleWire {
                frequency: self.frequency,
                interval: self.interval,
                count: None,
                until_date: None,
                forever: Some(true),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RecurrenceRule {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = RuleWire::deserialize(deserializer)?;
        let end = match (wire.count, wire.until_date, wire.forever) {
            (Some(count), None, None | Some(false)) => RecurrenceEnd::Count(count),
            (None, Some(date), None | Some(false)) => RecurrenceEnd::Until(date),
            (None, None, Some(true)) => RecurrenceEnd::Forever,
            _ => {
                return Err(serde::de::Error::custom(
                    "recurrence rule requires exactly one of count, until_date, or forever",
                ));
            }
        };
        Self::new(wire.frequency, wire.interval, end).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_round_trips_through_json() {
        let rule = RecurrenceRule::new(Frequency::Weekly, 2, RecurrenceEnd::Count(10))
            .expect("valid rule");
        let json = serde_json::to_value(rule).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({"type": "weekly", "interval": 2, "count": 10})
        );
        let back: RecurrenceRule = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, rule);
    }

    #[test]
    fn rule_accepts_forever_terminator() {
        let rule: RecurrenceRule =
            serde_json::from_value(serde_json::json!({"type": "daily", "interval": 1, "forever": true}))
                .expect("deserializes");
        assert!(rule.is_forever());
    }

    #[test]
    fn rule_rejects_multiple_terminators() {
        let result: Result<RecurrenceRule, _> = serde_json::from_value(serde_json::json!({
            "type": "daily",
            "interval": 1,
            "count": 5,
            "forever": true,
        }));
        assert!(result.is_err());
    }

    #[test]
    fn rule_rejects_missing_terminator() {
        let result: Result<RecurrenceRule, _> =
            serde_json::from_value(serde_json::json!({"type": "monthly", "interval": 1}));
        assert!(result.is_err());
    }

    #[test]
    fn rule_rejects_oversized_count() {
        let result = RecurrenceRule::new(Frequency::Daily, 1, RecurrenceEnd::Count(501));
        assert!(result.is_err());
    }

    #[test]
    fn rule_rejects_zero_interval() {
        let result = RecurrenceRule::new(Frequency::Daily, 0, RecurrenceEnd::Forever);
        assert!(result.is_err());
    }

    #[test]
    fn scope_serializes_snake_case() {
        let scope: SeriesScope =
            serde_json::from_value(serde_json::json!("this_and_future")).expect("deserializes");
        assert_eq!(scope, SeriesScope::ThisAndFuture);
        assert_eq!(scope.as_str(), "this_and_future");
    }
}
