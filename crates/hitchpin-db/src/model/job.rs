//! Models for the job table.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use hitchpin_core::types::RecurrenceRule;

use crate::db::enums::JobStatus;
use crate::db::pg_types::JsonRule;
use crate::db::schema::job;

/// A unit of scheduled work: rental pickup, drop-off, or repair.
///
/// A job carrying a `recurrence_rule` and no `recurrence_parent_id` is a
/// recurring parent; a job with `recurrence_parent_id` set is a persisted
/// instance of that parent's series.
#[expect(clippy::struct_excessive_bools)] // mirrors the job table's flag columns
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = job)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(super::calendar::Calendar, foreign_key = calendar_id))]
pub struct Job {
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
    /// Start instant, stored UTC.
    pub start_dt: DateTime<Utc>,
    /// End instant, stored UTC. Exclusive next-day noon anchor for all-day jobs.
    pub end_dt: DateTime<Utc>,
    pub all_day: bool,
    pub deleted: bool,
    pub recurrence_rule: Option<JsonRule>,
    pub recurrence_parent_id: Option<Uuid>,
    /// The virtual start this instance materializes; unique per parent.
    pub recurrence_original_start: Option<DateTime<Utc>>,
    /// Truncation boundary: no occurrences are generated on/after this date.
    pub end_recurrence_date: Option<NaiveDate>,
    pub has_call_reminder: bool,
    pub call_reminder_weeks_prior: Option<i32>,
    pub call_reminder_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Whether this job is the parent of a recurring series.
    #[must_use]
    pub const fn is_recurrence_parent(&self) -> bool {
        self.recurrence_rule.is_some() && self.recurrence_parent_id.is_none()
    }

    /// Whether this job is a persisted instance of a recurring series.
    #[must_use]
    pub const fn is_recurrence_instance(&self) -> bool {
        self.recurrence_parent_id.is_some()
    }

    /// The structured recurrence rule, if any.
    #[must_use]
    pub fn rule(&self) -> Option<RecurrenceRule> {
        self.recurrence_rule.map(RecurrenceRule::from)
    }

    /// Span between the stored start and end instants.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_dt - self.start_dt
    }
}

/// Insert struct for creating new jobs
#[expect(clippy::struct_excessive_bools)] // mirrors the job table's flag columns
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = job)]
pub struct NewJob {
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
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub all_day: bool,
    pub recurrence_rule: Option<JsonRule>,
    pub recurrence_parent_id: Option<Uuid>,
    pub recurrence_original_start: Option<DateTime<Utc>>,
    pub end_recurrence_date: Option<NaiveDate>,
    pub has_call_reminder: bool,
    pub call_reminder_weeks_prior: Option<i32>,
    pub call_reminder_completed: bool,
}

/// Changeset applied to the targeted job on update.
///
/// Nullable columns use `Option<Option<_>>`: the outer `None` leaves the
/// column untouched, `Some(None)` writes SQL NULL.
#[expect(clippy::option_option)]
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = job)]
pub struct JobPatch {
    pub calendar_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub business_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub trailer_details: Option<String>,
    pub repair_notes: Option<String>,
    pub quote: Option<Option<f64>>,
    pub start_dt: Option<DateTime<Utc>>,
    pub end_dt: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub has_call_reminder: Option<bool>,
    pub call_reminder_weeks_prior: Option<Option<i32>>,
    pub call_reminder_completed: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    /// Restricts the patch to fields safe to propagate across a series.
    ///
    /// Start/end instants and the all-day flag stay per-instance; everything
    /// descriptive (names, phone, trailer text, quote, status, calendar and
    /// reminder configuration) follows the series.
    #[must_use]
    pub fn for_siblings(&self) -> Self {
        Self {
            start_dt: None,
            end_dt: None,
            all_day: None,
            ..self.clone()
        }
    }

    /// Whether the patch carries no field updates besides the timestamp.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.calendar_id.is_none()
            && self.status.is_none()
            && self.business_name.is_none()
            && self.contact_name.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.trailer_details.is_none()
            && self.repair_notes.is_none()
            && self.quote.is_none()
            && self.start_dt.is_none()
            && self.end_dt.is_none()
            && self.all_day.is_none()
            && self.has_call_reminder.is_none()
            && self.call_reminder_weeks_prior.is_none()
            && self.call_reminder_completed.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_patch_drops_time_fields() {
        let patch = JobPatch {
            business_name: Some("Lakeside Hauling".to_owned()),
            start_dt: Some(Utc::now()),
            end_dt: Some(Utc::now()),
            all_day: Some(true),
            ..JobPatch::default()
        };
        let sibling = patch.for_siblings();
        assert_eq!(sibling.business_name.as_deref(), Some("Lakeside Hauling"));
        assert!(sibling.start_dt.is_none());
        assert!(sibling.end_dt.is_none());
        assert!(sibling.all_day.is_none());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(JobPatch::default().is_empty());
        let patch = JobPatch {
            phone: Some("555-0117".to_owned()),
            ..JobPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
