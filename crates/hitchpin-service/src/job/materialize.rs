//! Materialization of virtual occurrences into persisted job instances.
//!
//! `(recurrence_parent_id, recurrence_original_start)` is the idempotency
//! key: materializing the same virtual occurrence twice returns the existing
//! row, and the unique index on that pair backstops concurrent
//! double-submissions.

use chrono::{DateTime, Utc};
use diesel::result::DatabaseErrorKind;
use diesel_async::scoped_futures::ScopedFutureExt;
use uuid::Uuid;

use hitchpin_core::config::SchedulingConfig;
use hitchpin_db::db::connection::DbConnection;
use hitchpin_db::db::enums::JobStatus;
use hitchpin_db::db::query::{call_reminder, job};
use hitchpin_db::db::transaction::with_transaction;
use hitchpin_db::model::call_reminder::NewCallReminder;
use hitchpin_db::model::job::{Job, NewJob};

use crate::error::{ServiceError, ServiceResult};
use crate::scheduling::reminder::reminder_sunday;

/// Result of a materialization call.
#[derive(Debug, Clone)]
pub struct MaterializeOutcome {
    pub job: Job,
    /// False when the occurrence was already materialized.
    pub created: bool,
}

/// ## Summary
/// Builds the insert row for an instance of `parent` materializing the given
/// virtual start: descriptive fields copied, duration preserved, reminder
/// completion reset. New instances start out pending regardless of the
/// parent's lifecycle status.
#[must_use]
pub fn instance_new_job(parent: &Job, original_start: DateTime<Utc>) -> NewJob {
    NewJob {
        id: Uuid::now_v7(),
        calendar_id: parent.calendar_id,
        status: JobStatus::Pending,
        business_name: parent.business_name.clone(),
        contact_name: parent.contact_name.clone(),
        phone: parent.phone.clone(),
        address: parent.address.clone(),
        trailer_details: parent.trailer_details.clone(),
        repair_notes: parent.repair_notes.clone(),
        quote: parent.quote,
        start_dt: original_start,
        end_dt: original_start + parent.duration(),
        all_day: parent.all_day,
        recurrence_rule: None,
        recurrence_parent_id: Some(parent.id),
        recurrence_original_start: Some(original_start),
        end_recurrence_date: None,
        has_call_reminder: parent.has_call_reminder,
        call_reminder_weeks_prior: parent.call_reminder_weeks_prior,
        call_reminder_completed: false,
    }
}

/// ## Summary
/// Builds the reminder row paired with a job, when reminders are enabled on
/// it.
///
/// ## Errors
/// Returns a `ValidationError` if the stored `weeks_prior` is out of range.
pub fn paired_reminder(
    job_id: Uuid,
    calendar_id: Uuid,
    start_utc: DateTime<Utc>,
    has_call_reminder: bool,
    weeks_prior: Option<i32>,
    tz: chrono_tz::Tz,
) -> ServiceResult<Option<NewCallReminder>> {
    let (true, Some(weeks)) = (has_call_reminder, weeks_prior) else {
        return Ok(None);
    };

    let start_local = start_utc.with_timezone(&tz).date_naive();
    Ok(Some(NewCallReminder {
        id: Uuid::now_v7(),
        calendar_id,
        job_id: Some(job_id),
        reminder_date: reminder_sunday(start_local, weeks)?,
        notes: String::new(),
        completed: false,
    }))
}

/// ## Summary
/// Materializes the virtual occurrence of `parent_id` starting at
/// `original_start` into a persisted job instance, exactly once.
///
/// An existing instance for the same virtual start is returned unchanged with
/// `created = false`; a unique violation from a concurrent double-submission
/// is treated the same way. The insert and its paired reminder run in one
/// transaction.
///
/// ## Errors
/// Returns `NotFound` for an unknown or deleted parent, `InvalidOperation`
/// when the target is not a recurring parent, and database errors otherwise.
pub async fn materialize(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    parent_id: Uuid,
    original_start: DateTime<Utc>,
) -> ServiceResult<MaterializeOutcome> {
    let tz = config.timezone()?;

    let parent = job::find_by_id(conn, parent_id)
        .await?
        .filter(|found| !found.deleted)
        .ok_or_else(|| ServiceError::NotFound(format!("job {parent_id} not found")))?;

    if !parent.is_recurrence_parent() {
        return Err(ServiceError::InvalidOperation(
            "materialization requires a recurring parent; this job has no recurrence rule or is itself an instance"
                .to_owned(),
        ));
    }

    if let Some(existing) = job::find_instance_by_original_start(conn, parent_id, original_start).await? {
        tracing::debug!(job_id = %existing.id, "occurrence already materialized");
        return Ok(MaterializeOutcome {
            job: existing,
            created: false,
        });
    }

    let new_instance = instance_new_job(&parent, original_start);
    let reminder = paired_reminder(
        new_instance.id,
        parent.calendar_id,
        original_start,
        parent.has_call_reminder,
        parent.call_reminder_weeks_prior,
        tz,
    )?;

    let inserted: Result<Job, ServiceError> = with_transaction(&mut *conn, |conn| {
        async move {
            let job = job::insert(conn, &new_instance).await?;
            if let Some(reminder) = &reminder {
                call_reminder::insert(conn, reminder).await?;
            }
            Ok(job)
        }
        .scope_boxed()
    })
    .await;

    match inserted {
        Ok(job) => {
            tracing::info!(job_id = %job.id, parent_id = %parent_id, "occurrence materialized");
            Ok(MaterializeOutcome { job, created: true })
        }
        Err(ServiceError::DieselError(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            _,
        ))) => {
            // Lost a race against a concurrent materialization of the same
            // occurrence; the existing row wins.
            let existing = job::find_instance_by_original_start(conn, parent_id, original_start)
                .await?
                .ok_or(ServiceError::InvariantViolation(
                    "unique violation without a matching instance",
                ))?;
            Ok(MaterializeOutcome {
                job: existing,
                created: false,
            })
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;
    use hitchpin_core::types::{Frequency, RecurrenceEnd, RecurrenceRule};
    use hitchpin_db::db::pg_types::JsonRule;

    fn parent_job() -> Job {
        let start = Utc.with_ymd_and_hms(2026, 1, 16, 16, 0, 0).single().expect("valid");
        let rule = RecurrenceRule::new(Frequency::Monthly, 1, RecurrenceEnd::Forever)
            .expect("valid rule");
        Job {
            id: Uuid::now_v7(),
            calendar_id: Uuid::now_v7(),
            status: JobStatus::Completed,
            business_name: "Red Barn Feed".to_owned(),
            contact_name: "Dana Ochoa".to_owned(),
            phone: "555-0142".to_owned(),
            address: "4802 County Rd 12".to_owned(),
            trailer_details: "16ft flatbed, dual axle".to_owned(),
            repair_notes: "bearing repack".to_owned(),
            quote: Some(240.0),
            start_dt: start,
            end_dt: start + chrono::TimeDelta::hours(3),
            all_day: false,
            deleted: false,
            recurrence_rule: Some(JsonRule(rule)),
            recurrence_parent_id: None,
            recurrence_original_start: None,
            end_recurrence_date: None,
            has_call_reminder: true,
            call_reminder_weeks_prior: Some(2),
            call_reminder_completed: true,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn instance_copies_descriptive_fields_and_preserves_duration() {
        let parent = parent_job();
        let original_start = Utc.with_ymd_and_hms(2026, 2, 20, 16, 0, 0).single().expect("valid");
        let instance = instance_new_job(&parent, original_start);

        assert_eq!(instance.business_name, parent.business_name);
        assert_eq!(instance.contact_name, parent.contact_name);
        assert_eq!(instance.quote, parent.quote);
        assert_eq!(instance.recurrence_parent_id, Some(parent.id));
        assert_eq!(instance.recurrence_original_start, Some(original_start));
        assert_eq!(instance.start_dt, original_start);
        assert_eq!(instance.end_dt - instance.start_dt, parent.duration());
        assert!(instance.recurrence_rule.is_none());
        assert_eq!(instance.status, JobStatus::Pending);
    }

    #[test]
    fn instance_resets_reminder_completion() {
        let parent = parent_job();
        let original_start = Utc.with_ymd_and_hms(2026, 2, 20, 16, 0, 0).single().expect("valid");
        let instance = instance_new_job(&parent, original_start);

        assert!(instance.has_call_reminder);
        assert_eq!(instance.call_reminder_weeks_prior, Some(2));
        assert!(!instance.call_reminder_completed);
    }

    #[test]
    fn paired_reminder_lands_on_the_expected_sunday() {
        let parent = parent_job();
        // 2026-02-20 10:00 Chicago; week Sunday is 2026-02-15.
        let start = Utc.with_ymd_and_hms(2026, 2, 20, 16, 0, 0).single().expect("valid");
        let reminder = paired_reminder(
            Uuid::now_v7(),
            parent.calendar_id,
            start,
            parent.has_call_reminder,
            parent.call_reminder_weeks_prior,
            Chicago,
        )
        .expect("valid weeks_prior")
        .expect("reminder enabled");

        assert_eq!(
            reminder.reminder_date,
            chrono::NaiveDate::from_ymd_opt(2026, 2, 8).expect("valid date"),
        );
        assert!(!reminder.completed);
    }

    #[test]
    fn paired_reminder_absent_when_disabled() {
        let parent = parent_job();
        let start = parent.start_dt;
        let reminder = paired_reminder(
            Uuid::now_v7(),
            parent.calendar_id,
            start,
            false,
            Some(2),
            Chicago,
        )
        .expect("no validation error");
        assert!(reminder.is_none());
    }
}
