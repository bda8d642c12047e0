//! Job lifecycle operations: create (possibly recurring), scoped update,
//! scoped soft-delete, future-occurrence cancellation, and series preview.
//!
//! Every mutating operation runs in a single transaction so a bounded series
//! and its reminders persist completely or not at all.

use chrono::{NaiveDate, Utc};
use diesel_async::scoped_futures::ScopedFutureExt;
use serde::Deserialize;
use uuid::Uuid;

use hitchpin_core::config::SchedulingConfig;
use hitchpin_core::types::{MAX_RECURRENCE_COUNT, RecurrenceRule, SeriesScope};
use hitchpin_db::db::connection::DbConnection;
use hitchpin_db::db::enums::JobStatus;
use hitchpin_db::db::pg_types::JsonRule;
use hitchpin_db::db::query::{calendar, call_reminder, job};
use hitchpin_db::db::transaction::with_transaction;
use hitchpin_db::model::job::{Job, JobPatch, NewJob};

use crate::error::{ServiceError, ServiceResult};
use crate::job::materialize::{instance_new_job, paired_reminder};
use crate::scheduling::datetime::{display_instant, local_midnight_utc, normalize};
use crate::scheduling::recurrence::{SeriesAnchor, generate_bounded, preview_occurrences};
use crate::scheduling::validate::{validate_call_reminder, validate_schedule};

/// Payload for creating a job, possibly with a recurrence rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateJobRequest {
    pub calendar_id: Uuid,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub trailer_details: String,
    #[serde(default)]
    pub repair_notes: String,
    pub quote: Option<f64>,
    pub status: Option<JobStatus>,
    pub start: String,
    pub end: Option<String>,
    #[serde(default)]
    pub all_day: bool,
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub has_call_reminder: bool,
    pub call_reminder_weeks_prior: Option<i32>,
}

/// Payload for updating a job; absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub calendar_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub business_name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub trailer_details: Option<String>,
    pub repair_notes: Option<String>,
    pub quote: Option<f64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub all_day: Option<bool>,
    pub has_call_reminder: Option<bool>,
    pub call_reminder_weeks_prior: Option<i32>,
    pub call_reminder_completed: Option<bool>,
    pub update_scope: Option<SeriesScope>,
}

#[derive(Debug, Clone)]
pub struct CreateJobOutcome {
    pub job: Job,
    pub recurrence_created: bool,
    pub instances_created: usize,
}

#[derive(Debug, Clone)]
pub struct UpdateJobOutcome {
    pub job: Job,
    pub instances_updated: usize,
    pub scope: SeriesScope,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteJobOutcome {
    pub deleted_count: usize,
    pub scope: SeriesScope,
}

#[derive(Debug, Clone, Copy)]
pub struct CancelOutcome {
    pub canceled_count: usize,
    pub end_recurrence_date: NaiveDate,
    pub parent_updated: bool,
}

/// A virtual occurrence rendered for the preview endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OccurrencePreview {
    pub start: String,
    pub end: String,
}

/// ## Summary
/// Creates a job. A bounded (count/until) recurrence rule eagerly persists
/// every occurrence as an instance row, each with its paired call reminder;
/// a forever rule persists only the parent.
///
/// ## Errors
/// Returns `ValidationError` for schedule/reminder/rule violations or an
/// unknown calendar, and database errors otherwise.
#[expect(clippy::too_many_lines)]
pub async fn create_job(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    request: CreateJobRequest,
) -> ServiceResult<CreateJobOutcome> {
    let tz = config.timezone()?;

    let schedule = normalize(&request.start, request.end.as_deref(), request.all_day, tz)?;
    validate_schedule(schedule.start_utc, schedule.end_utc, schedule.all_day, tz, config)?;
    validate_call_reminder(request.has_call_reminder, request.call_reminder_weeks_prior)?;

    if calendar::find_by_id(conn, request.calendar_id).await?.is_none() {
        return Err(ServiceError::ValidationError(format!(
            "calendar {} does not exist",
            request.calendar_id
        )));
    }

    let anchor = SeriesAnchor {
        start_utc: schedule.start_utc,
        end_utc: schedule.end_utc,
        truncation: None,
    };
    let eager_cap = usize::try_from(MAX_RECURRENCE_COUNT).unwrap_or(usize::MAX);
    let bounded_occurrences = match &request.recurrence {
        Some(rule) if !rule.is_forever() => generate_bounded(&anchor, *rule, tz, eager_cap)?,
        _ => Vec::new(),
    };
    let recurrence_created = request.recurrence.is_some();

    let new_parent = NewJob {
        id: Uuid::now_v7(),
        calendar_id: request.calendar_id,
        status: request.status.unwrap_or(JobStatus::Pending),
        business_name: request.business_name,
        contact_name: request.contact_name,
        phone: request.phone,
        address: request.address,
        trailer_details: request.trailer_details,
        repair_notes: request.repair_notes,
        quote: request.quote,
        start_dt: schedule.start_utc,
        end_dt: schedule.end_utc,
        all_day: schedule.all_day,
        recurrence_rule: request.recurrence.map(JsonRule),
        recurrence_parent_id: None,
        recurrence_original_start: None,
        end_recurrence_date: None,
        has_call_reminder: request.has_call_reminder,
        call_reminder_weeks_prior: request.call_reminder_weeks_prior,
        call_reminder_completed: false,
    };

    let outcome: CreateJobOutcome = with_transaction(conn, |conn| {
        async move {
            let parent = job::insert(conn, &new_parent).await?;

            let mut reminders = Vec::new();
            if let Some(reminder) = paired_reminder(
                parent.id,
                parent.calendar_id,
                parent.start_dt,
                parent.has_call_reminder,
                parent.call_reminder_weeks_prior,
                tz,
            )? {
                reminders.push(reminder);
            }

            let instance_rows: Vec<NewJob> = bounded_occurrences
                .iter()
                .map(|occurrence| instance_new_job(&parent, occurrence.start_utc))
                .collect();
            let instances = job::insert_batch(conn, &instance_rows).await?;
            for instance in &instances {
                if let Some(reminder) = paired_reminder(
                    instance.id,
                    instance.calendar_id,
                    instance.start_dt,
                    instance.has_call_reminder,
                    instance.call_reminder_weeks_prior,
                    tz,
                )? {
                    reminders.push(reminder);
                }
            }
            call_reminder::insert_batch(conn, &reminders).await?;

            tracing::info!(
                job_id = %parent.id,
                instances = instances.len(),
                recurrence_created,
                "job created"
            );
            Ok::<_, ServiceError>(CreateJobOutcome {
                job: parent,
                recurrence_created,
                instances_created: instances.len(),
            })
        }
        .scope_boxed()
    })
    .await?;

    Ok(outcome)
}

/// ## Summary
/// Updates a job, propagating descriptive fields to series siblings per the
/// requested scope. Start/end changes always stay on the targeted job.
///
/// ## Errors
/// Returns `NotFound` for unknown/deleted jobs, `ValidationError` for
/// schedule violations, and database errors otherwise.
#[expect(clippy::too_many_lines)]
pub async fn update_job(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    id: Uuid,
    request: UpdateJobRequest,
) -> ServiceResult<UpdateJobOutcome> {
    let tz = config.timezone()?;

    let existing = job::find_by_id(conn, id)
        .await?
        .filter(|found| !found.deleted)
        .ok_or_else(|| ServiceError::NotFound(format!("job {id} not found")))?;

    let scope = request.update_scope.unwrap_or(SeriesScope::ThisOnly);

    let mut patch = JobPatch {
        calendar_id: request.calendar_id,
        status: request.status,
        business_name: request.business_name,
        contact_name: request.contact_name,
        phone: request.phone,
        address: request.address,
        trailer_details: request.trailer_details,
        repair_notes: request.repair_notes,
        quote: request.quote.map(Some),
        has_call_reminder: request.has_call_reminder,
        call_reminder_weeks_prior: request.call_reminder_weeks_prior.map(Some),
        call_reminder_completed: request.call_reminder_completed,
        updated_at: Some(Utc::now()),
        ..JobPatch::default()
    };

    if let Some(calendar_id) = request.calendar_id {
        if calendar::find_by_id(conn, calendar_id).await?.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "calendar {calendar_id} does not exist"
            )));
        }
    }

    if request.start.is_some() || request.end.is_some() || request.all_day.is_some() {
        let all_day = request.all_day.unwrap_or(existing.all_day);
        let start_raw = request.start.as_deref().ok_or_else(|| {
            ServiceError::ValidationError(
                "start is required when changing a job's schedule".to_owned(),
            )
        })?;
        let schedule = normalize(start_raw, request.end.as_deref(), all_day, tz)?;
        validate_schedule(schedule.start_utc, schedule.end_utc, schedule.all_day, tz, config)?;
        patch.start_dt = Some(schedule.start_utc);
        patch.end_dt = Some(schedule.end_utc);
        patch.all_day = Some(schedule.all_day);
    }

    let effective_has_reminder = request
        .has_call_reminder
        .unwrap_or(existing.has_call_reminder);
    let effective_weeks = request
        .call_reminder_weeks_prior
        .or(existing.call_reminder_weeks_prior);
    validate_call_reminder(effective_has_reminder, effective_weeks)?;

    let outcome: UpdateJobOutcome = with_transaction(conn, |conn| {
        async move {
            let updated = job::apply_patch(conn, id, &patch).await?;

            let sibling_patch = patch.for_siblings();
            let in_series = updated.is_recurrence_parent() || updated.is_recurrence_instance();
            let instances_updated = if !in_series || sibling_patch.is_empty() {
                0
            } else {
                match scope {
                    SeriesScope::ThisOnly => 0,
                    SeriesScope::All => {
                        let parent_id = updated.recurrence_parent_id.unwrap_or(updated.id);
                        let mut count =
                            job::patch_instances(conn, parent_id, updated.id, &sibling_patch)
                                .await?;
                        if parent_id != updated.id {
                            job::apply_patch(conn, parent_id, &sibling_patch).await?;
                            count += 1;
                        }
                        count
                    }
                    SeriesScope::ThisAndFuture => {
                        if let Some(parent_id) = updated.recurrence_parent_id {
                            let cutoff = updated
                                .recurrence_original_start
                                .unwrap_or(updated.start_dt);
                            job::patch_instances_from(
                                conn,
                                parent_id,
                                updated.id,
                                cutoff,
                                &sibling_patch,
                            )
                            .await?
                        } else {
                            // On the parent, "this and future" covers the
                            // whole series.
                            job::patch_instances(conn, updated.id, updated.id, &sibling_patch)
                                .await?
                        }
                    }
                }
            };

            tracing::info!(job_id = %updated.id, instances_updated, scope = %scope, "job updated");
            Ok::<_, ServiceError>(UpdateJobOutcome {
                job: updated,
                instances_updated,
                scope,
            })
        }
        .scope_boxed()
    })
    .await?;

    Ok(outcome)
}

/// ## Summary
/// Soft-deletes a job with series scope. Linked call reminders are removed
/// in the same transaction.
///
/// `this_only` on a parent with live instances is rejected so a series is
/// never orphaned; `this_and_future` on an instance also truncates the
/// parent's recurrence generation.
///
/// ## Errors
/// Returns `NotFound` for unknown/deleted jobs, `InvalidOperation` for the
/// orphaning case, and database errors otherwise.
#[expect(clippy::too_many_lines)]
pub async fn delete_job(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    id: Uuid,
    scope: SeriesScope,
) -> ServiceResult<DeleteJobOutcome> {
    let tz = config.timezone()?;

    let target = job::find_by_id(conn, id)
        .await?
        .filter(|found| !found.deleted)
        .ok_or_else(|| ServiceError::NotFound(format!("job {id} not found")))?;

    let deleted_count: usize = with_transaction(conn, |conn| {
        async move {
            let count = match scope {
                SeriesScope::ThisOnly => {
                    if target.is_recurrence_parent() {
                        let live = job::live_instance_count(conn, target.id).await?;
                        if live > 0 {
                            return Err(ServiceError::InvalidOperation(format!(
                                "cannot delete only this job: the series still has {live} instances; delete the whole series or cancel future occurrences instead"
                            )));
                        }
                    }
                    let ids = [target.id];
                    call_reminder::delete_for_jobs(conn, &ids).await?;
                    job::soft_delete(conn, &ids).await?
                }
                SeriesScope::ThisAndFuture if target.is_recurrence_instance() => {
                    let parent_id = target
                        .recurrence_parent_id
                        .ok_or(ServiceError::InvariantViolation("instance without parent id"))?;
                    let mut ids =
                        job::live_instance_ids_from(conn, parent_id, target.start_dt).await?;
                    if !ids.contains(&target.id) {
                        ids.push(target.id);
                    }
                    call_reminder::delete_for_jobs(conn, &ids).await?;
                    let count = job::soft_delete(conn, &ids).await?;

                    let boundary = target
                        .recurrence_original_start
                        .unwrap_or(target.start_dt)
                        .with_timezone(&tz)
                        .date_naive();
                    job::set_end_recurrence_date(conn, parent_id, boundary).await?;
                    count
                }
                // "This and future" on a parent removes the whole series.
                SeriesScope::ThisAndFuture | SeriesScope::All => {
                    let parent_id = target.recurrence_parent_id.unwrap_or(target.id);
                    let mut ids = job::live_instance_ids(conn, parent_id).await?;
                    ids.push(parent_id);
                    call_reminder::delete_for_jobs(conn, &ids).await?;
                    job::soft_delete(conn, &ids).await?
                }
            };

            tracing::info!(job_id = %target.id, deleted = count, scope = %scope, "job deleted");
            Ok(count)
        }
        .scope_boxed()
    })
    .await?;

    Ok(DeleteJobOutcome {
        deleted_count,
        scope,
    })
}

/// ## Summary
/// Cancels the future occurrences of a recurring series: soft-deletes
/// instances starting at/after `from_date` and truncates generation at that
/// date.
///
/// ## Errors
/// Returns `NotFound` for unknown/deleted jobs, `InvalidOperation` when the
/// target is not a recurring parent, and database errors otherwise.
pub async fn cancel_future_recurrences(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    parent_id: Uuid,
    from_date: NaiveDate,
) -> ServiceResult<CancelOutcome> {
    let tz = config.timezone()?;

    let parent = job::find_by_id(conn, parent_id)
        .await?
        .filter(|found| !found.deleted)
        .ok_or_else(|| ServiceError::NotFound(format!("job {parent_id} not found")))?;

    if !parent.is_recurrence_parent() {
        return Err(ServiceError::InvalidOperation(
            "only a recurring parent can have future occurrences canceled".to_owned(),
        ));
    }

    let from_utc = local_midnight_utc(from_date, tz)?;
    let parent_updated = parent.end_recurrence_date != Some(from_date);

    let canceled_count: usize = with_transaction(conn, |conn| {
        async move {
            let ids = job::live_instance_ids_from(conn, parent_id, from_utc).await?;
            call_reminder::delete_for_jobs(conn, &ids).await?;
            let count = job::soft_delete(conn, &ids).await?;
            if parent_updated {
                job::set_end_recurrence_date(conn, parent_id, from_date).await?;
            }

            tracing::info!(
                job_id = %parent_id,
                canceled = count,
                end_recurrence_date = %from_date,
                "future recurrences canceled"
            );
            Ok::<_, ServiceError>(count)
        }
        .scope_boxed()
    })
    .await?;

    Ok(CancelOutcome {
        canceled_count,
        end_recurrence_date: from_date,
        parent_updated,
    })
}

/// ## Summary
/// Previews the next `count` virtual occurrences of a forever series without
/// materializing anything. `count` is capped by configuration.
///
/// ## Errors
/// Returns `NotFound` for unknown/deleted jobs and `InvalidOperation` when
/// the job is not the parent of a forever series (bounded series persist
/// their occurrences at creation).
pub async fn preview_series(
    conn: &mut DbConnection<'_>,
    config: &SchedulingConfig,
    parent_id: Uuid,
    count: usize,
) -> ServiceResult<Vec<OccurrencePreview>> {
    let tz = config.timezone()?;

    let parent = job::find_by_id(conn, parent_id)
        .await?
        .filter(|found| !found.deleted)
        .ok_or_else(|| ServiceError::NotFound(format!("job {parent_id} not found")))?;

    let rule = parent
        .rule()
        .filter(|_| parent.is_recurrence_parent())
        .ok_or_else(|| {
            ServiceError::InvalidOperation("this job is not a recurring parent".to_owned())
        })?;
    if !rule.is_forever() {
        return Err(ServiceError::InvalidOperation(
            "bounded series persist their occurrences at creation; preview applies to forever series"
                .to_owned(),
        ));
    }

    let anchor = SeriesAnchor {
        start_utc: parent.start_dt,
        end_utc: parent.end_dt,
        truncation: parent.end_recurrence_date,
    };
    let capped = count.min(config.preview_occurrence_cap);

    Ok(preview_occurrences(&anchor, rule, tz, capped)
        .into_iter()
        .map(|occurrence| OccurrencePreview {
            start: display_instant(occurrence.start_utc, parent.all_day, tz),
            end: display_instant(occurrence.end_utc, parent.all_day, tz),
        })
        .collect())
}
