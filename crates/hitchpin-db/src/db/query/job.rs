//! Query composition for the `job` table.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::enums::JobStatus;
use crate::db::query::text_search::contains_pattern;
use crate::db::schema::job;
use crate::model::job::{Job, JobPatch, NewJob};

/// Window and filter parameters for the feed's base job query.
#[derive(Debug, Clone)]
pub struct WindowFilter {
    /// Inclusive lower bound: jobs ending before this instant are excluded.
    pub lower: DateTime<Utc>,
    /// Exclusive upper bound: jobs starting at/after this instant are excluded.
    pub upper: DateTime<Utc>,
    pub calendar_ids: Option<Vec<Uuid>>,
    pub status: Option<JobStatus>,
    pub search: Option<String>,
}

/// ## Summary
/// Loads a job by id, including soft-deleted rows.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn find_by_id(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<Job>> {
    job::table
        .find(id)
        .select(Job::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Inserts a job and returns the created row.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert(conn: &mut DbConnection<'_>, new_job: &NewJob) -> QueryResult<Job> {
    diesel::insert_into(job::table)
        .values(new_job)
        .returning(Job::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Inserts multiple jobs in a batch and returns the created rows.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert_batch(conn: &mut DbConnection<'_>, new_jobs: &[NewJob]) -> QueryResult<Vec<Job>> {
    if new_jobs.is_empty() {
        return Ok(Vec::new());
    }

    diesel::insert_into(job::table)
        .values(new_jobs)
        .returning(Job::as_returning())
        .get_results(conn)
        .await
}

/// ## Summary
/// Loads non-deleted jobs overlapping a window, with optional calendar,
/// status, and substring-search filters.
///
/// Overlap is the half-open test `start_dt < upper AND end_dt >= lower`;
/// ordering by id keeps the feed stable across reads.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn in_window(conn: &mut DbConnection<'_>, filter: &WindowFilter) -> QueryResult<Vec<Job>> {
    let mut query = job::table
        .filter(job::deleted.eq(false))
        .filter(job::start_dt.lt(filter.upper))
        .filter(job::end_dt.ge(filter.lower))
        .select(Job::as_select())
        .into_boxed();

    if let Some(calendar_ids) = &filter.calendar_ids {
        query = query.filter(job::calendar_id.eq_any(calendar_ids.clone()));
    }
    if let Some(status) = filter.status {
        query = query.filter(job::status.eq(status));
    }
    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        query = query.filter(
            job::business_name
                .ilike(pattern.clone())
                .or(job::contact_name.ilike(pattern.clone()))
                .or(job::phone.ilike(pattern.clone()))
                .or(job::trailer_details.ilike(pattern.clone()))
                .or(job::repair_notes.ilike(pattern)),
        );
    }

    query.order(job::id.asc()).load(conn).await
}

/// ## Summary
/// Loads the non-deleted instances of a recurring parent, ordered by their
/// original virtual start.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn live_instances(conn: &mut DbConnection<'_>, parent_id: Uuid) -> QueryResult<Vec<Job>> {
    job::table
        .filter(job::recurrence_parent_id.eq(parent_id))
        .filter(job::deleted.eq(false))
        .order(job::recurrence_original_start.asc())
        .select(Job::as_select())
        .load(conn)
        .await
}

/// ## Summary
/// Counts the non-deleted instances of a recurring parent.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn live_instance_count(conn: &mut DbConnection<'_>, parent_id: Uuid) -> QueryResult<i64> {
    job::table
        .filter(job::recurrence_parent_id.eq(parent_id))
        .filter(job::deleted.eq(false))
        .count()
        .get_result(conn)
        .await
}

/// ## Summary
/// Collects ids of non-deleted instances of a parent starting at/after the
/// given instant.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn live_instance_ids_from(
    conn: &mut DbConnection<'_>,
    parent_id: Uuid,
    from: DateTime<Utc>,
) -> QueryResult<Vec<Uuid>> {
    job::table
        .filter(job::recurrence_parent_id.eq(parent_id))
        .filter(job::deleted.eq(false))
        .filter(job::start_dt.ge(from))
        .order(job::id.asc())
        .select(job::id)
        .load(conn)
        .await
}

/// ## Summary
/// Collects ids of all non-deleted instances of a parent.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn live_instance_ids(
    conn: &mut DbConnection<'_>,
    parent_id: Uuid,
) -> QueryResult<Vec<Uuid>> {
    job::table
        .filter(job::recurrence_parent_id.eq(parent_id))
        .filter(job::deleted.eq(false))
        .order(job::id.asc())
        .select(job::id)
        .load(conn)
        .await
}

/// ## Summary
/// Finds the persisted instance of a parent materializing a given virtual
/// start, if one exists. Soft-deleted instances still count: the
/// `(parent, original_start)` key stays claimed so a deleted occurrence is
/// not silently resurrected by re-materialization.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn find_instance_by_original_start(
    conn: &mut DbConnection<'_>,
    parent_id: Uuid,
    original_start: DateTime<Utc>,
) -> QueryResult<Option<Job>> {
    job::table
        .filter(job::recurrence_parent_id.eq(parent_id))
        .filter(job::recurrence_original_start.eq(original_start))
        .select(Job::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Applies a patch to one job and returns the updated row.
///
/// ## Errors
/// Returns an error if the database operation fails or the patch is empty.
pub async fn apply_patch(
    conn: &mut DbConnection<'_>,
    id: Uuid,
    patch: &JobPatch,
) -> QueryResult<Job> {
    diesel::update(job::table.find(id))
        .set(patch)
        .returning(Job::as_returning())
        .get_result(conn)
        .await
}

/// ## Summary
/// Applies a patch to all non-deleted instances of a parent, excluding one
/// id (the job already patched directly). Returns the number of rows updated.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn patch_instances(
    conn: &mut DbConnection<'_>,
    parent_id: Uuid,
    exclude_id: Uuid,
    patch: &JobPatch,
) -> QueryResult<usize> {
    diesel::update(
        job::table
            .filter(job::recurrence_parent_id.eq(parent_id))
            .filter(job::deleted.eq(false))
            .filter(job::id.ne(exclude_id)),
    )
    .set(patch)
    .execute(conn)
    .await
}

/// ## Summary
/// Applies a patch to non-deleted instances of a parent whose original start
/// is at/after a cutoff, excluding one id. Returns the rows updated.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn patch_instances_from(
    conn: &mut DbConnection<'_>,
    parent_id: Uuid,
    exclude_id: Uuid,
    cutoff: DateTime<Utc>,
    patch: &JobPatch,
) -> QueryResult<usize> {
    diesel::update(
        job::table
            .filter(job::recurrence_parent_id.eq(parent_id))
            .filter(job::deleted.eq(false))
            .filter(job::id.ne(exclude_id))
            .filter(job::recurrence_original_start.ge(cutoff)),
    )
    .set(patch)
    .execute(conn)
    .await
}

/// ## Summary
/// Soft-deletes the given jobs. Returns the number of rows marked.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn soft_delete(conn: &mut DbConnection<'_>, ids: &[Uuid]) -> QueryResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }

    diesel::update(job::table.filter(job::id.eq_any(ids.to_vec())))
        .set((job::deleted.eq(true), job::updated_at.eq(Utc::now())))
        .execute(conn)
        .await
}

/// ## Summary
/// Sets the recurrence truncation date on a parent row.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn set_end_recurrence_date(
    conn: &mut DbConnection<'_>,
    parent_id: Uuid,
    end_date: NaiveDate,
) -> QueryResult<usize> {
    diesel::update(job::table.find(parent_id))
        .set((
            job::end_recurrence_date.eq(end_date),
            job::updated_at.eq(Utc::now()),
        ))
        .execute(conn)
        .await
}
