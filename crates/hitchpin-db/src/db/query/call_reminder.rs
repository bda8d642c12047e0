//! Query composition for the `call_reminder` table.

use chrono::NaiveDate;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::{calendar, call_reminder};
use crate::model::calendar::Calendar;
use crate::model::call_reminder::{CallReminder, NewCallReminder};

/// ## Summary
/// Inserts a call reminder.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert(conn: &mut DbConnection<'_>, reminder: &NewCallReminder) -> QueryResult<()> {
    diesel::insert_into(call_reminder::table)
        .values(reminder)
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Inserts multiple call reminders in a batch.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn insert_batch(
    conn: &mut DbConnection<'_>,
    reminders: &[NewCallReminder],
) -> QueryResult<()> {
    if reminders.is_empty() {
        return Ok(());
    }

    diesel::insert_into(call_reminder::table)
        .values(reminders)
        .execute(conn)
        .await?;
    Ok(())
}

/// ## Summary
/// Loads incomplete standalone reminders (no linked job) falling inside a
/// date window, paired with their active calendars, ordered by id.
///
/// Job-linked reminders are intentionally excluded: the feed derives those
/// from the job rows themselves.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn standalone_in_window(
    conn: &mut DbConnection<'_>,
    from: NaiveDate,
    to: NaiveDate,
    calendar_ids: Option<&[Uuid]>,
) -> QueryResult<Vec<(CallReminder, Calendar)>> {
    let mut query = call_reminder::table
        .inner_join(calendar::table)
        .filter(calendar::active.eq(true))
        .filter(call_reminder::job_id.is_null())
        .filter(call_reminder::completed.eq(false))
        .filter(call_reminder::reminder_date.ge(from))
        .filter(call_reminder::reminder_date.le(to))
        .select((CallReminder::as_select(), Calendar::as_select()))
        .into_boxed();

    if let Some(ids) = calendar_ids {
        query = query.filter(call_reminder::calendar_id.eq_any(ids.to_vec()));
    }

    query.order(call_reminder::id.asc()).load(conn).await
}

/// ## Summary
/// Deletes the reminders linked to the given jobs. Returns the rows removed.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn delete_for_jobs(conn: &mut DbConnection<'_>, job_ids: &[Uuid]) -> QueryResult<usize> {
    if job_ids.is_empty() {
        return Ok(0);
    }

    diesel::delete(call_reminder::table.filter(call_reminder::job_id.eq_any(job_ids.to_vec())))
        .execute(conn)
        .await
}
