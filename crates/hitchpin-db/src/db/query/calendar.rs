//! Query composition for the `calendar` table.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::connection::DbConnection;
use crate::db::schema::calendar;
use crate::model::calendar::Calendar;

/// ## Summary
/// Loads a calendar by id.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn find_by_id(conn: &mut DbConnection<'_>, id: Uuid) -> QueryResult<Option<Calendar>> {
    calendar::table
        .find(id)
        .select(Calendar::as_select())
        .first(conn)
        .await
        .optional()
}

/// ## Summary
/// Loads every calendar, ordered by name. The feed colors jobs on inactive
/// calendars too, so no active filter here.
///
/// ## Errors
/// Returns an error if the database operation fails.
pub async fn list_all(conn: &mut DbConnection<'_>) -> QueryResult<Vec<Calendar>> {
    calendar::table
        .order(calendar::name.asc())
        .select(Calendar::as_select())
        .load(conn)
        .await
}
