//! Models for the calendar grouping/coloring table.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::calendar;

/// Grouping and coloring entity jobs and call reminders belong to.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = calendar)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Calendar {
    pub id: Uuid,
    pub name: String,
    /// Hex color for job events, e.g. `#3788d8`.
    pub color: String,
    /// Hex color for call reminder events.
    pub call_reminder_color: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
