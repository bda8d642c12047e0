//! Models for the call reminder table.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::schema::call_reminder;

/// A standalone or job-linked call reminder placed on a Sunday.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = call_reminder)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(belongs_to(super::calendar::Calendar, foreign_key = calendar_id))]
#[diesel(belongs_to(super::job::Job, foreign_key = job_id))]
pub struct CallReminder {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub job_id: Option<Uuid>,
    pub reminder_date: NaiveDate,
    pub notes: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert struct for creating new call reminders
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = call_reminder)]
pub struct NewCallReminder {
    pub id: Uuid,
    pub calendar_id: Uuid,
    pub job_id: Option<Uuid>,
    pub reminder_date: NaiveDate,
    pub notes: String,
    pub completed: bool,
}
