//! Pure assembly of the calendar feed from fetched rows.
//!
//! Three event categories merge into one collection: job segments (multi-day
//! jobs split into per-day segments), job-linked call reminders derived from
//! the job rows, and standalone call reminder rows. Assembly is a pure
//! function over already-fetched data so the same contract could be pushed
//! into a single SQL query if the feed ever needs it.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use hitchpin_db::db::enums::JobStatus;
use hitchpin_db::model::calendar::Calendar;
use hitchpin_db::model::call_reminder::CallReminder;
use hitchpin_db::model::job::Job;

use crate::scheduling::color::{COMPLETED_LIGHTEN_FACTOR, lighten_hex};
use crate::scheduling::reminder::reminder_sunday;

/// Glyph prefixed to call-reminder titles so they stand out on the calendar.
pub const REMINDER_GLYPH: &str = "\u{1f4de}";

/// Longest notes preview shown on a standalone reminder event.
pub const NOTES_PREVIEW_CHARS: usize = 50;

/// Window and limits for one feed assembly.
#[derive(Debug, Clone, Copy)]
pub struct FeedContext {
    pub tz: Tz,
    /// First local date of the window, inclusive.
    pub window_start: NaiveDate,
    /// Last local date of the window, inclusive.
    pub window_end: NaiveDate,
    /// Most per-day segments one job may expand into.
    pub max_expand_days: usize,
}

/// Category of a feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedEventKind {
    Job,
    JobCallReminder,
    CallReminder,
}

/// One renderable calendar event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEvent {
    pub id: String,
    pub event_type: FeedEventKind,
    pub title: String,
    /// Display start: `YYYY-MM-DD` or local ISO datetime without offset.
    pub start: String,
    /// Display end, exclusive next-day date for all-day events.
    pub end: String,
    pub all_day: bool,
    pub color: String,
    pub calendar_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    pub is_multi_day: bool,
    /// 0-indexed day offset from the job's first day, multi-day jobs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_number: Option<i64>,
    /// 0-indexed index of the job's last day, multi-day jobs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_preview: Option<String>,
}

/// ## Summary
/// Merges job segments, job-linked reminders, and standalone reminders into
/// the feed collection. Ordering within each category follows the input
/// (persisted id) order.
#[must_use]
pub fn assemble_feed(
    jobs: &[Job],
    standalone: &[(CallReminder, Calendar)],
    calendars: &HashMap<Uuid, Calendar>,
    ctx: &FeedContext,
) -> Vec<FeedEvent> {
    let mut events = Vec::new();

    for job in jobs {
        let Some(calendar) = calendars.get(&job.calendar_id) else {
            tracing::warn!(job_id = %job.id, calendar_id = %job.calendar_id, "job references a missing calendar");
            continue;
        };
        events.extend(job_segments(job, calendar, ctx));
    }

    for job in jobs {
        let Some(calendar) = calendars.get(&job.calendar_id) else {
            continue;
        };
        if let Some(event) = job_reminder_event(job, calendar, ctx) {
            events.push(event);
        }
    }

    for (reminder, calendar) in standalone {
        events.push(standalone_reminder_event(reminder, calendar));
    }

    events
}

/// ## Summary
/// Derives a job's display title: `"{business} ({contact}) - {phone}"` with
/// graceful omission of any empty part.
#[must_use]
pub fn derive_title(business_name: &str, contact_name: &str, phone: &str) -> String {
    let name = match (business_name.is_empty(), contact_name.is_empty()) {
        (false, false) => format!("{business_name} ({contact_name})"),
        (false, true) => business_name.to_owned(),
        (true, false) => contact_name.to_owned(),
        (true, true) => "No Name Provided".to_owned(),
    };
    if phone.is_empty() {
        name
    } else {
        format!("{name} - {phone}")
    }
}

/// ## Summary
/// Picks the render color for a job: completed jobs lighten the calendar
/// color 30% toward white, every other status uses the raw color.
#[must_use]
pub fn job_color(status: JobStatus, base_color: &str) -> String {
    if status == JobStatus::Completed {
        match lighten_hex(base_color, COMPLETED_LIGHTEN_FACTOR) {
            Ok(lightened) => lightened,
            Err(_err) => {
                tracing::warn!(color = base_color, "unparseable calendar color");
                base_color.to_owned()
            }
        }
    } else {
        base_color.to_owned()
    }
}

/// ## Summary
/// Truncates reminder notes to a preview of at most
/// [`NOTES_PREVIEW_CHARS`] characters, with an ellipsis when cut.
#[must_use]
pub fn notes_preview(notes: &str) -> String {
    if notes.chars().count() <= NOTES_PREVIEW_CHARS {
        notes.to_owned()
    } else {
        let cut: String = notes.chars().take(NOTES_PREVIEW_CHARS).collect();
        format!("{cut}...")
    }
}

/// ## Summary
/// Expands one job into its per-day display segments.
///
/// Single-day jobs yield one plain event. A job spanning multiple local
/// days yields one segment per day intersecting the window, capped at
/// `max_expand_days`: the first day keeps the real start time, the last day
/// keeps the real end time, and interior days run local
/// midnight-to-midnight. Day numbering is relative to the job's own first
/// day, so a window that clips the front of the job does not reset the
/// "Day X of Y" labels.
#[must_use]
pub fn job_segments(job: &Job, calendar: &Calendar, ctx: &FeedContext) -> Vec<FeedEvent> {
    let start_local = job.start_dt.with_timezone(&ctx.tz);
    let end_local = job.end_dt.with_timezone(&ctx.tz);
    let first_date = start_local.date_naive();
    let last_date = last_visible_date(job, end_local.date_naive(), end_local.time());

    let title = derive_title(&job.business_name, &job.contact_name, &job.phone);
    let color = job_color(job.status, &calendar.color);

    let total_days = (last_date - first_date).num_days().max(0);
    if total_days == 0 {
        return vec![base_job_event(job, &title, &color, single_day_times(job, ctx))];
    }

    let mut segments = Vec::new();
    let mut date = first_date.max(ctx.window_start);
    let stop = last_date.min(ctx.window_end);
    while date <= stop && segments.len() < ctx.max_expand_days {
        let day_number = (date - first_date).num_days();
        let (start, end, all_day) = if job.all_day {
            (
                date.format("%Y-%m-%d").to_string(),
                next_day(date).format("%Y-%m-%d").to_string(),
                true,
            )
        } else {
            let seg_start = if date == first_date {
                start_local.format("%Y-%m-%dT%H:%M:%S").to_string()
            } else {
                format!("{}T00:00:00", date.format("%Y-%m-%d"))
            };
            let seg_end = if date == last_date {
                end_local.format("%Y-%m-%dT%H:%M:%S").to_string()
            } else {
                format!("{}T00:00:00", next_day(date).format("%Y-%m-%d"))
            };
            (seg_start, seg_end, false)
        };

        segments.push(FeedEvent {
            id: format!("job-{}-day-{day_number}", job.id),
            event_type: FeedEventKind::Job,
            title: title.clone(),
            start,
            end,
            all_day,
            color: color.clone(),
            calendar_id: job.calendar_id,
            job_id: Some(job.id),
            reminder_id: None,
            status: Some(job.status),
            is_multi_day: true,
            day_number: Some(day_number),
            total_days: Some(total_days),
            notes_preview: None,
        });

        date = next_day(date);
    }
    segments
}

fn single_day_times(job: &Job, ctx: &FeedContext) -> (String, String) {
    if job.all_day {
        let start = job.start_dt.with_timezone(&ctx.tz).date_naive();
        let end = job.end_dt.with_timezone(&ctx.tz).date_naive();
        (
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        )
    } else {
        (
            job.start_dt
                .with_timezone(&ctx.tz)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            job.end_dt
                .with_timezone(&ctx.tz)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
        )
    }
}

fn base_job_event(job: &Job, title: &str, color: &str, times: (String, String)) -> FeedEvent {
    FeedEvent {
        id: format!("job-{}", job.id),
        event_type: FeedEventKind::Job,
        title: title.to_owned(),
        start: times.0,
        end: times.1,
        all_day: job.all_day,
        color: color.to_owned(),
        calendar_id: job.calendar_id,
        job_id: Some(job.id),
        reminder_id: None,
        status: Some(job.status),
        is_multi_day: false,
        day_number: None,
        total_days: None,
        notes_preview: None,
    }
}

/// Last local date a job visibly occupies.
///
/// All-day ends are stored exclusive, so the displayed end date steps back
/// one day; a timed job ending exactly at local midnight belongs to the
/// previous day.
fn last_visible_date(job: &Job, end_date: NaiveDate, end_time: NaiveTime) -> NaiveDate {
    if job.all_day || end_time == NaiveTime::MIN {
        end_date.pred_opt().unwrap_or(end_date)
    } else {
        end_date
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

/// ## Summary
/// Derives the reminder event for a job with an enabled, incomplete call
/// reminder whose computed Sunday falls inside the window.
#[must_use]
pub fn job_reminder_event(job: &Job, calendar: &Calendar, ctx: &FeedContext) -> Option<FeedEvent> {
    if !job.has_call_reminder || job.call_reminder_completed {
        return None;
    }
    let weeks_prior = job.call_reminder_weeks_prior?;

    let start_local = job.start_dt.with_timezone(&ctx.tz).date_naive();
    let sunday = reminder_sunday(start_local, weeks_prior).ok()?;
    if sunday < ctx.window_start || sunday > ctx.window_end {
        return None;
    }

    let title = derive_title(&job.business_name, &job.contact_name, &job.phone);
    Some(FeedEvent {
        id: format!("job-reminder-{}", job.id),
        event_type: FeedEventKind::JobCallReminder,
        title: format!("{REMINDER_GLYPH} {title}"),
        start: sunday.format("%Y-%m-%d").to_string(),
        end: next_day(sunday).format("%Y-%m-%d").to_string(),
        all_day: true,
        color: calendar.call_reminder_color.clone(),
        calendar_id: job.calendar_id,
        job_id: Some(job.id),
        reminder_id: None,
        status: Some(job.status),
        is_multi_day: false,
        day_number: None,
        total_days: None,
        notes_preview: None,
    })
}

/// ## Summary
/// Renders a standalone reminder row as a feed event with a truncated notes
/// preview.
#[must_use]
pub fn standalone_reminder_event(reminder: &CallReminder, calendar: &Calendar) -> FeedEvent {
    let preview = notes_preview(&reminder.notes);
    let title = if preview.is_empty() {
        format!("{REMINDER_GLYPH} Call reminder")
    } else {
        format!("{REMINDER_GLYPH} {preview}")
    };
    FeedEvent {
        id: format!("reminder-{}", reminder.id),
        event_type: FeedEventKind::CallReminder,
        title,
        start: reminder.reminder_date.format("%Y-%m-%d").to_string(),
        end: next_day(reminder.reminder_date).format("%Y-%m-%d").to_string(),
        all_day: true,
        color: calendar.call_reminder_color.clone(),
        calendar_id: reminder.calendar_id,
        job_id: None,
        reminder_id: Some(reminder.id),
        status: None,
        is_multi_day: false,
        day_number: None,
        total_days: None,
        notes_preview: Some(preview),
    }
}
