pub mod calendar;
pub mod call_reminder;
pub mod job;
