pub mod calendar;
pub mod call_reminder;
pub mod job;
pub mod text_search;
