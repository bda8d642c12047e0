pub mod color;
pub mod datetime;
pub mod recurrence;
pub mod reminder;
pub mod validate;
