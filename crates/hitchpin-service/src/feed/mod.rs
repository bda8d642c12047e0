pub mod build;
pub mod service;

pub use build::{FeedContext, FeedEvent, FeedEventKind};
