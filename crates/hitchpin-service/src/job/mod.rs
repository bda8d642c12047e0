pub mod materialize;
pub mod service;
