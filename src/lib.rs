pub mod calendar;
pub mod cli;
pub mod client;
pub mod config;
pub mod graph;
pub mod import;
pub mod period;
pub mod query;
pub mod summary;
pub mod types;
pub mod validate;
