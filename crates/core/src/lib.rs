pub mod config;
pub mod domain;
pub mod ingest;
pub mod report;
pub mod schedule;
