//! Data storage for the batch jobs.
//!
//! This crate provides:
//! - `SQLite` client and schema for the economics database
//! - Row models for calendars, markets and indicators
//! - Repositories with replace-by-key upserts
//! - CSV storage for price history and reports

pub mod csv_storage;
pub mod database;
pub mod models;
pub mod repositories;

pub use csv_storage::{parse_timestamp, CsvStorage};
pub use database::{DatabaseClient, ReorgCount, TABLES};

pub use models::{CalendarRecord, IndicatorRecord, MarketRecord, SentimentRecord};

pub use repositories::{
    CalendarRepository, IndicatorRepository, MarketRepository, Repositories, UpsertStats,
};
