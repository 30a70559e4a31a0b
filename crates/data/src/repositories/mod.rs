//! Database repositories for the economics tables.
//!
//! Each repository replaces rows by primary key: a row with a missing key
//! column is skipped, every other row is deleted by key and re-inserted
//! inside one transaction.

pub mod calendar_repo;
pub mod indicator_repo;
pub mod market_repo;

pub use calendar_repo::CalendarRepository;
pub use indicator_repo::IndicatorRepository;
pub use market_repo::MarketRepository;

use sqlx::SqlitePool;

/// Row counts reported by an upsert batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: u64,
    pub deleted: u64,
    pub skipped: u64,
}

/// Creates all repositories from a single database pool.
pub struct Repositories {
    pub calendars: CalendarRepository,
    pub markets: MarketRepository,
    pub indicators: IndicatorRepository,
}

impl Repositories {
    /// Creates a new set of repositories from a database pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            calendars: CalendarRepository::new(pool.clone()),
            markets: MarketRepository::new(pool.clone()),
            indicators: IndicatorRepository::new(pool),
        }
    }
}
