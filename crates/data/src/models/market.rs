//! Financial market snapshot model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of a country's "Markets" table (`Markets` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketRecord {
    #[sqlx(rename = "Country")]
    pub country: String,
    #[sqlx(rename = "Market")]
    pub market: String,
    #[sqlx(rename = "Symbol")]
    pub symbol: String,
    #[sqlx(rename = "Last_value")]
    pub last_value: Option<f64>,
    #[sqlx(rename = "Momentum")]
    pub momentum: Option<f64>,
    #[sqlx(rename = "Trend")]
    pub trend: Option<f64>,
    /// Exhaustion oscillator.
    #[sqlx(rename = "Oscillator")]
    pub oscillator: Option<f64>,
    #[sqlx(rename = "RSI")]
    pub rsi: Option<f64>,
    /// Day over day change in percent.
    #[sqlx(rename = "DOD")]
    pub dod: Option<f64>,
    #[sqlx(rename = "WOW")]
    pub wow: Option<f64>,
    #[sqlx(rename = "MOM")]
    pub mom: Option<f64>,
    #[sqlx(rename = "YOY")]
    pub yoy: Option<f64>,
    /// Day the snapshot was scraped.
    #[sqlx(rename = "Date")]
    pub date: NaiveDate,
}

impl MarketRecord {
    /// True when every primary-key column is populated.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.country.is_empty()
            && !self.market.is_empty()
            && !self.symbol.is_empty()
            && self.last_value.is_some()
    }
}
