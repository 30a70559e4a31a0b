//! Macroeconomic indicator model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One macroeconomic indicator release (`Indicators` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndicatorRecord {
    #[sqlx(rename = "Country")]
    pub country: String,
    #[sqlx(rename = "Indicator")]
    pub indicator: String,
    /// Date of the last update of the indicator.
    #[sqlx(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[sqlx(rename = "Symbol")]
    pub symbol: Option<String>,
    #[sqlx(rename = "Actual")]
    pub actual: Option<f64>,
    #[sqlx(rename = "Previous")]
    pub previous: Option<f64>,
    #[sqlx(rename = "MOM")]
    pub mom: Option<f64>,
    #[sqlx(rename = "YOY")]
    pub yoy: Option<f64>,
    #[sqlx(rename = "Trend")]
    pub trend: Option<String>,
    #[sqlx(rename = "Slope")]
    pub slope: Option<String>,
    /// Five year z-score.
    #[sqlx(rename = "ZS5Y")]
    pub zs5y: Option<i64>,
}

impl IndicatorRecord {
    /// True when every primary-key column is populated.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.country.is_empty() && !self.indicator.is_empty() && self.date.is_some()
    }
}
