//! Economic calendar event model.

use serde::{Deserialize, Serialize};

/// One scheduled macro release (`Calendars` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CalendarRecord {
    /// Release timestamp as published, e.g. `2023-11-07 13:30:00`.
    pub date: String,
    /// Two letter country code.
    pub country: String,
    pub event: String,
    pub currency: Option<String>,
    pub previous: Option<f64>,
    pub estimate: Option<f64>,
    pub actual: Option<f64>,
    pub change: Option<f64>,
    pub impact: Option<String>,
    #[sqlx(rename = "changePercentage")]
    #[serde(rename = "changePercentage")]
    pub change_percentage: Option<f64>,
}

impl CalendarRecord {
    /// True when every primary-key column is populated.
    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.date.is_empty() && !self.country.is_empty() && !self.event.is_empty()
    }
}
