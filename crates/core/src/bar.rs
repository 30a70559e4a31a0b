//! Price bars and the timeframes the batch jobs work with.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// True when the bar closed above its open.
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.open < self.close
    }
}

/// Extracts the close column.
#[must_use]
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Bar timeframe used for history files and provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    OneMinute,
    #[serde(rename = "1hour")]
    OneHour,
    #[serde(rename = "1day")]
    OneDay,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Self::OneMinute, Self::OneHour, Self::OneDay];

    /// Label used in history file names (`SPY_hist_1day.csv`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1min",
            Self::OneHour => "1hour",
            Self::OneDay => "1day",
        }
    }

    /// Interval string understood by the chart provider.
    #[must_use]
    pub const fn provider_interval(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }

    /// Longest range the provider serves for this interval.
    #[must_use]
    pub const fn provider_range(&self) -> &'static str {
        match self {
            Self::OneMinute => "7d",
            Self::OneHour => "730d",
            Self::OneDay => "10y",
        }
    }
}

impl FromStr for Timeframe {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1min" | "1m" => Ok(Self::OneMinute),
            "1hour" | "1h" => Ok(Self::OneHour),
            "1day" | "1d" => Ok(Self::OneDay),
            _ => Err(anyhow!(
                "Invalid timeframe: '{s}'. Valid values: 1min, 1hour, 1day"
            )),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
