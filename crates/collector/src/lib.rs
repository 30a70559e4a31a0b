//! HTTP collectors feeding the batch jobs.
//!
//! - [`macrovar`]: country pages with market and indicator tables
//! - [`calendar`]: economic calendar events
//! - [`yahoo`]: historical price bars
//! - [`cot`]: CFTC Commitment of Traders reports

pub mod calendar;
pub mod cot;
pub mod error;
pub mod macrovar;
pub mod yahoo;

pub use calendar::CalendarClient;
pub use cot::{load_sentiment, CotDownloader};
pub use error::CollectorError;
pub use macrovar::{HtmlTable, MacroVarClient};
pub use yahoo::{ChartWindow, FetchStats, YahooChartClient};
