//! Commitment of Traders sentiment row.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Positioning of one futures market on one report date, in percent of
/// open interest. Column names follow the CFTC financial futures files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    #[serde(rename = "Market_and_Exchange_Names")]
    pub market: String,
    #[serde(rename = "Report_Date_as_YYYY-MM-DD")]
    pub report_date: NaiveDate,
    #[serde(rename = "Pct_of_OI_Dealer_Long_All")]
    pub dealer_long: Option<f64>,
    #[serde(rename = "Pct_of_OI_Dealer_Short_All")]
    pub dealer_short: Option<f64>,
    #[serde(rename = "Pct_of_OI_Lev_Money_Long_All")]
    pub lev_money_long: Option<f64>,
    #[serde(rename = "Pct_of_OI_Lev_Money_Short_All")]
    pub lev_money_short: Option<f64>,
}

impl SentimentRecord {
    /// The four positioning fields, if all are present.
    #[must_use]
    pub fn fields(&self) -> Option<[f64; 4]> {
        Some([
            self.dealer_long?,
            self.dealer_short?,
            self.lev_money_long?,
            self.lev_money_short?,
        ])
    }
}
