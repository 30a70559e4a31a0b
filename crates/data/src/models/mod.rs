//! Row models for the economics database.
//!
//! Column names follow the historical table layout, so fields are renamed
//! for `sqlx::FromRow`.

pub mod calendar;
pub mod indicator;
pub mod market;
pub mod sentiment;

pub use calendar::CalendarRecord;
pub use indicator::IndicatorRecord;
pub use market::MarketRecord;
pub use sentiment::SentimentRecord;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_key_presence() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 7).unwrap();

        let market = MarketRecord {
            country: "US".to_string(),
            market: "S&P 500".to_string(),
            symbol: "SPX".to_string(),
            last_value: None,
            date,
            ..MarketRecord::default()
        };
        assert!(!market.has_key());
        assert!(MarketRecord {
            last_value: Some(4378.38),
            ..market
        }
        .has_key());

        let indicator = IndicatorRecord {
            country: "KR".to_string(),
            indicator: "Inflation Rate".to_string(),
            date: None,
            ..IndicatorRecord::default()
        };
        assert!(!indicator.has_key());

        let calendar = CalendarRecord {
            date: "2023-11-07 13:30:00".to_string(),
            country: "US".to_string(),
            event: String::new(),
            ..CalendarRecord::default()
        };
        assert!(!calendar.has_key());
    }
}
