//! Economic calendar collector (FinancialModelingPrep compatible API).

use chrono::{Duration, NaiveDate};
use quant_batch_core::CalendarConfig;
use quant_batch_data::CalendarRecord;
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::error::CollectorError;

const CALENDAR_PATH: &str = "/api/v3/economic_calendar";

/// Event as published by the calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEvent {
    date: Option<String>,
    country: Option<String>,
    event: Option<String>,
    currency: Option<String>,
    previous: Option<f64>,
    estimate: Option<f64>,
    actual: Option<f64>,
    change: Option<f64>,
    impact: Option<String>,
    change_percentage: Option<f64>,
}

impl From<CalendarEvent> for CalendarRecord {
    fn from(event: CalendarEvent) -> Self {
        Self {
            date: event.date.unwrap_or_default(),
            country: event.country.unwrap_or_default(),
            event: event.event.unwrap_or_default(),
            currency: event.currency,
            previous: event.previous,
            estimate: event.estimate,
            actual: event.actual,
            change: event.change,
            impact: event.impact,
            change_percentage: event.change_percentage,
        }
    }
}

/// Client for the economic calendar endpoint.
pub struct CalendarClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    lookback: Duration,
}

impl CalendarClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CalendarConfig, timeout_secs: u64) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(timeout_secs))
            .build()?;

        if config.api_key.is_none() {
            tracing::warn!("No calendar API key configured, requests may be rejected");
        }

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            lookback: Duration::weeks(config.lookback_weeks),
        })
    }

    /// Fetches all events between `from` and `to` (inclusive).
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status or an
    /// error payload.
    pub async fn fetch(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CalendarRecord>, CollectorError> {
        let url = format!("{}{}", self.api_url, CALENDAR_PATH);
        let mut query = vec![
            ("from", from.format("%Y-%m-%d").to_string()),
            ("to", to.format("%Y-%m-%d").to_string()),
        ];
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.clone()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::status(status.as_u16(), url));
        }

        let body: serde_json::Value = response.json().await?;
        if let Some(message) = body.get("Error Message").and_then(|m| m.as_str()) {
            return Err(CollectorError::api(status.as_u16().to_string(), message));
        }

        let events: Vec<CalendarEvent> =
            serde_json::from_value(body).map_err(|e| CollectorError::Decode(e.to_string()))?;

        Ok(events.into_iter().map(CalendarRecord::from).collect())
    }

    /// Events of the watched countries in the lookback window ending at `to`.
    ///
    /// # Errors
    /// Returns an error if the calendar request fails.
    pub async fn recent(
        &self,
        to: NaiveDate,
        countries: &[String],
    ) -> Result<Vec<CalendarRecord>, CollectorError> {
        let from = to - self.lookback;
        let events = self.fetch(from, to).await?;
        let total = events.len();

        let kept = filter_countries(events, countries);
        tracing::info!(
            "Calendar {} ~ {}: {} events, {} in watched countries",
            from,
            to,
            total,
            kept.len()
        );
        Ok(kept)
    }
}

/// Keeps events of `countries`, grouped in the order the countries are listed.
#[must_use]
pub fn filter_countries(events: Vec<CalendarRecord>, countries: &[String]) -> Vec<CalendarRecord> {
    let mut kept = Vec::new();
    for country in countries {
        kept.extend(events.iter().filter(|e| &e.country == country).cloned());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: String) -> CalendarConfig {
        CalendarConfig {
            api_url,
            api_key: Some("demo".to_string()),
            lookback_weeks: 1,
        }
    }

    #[test]
    fn test_filter_countries_groups_by_nation_order() {
        let event = |country: &str, name: &str| CalendarRecord {
            date: "2023-11-07 00:00:00".to_string(),
            country: country.to_string(),
            event: name.to_string(),
            ..CalendarRecord::default()
        };
        let events = vec![event("US", "a"), event("KR", "b"), event("AU", "c"), event("US", "d")];

        let kept = filter_countries(events, &["KR".to_string(), "US".to_string()]);
        let names: Vec<&str> = kept.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "d"]);
    }

    #[tokio::test]
    async fn test_recent_queries_lookback_window() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/economic_calendar"))
            .and(query_param("from", "2023-10-31"))
            .and(query_param("to", "2023-11-07"))
            .and(query_param("apikey", "demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "date": "2023-11-07 13:30:00",
                    "country": "US",
                    "event": "Trade Balance",
                    "currency": "USD",
                    "previous": -58.3,
                    "estimate": -59.9,
                    "actual": -61.5,
                    "change": -3.2,
                    "impact": "Medium",
                    "changePercentage": 5.489,
                    "unit": "B"
                },
                {
                    "date": "2023-11-07 00:30:00",
                    "country": "AU",
                    "event": "RBA Rate Decision",
                    "currency": "AUD",
                    "previous": null,
                    "estimate": null,
                    "actual": 4.35,
                    "change": null,
                    "impact": "High",
                    "changePercentage": null
                }
            ])))
            .mount(&mock_server)
            .await;

        let client = CalendarClient::new(&config(mock_server.uri()), 5).unwrap();
        let to = NaiveDate::from_ymd_opt(2023, 11, 7).unwrap();
        let events = client.recent(to, &["US".to_string()]).await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "Trade Balance");
        assert_eq!(events[0].actual, Some(-61.5));
        assert_eq!(events[0].change_percentage, Some(5.489));
    }

    #[tokio::test]
    async fn test_error_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/economic_calendar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Error Message": "Invalid API KEY."
            })))
            .mount(&mock_server)
            .await;

        let client = CalendarClient::new(&config(mock_server.uri()), 5).unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 11, 7).unwrap();
        let err = client.fetch(day, day).await.unwrap_err();
        assert!(matches!(err, CollectorError::Api { .. }));
    }
}
