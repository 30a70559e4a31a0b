//! Country page scraper for macroeconomic indicator and market tables.
//!
//! Every country page carries tabbed containers (`container--tabs mb-2`).
//! The first table inside them lists financial markets, the second lists
//! macroeconomic indicators.

use chrono::NaiveDate;
use quant_batch_core::{MacroVarConfig, NationPage};
use quant_batch_data::{IndicatorRecord, MarketRecord};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

use crate::error::CollectorError;

const TAB_CONTAINER: &str = ".container--tabs.mb-2";
const MARKETS_TABLE: usize = 0;
const INDICATORS_TABLE: usize = 1;

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// A parsed HTML table: header labels and text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Position of a header label.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Text of the cell at `row` under header `name`.
    #[must_use]
    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let column = self.column(name)?;
        self.rows
            .get(row)?
            .get(column)
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    fn number(&self, row: usize, name: &str) -> Option<f64> {
        self.cell(row, name).and_then(parse_number)
    }

    fn text(&self, row: usize, name: &str) -> Option<String> {
        self.cell(row, name).map(str::to_string)
    }

    fn require(&self, name: &str) -> Result<(), CollectorError> {
        match self.column(name) {
            Some(_) => Ok(()),
            None => Err(CollectorError::Decode(format!("column {name} not in table"))),
        }
    }
}

/// Parses a numeric cell such as `4,378.38`, `-1.2%` or `+0.5`.
///
/// Blanks, dashes and other non-numeric text yield `None`.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .replace('\u{2212}', "-")
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '+' | ' '))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses the `Update` column of the indicator table.
#[must_use]
pub fn parse_update_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.split('T').next().unwrap_or(text);
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
        .or_else(|| {
            // "2023-11-07 10:00" style stamps
            text.split_whitespace()
                .next()
                .and_then(|first| NaiveDate::parse_from_str(first, "%Y-%m-%d").ok())
        })
}

#[allow(clippy::cast_possible_truncation)]
fn round_score(value: f64) -> i64 {
    value.round() as i64
}

fn selector(css: &str) -> Result<Selector, CollectorError> {
    Selector::parse(css).map_err(|e| CollectorError::Decode(format!("selector {css}: {e}")))
}

fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_table(table: ElementRef<'_>, row_sel: &Selector, cell_sel: &Selector) -> HtmlTable {
    let mut parsed = HtmlTable::default();

    for row in table.select(row_sel) {
        let cells: Vec<ElementRef<'_>> = row.select(cell_sel).collect();
        if cells.is_empty() {
            continue;
        }
        let all_headers = cells.iter().all(|cell| cell.value().name() == "th");
        let texts: Vec<String> = cells.into_iter().map(cell_text).collect();

        if parsed.headers.is_empty() && all_headers {
            parsed.headers = texts;
        } else {
            parsed.rows.push(texts);
        }
    }

    parsed
}

/// Extracts every table inside the tabbed containers, in document order.
///
/// # Errors
/// Returns an error if a CSS selector fails to compile.
pub fn parse_tables(html: &str) -> Result<Vec<HtmlTable>, CollectorError> {
    let document = Html::parse_document(html);
    let container_sel = selector(TAB_CONTAINER)?;
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    let tables = document
        .select(&container_sel)
        .flat_map(|container| container.select(&table_sel))
        .map(|table| parse_table(table, &row_sel, &cell_sel))
        .collect();

    Ok(tables)
}

/// Maps the markets table of a country page.
///
/// # Errors
/// Returns an error if the `Market` or `Symbol` column is missing.
pub fn markets_from_table(
    table: &HtmlTable,
    country: &str,
    run_date: NaiveDate,
) -> Result<Vec<MarketRecord>, CollectorError> {
    table.require("Market")?;
    table.require("Symbol")?;

    let records = (0..table.rows.len())
        .map(|row| MarketRecord {
            country: country.to_string(),
            market: table.text(row, "Market").unwrap_or_default(),
            symbol: table.text(row, "Symbol").unwrap_or_default(),
            last_value: table.number(row, "Last"),
            momentum: table.number(row, "Mom"),
            trend: table.number(row, "Trend"),
            oscillator: table.number(row, "Exh"),
            rsi: table.number(row, "RSI"),
            dod: table.number(row, "1D%"),
            wow: table.number(row, "1W%"),
            mom: table.number(row, "1M%"),
            yoy: table.number(row, "1Y%"),
            date: run_date,
        })
        .collect();

    Ok(records)
}

/// Maps the macroeconomic indicators table of a country page.
///
/// # Errors
/// Returns an error if the `Indicator` or `Update` column is missing.
pub fn indicators_from_table(
    table: &HtmlTable,
    country: &str,
) -> Result<Vec<IndicatorRecord>, CollectorError> {
    table.require("Indicator")?;
    table.require("Update")?;

    let records = (0..table.rows.len())
        .map(|row| IndicatorRecord {
            country: country.to_string(),
            indicator: table.text(row, "Indicator").unwrap_or_default(),
            date: table.cell(row, "Update").and_then(parse_update_date),
            symbol: table.text(row, "Symbol"),
            actual: table.number(row, "Actual"),
            previous: table.number(row, "Previous"),
            mom: table.number(row, "M/M%"),
            yoy: table.number(row, "Y/Y%"),
            trend: table.text(row, "Trend"),
            slope: table.text(row, "Slope"),
            zs5y: table.number(row, "ZS5Y").map(round_score),
        })
        .collect();

    Ok(records)
}

/// Scraper client for the country pages.
pub struct MacroVarClient {
    client: reqwest::Client,
    base_url: String,
}

impl MacroVarClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &MacroVarConfig) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL of a country page.
    #[must_use]
    pub fn page_url(&self, nation: &NationPage) -> String {
        format!("{}/{}/", self.base_url, nation.slug)
    }

    /// Downloads a country page and parses its tabbed tables.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success status.
    pub async fn fetch_tables(&self, nation: &NationPage) -> Result<Vec<HtmlTable>, CollectorError> {
        let url = self.page_url(nation);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::status(status.as_u16(), url));
        }

        let body = response.text().await?;
        parse_tables(&body)
    }

    /// Financial markets snapshot of one country, dated `run_date`.
    ///
    /// # Errors
    /// Returns an error if the page cannot be fetched or has no markets table.
    pub async fn markets(
        &self,
        nation: &NationPage,
        run_date: NaiveDate,
    ) -> Result<Vec<MarketRecord>, CollectorError> {
        let tables = self.fetch_tables(nation).await?;
        let table = tables
            .get(MARKETS_TABLE)
            .ok_or_else(|| CollectorError::missing_table(MARKETS_TABLE, self.page_url(nation)))?;
        markets_from_table(table, &nation.code, run_date)
    }

    /// Macroeconomic indicators of one country.
    ///
    /// # Errors
    /// Returns an error if the page cannot be fetched or has no indicators table.
    pub async fn indicators(
        &self,
        nation: &NationPage,
    ) -> Result<Vec<IndicatorRecord>, CollectorError> {
        let tables = self.fetch_tables(nation).await?;
        let table = tables.get(INDICATORS_TABLE).ok_or_else(|| {
            CollectorError::missing_table(INDICATORS_TABLE, self.page_url(nation))
        })?;
        indicators_from_table(table, &nation.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
        <html><body>
          <table><tr><th>Ignored</th></tr><tr><td>outside tabs</td></tr></table>
          <div class="container--tabs mb-2">
            <table>
              <thead>
                <tr><th>Market</th><th>Symbol</th><th>Last</th><th>Mom</th><th>Trend</th>
                    <th>Exh</th><th>RSI</th><th>1D%</th><th>1W%</th><th>1M%</th><th>1Y%</th></tr>
              </thead>
              <tbody>
                <tr><td>S&amp;P 500</td><td>SPX</td><td>4,378.38</td><td>1</td><td>-1</td>
                    <td>0</td><td>55.2</td><td>0.28%</td><td>+1.9%</td><td>-2.1%</td><td>9.4%</td></tr>
                <tr><td>US 10Y</td><td>US10Y</td><td>-</td><td></td><td>1</td>
                    <td>0</td><td>48</td><td>-</td><td>-</td><td>-</td><td>-</td></tr>
              </tbody>
            </table>
          </div>
          <div class="container--tabs mb-2">
            <table>
              <tr><th>Indicator</th><th>Symbol</th><th>Actual</th><th>Previous</th><th>M/M%</th>
                  <th>Y/Y%</th><th>Trend</th><th>Slope</th><th>ZS5Y</th><th>Update</th></tr>
              <tr><td>Inflation Rate</td><td>USCPI</td><td>3.7</td><td>3.2</td><td>0.4</td>
                  <td>3.7</td><td>Up</td><td>Positive</td><td>1.4</td><td>2023-10-12</td></tr>
            </table>
          </div>
        </body></html>
    "#;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 11, 7).unwrap()
    }

    #[test]
    fn test_parse_number_variants() {
        assert_eq!(parse_number("4,378.38"), Some(4378.38));
        assert_eq!(parse_number("-2.1%"), Some(-2.1));
        assert_eq!(parse_number("+1.9%"), Some(1.9));
        assert_eq!(parse_number("\u{2212}0.5"), Some(-0.5));
        assert_eq!(parse_number(" - "), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_parse_update_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 10, 12);
        assert_eq!(parse_update_date("2023-10-12"), expected);
        assert_eq!(parse_update_date("Oct 12, 2023"), expected);
        assert_eq!(parse_update_date("10/12/2023"), expected);
        assert_eq!(parse_update_date("2023-10-12 08:30"), expected);
        assert_eq!(parse_update_date("soon"), None);
    }

    #[test]
    fn test_only_tabbed_tables_are_parsed() {
        let tables = parse_tables(PAGE).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].headers[0], "Market");
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].cell(0, "Market"), Some("S&P 500"));
        assert_eq!(tables[1].rows.len(), 1);
    }

    #[test]
    fn test_markets_mapping() {
        let tables = parse_tables(PAGE).unwrap();
        let markets = markets_from_table(&tables[0], "US", run_date()).unwrap();

        assert_eq!(markets.len(), 2);
        let spx = &markets[0];
        assert_eq!(spx.country, "US");
        assert_eq!(spx.symbol, "SPX");
        assert_eq!(spx.last_value, Some(4378.38));
        assert_eq!(spx.trend, Some(-1.0));
        assert_eq!(spx.wow, Some(1.9));
        assert_eq!(spx.date, run_date());

        // no last value, dropped later by the repository
        assert!(!markets[1].has_key());
    }

    #[test]
    fn test_indicators_mapping() {
        let tables = parse_tables(PAGE).unwrap();
        let indicators = indicators_from_table(&tables[1], "US").unwrap();

        assert_eq!(indicators.len(), 1);
        let cpi = &indicators[0];
        assert_eq!(cpi.indicator, "Inflation Rate");
        assert_eq!(cpi.date, NaiveDate::from_ymd_opt(2023, 10, 12));
        assert_eq!(cpi.mom, Some(0.4));
        assert_eq!(cpi.trend.as_deref(), Some("Up"));
        assert_eq!(cpi.zs5y, Some(1));

        assert!(indicators_from_table(&tables[0], "US").is_err());
    }

    #[tokio::test]
    async fn test_fetch_country_page() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/united-states/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&mock_server)
            .await;

        let config = MacroVarConfig {
            base_url: mock_server.uri(),
            nations: Vec::new(),
            timeout_secs: 5,
            user_agent: "test".to_string(),
        };
        let client = MacroVarClient::new(&config).unwrap();
        let nation = NationPage {
            code: "US".to_string(),
            slug: "united-states".to_string(),
        };

        let markets = client.markets(&nation, run_date()).await.unwrap();
        assert_eq!(markets.len(), 2);

        let indicators = client.indicators(&nation).await.unwrap();
        assert_eq!(indicators[0].symbol.as_deref(), Some("USCPI"));
    }

    #[tokio::test]
    async fn test_missing_page_and_table() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/vietnam/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;

        let config = MacroVarConfig {
            base_url: mock_server.uri(),
            nations: Vec::new(),
            timeout_secs: 5,
            user_agent: "test".to_string(),
        };
        let client = MacroVarClient::new(&config).unwrap();

        let vietnam = NationPage {
            code: "VN".to_string(),
            slug: "vietnam".to_string(),
        };
        let err = client.markets(&vietnam, run_date()).await.unwrap_err();
        assert!(matches!(err, CollectorError::MissingTable { index: 0, .. }));

        let mars = NationPage {
            code: "MA".to_string(),
            slug: "mars".to_string(),
        };
        let err = client.indicators(&mars).await.unwrap_err();
        assert!(matches!(err, CollectorError::Status { status_code: 404, .. }));
    }
}
