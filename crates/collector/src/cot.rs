//! Commitment of Traders downloader for the CFTC financial futures reports.
//!
//! History up to 2015 comes from one bundle archive, later years from one
//! archive per year. Each archive holds a single comma separated text file.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use quant_batch_core::CotConfig;
use quant_batch_data::{CsvStorage, SentimentRecord};
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use crate::error::CollectorError;

const MARKET_COLUMN: &str = "Market_and_Exchange_Names";
const DATE_COLUMN: &str = "Report_Date_as_YYYY-MM-DD";
const FIELD_COLUMNS: [&str; 4] = [
    "Pct_of_OI_Dealer_Long_All",
    "Pct_of_OI_Dealer_Short_All",
    "Pct_of_OI_Lev_Money_Long_All",
    "Pct_of_OI_Lev_Money_Short_All",
];

fn parse_report_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_pct(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Reads the report rows from a CFTC text file.
///
/// Rows with an unreadable report date are dropped.
///
/// # Errors
/// Returns an error if a required column is missing or the CSV is malformed.
pub fn parse_report<R: Read>(reader: R) -> Result<Vec<SentimentRecord>, CollectorError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CollectorError::Decode(format!("column {name} not in report")))
    };
    let market_idx = position(MARKET_COLUMN)?;
    let date_idx = position(DATE_COLUMN)?;
    let mut field_idx = [0usize; 4];
    for (slot, name) in field_idx.iter_mut().zip(FIELD_COLUMNS) {
        *slot = position(name)?;
    }

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let Some(report_date) = row.get(date_idx).and_then(parse_report_date) else {
            continue;
        };
        let field = |i: usize| row.get(field_idx[i]).and_then(parse_pct);
        records.push(SentimentRecord {
            market: row.get(market_idx).unwrap_or_default().to_string(),
            report_date,
            dealer_long: field(0),
            dealer_short: field(1),
            lev_money_long: field(2),
            lev_money_short: field(3),
        });
    }

    Ok(records)
}

/// Reads the first file of a zip archive as a report.
///
/// # Errors
/// Returns an error if the archive is empty or unreadable.
pub fn parse_archive(bytes: &[u8]) -> Result<Vec<SentimentRecord>, CollectorError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.is_empty() {
        return Err(CollectorError::Archive("archive has no entries".to_string()));
    }
    let file = archive.by_index(0)?;
    parse_report(file)
}

/// Sorts by market and report date and removes identical rows.
pub fn sort_and_dedup(records: &mut Vec<SentimentRecord>) {
    let key = |v: Option<f64>| v.unwrap_or(f64::NAN);
    records.sort_by(|a, b| {
        a.market
            .cmp(&b.market)
            .then(a.report_date.cmp(&b.report_date))
            .then(key(a.dealer_long).total_cmp(&key(b.dealer_long)))
            .then(key(a.dealer_short).total_cmp(&key(b.dealer_short)))
            .then(key(a.lev_money_long).total_cmp(&key(b.lev_money_long)))
            .then(key(a.lev_money_short).total_cmp(&key(b.lev_money_short)))
    });
    records.dedup();
}

/// Downloads and merges the sentiment history.
pub struct CotDownloader {
    client: reqwest::Client,
    config: CotConfig,
}

impl CotDownloader {
    /// Creates a downloader from configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CotConfig, timeout_secs: u64) -> Result<Self, CollectorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Downloads one archive and parses its report.
    ///
    /// # Errors
    /// Returns an error on transport failure, a non-success status or an
    /// unreadable archive.
    pub async fn fetch_archive(&self, url: &str) -> Result<Vec<SentimentRecord>, CollectorError> {
        tracing::info!("Downloading {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::status(status.as_u16(), url));
        }
        let bytes = response.bytes().await?;
        parse_archive(&bytes)
    }

    /// Bundle rows before the first yearly file plus every yearly file up
    /// to `last_year`, sorted and deduplicated.
    ///
    /// # Errors
    /// Returns an error if any archive fails to download or parse.
    pub async fn collect(&self, last_year: i32) -> Result<Vec<SentimentRecord>> {
        let cutoff = NaiveDate::from_ymd_opt(self.config.first_year, 1, 1)
            .with_context(|| format!("Invalid first year {}", self.config.first_year))?;

        let mut records: Vec<SentimentRecord> = self
            .fetch_archive(&self.config.bundle_url)
            .await
            .context("Failed to load the COT bundle")?
            .into_iter()
            .filter(|r| r.report_date < cutoff)
            .collect();

        for year in self.config.first_year..=last_year {
            let url = self.config.year_url.replace("{year}", &year.to_string());
            let yearly = self
                .fetch_archive(&url)
                .await
                .with_context(|| format!("Failed to load the {year} COT file"))?;
            records.extend(yearly);
        }

        sort_and_dedup(&mut records);
        tracing::info!("Sentiment rows: {}", records.len());
        Ok(records)
    }

    /// Collects the history and writes the sentiment CSV.
    ///
    /// # Errors
    /// Returns an error if collecting or writing fails.
    pub async fn write_sentiment_file(&self, path: &Path, last_year: i32) -> Result<usize> {
        let records = self.collect(last_year).await?;
        CsvStorage::write_records(path, &records)?;
        tracing::info!("Sentiment file written: {}", path.display());
        Ok(records.len())
    }
}

/// Reads the sentiment CSV for one market.
///
/// Alias names are rewritten to `symbol` first, so renamed contracts join
/// the same series. Rows are sorted by report date.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn load_sentiment(path: &Path, symbol: &str, aliases: &[String]) -> Result<Vec<SentimentRecord>> {
    let rows: Vec<SentimentRecord> = CsvStorage::read_records(path)?;

    let mut rows: Vec<SentimentRecord> = rows
        .into_iter()
        .map(|mut row| {
            for alias in aliases {
                if row.market.contains(alias.as_str()) {
                    row.market = row.market.replace(alias.as_str(), symbol);
                }
            }
            row
        })
        .filter(|row| row.market == symbol)
        .collect();

    rows.sort_by_key(|row| row.report_date);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SP: &str = "E-MINI S&P 500 - CHICAGO MERCANTILE EXCHANGE";
    const SP_OLD: &str = "E-MINI S&P 500 STOCK INDEX - CHICAGO MERCANTILE EXCHANGE";

    fn report(rows: &[(&str, &str, f64)]) -> String {
        let mut text = String::from(
            "\"Market_and_Exchange_Names\",\"As_of_Date_In_Form_YYMMDD\",\"Report_Date_as_YYYY-MM-DD\",\
             \"Pct_of_OI_Dealer_Long_All\",\"Pct_of_OI_Dealer_Short_All\",\
             \"Pct_of_OI_Lev_Money_Long_All\",\"Pct_of_OI_Lev_Money_Short_All\"\n",
        );
        for (market, date, value) in rows {
            text.push_str(&format!(
                "\"{market}\",000000,{date},{value},{},{},{}\n",
                value + 1.0,
                value + 2.0,
                value + 3.0
            ));
        }
        text
    }

    fn zipped(content: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.start_file("FinFutYY.txt", options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    fn config(base: &str) -> CotConfig {
        CotConfig {
            bundle_url: format!("{base}/bundle.zip"),
            year_url: format!("{base}/fut_fin_txt_{{year}}.zip"),
            first_year: 2016,
            sentiment_file: "market_sentiment_data.csv".to_string(),
            symbol: SP.to_string(),
            aliases: vec![SP_OLD.to_string()],
            user_agent: "test".to_string(),
        }
    }

    #[test]
    fn test_parse_report_keeps_required_columns() {
        let text = report(&[(SP, "2023-10-31", 10.5), (SP, "not a date", 1.0)]);
        let rows = parse_report(text.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market, SP);
        assert_eq!(rows[0].report_date, NaiveDate::from_ymd_opt(2023, 10, 31).unwrap());
        assert_eq!(rows[0].fields(), Some([10.5, 11.5, 12.5, 13.5]));

        assert!(parse_report("a,b\n1,2\n".as_bytes()).is_err());
    }

    #[test]
    fn test_sort_and_dedup() {
        let text = report(&[
            (SP, "2023-10-31", 10.0),
            ("BBB", "2023-10-24", 5.0),
            (SP, "2023-10-24", 9.0),
            (SP, "2023-10-31", 10.0),
        ]);
        let mut rows = parse_report(text.as_bytes()).unwrap();
        sort_and_dedup(&mut rows);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].market, "BBB");
        assert_eq!(rows[1].dealer_long, Some(9.0));
        assert_eq!(rows[2].dealer_long, Some(10.0));
    }

    #[test]
    fn test_load_sentiment_merges_aliases() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("market_sentiment_data.csv");

        let mut rows = parse_report(
            report(&[
                (SP, "2023-10-31", 10.0),
                (SP_OLD, "2010-01-05", 7.0),
                ("GOLD - COMMODITY EXCHANGE INC.", "2023-10-31", 1.0),
            ])
            .as_bytes(),
        )
        .unwrap();
        sort_and_dedup(&mut rows);
        CsvStorage::write_records(&file, &rows).unwrap();

        let loaded = load_sentiment(&file, SP, &[SP_OLD.to_string()]).unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.iter().all(|r| r.market == SP));
        assert_eq!(loaded[0].report_date, NaiveDate::from_ymd_opt(2010, 1, 5).unwrap());
    }

    #[tokio::test]
    async fn test_collect_bundle_and_years() {
        let mock_server = MockServer::start().await;
        let base = mock_server.uri();

        // bundle overlaps the first yearly file; its 2016 rows are dropped
        Mock::given(method("GET"))
            .and(path("/bundle.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zipped(&report(&[
                (SP, "2015-12-29", 1.0),
                (SP, "2016-01-05", 99.0),
            ]))))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fut_fin_txt_2016.zip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(zipped(&report(&[(SP, "2016-01-05", 2.0)]))),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fut_fin_txt_2017.zip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(zipped(&report(&[(SP, "2017-01-03", 3.0)]))),
            )
            .mount(&mock_server)
            .await;

        let downloader = CotDownloader::new(&config(&base), 5).unwrap();
        let rows = downloader.collect(2017).await.unwrap();

        let values: Vec<Option<f64>> = rows.iter().map(|r| r.dealer_long).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);

        // missing year fails the whole build
        assert!(downloader.collect(2018).await.is_err());
    }

    #[test]
    fn test_corrupt_archive() {
        let err = parse_archive(b"not a zip").unwrap_err();
        assert!(matches!(err, CollectorError::Archive(_)));
    }
}
