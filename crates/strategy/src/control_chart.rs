//! Statistical process control rules applied to detrended closes.
//!
//! The close series is resampled to 5-minute buckets and detrended. Each
//! rule compares the residual with its rolling mean and sample standard
//! deviation and yields a buy or sell per point.

use crate::indicators::{detrend, rolling_count, rolling_std, sma};
use chrono::{DateTime, Duration, Utc};
use quant_batch_backtest::{evaluate, extract_trade_pairs, resample_last, Sizing, StrategyOutcome};
use quant_batch_core::{ResultBlock, Signal};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW: usize = 10;

/// Resampled close with its detrended residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub feature: f64,
}

/// Last close of each 5-minute bucket plus the detrended feature.
#[must_use]
pub fn chart_points(closes: &[(DateTime<Utc>, f64)]) -> Vec<ChartPoint> {
    let resampled = resample_last(closes, Duration::minutes(5));
    let values: Vec<f64> = resampled.iter().map(|&(_, close)| close).collect();
    let feature = detrend(&values);
    resampled
        .into_iter()
        .zip(feature)
        .map(|((timestamp, close), feature)| ChartPoint {
            timestamp,
            close,
            feature,
        })
        .collect()
}

/// The control chart rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    /// One point beyond 3σ.
    BeyondThreeSigma,
    /// Eight points in a row on one side of the centre line.
    EightOnOneSide,
    /// Four of five points beyond 1σ on the same side.
    FourOfFiveBeyondOneSigma,
    /// Six points in a row steadily falling or rising.
    SixTrending,
    /// Two of three points beyond 2σ on the same side.
    TwoOfThreeBeyondTwoSigma,
    /// Fourteen points in a row changing zone.
    FourteenAlternating,
}

impl Rule {
    pub const ALL: [Rule; 6] = [
        Self::BeyondThreeSigma,
        Self::EightOnOneSide,
        Self::FourOfFiveBeyondOneSigma,
        Self::SixTrending,
        Self::TwoOfThreeBeyondTwoSigma,
        Self::FourteenAlternating,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeyondThreeSigma => "rule1",
            Self::EightOnOneSide => "rule2",
            Self::FourOfFiveBeyondOneSigma => "rule3",
            Self::SixTrending => "rule4",
            Self::TwoOfThreeBeyondTwoSigma => "rule5",
            Self::FourteenAlternating => "rule6",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::BeyondThreeSigma => "Rule 1: One Point Beyond the 3σ Control Limit",
            Self::EightOnOneSide => {
                "Rule 2: Eight or More Points on One Side of the Centerline Without Crossing"
            }
            Self::FourOfFiveBeyondOneSigma => "Rule 3: Four out of five points in zone B or beyond",
            Self::SixTrending => "Rule 4: Six Points or More in a Row Steadily Increasing or Decreasing",
            Self::TwoOfThreeBeyondTwoSigma => "Rule 5: Two out of three points in zone A",
            Self::FourteenAlternating => "Rule 6: 14 Points in a Row Alternating Up and Down",
        }
    }
}

/// Rolling centre line and deviation of the feature.
struct Limits {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Limits {
    fn new(feature: &[f64], window: usize) -> Self {
        Self {
            mean: sma(feature, window),
            std: rolling_std(feature, window, 1),
        }
    }

    /// Points below `mean - k·σ` and above `mean + k·σ`; NaN compares false.
    fn beyond(&self, feature: &[f64], k: f64) -> (Vec<bool>, Vec<bool>) {
        feature
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let band = k * self.std[i];
                (f < self.mean[i] - band, f > self.mean[i] + band)
            })
            .unzip()
    }
}

fn at_least(counts: &[Option<usize>], n: usize) -> impl Iterator<Item = bool> + '_ {
    counts.iter().map(move |c| c.is_some_and(|c| c >= n))
}

/// Buy when `low` holds, sell when `high` holds.
fn combine(low: impl Iterator<Item = bool>, high: impl Iterator<Item = bool>) -> Vec<Signal> {
    low.zip(high)
        .map(|(buy, sell)| Signal::from_conditions(buy, sell))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Above(u8),
    Below(u8),
}

fn zones(feature: &[f64], limits: &Limits) -> Vec<Option<Zone>> {
    feature
        .iter()
        .enumerate()
        .map(|(i, &f)| {
            let (mean, std) = (limits.mean[i], limits.std[i]);
            if f > mean {
                Some(Zone::Above(if f > mean + 2.0 * std {
                    3
                } else if f > mean + std {
                    2
                } else {
                    1
                }))
            } else if f < mean {
                Some(Zone::Below(if f < mean - 2.0 * std {
                    3
                } else if f < mean - std {
                    2
                } else {
                    1
                }))
            } else {
                None
            }
        })
        .collect()
}

/// Signals of `rule` over the feature series.
#[must_use]
pub fn rule_signals(rule: Rule, feature: &[f64], window: usize) -> Vec<Signal> {
    let limits = Limits::new(feature, window);
    match rule {
        Rule::BeyondThreeSigma => {
            let (low, high) = limits.beyond(feature, 3.0);
            combine(low.into_iter(), high.into_iter())
        }
        Rule::EightOnOneSide => {
            let (below, above) = limits.beyond(feature, 0.0);
            let above = rolling_count(&above, 8);
            let below = rolling_count(&below, 8);
            combine(at_least(&above, 8), at_least(&below, 8))
        }
        Rule::FourOfFiveBeyondOneSigma => {
            let (low, high) = limits.beyond(feature, 1.0);
            combine(
                at_least(&rolling_count(&low, 5), 4),
                at_least(&rolling_count(&high, 5), 4),
            )
        }
        Rule::SixTrending => {
            let run = |cmp: fn(f64, f64) -> bool| -> Vec<bool> {
                (0..feature.len())
                    .map(|i| i >= 5 && (i - 5..i).all(|j| cmp(feature[j + 1], feature[j])))
                    .collect()
            };
            let falling = run(|next, prev| next < prev);
            let rising = run(|next, prev| next > prev);
            combine(falling.into_iter(), rising.into_iter())
        }
        Rule::TwoOfThreeBeyondTwoSigma => {
            let (low, high) = limits.beyond(feature, 2.0);
            combine(
                at_least(&rolling_count(&low, 3), 2),
                at_least(&rolling_count(&high, 3), 2),
            )
        }
        Rule::FourteenAlternating => {
            let zones = zones(feature, &limits);
            let changes: Vec<bool> = (0..zones.len())
                .map(|i| match (i.checked_sub(1).and_then(|p| zones[p]), zones[i]) {
                    (Some(prev), Some(current)) => prev != current,
                    _ => true,
                })
                .collect();
            at_least(&rolling_count(&changes, 14), 14)
                .map(|alternating| if alternating { Signal::Buy } else { Signal::Sell })
                .collect()
        }
    }
}

/// Sized outcome of every rule.
#[must_use]
pub fn evaluate_rules(points: &[ChartPoint], window: usize, cash: f64) -> Vec<(Rule, StrategyOutcome)> {
    let feature: Vec<f64> = points.iter().map(|p| p.feature).collect();
    let prices: Vec<f64> = points.iter().map(|p| p.close).collect();
    Rule::ALL
        .iter()
        .map(|&rule| {
            let pairs = extract_trade_pairs(&prices, &rule_signals(rule, &feature, window));
            (rule, evaluate(&pairs, Sizing::Cash(cash)))
        })
        .collect()
}

/// Runs every rule over the closes of one ticker and logs the results.
pub fn run(ticker: &str, closes: &[(DateTime<Utc>, f64)], cash: f64) -> Vec<(Rule, StrategyOutcome)> {
    let points = chart_points(closes);
    for rule in Rule::ALL {
        tracing::info!("{}", rule.description());
    }
    let results = evaluate_rules(&points, DEFAULT_WINDOW, cash);
    for (rule, outcome) in &results {
        ResultBlock::new(format!("Result of {ticker} for ({})", rule.name()))
            .outcome(outcome.profit, outcome.wins, outcome.losses)
            .log();
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_chart_points_resample_and_detrend() {
        let at = |m: u32| Utc.with_ymd_and_hms(2024, 3, 1, 10, m, 0).unwrap();
        let closes = vec![(at(0), 1.0), (at(3), 2.0), (at(5), 3.0), (at(10), 5.0)];
        let points = chart_points(&closes);
        assert_eq!(points.len(), 3);
        assert!((points[0].close - 2.0).abs() < f64::EPSILON);
        // 2, 3, 5 around the fitted line
        assert!((points.iter().map(|p| p.feature).sum::<f64>()).abs() < 1e-9);
    }

    #[test]
    fn test_rule1_is_symmetric() {
        let feature: Vec<f64> = (0..40_usize)
            .map(|i| match i {
                19 => -25.0,
                39 => 25.0,
                _ if i % 2 == 0 => 1.0,
                _ => -1.0,
            })
            .collect();
        let signals = rule_signals(Rule::BeyondThreeSigma, &feature, 20);
        assert_eq!(signals[19], Signal::Buy);
        assert_eq!(signals[39], Signal::Sell);
        assert_eq!(signals.iter().filter(|s| s.is_trade()).count(), 2);
    }

    #[test]
    fn test_rule1_needs_wide_window() {
        // a point inside its own 10-point window stays within 3 sample σ
        let mut feature = vec![0.0; 9];
        feature.push(-1_000.0);
        let signals = rule_signals(Rule::BeyondThreeSigma, &feature, DEFAULT_WINDOW);
        assert!(signals.iter().all(|s| *s == Signal::Hold));
    }

    #[test]
    fn test_rule4_trends() {
        let falling = [6.0, 5.0, 4.0, 3.0, 2.0, 1.0, 0.0];
        let signals = rule_signals(Rule::SixTrending, &falling, 3);
        assert_eq!(signals[4], Signal::Hold);
        assert_eq!(signals[5], Signal::Buy);
        assert_eq!(signals[6], Signal::Buy);

        let rising: Vec<f64> = falling.iter().rev().copied().collect();
        assert_eq!(rule_signals(Rule::SixTrending, &rising, 3)[5], Signal::Sell);
    }

    #[test]
    fn test_rule2_side_counts() {
        // centre line lags a step change, leaving eight points above it
        let mut feature = vec![0.0; 10];
        feature.extend([5.0; 10]);
        let signals = rule_signals(Rule::EightOnOneSide, &feature, 10);
        assert_eq!(signals[16], Signal::Hold);
        assert_eq!(signals[17], Signal::Buy);
    }

    #[test]
    fn test_rule6_warm_up_sells() {
        let feature: Vec<f64> = (0..30_i32).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let signals = rule_signals(Rule::FourteenAlternating, &feature, 10);
        assert!(signals[..13].iter().all(|s| *s == Signal::Sell));
        assert_eq!(signals[29], Signal::Buy);
    }

    #[test]
    fn test_evaluate_rules_reports_all() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let closes: Vec<(DateTime<Utc>, f64)> = (0..120_i32)
            .map(|i| {
                (
                    start + Duration::days(i64::from(i)),
                    100.0 + 5.0 * (f64::from(i) / 3.0).sin(),
                )
            })
            .collect();
        let results = run("SPY", &closes, 10_000.0);
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].0, Rule::BeyondThreeSigma);
    }
}
