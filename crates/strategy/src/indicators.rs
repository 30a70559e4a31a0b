//! Rolling indicators over close series.
//!
//! All functions return a vector aligned with the input. Positions without
//! a full window (and windows touching a NaN input) are NaN.

use ta::indicators::{
    BollingerBands as Bands, RelativeStrengthIndex, SimpleMovingAverage, StandardDeviation,
};
use ta::{Next, Reset};

/// Feeds `values` through `indicator`, yielding `None` until `warm_up`
/// finite values have been seen since the last NaN.
fn windowed<I>(values: &[f64], warm_up: usize, indicator: Option<I>) -> Vec<Option<I::Output>>
where
    I: Next<f64> + Reset,
{
    let Some(mut indicator) = indicator else {
        return values.iter().map(|_| None).collect();
    };

    let mut seen = 0usize;
    values
        .iter()
        .map(|&value| {
            if !value.is_finite() {
                indicator.reset();
                seen = 0;
                return None;
            }
            seen += 1;
            let output = indicator.next(value);
            (seen >= warm_up).then_some(output)
        })
        .collect()
}

/// Simple moving average.
#[must_use]
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    windowed(values, period, SimpleMovingAverage::new(period).ok())
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

/// Rolling standard deviation with `ddof` delta degrees of freedom
/// (0 for population, 1 for sample).
#[must_use]
pub fn rolling_std(values: &[f64], period: usize, ddof: usize) -> Vec<f64> {
    if period <= ddof {
        return vec![f64::NAN; values.len()];
    }
    #[allow(clippy::cast_precision_loss)]
    let correction = (period as f64 / (period - ddof) as f64).sqrt();
    windowed(values, period, StandardDeviation::new(period).ok())
        .into_iter()
        .map(|v| v.map_or(f64::NAN, |std| std * correction))
        .collect()
}

/// Bollinger bands of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub lower: Vec<f64>,
    pub mid: Vec<f64>,
    pub upper: Vec<f64>,
    /// Band width in percent of the mid band.
    pub bandwidth: Vec<f64>,
    /// Position of the value between the bands.
    pub percent: Vec<f64>,
}

impl BollingerBands {
    #[must_use]
    pub fn len(&self) -> usize {
        self.mid.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mid.is_empty()
    }

    /// True when every band is defined at `i`.
    #[must_use]
    pub fn is_valid(&self, i: usize) -> bool {
        self.lower[i].is_finite() && self.upper[i].is_finite()
    }
}

/// Bollinger bands: `mid ± k · σ` with the population deviation over
/// `length` values.
#[must_use]
pub fn bollinger(values: &[f64], length: usize, k: f64) -> BollingerBands {
    let outputs = windowed(values, length, Bands::new(length, k).ok());
    let len = values.len();
    let mut lower = Vec::with_capacity(len);
    let mut mid = Vec::with_capacity(len);
    let mut upper = Vec::with_capacity(len);
    let mut bandwidth = Vec::with_capacity(len);
    let mut percent = Vec::with_capacity(len);

    for (value, output) in values.iter().zip(outputs) {
        let (low, average, high) =
            output.map_or((f64::NAN, f64::NAN, f64::NAN), |o| (o.lower, o.average, o.upper));
        lower.push(low);
        mid.push(average);
        upper.push(high);
        bandwidth.push(100.0 * (high - low) / average);
        percent.push((value - low) / (high - low));
    }

    BollingerBands {
        lower,
        mid,
        upper,
        bandwidth,
        percent,
    }
}

/// Relative strength index with Wilder smoothing (`alpha = 1 / period`).
///
/// The first `period` positions are NaN.
#[must_use]
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return vec![f64::NAN; values.len()];
    }
    // an EMA over 2p - 1 values decays with 1 / p
    windowed(values, period + 1, RelativeStrengthIndex::new(2 * period - 1).ok())
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

/// Residual of the least-squares line through the series.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn detrend(values: &[f64]) -> Vec<f64> {
    let len = values.len();
    if len < 2 {
        return vec![0.0; len];
    }

    let n = len as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (mut cov, mut var) = (0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }
    let slope = cov / var;

    values
        .iter()
        .enumerate()
        .map(|(i, &y)| y - (mean_y + slope * (i as f64 - mean_x)))
        .collect()
}

/// Number of true flags in each trailing window, `None` before the window fills.
#[must_use]
pub fn rolling_count(flags: &[bool], window: usize) -> Vec<Option<usize>> {
    let mut out = Vec::with_capacity(flags.len());
    let mut count = 0usize;
    for i in 0..flags.len() {
        count += usize::from(flags[i]);
        if window > 0 && i >= window {
            count -= usize::from(flags[i - window]);
        }
        out.push((window > 0 && i + 1 >= window).then_some(count));
    }
    out
}

/// Position of `value` between `low` and `high`, clipped to `[0, 1]`.
#[must_use]
pub fn percent_position(value: f64, low: f64, high: f64) -> f64 {
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}

/// Simple returns `p[t] / p[t-1] - 1`, one shorter than the input.
#[must_use]
pub fn daily_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Compounded growth of one unit invested at the start.
#[must_use]
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// Decline from the running maximum, `cum / max(cum) - 1`.
#[must_use]
pub fn drawdown(cumulative: &[f64]) -> Vec<f64> {
    let mut peak = f64::NAN;
    cumulative
        .iter()
        .map(|&value| {
            peak = peak.max(value);
            value / peak - 1.0
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_sma_warm_up_and_values() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_close(out[2], 2.0);
        assert_close(out[3], 3.0);
        assert_close(out[4], 4.0);
    }

    #[test]
    fn test_rolling_std_ddof() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let population = rolling_std(&values, 8, 0);
        assert_close(population[7], 2.0);
        let sample = rolling_std(&values, 8, 1);
        assert_close(sample[7], (32.0f64 / 7.0).sqrt());
    }

    #[test]
    fn test_nan_input_poisons_window() {
        let out = sma(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan() && out[2].is_nan());
        assert_close(out[3], 3.5);
    }

    #[test]
    fn test_rsi_restarts_after_nan() {
        let mut values: Vec<f64> = (0..20_i32).map(f64::from).collect();
        values[5] = f64::NAN;
        let out = rsi(&values, 3);
        assert!(out[2].is_nan() && out[3].is_finite());
        assert!(out[5].is_nan() && out[8].is_nan());
        assert!(out[9].is_finite());
    }

    #[test]
    fn test_zero_period_is_all_nan() {
        assert!(sma(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
        assert!(rsi(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
        assert!(rolling_std(&[1.0, 2.0], 1, 1).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_bollinger_flat_series() {
        let bands = bollinger(&[100.0; 25], 20, 2.0);
        assert!(!bands.is_valid(18));
        assert!(bands.is_valid(19));
        assert_close(bands.lower[24], 100.0);
        assert_close(bands.upper[24], 100.0);
        assert_close(bands.bandwidth[24], 0.0);
    }

    #[test]
    fn test_bollinger_bands_width() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let bands = bollinger(&values, 5, 2.0);
        let sigma = 2.0f64.sqrt();
        assert_close(bands.mid[4], 3.0);
        assert_close(bands.upper[4], 3.0 + 2.0 * sigma);
        assert_close(bands.lower[4], 3.0 - 2.0 * sigma);
        assert_close(bands.bandwidth[4], 100.0 * 4.0 * sigma / 3.0);
        assert_close(bands.percent[4], (5.0 - bands.lower[4]) / (4.0 * sigma));
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (0..30_i32).map(f64::from).collect();
        let out = rsi(&rising, 14);
        assert!(out[13].is_nan());
        assert!(out[14] > 90.0 && out[29] > out[14]);
        assert!(out[29] <= 100.0);

        let zigzag: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let out = rsi(&zigzag, 14);
        assert!(out[39] > 40.0 && out[39] < 60.0);
    }

    #[test]
    fn test_detrend_removes_line() {
        let line: Vec<f64> = (0..10_i32).map(|i| 3.0 + 2.0 * f64::from(i)).collect();
        assert!(detrend(&line).iter().all(|r| r.abs() < 1e-9));

        let out = detrend(&[0.0, 1.0, 0.0]);
        assert_close(out[0], -1.0 / 3.0);
        assert_close(out[1], 2.0 / 3.0);
    }

    #[test]
    fn test_rolling_count() {
        let flags = [true, false, true, true, true];
        assert_eq!(
            rolling_count(&flags, 3),
            vec![None, None, Some(2), Some(2), Some(3)]
        );
    }

    #[test]
    fn test_percent_position_clips() {
        assert_close(percent_position(5.0, 0.0, 10.0), 0.5);
        assert_close(percent_position(-5.0, 0.0, 10.0), 0.0);
        assert_close(percent_position(15.0, 0.0, 10.0), 1.0);
        assert!(percent_position(f64::NAN, 0.0, 10.0).is_nan());
    }

    #[test]
    fn test_drawdown_chain() {
        let prices = [100.0, 110.0, 99.0, 121.0];
        let returns = daily_returns(&prices);
        assert_eq!(returns.len(), 3);
        let cumulative = cumulative_returns(&returns);
        assert_close(cumulative[2], 1.21);
        let dd = drawdown(&cumulative);
        assert_close(dd[0], 0.0);
        assert_close(dd[1], 0.99 / 1.1 - 1.0);
        assert_close(dd[2], 0.0);
    }
}
