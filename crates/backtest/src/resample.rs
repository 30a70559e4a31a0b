//! Time bucketing helpers.

use chrono::{DateTime, Datelike, Duration, Utc};

/// Keeps the last value of each `bucket`-long interval.
///
/// Buckets are aligned to the Unix epoch and labelled by their start.
/// Empty buckets produce no row. Input must be sorted by time.
#[must_use]
pub fn resample_last(
    points: &[(DateTime<Utc>, f64)],
    bucket: Duration,
) -> Vec<(DateTime<Utc>, f64)> {
    let width = bucket.num_seconds();
    if width <= 0 {
        return points.to_vec();
    }

    let mut out: Vec<(DateTime<Utc>, f64)> = Vec::new();
    for &(timestamp, value) in points {
        if !value.is_finite() {
            continue;
        }
        let start = timestamp.timestamp().div_euclid(width) * width;
        let Some(label) = DateTime::from_timestamp(start, 0) else {
            continue;
        };
        match out.last_mut() {
            Some(last) if last.0 == label => last.1 = value,
            _ => out.push((label, value)),
        }
    }
    out
}

fn month_index<T: Datelike>(date: &T) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Window number of each date when time is cut into `months`-long windows
/// closed on month ends.
///
/// The first window holds only the month of the first date; every later
/// window spans `months` calendar months ending on a month end.
#[must_use]
pub fn month_windows<T: Datelike>(dates: &[T], months: u32) -> Vec<i64> {
    let Some(first) = dates.first() else {
        return Vec::new();
    };
    let origin = month_index(first);
    let months = i64::from(months.max(1));
    dates
        .iter()
        .map(|date| (month_index(date) - origin + months - 1).div_euclid(months))
        .collect()
}
