//! Utility functions for the forecast_core crate

use crate::error::{ForecastError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use statrs::statistics::{Data, Median};

/// Share of windows, taken from the front, used to fit the model
pub const TRAIN_FRACTION: f64 = 0.8;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Number of leading items that go to the training split.
///
/// Truncates toward zero, so a single window yields an empty training split.
pub fn train_split_len(total: usize) -> usize {
    (total as f64 * TRAIN_FRACTION).floor() as usize
}

/// Parse a timestamp string into UTC.
///
/// Accepts RFC 3339 (offsets are converted to UTC), ISO-like date-times with
/// a space or `T` separator and optional fractional seconds, and plain dates
/// (interpreted as midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Convert epoch milliseconds into a UTC timestamp
pub fn timestamp_from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Median spacing between consecutive timestamps.
///
/// Timestamps must be strictly increasing; at least two are required.
pub fn detect_granularity(timestamps: &[DateTime<Utc>]) -> Result<Duration> {
    if timestamps.len() < 2 {
        return Err(ForecastError::InsufficientData(format!(
            "At least 2 timestamps are needed to detect the series granularity, got {}",
            timestamps.len()
        )));
    }

    let deltas = timestamps
        .windows(2)
        .map(|pair| {
            (pair[1] - pair[0])
                .num_nanoseconds()
                .map(|ns| ns as f64)
                .ok_or_else(|| {
                    ForecastError::InvalidInput(format!(
                        "Gap between {} and {} is too large",
                        pair[0], pair[1]
                    ))
                })
        })
        .collect::<Result<Vec<f64>>>()?;

    let median = Data::new(deltas).median();
    Ok(Duration::nanoseconds(median.round() as i64))
}

/// Create future timestamps for forecasting.
///
/// Step `k` (1-based) lands at `last_timestamp + k * granularity`. The final
/// step is checked before anything is allocated, so a horizon that leaves
/// chrono's date range fails without building the earlier steps.
pub fn future_timestamps(
    last_timestamp: DateTime<Utc>,
    horizon: usize,
    granularity: Duration,
) -> Result<Vec<DateTime<Utc>>> {
    let step = |k: usize| -> Result<DateTime<Utc>> {
        i32::try_from(k)
            .ok()
            .and_then(|k| granularity.checked_mul(k))
            .and_then(|offset| last_timestamp.checked_add_signed(offset))
            .ok_or_else(|| {
                ForecastError::InvalidInput(format!(
                    "Forecasting {} periods of {} after {} leaves the supported date range",
                    horizon, granularity, last_timestamp
                ))
            })
    };

    if horizon > 0 {
        step(horizon)?;
    }

    (1..=horizon).map(step).collect()
}
