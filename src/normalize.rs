//! Candle normalization
//!
//! Exchange feeds deliver candles in several shapes: arrays in two different
//! column orders, or keyed objects with full or abbreviated field names.
//! This module decodes all of them once, at the ingestion boundary, into the
//! canonical [`Candle`] type. Nothing downstream branches on input shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::types::Candle;

/// Factor applied when estimating volume from price range.
const VOLUME_ESTIMATE_FACTOR: f64 = 0.1;

/// Timestamps in milliseconds are comfortably above this; values in the
/// price domain never reach it.
const MS_TIMESTAMP_FLOOR: f64 = 1e12;

/// Raw candle as received from a market-data collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCandle {
    /// Array form: 5 elements `[time,o,h,l,c]` or 6 elements in either
    /// `[time,o,h,l,c,v]` or `[o,h,l,c,v,time]` order
    Row(Vec<Value>),
    /// Keyed form, accepting abbreviated exchange field names
    Keyed {
        #[serde(alias = "t", alias = "timestamp")]
        time: i64,
        #[serde(alias = "o")]
        open: Value,
        #[serde(alias = "h")]
        high: Value,
        #[serde(alias = "l")]
        low: Value,
        #[serde(alias = "c")]
        close: Value,
        #[serde(default, alias = "v")]
        volume: Option<Value>,
    },
}

/// Result of normalizing a raw candle batch
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    pub candles: Vec<Candle>,
    /// Inputs discarded for failing validation or being unparseable
    pub dropped: usize,
}

/// Parse a JSON value as f64, accepting stringified numbers
///
/// Exchange feeds routinely stringify floats ("50" instead of 50).
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse a JSON value as a millisecond timestamp
fn as_time(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Estimate volume from the candle's price range
///
/// `(high-low) * midprice * 0.1` is a crude liquidity proxy, not real
/// volume. It keeps volume-driven indicators defined for feeds that omit
/// the field.
pub fn estimate_volume(high: f64, low: f64) -> f64 {
    (high - low) * ((high + low) / 2.0) * VOLUME_ESTIMATE_FACTOR
}

fn decode_row(row: &[Value]) -> Option<Candle> {
    let (time, open, high, low, close, volume) = match row.len() {
        // [time, o, h, l, c] with volume unset
        5 => (
            as_time(&row[0])?,
            as_f64(&row[1])?,
            as_f64(&row[2])?,
            as_f64(&row[3])?,
            as_f64(&row[4])?,
            None,
        ),
        6 => {
            // Disambiguate by whether the first element looks like a
            // millisecond timestamp.
            if as_f64(&row[0]).is_some_and(|v| v > MS_TIMESTAMP_FLOOR) {
                (
                    as_time(&row[0])?,
                    as_f64(&row[1])?,
                    as_f64(&row[2])?,
                    as_f64(&row[3])?,
                    as_f64(&row[4])?,
                    Some(as_f64(&row[5])?),
                )
            } else {
                (
                    as_time(&row[5])?,
                    as_f64(&row[0])?,
                    as_f64(&row[1])?,
                    as_f64(&row[2])?,
                    as_f64(&row[3])?,
                    Some(as_f64(&row[4])?),
                )
            }
        }
        _ => return None,
    };

    Some(build_candle(time, open, high, low, close, volume))
}

fn build_candle(
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
) -> Candle {
    let volume = match volume {
        Some(v) if v > 0.0 => v,
        _ => estimate_volume(high, low),
    };
    Candle {
        time,
        open,
        high,
        low,
        close,
        volume,
    }
}

/// Normalize a heterogeneous raw candle batch into canonical candles
///
/// Invalid candles (`close <= 0`, `open <= 0`, `high < low`) and
/// unparseable rows are dropped and counted, never propagated. Input order
/// is preserved.
pub fn normalize_candles(raw: &[RawCandle]) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();

    for item in raw {
        let candle = match item {
            RawCandle::Row(row) => decode_row(row),
            RawCandle::Keyed {
                time,
                open,
                high,
                low,
                close,
                volume,
            } => match (as_f64(open), as_f64(high), as_f64(low), as_f64(close)) {
                (Some(o), Some(h), Some(l), Some(c)) => {
                    let v = volume.as_ref().and_then(as_f64);
                    Some(build_candle(*time, o, h, l, c, v))
                }
                _ => None,
            },
        };

        match candle {
            Some(c) if c.is_valid() => outcome.candles.push(c),
            Some(c) => {
                warn!(time = c.time, "dropping invalid candle: {:?}", c.validate());
                outcome.dropped += 1;
            }
            None => {
                outcome.dropped += 1;
            }
        }
    }

    outcome
}

/// Decode a raw JSON array of candles and normalize it
///
/// Elements that fit neither candle shape are counted as dropped; a payload
/// that is not an array at all normalizes to an empty outcome.
pub fn normalize_json(raw: &Value) -> NormalizeOutcome {
    let Some(items) = raw.as_array() else {
        warn!("candle payload is not an array");
        return NormalizeOutcome::default();
    };

    let mut rows = Vec::with_capacity(items.len());
    let mut undecodable = 0;
    for item in items {
        match serde_json::from_value::<RawCandle>(item.clone()) {
            Ok(row) => rows.push(row),
            Err(_) => undecodable += 1,
        }
    }

    let mut outcome = normalize_candles(&rows);
    outcome.dropped += undecodable;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timestamp_first_row_with_string_volume() {
        let raw = normalize_json(&json!([[1700000000000u64, 100, 110, 90, 105, "50"]]));
        assert_eq!(raw.dropped, 0);
        let c = &raw.candles[0];
        assert_eq!(c.time, 1700000000000);
        assert_eq!(c.open, 100.0);
        assert_eq!(c.high, 110.0);
        assert_eq!(c.low, 90.0);
        assert_eq!(c.close, 105.0);
        assert_eq!(c.volume, 50.0);
    }

    #[test]
    fn test_ohlcv_time_last_row() {
        let raw = normalize_json(&json!([[100, 110, 90, 105, 50, 1700000000000u64]]));
        let c = &raw.candles[0];
        assert_eq!(c.time, 1700000000000);
        assert_eq!(c.open, 100.0);
        assert_eq!(c.volume, 50.0);
    }

    #[test]
    fn test_five_element_row_estimates_volume() {
        let raw = normalize_json(&json!([[1700000000000u64, 100, 110, 90, 105]]));
        let c = &raw.candles[0];
        // (110-90) * 100 * 0.1 = 200
        assert_eq!(c.volume, estimate_volume(110.0, 90.0));
        assert_eq!(c.volume, 200.0);
    }

    #[test]
    fn test_keyed_abbreviated_fields() {
        let raw = normalize_json(&json!([
            {"t": 1700000000000u64, "o": 100, "h": 110, "l": 90, "c": 105, "v": 42}
        ]));
        assert_eq!(raw.candles[0].volume, 42.0);
        assert_eq!(raw.candles[0].time, 1700000000000);
    }

    #[test]
    fn test_zero_volume_is_estimated() {
        let raw = normalize_json(&json!([[1700000000000u64, 100, 110, 90, 105, 0]]));
        assert_eq!(raw.candles[0].volume, 200.0);
    }

    #[test]
    fn test_invalid_candle_dropped() {
        let raw = normalize_json(&json!([
            [1700000000000u64, 100, 90, 95, 105, 50], // high < low
            [1700000000001u64, 100, 110, 90, 105, 50]
        ]));
        assert_eq!(raw.dropped, 1);
        assert_eq!(raw.candles.len(), 1);
        assert_eq!(raw.candles[0].time, 1700000000001);
    }

    #[test]
    fn test_order_preserved() {
        let raw = normalize_json(&json!([
            [1700000000002u64, 100, 110, 90, 105, 50],
            [1700000000001u64, 100, 110, 90, 105, 50]
        ]));
        // No reordering, even when timestamps are out of order
        assert_eq!(raw.candles[0].time, 1700000000002);
        assert_eq!(raw.candles[1].time, 1700000000001);
    }

    #[test]
    fn test_garbage_rows_counted_not_thrown() {
        let raw = normalize_json(&json!([[1, 2], "junk", null]));
        assert!(raw.candles.is_empty());
        assert_eq!(raw.dropped, 3);
    }
}
