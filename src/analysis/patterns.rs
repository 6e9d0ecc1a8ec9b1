//! Candlestick pattern recognition
//!
//! Two-candle scan over the tail of the window. Standard body/wick ratio
//! definitions; each hit carries a direction for confidence adjustment
//! downstream.

use serde::{Deserialize, Serialize};

use crate::types::{Candle, TrendDirection};

/// Body smaller than this fraction of range is a doji
const DOJI_BODY_RATIO: f64 = 0.1;
/// Wick at least this multiple of body marks hammer / shooting star
const WICK_BODY_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    Doji,
}

/// A recognized candlestick pattern on the latest candle(s)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CandlePattern {
    pub kind: PatternKind,
    pub direction: TrendDirection,
}

fn engulfing(prev: &Candle, last: &Candle) -> Option<CandlePattern> {
    let prev_bearish = !prev.is_bullish();
    let engulfs = last.body() > prev.body()
        && last.open.min(last.close) <= prev.open.min(prev.close)
        && last.open.max(last.close) >= prev.open.max(prev.close);

    if !engulfs || prev.body() == 0.0 {
        return None;
    }

    if last.is_bullish() && prev_bearish {
        Some(CandlePattern {
            kind: PatternKind::BullishEngulfing,
            direction: TrendDirection::Up,
        })
    } else if !last.is_bullish() && prev.is_bullish() {
        Some(CandlePattern {
            kind: PatternKind::BearishEngulfing,
            direction: TrendDirection::Down,
        })
    } else {
        None
    }
}

fn single_candle(last: &Candle) -> Option<CandlePattern> {
    let range = last.range();
    if range <= 0.0 {
        return None;
    }

    let body = last.body();

    if body <= range * DOJI_BODY_RATIO {
        return Some(CandlePattern {
            kind: PatternKind::Doji,
            direction: TrendDirection::Neutral,
        });
    }

    if last.lower_wick() >= body * WICK_BODY_RATIO && last.upper_wick() < body {
        return Some(CandlePattern {
            kind: PatternKind::Hammer,
            direction: TrendDirection::Up,
        });
    }

    if last.upper_wick() >= body * WICK_BODY_RATIO && last.lower_wick() < body {
        return Some(CandlePattern {
            kind: PatternKind::ShootingStar,
            direction: TrendDirection::Down,
        });
    }

    None
}

/// Detect candlestick patterns on the most recent candles
///
/// At most one two-candle pattern and one single-candle pattern are
/// reported per call.
pub fn detect_patterns(candles: &[Candle]) -> Vec<CandlePattern> {
    let mut patterns = Vec::new();

    let Some(last) = candles.last() else {
        return patterns;
    };

    if candles.len() >= 2 {
        let prev = &candles[candles.len() - 2];
        if let Some(p) = engulfing(prev, last) {
            patterns.push(p);
        }
    }

    if let Some(p) = single_candle(last) {
        patterns.push(p);
    }

    patterns
}
