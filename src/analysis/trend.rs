//! Trend detection and multi-timeframe alignment

use crate::indicators::{ema, latest};
use crate::types::{Candle, TrendAlignment, TrendDirection};

const EMA_FAST: usize = 20;
const EMA_SLOW: usize = 50;

/// Detect the trend direction on a single timeframe
///
/// Up when price sits above a bullish EMA stack (`price > ema20 > ema50`),
/// Down when below a bearish stack, Neutral otherwise or when history is
/// insufficient.
pub fn detect_trend(candles: &[Candle]) -> TrendDirection {
    if candles.len() < EMA_SLOW {
        return TrendDirection::Neutral;
    }

    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let price = match close.last() {
        Some(&p) => p,
        None => return TrendDirection::Neutral,
    };

    let fast = latest(&ema(&close, EMA_FAST));
    let slow = latest(&ema(&close, EMA_SLOW));

    match (fast, slow) {
        (Some(fast), Some(slow)) => {
            if price > fast && fast > slow {
                TrendDirection::Up
            } else if price < fast && fast < slow {
                TrendDirection::Down
            } else {
                TrendDirection::Neutral
            }
        }
        _ => TrendDirection::Neutral,
    }
}

/// Summarize cross-timeframe trend agreement
///
/// The daily trend anchors the score: a non-neutral daily trend starts at
/// 50, and each lower timeframe agreeing with it adds 25. A neutral daily
/// trend scores 0 regardless of the lower timeframes.
pub fn trend_alignment(daily: &[Candle], h4: &[Candle], h1: &[Candle]) -> TrendAlignment {
    let daily_trend = detect_trend(daily);
    let h4_trend = detect_trend(h4);
    let h1_trend = detect_trend(h1);

    let h4_aligned = daily_trend != TrendDirection::Neutral && h4_trend == daily_trend;
    let h1_aligned = daily_trend != TrendDirection::Neutral && h1_trend == daily_trend;

    let alignment_score = if daily_trend == TrendDirection::Neutral {
        0.0
    } else {
        let mut score = 50.0;
        if h4_aligned {
            score += 25.0;
        }
        if h1_aligned {
            score += 25.0;
        }
        score
    };

    TrendAlignment {
        daily_trend,
        h4_aligned,
        h1_aligned,
        alignment_score,
    }
}
