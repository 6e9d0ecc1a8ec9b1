//! Price/RSI divergence detection
//!
//! Compares the two most recent swing lows (or highs) in price against RSI
//! at the same bars. Price making a lower low while RSI makes a higher low
//! is bullish divergence; the mirror case is bearish.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::indicators::rsi;
use crate::types::Candle;

const RSI_PERIOD: usize = 14;
/// Bars on each side required for a bar to count as a swing point
const SWING_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivergenceKind {
    Bullish,
    Bearish,
}

/// A detected divergence with its normalized strength
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Divergence {
    pub kind: DivergenceKind,
    /// RSI gap between the two swing points, 0-100
    pub strength: f64,
    /// Bar indices of the older and newer swing points
    pub bars: (usize, usize),
}

/// Indices of swing lows: bars strictly below their neighbors
fn swing_lows(lows: &[f64]) -> Vec<usize> {
    (SWING_WIDTH..lows.len().saturating_sub(SWING_WIDTH))
        .filter(|&i| {
            (1..=SWING_WIDTH).all(|w| lows[i] < lows[i - w] && lows[i] < lows[i + w])
        })
        .collect()
}

/// Indices of swing highs: bars strictly above their neighbors
fn swing_highs(highs: &[f64]) -> Vec<usize> {
    (SWING_WIDTH..highs.len().saturating_sub(SWING_WIDTH))
        .filter(|&i| {
            (1..=SWING_WIDTH).all(|w| highs[i] > highs[i - w] && highs[i] > highs[i + w])
        })
        .collect()
}

/// Detect the most recent price/RSI divergence within `lookback` bars
///
/// Returns `None` when history is insufficient or no divergence is present.
pub fn detect_divergence(candles: &[Candle], lookback: usize) -> Option<Divergence> {
    if candles.len() < RSI_PERIOD + 2 * SWING_WIDTH + 1 {
        return None;
    }

    let window_start = candles.len().saturating_sub(lookback);
    let window = &candles[window_start..];

    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let rsi_series = rsi(&close, RSI_PERIOD);

    let lows: Vec<f64> = window.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = window.iter().map(|c| c.high).collect();

    // Bullish: price lower low, RSI higher low
    if let Some((older, newer)) = swing_lows(&lows).into_iter().rev().take(2).collect_tuple() {
        // rev() yields newest first
        let (older, newer) = (newer, older);
        let rsi_older = rsi_series[window_start + older];
        let rsi_newer = rsi_series[window_start + newer];
        if let (Some(rsi_older), Some(rsi_newer)) = (rsi_older, rsi_newer) {
            if lows[newer] < lows[older] && rsi_newer > rsi_older {
                return Some(Divergence {
                    kind: DivergenceKind::Bullish,
                    strength: (rsi_newer - rsi_older).clamp(0.0, 100.0),
                    bars: (window_start + older, window_start + newer),
                });
            }
        }
    }

    // Bearish: price higher high, RSI lower high
    if let Some((older, newer)) = swing_highs(&highs).into_iter().rev().take(2).collect_tuple() {
        let (older, newer) = (newer, older);
        let rsi_older = rsi_series[window_start + older];
        let rsi_newer = rsi_series[window_start + newer];
        if let (Some(rsi_older), Some(rsi_newer)) = (rsi_older, rsi_newer) {
            if highs[newer] > highs[older] && rsi_newer < rsi_older {
                return Some(Divergence {
                    kind: DivergenceKind::Bearish,
                    strength: (rsi_older - rsi_newer).clamp(0.0, 100.0),
                    bars: (window_start + older, window_start + newer),
                });
            }
        }
    }

    None
}
