//! Market regime classification
//!
//! Combines an ATR expansion ratio (current ATR vs its median over a
//! lookback window) with ADX trendiness to label the market as trending,
//! choppy, or volatile.

use statrs::statistics::{Data, OrderStatistics};

use crate::indicators::{adx, atr, latest};
use crate::types::{Candle, MarketRegime, RegimeKind};

const ATR_PERIOD: usize = 14;
const ADX_PERIOD: usize = 14;
const VOLATILITY_LOOKBACK: usize = 50;

/// ATR ratio at or above this marks a volatility expansion
const VOLATILE_THRESHOLD: f64 = 1.5;
/// ADX at or above this marks a trending market
const TRENDING_ADX: f64 = 25.0;

/// Classify the market regime from a candle window
///
/// Returns `None` when there is not enough history for ATR and ADX.
pub fn classify_regime(candles: &[Candle]) -> Option<MarketRegime> {
    if candles.len() < VOLATILITY_LOOKBACK {
        return None;
    }

    let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
    let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let close: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let atr_values = atr(&high, &low, &close, ATR_PERIOD);
    let current_atr = latest(&atr_values)?;
    let adx_value = latest(&adx(&high, &low, &close, ADX_PERIOD))?;

    let lookback_start = candles.len().saturating_sub(VOLATILITY_LOOKBACK);
    let lookback_atrs: Vec<f64> = atr_values[lookback_start..]
        .iter()
        .filter_map(|&x| x)
        .collect();

    if lookback_atrs.is_empty() {
        return None;
    }

    let mut atr_window = Data::new(lookback_atrs);
    let median_atr = atr_window.median();
    let atr_ratio = if median_atr > 0.0 {
        current_atr / median_atr
    } else {
        1.0
    };

    let regime = if atr_ratio >= VOLATILE_THRESHOLD {
        // Expansion strength: 1.5x median maps to 50, 3x median to 100
        let strength = ((atr_ratio - VOLATILE_THRESHOLD) / VOLATILE_THRESHOLD * 50.0 + 50.0)
            .clamp(0.0, 100.0);
        MarketRegime {
            kind: RegimeKind::Volatile,
            strength,
        }
    } else if adx_value >= TRENDING_ADX {
        // ADX 25 maps to 50, ADX 50+ to 100
        let strength = ((adx_value - TRENDING_ADX) / TRENDING_ADX * 50.0 + 50.0).clamp(0.0, 100.0);
        MarketRegime {
            kind: RegimeKind::Trending,
            strength,
        }
    } else {
        // The further ADX sits below the trending threshold, the choppier
        let strength = ((TRENDING_ADX - adx_value) / TRENDING_ADX * 100.0).clamp(0.0, 100.0);
        MarketRegime {
            kind: RegimeKind::Choppy,
            strength,
        }
    };

    Some(regime)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{flat_candles, trending_candles, volatile_tail_candles};

    #[test]
    fn test_insufficient_history() {
        let candles = trending_candles(20, 100.0, 1.0);
        assert!(classify_regime(&candles).is_none());
    }

    #[test]
    fn test_trending_market() {
        let candles = trending_candles(120, 100.0, 2.0);
        let regime = classify_regime(&candles).unwrap();
        assert_eq!(regime.kind, RegimeKind::Trending);
        assert!(regime.strength >= 50.0);
    }

    #[test]
    fn test_choppy_market() {
        let candles = flat_candles(120, 100.0);
        let regime = classify_regime(&candles).unwrap();
        assert_eq!(regime.kind, RegimeKind::Choppy);
    }

    #[test]
    fn test_volatile_market() {
        let candles = volatile_tail_candles(120, 100.0);
        let regime = classify_regime(&candles).unwrap();
        assert_eq!(regime.kind, RegimeKind::Volatile);
    }

    #[test]
    fn test_strength_bounds() {
        for candles in [
            trending_candles(120, 100.0, 2.0),
            flat_candles(120, 100.0),
            volatile_tail_candles(120, 100.0),
        ] {
            let regime = classify_regime(&candles).unwrap();
            assert!((0.0..=100.0).contains(&regime.strength));
        }
    }
}
