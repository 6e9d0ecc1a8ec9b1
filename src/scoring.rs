//! Composite scorers
//!
//! The Trend Strength Index collapses EMA structure, directional movement,
//! Aroon, and multi-timeframe alignment into a single score in [-1, +1].
//! The trading-style classifier picks a holding style for current
//! conditions.
//!
//! Every term performs one explicit availability check and either
//! contributes fully or is skipped; missing inputs never default to zero
//! inside a term.

use crate::indicators::IndicatorSet;
use crate::types::{MarketRegime, RegimeKind, TradingStyle, TrendAlignment, TrendDirection};

/// Weight of the EMA alignment term (full stack)
const EMA_FULL_WEIGHT: f64 = 0.30;
/// Weight of the EMA alignment term (partial stack, no ema200 confirmation)
const EMA_PARTIAL_WEIGHT: f64 = 0.20;
const ADX_WEIGHT: f64 = 0.25;
const AROON_WEIGHT: f64 = 0.20;
const ALIGNMENT_WEIGHT: f64 = 0.25;

/// ADX saturates the directional term at this level
const ADX_SATURATION: f64 = 50.0;
/// DI spread normalization divisor
const DI_SPREAD_SCALE: f64 = 25.0;

/// EMA alignment term: tiered weight for a full or partial EMA stack
fn ema_term(set: &IndicatorSet) -> Option<f64> {
    let (ema20, ema50) = match (set.ema20, set.ema50) {
        (Some(a), Some(b)) => (a, b),
        _ => return None,
    };
    let price = set.price;

    let bullish_partial = price > ema20 && ema20 > ema50;
    let bearish_partial = price < ema20 && ema20 < ema50;

    let value = match set.ema200 {
        Some(ema200) if bullish_partial && ema50 > ema200 => EMA_FULL_WEIGHT,
        Some(ema200) if bearish_partial && ema50 < ema200 => -EMA_FULL_WEIGHT,
        _ if bullish_partial => EMA_PARTIAL_WEIGHT,
        _ if bearish_partial => -EMA_PARTIAL_WEIGHT,
        _ => 0.0,
    };
    Some(value)
}

/// ADX-direction term: trend strength times directional spread
fn adx_term(set: &IndicatorSet) -> Option<f64> {
    let adx = set.adx?;
    let strength = (adx / ADX_SATURATION).min(1.0);

    let direction = match (set.plus_di, set.minus_di) {
        (Some(plus), Some(minus)) => ((plus - minus) / DI_SPREAD_SCALE).clamp(-1.0, 1.0),
        // DI unavailable: fall back to price position against ema20
        _ => {
            let ema20 = set.ema20?;
            (set.price - ema20).signum()
        }
    };

    Some(ADX_WEIGHT * strength * direction)
}

/// Aroon term: up/down spread scaled to [-1, 1]
fn aroon_term(set: &IndicatorSet) -> Option<f64> {
    let up = set.aroon_up?;
    let down = set.aroon_down?;
    Some(AROON_WEIGHT * (up - down) / 100.0)
}

/// Multi-timeframe alignment term
fn alignment_term(alignment: Option<&TrendAlignment>) -> Option<f64> {
    let alignment = alignment?;
    let direction = alignment.daily_trend.sign();
    Some(ALIGNMENT_WEIGHT * (alignment.alignment_score / 100.0) * direction)
}

/// Trend Strength Index in [-1, +1]
///
/// Weighted aggregate of the available terms, averaged over the number of
/// contributing terms so missing indicators do not drag the score toward
/// zero. All inputs missing scores 0 (no opinion).
pub fn trend_strength_index(set: &IndicatorSet, alignment: Option<&TrendAlignment>) -> f64 {
    let terms = [
        ema_term(set),
        adx_term(set),
        aroon_term(set),
        alignment_term(alignment),
    ];

    let mut sum = 0.0;
    let mut contributing = 0usize;
    for term in terms.into_iter().flatten() {
        sum += term;
        contributing += 1;
    }

    if contributing == 0 {
        return 0.0;
    }

    (sum / contributing as f64).clamp(-1.0, 1.0)
}

/// ATR percent of price above which conditions are scalp-only
const SCALP_ATR_PCT: f64 = 5.0;
/// ADX threshold for position-trade conditions
const POSITION_ADX: f64 = 25.0;

/// Classify the trading style suited to current conditions
///
/// Volatile regimes (or ATR above 5% of price) suit scalps; a confirmed
/// trend with an aligned EMA stack suits position trades; everything else,
/// including missing inputs, defaults to swing.
pub fn classify_trading_style(set: &IndicatorSet, regime: Option<&MarketRegime>) -> TradingStyle {
    if let Some(regime) = regime {
        if regime.kind == RegimeKind::Volatile {
            return TradingStyle::Scalp;
        }
    }
    if let Some(atr_pct) = set.atr_pct() {
        if atr_pct > SCALP_ATR_PCT {
            return TradingStyle::Scalp;
        }
    }

    let trending_regime = regime.is_some_and(|r| r.kind == RegimeKind::Trending);
    let strong_adx = set.adx.is_some_and(|adx| adx >= POSITION_ADX);
    let stacked = match (set.ema20, set.ema50, set.ema200) {
        (Some(e20), Some(e50), Some(e200)) => {
            (set.price > e20 && e20 > e50 && e50 > e200)
                || (set.price < e20 && e20 < e50 && e50 < e200)
        }
        _ => false,
    };

    if trending_regime && strong_adx && stacked {
        TradingStyle::PositionTrade
    } else {
        TradingStyle::Swing
    }
}

/// Direction implied by a Trend Strength Index value
pub fn tsi_direction(tsi: f64, entry_threshold: f64) -> TrendDirection {
    if tsi >= entry_threshold {
        TrendDirection::Up
    } else if tsi <= -entry_threshold {
        TrendDirection::Down
    } else {
        TrendDirection::Neutral
    }
}
