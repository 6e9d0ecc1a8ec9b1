//! Safety gates
//!
//! Boolean guard predicates that veto signals meeting dangerous
//! counter-trend criteria. Every gate fails open: a missing input
//! short-circuits to `false`, so a gate only ever blocks on fully
//! confirmed danger, never on absent data.

use crate::indicators::IndicatorSet;
use crate::types::{Side, TrendAlignment, TrendDirection};

/// MACD histogram below this confirms heavy downside momentum
const KNIFE_MACD_HISTOGRAM: f64 = -20.0;
/// OBV below this alone confirms distribution
const KNIFE_OBV_HARD: f64 = -5_000_000.0;
/// OBV below this confirms distribution when the daily trend is down
const KNIFE_OBV_SOFT: f64 = -1_000_000.0;

/// RSI beyond these marks an overextended move
const OVEREXTENDED_RSI_HIGH: f64 = 85.0;
const OVEREXTENDED_RSI_LOW: f64 = 15.0;

/// Detect a falling knife: a fully confirmed all-timeframe downtrend with
/// heavy momentum and volume confirmation
///
/// All four checks must hold:
/// 1. every timeframe agrees on a downtrend (alignment score 100, daily down);
/// 2. price sits below all three EMAs;
/// 3. MACD histogram below -20;
/// 4. OBV below -5M, or below -1M while the daily trend is down.
pub fn is_falling_knife(set: &IndicatorSet, alignment: &TrendAlignment) -> bool {
    let all_down = alignment.alignment_score >= 100.0
        && alignment.daily_trend == TrendDirection::Down;
    if !all_down {
        return false;
    }

    let below_all_emas = match (set.ema20, set.ema50, set.ema200) {
        (Some(e20), Some(e50), Some(e200)) => {
            set.price < e20 && set.price < e50 && set.price < e200
        }
        _ => return false,
    };
    if !below_all_emas {
        return false;
    }

    let momentum_confirmed = match set.macd_histogram {
        Some(hist) => hist < KNIFE_MACD_HISTOGRAM,
        None => return false,
    };
    if !momentum_confirmed {
        return false;
    }

    match set.obv {
        Some(obv) => {
            obv < KNIFE_OBV_HARD
                || (obv < KNIFE_OBV_SOFT && alignment.daily_trend == TrendDirection::Down)
        }
        None => false,
    }
}

/// Detect a chase into an overextended move
///
/// Blocks longs with RSI >= 85 while price is above the upper Bollinger
/// band, and shorts with RSI <= 15 while price is below the lower band.
pub fn is_overextended(set: &IndicatorSet, side: Side) -> bool {
    let Some(rsi) = set.rsi14 else {
        return false;
    };

    match side {
        Side::Long => match set.bb_upper {
            Some(upper) => rsi >= OVEREXTENDED_RSI_HIGH && set.price > upper,
            None => false,
        },
        Side::Short => match set.bb_lower {
            Some(lower) => rsi <= OVEREXTENDED_RSI_LOW && set.price < lower,
            None => false,
        },
    }
}
