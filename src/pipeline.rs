//! Evaluation pipeline
//!
//! Ties the analyzers together into one `evaluate` call per (asset, cycle).
//! The pipeline is a pure function of its inputs: warnings accumulate on an
//! explicit context object owned by the caller, and nothing here touches
//! shared mutable state, so concurrent evaluations of different symbols are
//! safe by construction.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::analysis::divergence::{detect_divergence, DivergenceKind};
use crate::analysis::patterns::detect_patterns;
use crate::analysis::regime::classify_regime;
use crate::analysis::trend::trend_alignment;
use crate::gates::{is_falling_knife, is_overextended};
use crate::indicators::IndicatorSet;
use crate::normalize::normalize_json;
use crate::scoring::{classify_trading_style, trend_strength_index, tsi_direction};
use crate::sizing::{size_position, RiskConfig};
use crate::types::{
    Candle, PositionState, Side, Signal, SignalAction, Symbol, TrendDirection,
};

/// Trend Strength Index magnitude required to emit an entry signal
///
/// With all four terms contributing the index tops out at 0.25, so 0.10
/// already marks a clear directional majority.
const ENTRY_TSI: f64 = 0.10;
/// TSI magnitude against an open position that forces a full close
const REVERSAL_TSI: f64 = 0.18;
/// Maps the 0.25 full-strength TSI ceiling onto a 0-100 confidence
const CONFIDENCE_SCALE: f64 = 400.0;
/// Share of the blended confidence contributed by regime strength
const REGIME_BLEND: f64 = 0.3;

const DIVERGENCE_LOOKBACK: usize = 50;
/// Confidence nudge from an agreeing (or opposing) divergence
const DIVERGENCE_NUDGE: f64 = 10.0;
/// Confidence nudge per agreeing (or opposing) candlestick pattern
const PATTERN_NUDGE: f64 = 5.0;

/// Fraction of the position closed by a moderate opposing signal
const REDUCE_FRACTION: f64 = 0.5;

/// One non-fatal observation recorded during an evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub symbol: Symbol,
    pub message: String,
}

/// Per-evaluation scratch state owned by the caller
///
/// Warnings are append-only and never affect control flow; callers decide
/// whether to surface, log, or drop them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub warnings: Vec<Warning>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, symbol: &Symbol, message: impl Into<String>) {
        self.warnings.push(Warning {
            symbol: symbol.clone(),
            message: message.into(),
        });
    }
}

/// Candle windows for the three analysis timeframes, oldest first
///
/// Fetching is a collaborator concern; the pipeline only consumes the
/// windows. The 1h window doubles as the primary (execution) timeframe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiTimeframeCandles {
    pub daily: Vec<Candle>,
    pub h4: Vec<Candle>,
    pub h1: Vec<Candle>,
}

impl MultiTimeframeCandles {
    /// Normalize raw JSON candle payloads into the three windows
    ///
    /// Dropped or undecodable candles become context warnings, never errors.
    pub fn from_json(
        symbol: &Symbol,
        daily: &Value,
        h4: &Value,
        h1: &Value,
        ctx: &mut EvaluationContext,
    ) -> Self {
        let mut decode = |label: &str, raw: &Value| {
            let outcome = normalize_json(raw);
            if outcome.dropped > 0 {
                ctx.warn(
                    symbol,
                    format!("dropped {} invalid {label} candles", outcome.dropped),
                );
            }
            outcome.candles
        };

        Self {
            daily: decode("daily", daily),
            h4: decode("4h", h4),
            h1: decode("1h", h1),
        }
    }
}

fn close_all(symbol: Symbol, confidence: f64, price: f64, quantity: f64) -> Signal {
    Signal {
        coin: symbol,
        action: SignalAction::CloseAll,
        confidence,
        entry_price: price,
        quantity,
        leverage: 1.0,
    }
}

/// Blend the TSI-derived confidence with regime strength and structural hints
fn blend_confidence(
    tsi: f64,
    direction: TrendDirection,
    regime_strength: Option<f64>,
    divergence: Option<DivergenceKind>,
    pattern_directions: &[TrendDirection],
) -> f64 {
    let base = (tsi.abs() * CONFIDENCE_SCALE).min(100.0);
    let mut confidence = match regime_strength {
        Some(strength) => base * (1.0 - REGIME_BLEND) + strength * REGIME_BLEND,
        None => base,
    };

    if let Some(kind) = divergence {
        let agrees = matches!(
            (kind, direction),
            (DivergenceKind::Bullish, TrendDirection::Up)
                | (DivergenceKind::Bearish, TrendDirection::Down)
        );
        confidence += if agrees {
            DIVERGENCE_NUDGE
        } else {
            -DIVERGENCE_NUDGE
        };
    }

    for pattern_direction in pattern_directions {
        if *pattern_direction == TrendDirection::Neutral {
            continue;
        }
        confidence += if *pattern_direction == direction {
            PATTERN_NUDGE
        } else {
            -PATTERN_NUDGE
        };
    }

    confidence.clamp(0.0, 100.0)
}

/// Evaluate one asset and produce a trading signal
///
/// Steps: indicators on the primary (1h) timeframe, cross-timeframe
/// alignment, regime/divergence/pattern analysis, Trend Strength Index,
/// safety gates, then sizing for entry signals. Never fails: missing data
/// degrades to a Hold with warnings on the context.
pub fn evaluate(
    symbol: Symbol,
    candles: &MultiTimeframeCandles,
    risk: &RiskConfig,
    position: Option<&PositionState>,
    ctx: &mut EvaluationContext,
) -> Signal {
    if candles.h1.is_empty() {
        ctx.warn(&symbol, "no primary-timeframe candles; holding");
        return Signal::hold(symbol, 0.0);
    }

    let set = IndicatorSet::compute(symbol.clone(), &candles.h1);
    let alignment = trend_alignment(&candles.daily, &candles.h4, &candles.h1);
    let regime = classify_regime(&candles.h1);
    let divergence = detect_divergence(&candles.h1, DIVERGENCE_LOOKBACK);
    let patterns = detect_patterns(&candles.h1);

    let tsi = trend_strength_index(&set, Some(&alignment));
    let style = classify_trading_style(&set, regime.as_ref());
    let direction = tsi_direction(tsi, ENTRY_TSI);

    debug!(
        symbol = %symbol,
        tsi,
        direction = ?direction,
        style = ?style,
        regime = ?regime.map(|r| r.kind),
        "evaluation scores"
    );

    let confidence = blend_confidence(
        tsi,
        direction,
        regime.map(|r| r.strength),
        divergence.map(|d| d.kind),
        &patterns.iter().map(|p| p.direction).collect::<Vec<_>>(),
    );

    // Open-position management comes before fresh entries
    if let Some(position) = position {
        let opposing = match position.side {
            Side::Long => tsi < 0.0,
            Side::Short => tsi > 0.0,
        };

        if opposing && tsi.abs() >= REVERSAL_TSI {
            ctx.warn(&symbol, "hard trend reversal against open position");
            return close_all(symbol, confidence, set.price, position.quantity);
        }
        if opposing && tsi.abs() >= ENTRY_TSI {
            return Signal {
                coin: symbol,
                action: SignalAction::Reduce,
                confidence,
                entry_price: set.price,
                quantity: position.quantity * REDUCE_FRACTION,
                leverage: 1.0,
            };
        }
        // Aligned or drifting: keep the position as is
        return Signal::hold(symbol, set.price);
    }

    let action = match direction {
        TrendDirection::Up => {
            if is_falling_knife(&set, &alignment) {
                ctx.warn(&symbol, "falling-knife gate vetoed long entry");
                return Signal::hold(symbol, set.price);
            }
            if is_overextended(&set, Side::Long) {
                ctx.warn(&symbol, "overextension gate vetoed long entry");
                return Signal::hold(symbol, set.price);
            }
            SignalAction::BuyToEnter
        }
        TrendDirection::Down => {
            if is_overextended(&set, Side::Short) {
                ctx.warn(&symbol, "overextension gate vetoed short entry");
                return Signal::hold(symbol, set.price);
            }
            SignalAction::SellToEnter
        }
        TrendDirection::Neutral => return Signal::hold(symbol, set.price),
    };

    let candidate = Signal {
        coin: symbol,
        action,
        confidence,
        entry_price: set.price,
        quantity: 0.0,
        leverage: 1.0,
    };
    let decision = size_position(&candidate, risk, 0, None, set.atr_pct());
    debug!(
        symbol = %candidate.coin,
        size_usd = decision.size_usd,
        capped = decision.capped,
        reasoning = %decision.reasoning,
        "entry sized"
    );

    Signal {
        quantity: decision.quantity,
        ..candidate
    }
}
