//! Core data types used across the signal pipeline

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("open ({0}) must be > 0")]
    NonPositiveOpen(f64),

    #[error("close ({0}) must be > 0")]
    NonPositiveClose(f64),

    #[error("volume ({0}) must be >= 0")]
    NegativeVolume(f64),
}

/// OHLCV candlestick data
///
/// `time` is a millisecond epoch timestamp, matching the wire format of the
/// exchange feeds this pipeline consumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        };
        candle.validate()?;
        Ok(candle)
    }

    /// Validate the candle data
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 {
            return Err(CandleValidationError::NonPositiveOpen(self.open));
        }
        if self.close <= 0.0 {
            return Err(CandleValidationError::NonPositiveClose(self.close));
        }
        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }
        if self.volume < 0.0 {
            return Err(CandleValidationError::NegativeVolume(self.volume));
        }
        Ok(())
    }

    /// Check if the candle is valid without returning detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Absolute body size (|close - open|)
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full candle range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Wick above the body
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Wick below the body
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// True if the candle closed above its open
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

/// Trading pair symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into every signal, warning, and exit record produced
/// per evaluation cycle. Arc<str> keeps those clones allocation-free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

/// Action recommended by an evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    BuyToEnter,
    SellToEnter,
    Reduce,
    CloseAll,
    Hold,
}

/// Trading signal emitted once per (asset, cycle)
///
/// Immutable once emitted: sizing and exit logic derive new values from it
/// rather than mutating it in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub coin: Symbol,
    #[serde(rename = "signal")]
    pub action: SignalAction,
    /// Confidence in the direction, 0-100
    pub confidence: f64,
    pub entry_price: f64,
    pub quantity: f64,
    pub leverage: f64,
}

impl Signal {
    /// Neutral signal for an asset (no action, no size)
    pub fn hold(coin: Symbol, price: f64) -> Self {
        Self {
            coin,
            action: SignalAction::Hold,
            confidence: 0.0,
            entry_price: price,
            quantity: 0.0,
            leverage: 1.0,
        }
    }
}

/// Direction of a detected trend on one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

impl TrendDirection {
    /// Numeric direction: +1 up, -1 down, 0 neutral
    pub fn sign(&self) -> f64 {
        match self {
            TrendDirection::Up => 1.0,
            TrendDirection::Down => -1.0,
            TrendDirection::Neutral => 0.0,
        }
    }
}

/// Cross-timeframe trend agreement summary
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrendAlignment {
    pub daily_trend: TrendDirection,
    pub h4_aligned: bool,
    pub h1_aligned: bool,
    /// 0-100: how strongly the lower timeframes agree with the daily trend
    pub alignment_score: f64,
}

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegimeKind {
    Trending,
    Choppy,
    Volatile,
}

/// Regime with a 0-100 strength score
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketRegime {
    pub kind: RegimeKind,
    pub strength: f64,
}

/// Trading style suggested by current market conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStyle {
    Scalp,
    Swing,
    PositionTrade,
}

/// Why an exit condition fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    Emergency,
    StopLoss,
    TakeProfit,
    Trailing,
    SignalReversal,
}

impl ExitReason {
    /// Evaluation priority: 1 is highest
    pub fn priority(&self) -> u8 {
        match self {
            ExitReason::Emergency => 1,
            ExitReason::StopLoss => 2,
            ExitReason::TakeProfit => 3,
            ExitReason::Trailing => 4,
            ExitReason::SignalReversal => 5,
        }
    }
}

/// One fired exit decision
///
/// Exit conditions are append-only history on a position: multiple
/// take-profit entries accumulate over a position's life and are never
/// edited after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitCondition {
    pub reason: ExitReason,
    pub priority: u8,
    pub should_exit: bool,
    /// Percent of the position to close, (0, 100]
    pub exit_size_pct: f64,
    pub exit_price: f64,
    pub metadata: String,
    /// Millisecond epoch timestamp of the evaluation
    pub time: i64,
}

/// Open position state, owned by the caller's position store
///
/// The exit engine reads this and returns decisions; it never persists or
/// mutates the position itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionState {
    pub symbol: Symbol,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: f64,
    /// Stop price; <= 0 means no stop is set
    #[serde(default)]
    pub stop_loss: f64,
    /// Legacy single take-profit price; <= 0 means unset
    #[serde(default)]
    pub take_profit: f64,
    /// Previously fired exit conditions, oldest first
    #[serde(default)]
    pub exit_conditions: Vec<ExitCondition>,
}

impl PositionState {
    /// Unrealized PnL as a percent of entry price (positive = profit)
    pub fn unrealized_pnl_pct(&self, current_price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let raw = (current_price - self.entry_price) / self.entry_price * 100.0;
        match self.side {
            Side::Long => raw,
            Side::Short => -raw,
        }
    }

    /// Cumulative percent already closed via take-profit exits
    pub fn take_profit_closed_pct(&self) -> f64 {
        self.exit_conditions
            .iter()
            .filter(|c| c.reason == ExitReason::TakeProfit && c.should_exit)
            .map(|c| c.exit_size_pct)
            .sum()
    }
}
