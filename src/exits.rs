//! Exit condition engine
//!
//! Stateless per-position evaluator. Given current price and position
//! state it returns at most one firing condition per call, ranked by
//! priority (1 = highest). A caller loop may re-invoke after applying an
//! exit to detect the next condition; level hit-state persists only through
//! the caller-supplied exit history on the position.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{ExitCondition, ExitReason, PositionState, Side};

/// Multi-level take-profit configuration
///
/// `levels` holds percent-from-entry triggers, `sizes` the cumulative
/// percent of the position to have closed once that level is reached.
/// Both arrays are parallel and the sizes are expected non-decreasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeProfitLevels {
    pub levels: Vec<f64>,
    pub sizes: Vec<f64>,
}

impl TakeProfitLevels {
    /// Trigger price of one level for the given entry and side
    pub fn trigger_price(&self, index: usize, entry_price: f64, side: Side) -> f64 {
        let pct = self.levels[index] / 100.0;
        match side {
            Side::Long => entry_price * (1.0 + pct),
            Side::Short => entry_price * (1.0 - pct),
        }
    }
}

/// Exit engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitEngineConfig {
    /// Multi-level take-profit; when absent the position's legacy single
    /// `take_profit` price applies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_profit_levels: Option<TakeProfitLevels>,
    /// Unrealized loss percent that forces a full emergency exit,
    /// regardless of stop placement; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_loss_pct: Option<f64>,
}

fn condition(
    reason: ExitReason,
    exit_size_pct: f64,
    exit_price: f64,
    metadata: String,
    now_ms: i64,
) -> ExitCondition {
    ExitCondition {
        reason,
        priority: reason.priority(),
        should_exit: true,
        exit_size_pct,
        exit_price,
        metadata,
        time: now_ms,
    }
}

fn check_emergency(
    position: &PositionState,
    current_price: f64,
    config: &ExitEngineConfig,
    now_ms: i64,
) -> Option<ExitCondition> {
    let threshold = config.emergency_loss_pct?;
    let pnl_pct = position.unrealized_pnl_pct(current_price);
    if pnl_pct <= -threshold {
        return Some(condition(
            ExitReason::Emergency,
            100.0,
            current_price,
            format!("unrealized loss {pnl_pct:.2}% breached emergency threshold -{threshold:.2}%"),
            now_ms,
        ));
    }
    None
}

fn check_stop_loss(
    position: &PositionState,
    current_price: f64,
    now_ms: i64,
) -> Option<ExitCondition> {
    if position.stop_loss <= 0.0 {
        return None;
    }

    let hit = match position.side {
        Side::Long => current_price <= position.stop_loss,
        Side::Short => current_price >= position.stop_loss,
    };

    if hit {
        return Some(condition(
            ExitReason::StopLoss,
            100.0,
            current_price,
            format!(
                "price {current_price} crossed stop {} ({:?})",
                position.stop_loss, position.side
            ),
            now_ms,
        ));
    }
    None
}

fn check_take_profit_levels(
    position: &PositionState,
    current_price: f64,
    levels: &TakeProfitLevels,
    now_ms: i64,
) -> Option<ExitCondition> {
    if levels.levels.is_empty() || levels.levels.len() != levels.sizes.len() {
        return None;
    }

    let already_closed = position.take_profit_closed_pct();

    // Scan from the highest level downward: if price blew through several
    // levels in one step, close up to the deepest level reached.
    for index in (0..levels.levels.len()).rev() {
        let trigger = levels.trigger_price(index, position.entry_price, position.side);
        let hit = match position.side {
            Side::Long => current_price >= trigger,
            Side::Short => current_price <= trigger,
        };
        if !hit {
            continue;
        }

        let cumulative_target = levels.sizes[index].min(100.0);
        let to_close = cumulative_target - already_closed;
        if to_close <= 0.0 {
            // This level (and everything below it) is already realized.
            return None;
        }

        return Some(condition(
            ExitReason::TakeProfit,
            to_close,
            current_price,
            format!(
                "take-profit level {} ({:+.2}% from entry) reached; closing {to_close:.2}% \
                 (cumulative target {cumulative_target:.2}%, already closed {already_closed:.2}%)",
                index + 1,
                levels.levels[index]
            ),
            now_ms,
        ));
    }

    None
}

fn check_legacy_take_profit(
    position: &PositionState,
    current_price: f64,
    now_ms: i64,
) -> Option<ExitCondition> {
    if position.take_profit <= 0.0 {
        return None;
    }

    let hit = match position.side {
        Side::Long => current_price >= position.take_profit,
        Side::Short => current_price <= position.take_profit,
    };

    if hit {
        return Some(condition(
            ExitReason::TakeProfit,
            100.0,
            current_price,
            format!(
                "price {current_price} reached take-profit {} ({:?})",
                position.take_profit, position.side
            ),
            now_ms,
        ));
    }
    None
}

/// Evaluate exit conditions for a position at the current price
///
/// Returns the highest-priority firing condition, or `None`. The engine
/// never mutates the position; appending the returned condition to
/// `position.exit_conditions` is the caller's job.
pub fn check_exit_conditions(
    position: &PositionState,
    current_price: f64,
    config: &ExitEngineConfig,
    now_ms: i64,
) -> Option<ExitCondition> {
    if current_price <= 0.0 || position.quantity <= 0.0 {
        return None;
    }

    let result = check_emergency(position, current_price, config, now_ms)
        .or_else(|| check_stop_loss(position, current_price, now_ms))
        .or_else(|| match &config.take_profit_levels {
            Some(levels) => check_take_profit_levels(position, current_price, levels, now_ms),
            None => check_legacy_take_profit(position, current_price, now_ms),
        });

    if let Some(ref c) = result {
        debug!(
            symbol = %position.symbol,
            reason = ?c.reason,
            exit_size_pct = c.exit_size_pct,
            "exit condition fired"
        );
    }

    result
}
