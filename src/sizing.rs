//! Position sizing
//!
//! Converts a raw trade signal plus capital configuration into a position
//! size in quote currency and base quantity. Every branch produces a
//! non-negative size and a human-readable reasoning string naming the
//! formula, any fallback, and any clamp that fired.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Signal;

/// Kelly fraction hard cap: never bet more than a quarter of available
/// capital on one signal, whatever the edge claims.
const KELLY_CAP: f64 = 0.25;

/// Target per-position volatility for risk-parity sizing, as ATR percent
/// of price.
const RISK_PARITY_TARGET_VOL_PCT: f64 = 2.0;
/// Risk-parity multiplier bounds around the equal-weight base.
const RISK_PARITY_MIN_MULT: f64 = 0.25;
const RISK_PARITY_MAX_MULT: f64 = 2.0;

/// Capital allocation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingStrategy {
    Equal,
    ConfidenceWeighted,
    RankingWeighted,
    RiskParity,
    Kelly,
}

/// Capital configuration supplied by the caller per evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub total_capital: f64,
    /// Percent of capital never deployed, 0-100
    #[serde(default)]
    pub reserve_capital_pct: f64,
    /// Hard cap on one position, as percent of total capital
    pub max_position_size_pct: f64,
    pub strategy: SizingStrategy,
    /// Kelly inputs; strategy falls back to equal-weight when missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_win: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_loss: Option<f64>,
    /// Ranking cutoff for ranking-weighted sizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n_ranking: Option<usize>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            total_capital: 10_000.0,
            reserve_capital_pct: 10.0,
            max_position_size_pct: 20.0,
            strategy: SizingStrategy::Equal,
            win_rate: None,
            average_win: None,
            average_loss: None,
            top_n_ranking: None,
        }
    }
}

impl RiskConfig {
    /// Capital available for deployment after the reserve
    pub fn available_capital(&self) -> f64 {
        (self.total_capital * (1.0 - self.reserve_capital_pct / 100.0)).max(0.0)
    }

    /// Hard cap for one position in quote currency
    pub fn max_size_usd(&self) -> f64 {
        (self.total_capital * self.max_position_size_pct / 100.0).max(0.0)
    }
}

/// Sizing result with its audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingDecision {
    pub size_usd: f64,
    pub quantity: f64,
    /// True when the max-position clamp fired
    pub capped: bool,
    /// Which formula produced the size, and any fallback or clamp applied
    pub reasoning: String,
}

fn equal_weight(available: f64, existing_positions: usize) -> f64 {
    available / (existing_positions + 1).max(1) as f64
}

/// Compute the position size for a signal
///
/// `existing_positions` is the count of currently open positions; `rank`
/// is the signal's 1-based rank for ranking-weighted sizing; `atr_pct` is
/// ATR as a percent of price for risk-parity sizing.
pub fn size_position(
    signal: &Signal,
    config: &RiskConfig,
    existing_positions: usize,
    rank: Option<usize>,
    atr_pct: Option<f64>,
) -> SizingDecision {
    let available = config.available_capital();
    let max_size = config.max_size_usd();
    let base = equal_weight(available, existing_positions);

    let (mut size_usd, mut reasoning) = match config.strategy {
        SizingStrategy::Equal => (
            base,
            format!(
                "equal-weight: {available:.2} available / {} slots = {base:.2}",
                existing_positions + 1
            ),
        ),

        SizingStrategy::ConfidenceWeighted => {
            // Confidence 0 means the signal carried none; use the neutral 50.
            let confidence = if signal.confidence > 0.0 {
                signal.confidence
            } else {
                50.0
            };
            let size = base * (confidence / 50.0);
            (
                size,
                format!(
                    "confidence-weighted: base {base:.2} * (confidence {confidence:.0} / 50) = {size:.2}"
                ),
            )
        }

        SizingStrategy::RankingWeighted => {
            let multiplier = match rank {
                Some(1) => 2.0,
                Some(2) => 1.5,
                Some(_) => 1.0,
                None => {
                    warn!(coin = %signal.coin, "ranking-weighted sizing without a rank, using 1.0x");
                    1.0
                }
            };
            let size = base * multiplier;
            (
                size,
                format!(
                    "ranking-weighted: base {base:.2} * rank multiplier {multiplier:.1} = {size:.2}"
                ),
            )
        }

        SizingStrategy::RiskParity => match atr_pct {
            Some(atr_pct) if atr_pct > 0.0 => {
                let multiplier = (RISK_PARITY_TARGET_VOL_PCT / atr_pct)
                    .clamp(RISK_PARITY_MIN_MULT, RISK_PARITY_MAX_MULT);
                let size = base * multiplier;
                (
                    size,
                    format!(
                        "risk-parity: base {base:.2} * (target vol {RISK_PARITY_TARGET_VOL_PCT:.1}% / atr {atr_pct:.2}%) clamped to {multiplier:.2}x = {size:.2}"
                    ),
                )
            }
            _ => {
                warn!(coin = %signal.coin, "risk-parity sizing without ATR, falling back to equal-weight");
                (
                    base,
                    format!("risk-parity fallback to equal-weight (no ATR): {base:.2}"),
                )
            }
        },

        SizingStrategy::Kelly => {
            // A zero win rate carries no usable edge estimate; treat it the
            // same as missing stats.
            match (config.win_rate, config.average_win, config.average_loss) {
                (Some(win_rate), Some(avg_win), Some(avg_loss))
                    if win_rate > 0.0 && avg_win > 0.0 =>
                {
                    let kelly = (win_rate * avg_win - (1.0 - win_rate) * avg_loss.abs()) / avg_win;
                    let kelly = kelly.clamp(0.0, KELLY_CAP);
                    let size = available * kelly;
                    (
                        size,
                        format!(
                            "kelly: fraction {kelly:.4} (win rate {win_rate:.2}, avg win {avg_win:.2}, avg loss {avg_loss:.2}) * {available:.2} = {size:.2}"
                        ),
                    )
                }
                _ => {
                    warn!(
                        coin = %signal.coin,
                        "kelly sizing without win rate / payoff stats, falling back to equal-weight"
                    );
                    (
                        base,
                        format!("kelly fallback to equal-weight (missing stats): {base:.2}"),
                    )
                }
            }
        }
    };

    size_usd = size_usd.max(0.0);

    let capped = size_usd > max_size;
    if capped {
        reasoning.push_str(&format!(
            "; clamped to max position size {max_size:.2} ({}% of capital)",
            config.max_position_size_pct
        ));
        size_usd = max_size;
    }

    let quantity = if signal.entry_price > 0.0 {
        size_usd / signal.entry_price
    } else {
        0.0
    };

    debug!(
        coin = %signal.coin,
        strategy = ?config.strategy,
        size_usd,
        quantity,
        capped,
        "position sized"
    );

    SizingDecision {
        size_usd,
        quantity,
        capped,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SignalAction, Symbol};
    use approx::assert_relative_eq;

    fn signal(confidence: f64, entry_price: f64) -> Signal {
        Signal {
            coin: Symbol::new("BTC"),
            action: SignalAction::BuyToEnter,
            confidence,
            entry_price,
            quantity: 0.0,
            leverage: 1.0,
        }
    }

    fn config(strategy: SizingStrategy) -> RiskConfig {
        RiskConfig {
            total_capital: 10_000.0,
            reserve_capital_pct: 10.0,
            max_position_size_pct: 50.0,
            strategy,
            ..RiskConfig::default()
        }
    }

    #[test]
    fn test_equal_weight_reference_case() {
        // 10000 capital, 10% reserve, 1 existing position:
        // available 9000, two slots -> 4500
        let decision = size_position(&signal(60.0, 100.0), &config(SizingStrategy::Equal), 1, None, None);
        assert_relative_eq!(decision.size_usd, 4_500.0);
        assert_relative_eq!(decision.quantity, 45.0);
        assert!(!decision.capped);
        assert!(decision.reasoning.contains("equal-weight"));
    }

    #[test]
    fn test_confidence_weighting() {
        let decision = size_position(
            &signal(100.0, 100.0),
            &config(SizingStrategy::ConfidenceWeighted),
            0,
            None,
            None,
        );
        // base 9000 * (100/50) = 18000, clamped to 50% of 10000 = 5000
        assert_relative_eq!(decision.size_usd, 5_000.0);
        assert!(decision.capped);
        assert!(decision.reasoning.contains("clamped"));
    }

    #[test]
    fn test_zero_confidence_defaults_to_neutral() {
        let decision = size_position(
            &signal(0.0, 100.0),
            &config(SizingStrategy::ConfidenceWeighted),
            1,
            None,
            None,
        );
        // treated as confidence 50 -> plain equal weight
        assert_relative_eq!(decision.size_usd, 4_500.0);
    }

    #[test]
    fn test_ranking_multipliers() {
        let cfg = config(SizingStrategy::RankingWeighted);
        let rank1 = size_position(&signal(60.0, 100.0), &cfg, 3, Some(1), None);
        let rank2 = size_position(&signal(60.0, 100.0), &cfg, 3, Some(2), None);
        let rank5 = size_position(&signal(60.0, 100.0), &cfg, 3, Some(5), None);
        // base = 9000/4 = 2250
        assert_relative_eq!(rank1.size_usd, 4_500.0);
        assert_relative_eq!(rank2.size_usd, 3_375.0);
        assert_relative_eq!(rank5.size_usd, 2_250.0);
    }

    #[test]
    fn test_risk_parity_scales_inverse_to_volatility() {
        let cfg = config(SizingStrategy::RiskParity);
        let calm = size_position(&signal(60.0, 100.0), &cfg, 3, None, Some(1.0));
        let wild = size_position(&signal(60.0, 100.0), &cfg, 3, None, Some(8.0));
        // base 2250; calm: 2/1 = 2x -> 4500; wild: 2/8 = 0.25x -> 562.5
        assert_relative_eq!(calm.size_usd, 4_500.0);
        assert_relative_eq!(wild.size_usd, 562.5);
        assert!(calm.size_usd > wild.size_usd);
    }

    #[test]
    fn test_risk_parity_without_atr_falls_back() {
        let cfg = config(SizingStrategy::RiskParity);
        let decision = size_position(&signal(60.0, 100.0), &cfg, 3, None, None);
        assert_relative_eq!(decision.size_usd, 2_250.0);
        assert!(decision.reasoning.contains("fallback"));
    }

    #[test]
    fn test_kelly_fraction_and_cap() {
        let cfg = RiskConfig {
            win_rate: Some(0.6),
            average_win: Some(100.0),
            average_loss: Some(50.0),
            ..config(SizingStrategy::Kelly)
        };
        let decision = size_position(&signal(60.0, 100.0), &cfg, 0, None, None);
        // kelly = (0.6*100 - 0.4*50)/100 = 0.4, capped at 0.25
        // size = 9000 * 0.25 = 2250
        assert_relative_eq!(decision.size_usd, 2_250.0);
        assert!(decision.reasoning.contains("0.2500"));
    }

    #[test]
    fn test_kelly_zero_win_rate_falls_back_to_equal() {
        let cfg = RiskConfig {
            win_rate: Some(0.0),
            average_win: Some(100.0),
            average_loss: Some(50.0),
            ..config(SizingStrategy::Kelly)
        };
        let equal = size_position(&signal(60.0, 100.0), &config(SizingStrategy::Equal), 1, None, None);
        let decision = size_position(&signal(60.0, 100.0), &cfg, 1, None, None);
        assert_relative_eq!(decision.size_usd, equal.size_usd);
        assert!(decision.reasoning.contains("fallback"));
    }

    #[test]
    fn test_kelly_nonpositive_avg_win_falls_back_to_equal() {
        let cfg = RiskConfig {
            win_rate: Some(0.6),
            average_win: Some(0.0),
            average_loss: Some(50.0),
            ..config(SizingStrategy::Kelly)
        };
        let equal = size_position(&signal(60.0, 100.0), &config(SizingStrategy::Equal), 1, None, None);
        let decision = size_position(&signal(60.0, 100.0), &cfg, 1, None, None);
        assert_relative_eq!(decision.size_usd, equal.size_usd);
        assert!(decision.reasoning.contains("fallback"));
    }

    #[test]
    fn test_max_position_cap_holds_for_all_strategies() {
        for strategy in [
            SizingStrategy::Equal,
            SizingStrategy::ConfidenceWeighted,
            SizingStrategy::RankingWeighted,
            SizingStrategy::RiskParity,
            SizingStrategy::Kelly,
        ] {
            let cfg = RiskConfig {
                max_position_size_pct: 5.0,
                win_rate: Some(0.9),
                average_win: Some(100.0),
                average_loss: Some(10.0),
                ..config(strategy)
            };
            let decision = size_position(&signal(100.0, 100.0), &cfg, 0, Some(1), Some(0.5));
            assert!(decision.size_usd <= cfg.total_capital * 5.0 / 100.0 + 1e-9);
            assert!(decision.size_usd >= 0.0);
        }
    }

    #[test]
    fn test_zero_entry_price_zero_quantity() {
        let decision = size_position(&signal(60.0, 0.0), &config(SizingStrategy::Equal), 0, None, None);
        assert_eq!(decision.quantity, 0.0);
        assert!(decision.size_usd > 0.0);
    }
}
