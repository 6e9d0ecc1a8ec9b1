//! Liquidation-cluster estimation
//!
//! Estimates where leveraged positions opened near recent swing extremes
//! would be liquidated, at common leverage tiers. This is derived purely
//! from OHLCV data, not an exchange liquidation feed: treat clusters as a
//! structural hint, not ground truth.

use serde::{Deserialize, Serialize};

use crate::types::{Candle, Side};

/// Leverage tiers commonly offered by perp exchanges
const LEVERAGE_TIERS: [f64; 5] = [5.0, 10.0, 25.0, 50.0, 100.0];

/// Bars scanned for the swing extremes that anchor entry estimates
const SWING_LOOKBACK: usize = 50;

/// An estimated cluster of liquidation prices
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LiquidationCluster {
    /// Side of the positions that would be liquidated here
    pub side: Side,
    pub leverage: f64,
    pub price: f64,
    /// Relative weight from recent volume, 0-1
    pub intensity: f64,
}

/// Estimate liquidation clusters around the current price
///
/// Longs opened near the recent swing low are liquidated below their entry
/// by roughly `entry / leverage`; shorts opened near the swing high
/// mirror that above. Intensity scales with the share of recent volume
/// traded near the anchoring extreme.
pub fn estimate_liquidation_clusters(
    current_price: f64,
    candles: &[Candle],
) -> Vec<LiquidationCluster> {
    if candles.is_empty() || current_price <= 0.0 {
        return Vec::new();
    }

    let window_start = candles.len().saturating_sub(SWING_LOOKBACK);
    let window = &candles[window_start..];

    let swing_high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let swing_low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let total_volume: f64 = window.iter().map(|c| c.volume).sum();
    if total_volume <= 0.0 || swing_high <= swing_low {
        return Vec::new();
    }

    // Volume traded in the bottom/top third of the range anchors how many
    // positions plausibly entered near each extreme.
    let third = (swing_high - swing_low) / 3.0;
    let low_zone_volume: f64 = window
        .iter()
        .filter(|c| c.low <= swing_low + third)
        .map(|c| c.volume)
        .sum();
    let high_zone_volume: f64 = window
        .iter()
        .filter(|c| c.high >= swing_high - third)
        .map(|c| c.volume)
        .sum();

    let long_intensity = (low_zone_volume / total_volume).clamp(0.0, 1.0);
    let short_intensity = (high_zone_volume / total_volume).clamp(0.0, 1.0);

    let mut clusters = Vec::with_capacity(LEVERAGE_TIERS.len() * 2);
    for &leverage in &LEVERAGE_TIERS {
        // Long entries near the swing low liquidate below it
        let long_liq = swing_low * (1.0 - 1.0 / leverage);
        if long_liq > 0.0 {
            clusters.push(LiquidationCluster {
                side: Side::Long,
                leverage,
                price: long_liq,
                intensity: long_intensity,
            });
        }

        // Short entries near the swing high liquidate above it
        let short_liq = swing_high * (1.0 + 1.0 / leverage);
        clusters.push(LiquidationCluster {
            side: Side::Short,
            leverage,
            price: short_liq,
            intensity: short_intensity,
        });
    }

    clusters
}

/// The cluster closest to the given price, if any
pub fn nearest_cluster(
    price: f64,
    clusters: &[LiquidationCluster],
) -> Option<&LiquidationCluster> {
    clusters.iter().min_by(|a, b| {
        let da = (a.price - price).abs();
        let db = (b.price - price).abs();
        da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::flat_candles;

    #[test]
    fn test_empty_candles() {
        assert!(estimate_liquidation_clusters(100.0, &[]).is_empty());
    }

    #[test]
    fn test_clusters_straddle_the_range() {
        let candles = flat_candles(60, 100.0);
        let clusters = estimate_liquidation_clusters(100.0, &candles);
        assert_eq!(clusters.len(), LEVERAGE_TIERS.len() * 2);

        for c in &clusters {
            match c.side {
                // Long liquidations land below the range low
                Side::Long => assert!(c.price < 100.0),
                // Short liquidations land above the range high
                Side::Short => assert!(c.price > 100.0),
            }
            assert!((0.0..=1.0).contains(&c.intensity));
        }
    }

    #[test]
    fn test_higher_leverage_liquidates_closer() {
        let candles = flat_candles(60, 100.0);
        let clusters = estimate_liquidation_clusters(100.0, &candles);

        let long_5x = clusters
            .iter()
            .find(|c| c.side == Side::Long && c.leverage == 5.0)
            .unwrap();
        let long_100x = clusters
            .iter()
            .find(|c| c.side == Side::Long && c.leverage == 100.0)
            .unwrap();
        assert!(long_100x.price > long_5x.price);
    }

    #[test]
    fn test_nearest_cluster() {
        let candles = flat_candles(60, 100.0);
        let clusters = estimate_liquidation_clusters(100.0, &candles);
        let nearest = nearest_cluster(100.0, &clusters).unwrap();
        // 100x tiers sit ~1% from the range edges, nearest to spot
        assert_eq!(nearest.leverage, 100.0);
    }
}
