//! Structural and pattern analyzers
//!
//! Consumers of indicator outputs plus raw candles: trend detection,
//! regime classification, divergence detection, candlestick patterns,
//! and liquidation-cluster estimation.

pub mod divergence;
pub mod liquidation;
pub mod patterns;
pub mod regime;
pub mod trend;

pub use divergence::{detect_divergence, Divergence, DivergenceKind};
pub use liquidation::{estimate_liquidation_clusters, nearest_cluster, LiquidationCluster};
pub use patterns::{detect_patterns, CandlePattern, PatternKind};
pub use regime::classify_regime;
pub use trend::{detect_trend, trend_alignment};
