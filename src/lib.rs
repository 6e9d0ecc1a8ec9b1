//! Coin Signals
//!
//! Signal generation and risk-sizing pipeline for crypto OHLCV data:
//! candle normalization, technical indicators, market-structure analysis,
//! composite trend scoring, position sizing, and a multi-level exit engine.
//! The crate is a pure computation boundary — fetching candles and storing
//! positions belong to the caller.

pub mod analysis;
pub mod config;
pub mod exits;
pub mod gates;
pub mod indicators;
pub mod normalize;
pub mod pipeline;
pub mod scoring;
pub mod sizing;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::AppConfig;
pub use types::*;
