//! Candle generators shared by unit tests

use crate::types::Candle;

const HOUR_MS: i64 = 3_600_000;

fn candle_at(i: usize, price: f64, spread: f64) -> Candle {
    Candle {
        time: 1_700_000_000_000 + i as i64 * HOUR_MS,
        open: price - spread * 0.25,
        high: price + spread,
        low: price - spread,
        close: price,
        volume: 1_000.0 + i as f64 * 10.0,
    }
}

/// Steadily rising closes
pub fn trending_candles(count: usize, base_price: f64, step: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = base_price + i as f64 * step;
            candle_at(i, price, base_price * 0.01)
        })
        .collect()
}

/// Steadily falling closes
pub fn downtrending_candles(count: usize, base_price: f64, step: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let price = base_price - i as f64 * step;
            candle_at(i, price, base_price * 0.01)
        })
        .collect()
}

/// Constant closes with a small intrabar range
pub fn flat_candles(count: usize, base_price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| candle_at(i, base_price, base_price * 0.002))
        .collect()
}

/// Calm candles followed by a burst of wide-range candles
pub fn volatile_tail_candles(count: usize, base_price: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| {
            let spread = if i + 10 >= count {
                base_price * 0.08
            } else {
                base_price * 0.005
            };
            let wiggle = if i % 2 == 0 { spread * 0.5 } else { -spread * 0.5 };
            candle_at(i, base_price + wiggle, spread)
        })
        .collect()
}
