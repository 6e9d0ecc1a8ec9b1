//! Technical indicators
//!
//! Stateless pure functions computing trend, momentum, volatility, and
//! volume indicators from candle data. Every function returns `None` (not
//! an error) for positions with insufficient history; callers must treat
//! `None` as "indicator unavailable", never as zero.

use crate::types::Candle;

/// Calculate Simple Moving Average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    if period == 0 {
        return vec![None; values.len()];
    }

    for i in 0..values.len() {
        if i + 1 < period {
            result.push(None);
        } else {
            let sum: f64 = values[i + 1 - period..=i].iter().sum();
            result.push(Some(sum / period as f64));
        }
    }

    result
}

/// Calculate Exponential Moving Average
///
/// Seeded with the SMA of the first `period` values, then the standard
/// recurrence with multiplier 2/(period+1).
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    if values.is_empty() || period == 0 {
        return vec![None; values.len()];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema_value: Option<f64> = None;

    for (i, &value) in values.iter().enumerate() {
        if i + 1 < period {
            result.push(None);
        } else if i + 1 == period {
            let sum: f64 = values[0..period].iter().sum();
            ema_value = Some(sum / period as f64);
            result.push(ema_value);
        } else if let Some(prev_ema) = ema_value {
            let new_ema = (value - prev_ema) * multiplier + prev_ema;
            ema_value = Some(new_ema);
            result.push(Some(new_ema));
        }
    }

    result
}

/// Calculate True Range
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        let tr_value = if i == 0 {
            high[i] - low[i]
        } else {
            let hl = high[i] - low[i];
            let hc = (high[i] - close[i - 1]).abs();
            let lc = (low[i] - close[i - 1]).abs();
            hl.max(hc).max(lc)
        };
        tr.push(tr_value);
    }

    tr
}

/// Calculate Average True Range (ATR)
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let tr = true_range(high, low, close);
    ema(&tr, period)
}

/// Calculate Directional Movement Index (DMI) components
///
/// Returns (+DI, -DI) normalized to 0-100 against ATR.
pub fn dmi(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut plus_dm = vec![0.0; high.len()];
    let mut minus_dm = vec![0.0; high.len()];

    for i in 1..high.len() {
        let up_move = high[i] - high[i - 1];
        let down_move = low[i - 1] - low[i];

        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }

    let plus_smoothed = ema(&plus_dm, period);
    let minus_smoothed = ema(&minus_dm, period);
    let atr_values = atr(high, low, close, period);

    let mut plus_di = Vec::with_capacity(high.len());
    let mut minus_di = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        match (plus_smoothed[i], minus_smoothed[i], atr_values[i]) {
            (Some(p), Some(m), Some(a)) if a > 0.0 => {
                plus_di.push(Some(p / a * 100.0));
                minus_di.push(Some(m / a * 100.0));
            }
            (Some(_), Some(_), Some(_)) => {
                plus_di.push(Some(0.0));
                minus_di.push(Some(0.0));
            }
            _ => {
                plus_di.push(None);
                minus_di.push(None);
            }
        }
    }

    (plus_di, minus_di)
}

/// Calculate Average Directional Index (ADX)
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let (plus_di, minus_di) = dmi(high, low, close, period);

    let mut dx = Vec::with_capacity(high.len());

    for i in 0..high.len() {
        if let (Some(pdi), Some(mdi)) = (plus_di[i], minus_di[i]) {
            let sum = pdi + mdi;
            if sum > 0.0 {
                dx.push(((pdi - mdi).abs() / sum) * 100.0);
            } else {
                dx.push(0.0);
            }
        } else {
            dx.push(0.0);
        }
    }

    ema(&dx, period)
}

/// Calculate RSI (Relative Strength Index)
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() {
        return Vec::new();
    }

    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());

    gains.push(0.0);
    losses.push(0.0);

    for i in 1..values.len() {
        let change = values[i] - values[i - 1];
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let avg_gains = ema(&gains, period);
    let avg_losses = ema(&losses, period);

    let mut rsi_values = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if let (Some(avg_gain), Some(avg_loss)) = (avg_gains[i], avg_losses[i]) {
            if avg_loss == 0.0 {
                rsi_values.push(Some(100.0));
            } else {
                let rs = avg_gain / avg_loss;
                rsi_values.push(Some(100.0 - (100.0 / (1.0 + rs))));
            }
        } else {
            rsi_values.push(None);
        }
    }

    rsi_values
}

/// Calculate MACD (Moving Average Convergence Divergence)
///
/// Returns (macd line, signal line, histogram) series.
pub fn macd(
    values: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);

    let macd_line: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // Signal line is an EMA over the defined portion of the MACD line.
    let first_defined = macd_line.iter().position(|v| v.is_some());
    let mut signal_line = vec![None; values.len()];
    if let Some(start) = first_defined {
        let defined: Vec<f64> = macd_line[start..].iter().filter_map(|&v| v).collect();
        let signal_ema = ema(&defined, signal_period);
        for (offset, value) in signal_ema.into_iter().enumerate() {
            signal_line[start + offset] = value;
        }
    }

    let histogram: Vec<Option<f64>> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    (macd_line, signal_line, histogram)
}

/// Calculate Bollinger Bands
///
/// Returns (upper, middle, lower).
pub fn bollinger_bands(
    values: &[f64],
    period: usize,
    num_std: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let middle = sma(values, period);
    let mut upper = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if let Some(mid) = middle[i] {
            let window = &values[i + 1 - period..=i];
            let variance: f64 = window
                .iter()
                .map(|&x| {
                    let diff = x - mid;
                    diff * diff
                })
                .sum::<f64>()
                / period as f64;
            let std_dev = variance.sqrt();

            upper.push(Some(mid + num_std * std_dev));
            lower.push(Some(mid - num_std * std_dev));
        } else {
            upper.push(None);
            lower.push(None);
        }
    }

    (upper, middle, lower)
}

/// Calculate Aroon indicator
///
/// Returns (aroon up, aroon down), each 0-100, measuring bars since the
/// period high/low.
pub fn aroon(high: &[f64], low: &[f64], period: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut up = Vec::with_capacity(high.len());
    let mut down = Vec::with_capacity(low.len());

    for i in 0..high.len() {
        if i + 1 < period + 1 {
            up.push(None);
            down.push(None);
            continue;
        }

        let window_start = i - period;
        let mut highest_idx = window_start;
        let mut lowest_idx = window_start;
        for j in window_start..=i {
            if high[j] >= high[highest_idx] {
                highest_idx = j;
            }
            if low[j] <= low[lowest_idx] {
                lowest_idx = j;
            }
        }

        let bars_since_high = (i - highest_idx) as f64;
        let bars_since_low = (i - lowest_idx) as f64;

        up.push(Some((period as f64 - bars_since_high) / period as f64 * 100.0));
        down.push(Some((period as f64 - bars_since_low) / period as f64 * 100.0));
    }

    (up, down)
}

/// Calculate On-Balance Volume
///
/// Cumulative series, defined from the first bar onward.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(close.len());
    let mut running = 0.0;

    for i in 0..close.len() {
        if i > 0 {
            if close[i] > close[i - 1] {
                running += volume[i];
            } else if close[i] < close[i - 1] {
                running -= volume[i];
            }
        }
        result.push(running);
    }

    result
}

/// Calculate Stochastic Oscillator
///
/// Returns (%K, %D) where %D is an SMA of %K over `d_period`.
pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    d_period: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut k = Vec::with_capacity(close.len());

    for i in 0..close.len() {
        if i + 1 < k_period {
            k.push(None);
            continue;
        }

        let window_start = i + 1 - k_period;
        let highest = high[window_start..=i].iter().fold(f64::MIN, |a, &b| a.max(b));
        let lowest = low[window_start..=i].iter().fold(f64::MAX, |a, &b| a.min(b));

        if highest > lowest {
            k.push(Some((close[i] - lowest) / (highest - lowest) * 100.0));
        } else {
            k.push(Some(50.0));
        }
    }

    // %D: SMA over the defined portion of %K
    let first_defined = k.iter().position(|v| v.is_some());
    let mut d = vec![None; close.len()];
    if let Some(start) = first_defined {
        let defined: Vec<f64> = k[start..].iter().filter_map(|&v| v).collect();
        let d_sma = sma(&defined, d_period);
        for (offset, value) in d_sma.into_iter().enumerate() {
            d[start + offset] = value;
        }
    }

    (k, d)
}

/// Calculate volume-weighted average price over the full candle window
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }

    let mut pv_sum = 0.0;
    let mut volume_sum = 0.0;
    for c in candles {
        let typical = (c.high + c.low + c.close) / 3.0;
        pv_sum += typical * c.volume;
        volume_sum += c.volume;
    }

    if volume_sum > 0.0 {
        Some(pv_sum / volume_sum)
    } else {
        None
    }
}

/// Last defined value of an indicator series
pub fn latest(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}

/// Immutable snapshot of the latest indicator values for one
/// (asset, interval, candle window)
///
/// Produced fresh per request and never mutated afterwards. All fields
/// except `price` are `None` when the window is too short to compute them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndicatorSet {
    pub symbol: crate::types::Symbol,
    pub price: f64,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub atr14: Option<f64>,
    pub aroon_up: Option<f64>,
    pub aroon_down: Option<f64>,
    pub obv: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub stoch_k: Option<f64>,
    pub stoch_d: Option<f64>,
    pub vwap: Option<f64>,
}

/// Periods used when building an [`IndicatorSet`]
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub adx_period: usize,
    pub aroon_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    pub bb_std: f64,
    pub stoch_k: usize,
    pub stoch_d: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            ema_fast: 20,
            ema_mid: 50,
            ema_slow: 200,
            rsi_period: 14,
            atr_period: 14,
            adx_period: 14,
            aroon_period: 25,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std: 2.0,
            stoch_k: 14,
            stoch_d: 3,
        }
    }
}

impl IndicatorSet {
    /// Compute the snapshot from a candle window with default periods
    pub fn compute(symbol: crate::types::Symbol, candles: &[Candle]) -> Self {
        Self::compute_with(symbol, candles, &IndicatorConfig::default())
    }

    /// Compute the snapshot from a candle window
    ///
    /// An empty window produces an all-`None` set with price 0; downstream
    /// scorers treat that as "no indicators available" and stay neutral.
    pub fn compute_with(
        symbol: crate::types::Symbol,
        candles: &[Candle],
        config: &IndicatorConfig,
    ) -> Self {
        let close: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let high: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let low: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let volume: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let price = close.last().copied().unwrap_or(0.0);

        let (macd_line, signal_line, histogram) =
            macd(&close, config.macd_fast, config.macd_slow, config.macd_signal);
        let (plus_di, minus_di) = dmi(&high, &low, &close, config.adx_period);
        let (aroon_up, aroon_down) = aroon(&high, &low, config.aroon_period);
        let (bb_upper, bb_middle, bb_lower) =
            bollinger_bands(&close, config.bb_period, config.bb_std);
        let (stoch_k, stoch_d) = stochastic(&high, &low, &close, config.stoch_k, config.stoch_d);
        let obv_series = obv(&close, &volume);

        IndicatorSet {
            symbol,
            price,
            ema20: latest(&ema(&close, config.ema_fast)),
            ema50: latest(&ema(&close, config.ema_mid)),
            ema200: latest(&ema(&close, config.ema_slow)),
            rsi14: latest(&rsi(&close, config.rsi_period)),
            macd: latest(&macd_line),
            macd_signal: latest(&signal_line),
            macd_histogram: latest(&histogram),
            adx: latest(&adx(&high, &low, &close, config.adx_period)),
            plus_di: latest(&plus_di),
            minus_di: latest(&minus_di),
            atr14: latest(&atr(&high, &low, &close, config.atr_period)),
            aroon_up: latest(&aroon_up),
            aroon_down: latest(&aroon_down),
            obv: if obv_series.is_empty() {
                None
            } else {
                obv_series.last().copied()
            },
            bb_upper: latest(&bb_upper),
            bb_middle: latest(&bb_middle),
            bb_lower: latest(&bb_lower),
            stoch_k: latest(&stoch_k),
            stoch_d: latest(&stoch_d),
            vwap: vwap(candles),
        }
    }

    /// ATR as a percent of current price
    pub fn atr_pct(&self) -> Option<f64> {
        match self.atr14 {
            Some(atr) if self.price > 0.0 => Some(atr / self.price * 100.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(2.0));
        assert_eq!(result[3], Some(3.0));
        assert_eq!(result[4], Some(4.0));
    }

    #[test]
    fn test_ema() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = ema(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_eq!(result[2], Some(2.0)); // seeded with SMA
        // multiplier = 0.5: 2.0 + (4-2)*0.5 = 3.0, then 3.0 + (5-3)*0.5 = 4.0
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let values: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let result = rsi(&values, 14);
        assert_relative_eq!(result.last().unwrap().unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_bounds() {
        let values = vec![
            44.0, 44.3, 44.1, 43.6, 44.3, 44.8, 45.1, 45.4, 45.8, 46.1, 45.9, 46.3, 46.0, 46.4,
            46.2, 45.6, 46.2, 46.2, 46.0,
        ];
        for v in rsi(&values, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_macd_insufficient_history() {
        let values = vec![1.0, 2.0, 3.0];
        let (macd_line, signal_line, histogram) = macd(&values, 12, 26, 9);
        assert!(macd_line.iter().all(|v| v.is_none()));
        assert!(signal_line.iter().all(|v| v.is_none()));
        assert!(histogram.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_aroon_recent_high() {
        // Monotonic rise: the period high is always the current bar
        let high: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 0.5).collect();
        let (up, down) = aroon(&high, &low, 25);
        assert_relative_eq!(up.last().unwrap().unwrap(), 100.0);
        // Low is also most recent in a monotonic rise with fixed spread
        assert_relative_eq!(down.last().unwrap().unwrap(), 100.0);
    }

    #[test]
    fn test_obv_accumulates_on_up_closes() {
        let close = vec![10.0, 11.0, 10.5, 12.0];
        let volume = vec![100.0, 200.0, 150.0, 300.0];
        let result = obv(&close, &volume);
        assert_eq!(result, vec![0.0, 200.0, 50.0, 350.0]);
    }

    #[test]
    fn test_stochastic_bounds() {
        let high: Vec<f64> = (1..=30).map(|i| 100.0 + i as f64).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 2.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 1.0).collect();
        let (k, d) = stochastic(&high, &low, &close, 14, 3);
        for v in k.into_iter().chain(d).flatten() {
            assert!((0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn test_vwap_weighted_by_volume() {
        let candles = vec![
            Candle::new(0, 10.0, 10.0, 10.0, 10.0, 100.0).unwrap(),
            Candle::new(1, 20.0, 20.0, 20.0, 20.0, 300.0).unwrap(),
        ];
        // (10*100 + 20*300) / 400 = 17.5
        assert_relative_eq!(vwap(&candles).unwrap(), 17.5);
    }

    #[test]
    fn test_indicator_set_empty_window() {
        let set = IndicatorSet::compute(crate::types::Symbol::new("BTC"), &[]);
        assert_eq!(set.price, 0.0);
        assert!(set.ema20.is_none());
        assert!(set.rsi14.is_none());
        assert!(set.obv.is_none());
    }
}
