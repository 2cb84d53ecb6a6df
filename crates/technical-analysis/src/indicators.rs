use analysis_core::Bar;

/// Neutral defaults returned when a series is too short for the requested
/// period. Callers must treat them as "unavailable", not as a reading.
pub const NEUTRAL_RSI: f64 = 50.0;
pub const NEUTRAL_STOCHASTIC: f64 = 50.0;
pub const NEUTRAL_WILLIAMS_R: f64 = -50.0;

/// Fraction of the MACD line used as its signal line when no smoothing is
/// requested.
pub const MACD_SIGNAL_FRACTION: f64 = 0.9;

/// Simple Moving Average of the last `period` values (0.0 when unavailable)
pub fn sma(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period {
        return 0.0;
    }
    data[data.len() - period..].iter().sum::<f64>() / period as f64
}

/// Rolling Simple Moving Average, one value per full window
pub fn sma_series(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Exponential Moving Average series, seeded with the SMA of the first
/// `period` values. The first element corresponds to `data[period - 1]`.
pub fn ema_series(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(seed);
    for &value in &data[period..] {
        let prev = result[result.len() - 1];
        result.push(value * multiplier + prev * (1.0 - multiplier));
    }
    result
}

/// Latest Exponential Moving Average (0.0 when unavailable)
pub fn ema(data: &[f64], period: usize) -> f64 {
    ema_series(data, period).last().copied().unwrap_or(0.0)
}

/// Relative Strength Index over the last `period` price changes, using simple
/// averages of gains and losses.
pub fn rsi(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &data[data.len() - period - 1..];
    let (gains, losses) = window.windows(2).fold((0.0, 0.0), |(gains, losses), w| {
        let change = w[1] - w[0];
        if change > 0.0 {
            (gains + change, losses)
        } else {
            (gains, losses - change)
        }
    });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD (Moving Average Convergence Divergence)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD with the signal line approximated as a fixed fraction of the MACD line
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize) -> Macd {
    if fast_period == 0 || slow_period <= fast_period || data.len() < slow_period {
        return Macd::default();
    }

    let line = ema(data, fast_period) - ema(data, slow_period);
    let signal = line * MACD_SIGNAL_FRACTION;
    Macd {
        macd: line,
        signal,
        histogram: line - signal,
    }
}

/// MACD line for every bar where both EMAs exist
pub fn macd_line_series(data: &[f64], fast_period: usize, slow_period: usize) -> Vec<f64> {
    if fast_period == 0 || slow_period <= fast_period || data.len() < slow_period {
        return vec![];
    }

    let ema_fast = ema_series(data, fast_period);
    let ema_slow = ema_series(data, slow_period);
    let offset = slow_period - fast_period;

    ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect()
}

/// MACD with a textbook EMA signal line. Falls back to the fractional signal
/// while the MACD series is still shorter than `signal_period`.
pub fn macd_smoothed(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> Macd {
    let line_series = macd_line_series(data, fast_period, slow_period);
    let Some(&line) = line_series.last() else {
        return Macd::default();
    };

    let signal = ema_series(&line_series, signal_period)
        .last()
        .copied()
        .unwrap_or(line * MACD_SIGNAL_FRACTION);

    Macd {
        macd: line,
        signal,
        histogram: line - signal,
    }
}

/// Bollinger Bands
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands over the last `period` values using the population
/// standard deviation. All bands are 0.0 when unavailable.
pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if period == 0 || data.len() < period {
        return BollingerBands::default();
    }

    let slice = &data[data.len() - period..];
    let middle = sma(data, period);
    let variance = slice.iter().map(|x| (x - middle).powi(2)).sum::<f64>() / period as f64;
    let band = std_dev * variance.sqrt();

    BollingerBands {
        upper: middle + band,
        middle,
        lower: middle - band,
    }
}

/// Stochastic Oscillator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
}

impl Default for Stochastic {
    fn default() -> Self {
        Self {
            k: NEUTRAL_STOCHASTIC,
            d: NEUTRAL_STOCHASTIC,
        }
    }
}

fn high_low(bars: &[Bar]) -> (f64, f64) {
    let highest = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let lowest = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    (highest, lowest)
}

fn percent_k(window: &[Bar]) -> f64 {
    let (highest, lowest) = high_low(window);
    let close = window[window.len() - 1].close;
    if highest == lowest {
        NEUTRAL_STOCHASTIC
    } else {
        100.0 * (close - lowest) / (highest - lowest)
    }
}

/// Stochastic %K over the last `period` bars; %D mirrors %K
pub fn stochastic(bars: &[Bar], period: usize) -> Stochastic {
    if period == 0 || bars.len() < period {
        return Stochastic::default();
    }

    let k = percent_k(&bars[bars.len() - period..]);
    Stochastic { k, d: k }
}

/// Stochastic with %D as the SMA of the last `d_period` %K readings. %D
/// mirrors %K until enough readings exist.
pub fn stochastic_smoothed(bars: &[Bar], period: usize, d_period: usize) -> Stochastic {
    if period == 0 || bars.len() < period {
        return Stochastic::default();
    }

    let k_values: Vec<f64> = bars.windows(period).map(percent_k).collect();
    let k = k_values[k_values.len() - 1];
    let d = if d_period > 0 && k_values.len() >= d_period {
        sma(&k_values, d_period)
    } else {
        k
    };
    Stochastic { k, d }
}

/// Williams %R in [-100, 0]
pub fn williams_r(bars: &[Bar], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return NEUTRAL_WILLIAMS_R;
    }

    let window = &bars[bars.len() - period..];
    let (highest, lowest) = high_low(window);
    if highest == lowest {
        return NEUTRAL_WILLIAMS_R;
    }
    -100.0 * (highest - window[window.len() - 1].close) / (highest - lowest)
}

/// True range for every bar after the first
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let high_low = w[1].high - w[1].low;
            let high_close = (w[1].high - w[0].close).abs();
            let low_close = (w[1].low - w[0].close).abs();
            high_low.max(high_close).max(low_close)
        })
        .collect()
}

/// Average True Range: SMA of the last `period` true ranges
pub fn atr(bars: &[Bar], period: usize) -> f64 {
    sma(&true_ranges(bars), period)
}

/// On-Balance Volume series, starting from zero
pub fn obv_series(bars: &[Bar]) -> Vec<f64> {
    let mut obv_values = Vec::with_capacity(bars.len());
    let mut running = 0.0;
    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].close;
            if bar.close > prev_close {
                running += bar.volume;
            } else if bar.close < prev_close {
                running -= bar.volume;
            }
        }
        obv_values.push(running);
    }
    obv_values
}

/// Latest On-Balance Volume
pub fn obv(bars: &[Bar]) -> f64 {
    obv_series(bars).last().copied().unwrap_or(0.0)
}

/// Volume-Price Trend
pub fn vpt(bars: &[Bar]) -> f64 {
    bars.windows(2)
        .filter(|w| w[0].close != 0.0)
        .map(|w| w[1].volume * (w[1].close - w[0].close) / w[0].close)
        .sum()
}

/// Accumulation/Distribution line
pub fn accumulation_distribution(bars: &[Bar]) -> f64 {
    bars.iter()
        .filter(|b| b.high != b.low)
        .map(|b| {
            let multiplier = ((b.close - b.low) - (b.high - b.close)) / (b.high - b.low);
            multiplier * b.volume
        })
        .sum()
}

/// Volume-Weighted Average Price over the whole series
pub fn vwap(bars: &[Bar]) -> f64 {
    let Some(last) = bars.last() else {
        return 0.0;
    };

    let (cumulative_tpv, cumulative_volume) = bars.iter().fold((0.0, 0.0), |(tpv, vol), bar| {
        (tpv + bar.typical_price() * bar.volume, vol + bar.volume)
    });

    if cumulative_volume > 0.0 {
        cumulative_tpv / cumulative_volume
    } else {
        last.typical_price()
    }
}

/// Pivot-point levels plus clustered swing levels
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SupportResistance {
    pub pivot: f64,
    pub support_1: f64,
    pub support_2: f64,
    pub resistance_1: f64,
    pub resistance_2: f64,
    /// Swing lows, closest to the latest close first
    pub supports: Vec<f64>,
    /// Swing highs, closest to the latest close first
    pub resistances: Vec<f64>,
}

impl SupportResistance {
    /// Highest support level at or below `price`
    pub fn nearest_support(&self, price: f64) -> Option<f64> {
        [self.support_1, self.support_2]
            .iter()
            .chain(self.supports.iter())
            .copied()
            .filter(|&level| level > 0.0 && level <= price)
            .reduce(f64::max)
    }

    /// Lowest resistance level at or above `price`
    pub fn nearest_resistance(&self, price: f64) -> Option<f64> {
        [self.resistance_1, self.resistance_2]
            .iter()
            .chain(self.resistances.iter())
            .copied()
            .filter(|&level| level >= price)
            .reduce(f64::min)
    }
}

/// Support and resistance from the last `lookback` bars.
///
/// Pivot levels come from the latest bar of the window. Swing levels are bars
/// whose low (high) is strictly below (above) both neighbours; with
/// `volume_filter` only bars trading at least the window's mean volume count.
/// At most `max_levels` swing levels per side are kept, nearest first.
pub fn support_resistance(
    bars: &[Bar],
    lookback: usize,
    max_levels: usize,
    volume_filter: bool,
) -> SupportResistance {
    if bars.is_empty() || lookback == 0 {
        return SupportResistance::default();
    }

    let window = &bars[bars.len().saturating_sub(lookback)..];
    let latest = &window[window.len() - 1];
    let pivot = latest.typical_price();
    let range = latest.high - latest.low;

    let mean_volume = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
    let qualifies = |bar: &Bar| !volume_filter || bar.volume >= mean_volume;

    let mut supports = Vec::new();
    let mut resistances = Vec::new();
    for i in 1..window.len().saturating_sub(1) {
        let (prev, bar, next) = (&window[i - 1], &window[i], &window[i + 1]);
        if !qualifies(bar) {
            continue;
        }
        if bar.low < prev.low && bar.low < next.low {
            supports.push(bar.low);
        }
        if bar.high > prev.high && bar.high > next.high {
            resistances.push(bar.high);
        }
    }

    let price = latest.close;
    let by_distance = |a: &f64, b: &f64| (price - a).abs().total_cmp(&(price - b).abs());
    supports.sort_by(by_distance);
    resistances.sort_by(by_distance);
    supports.truncate(max_levels);
    resistances.truncate(max_levels);

    SupportResistance {
        pivot,
        support_1: 2.0 * pivot - latest.high,
        support_2: pivot - range,
        resistance_1: 2.0 * pivot - latest.low,
        resistance_2: pivot + range,
        supports,
        resistances,
    }
}
