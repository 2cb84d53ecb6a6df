use std::collections::{BTreeMap, BTreeSet};

use analysis_core::Bar;
use serde::{Deserialize, Serialize};

use crate::indicators::*;
use crate::params::IndicatorParams;

/// Switches between the approximated signal lines and textbook smoothing.
/// The default keeps the approximation so scores stay comparable with
/// earlier runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorOptions {
    /// MACD signal as EMA of the MACD line, Stochastic %D as SMA(3) of %K
    pub smoothed_signal_lines: bool,
    /// Only count swing levels formed on at least average volume
    pub volume_filtered_levels: bool,
}

impl Default for IndicatorOptions {
    fn default() -> Self {
        Self {
            smoothed_signal_lines: false,
            volume_filtered_levels: true,
        }
    }
}

const STOCHASTIC_D_PERIOD: usize = 3;

/// Immutable snapshot of every indicator computed for one bar sequence.
///
/// Values that could not be computed hold their neutral default and are
/// reported as unavailable by [`IndicatorSet::get`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSet {
    values: BTreeMap<String, f64>,
    unavailable: BTreeSet<String>,
}

impl IndicatorSet {
    pub fn compute(bars: &[Bar], params: &IndicatorParams, options: &IndicatorOptions) -> Self {
        let mut set = IndicatorSet::default();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let n = bars.len();

        set.insert("sma_short", sma(&closes, params.sma_short), n >= params.sma_short);
        set.insert("sma_medium", sma(&closes, params.sma_medium), n >= params.sma_medium);
        set.insert("sma_long", sma(&closes, params.sma_long), n >= params.sma_long);
        set.insert("ema_fast", ema(&closes, params.ema_fast), n >= params.ema_fast);
        set.insert("ema_slow", ema(&closes, params.ema_slow), n >= params.ema_slow);
        set.insert("rsi", rsi(&closes, params.rsi_period), n > params.rsi_period);

        let macd_available = params.ema_slow > params.ema_fast && n >= params.ema_slow;
        let macd_result = if options.smoothed_signal_lines {
            macd_smoothed(&closes, params.ema_fast, params.ema_slow, params.macd_signal)
        } else {
            macd(&closes, params.ema_fast, params.ema_slow)
        };
        set.insert("macd", macd_result.macd, macd_available);
        set.insert("macd_signal", macd_result.signal, macd_available);
        set.insert("macd_histogram", macd_result.histogram, macd_available);

        let bb_available = n >= params.bollinger_period;
        let bb = bollinger_bands(&closes, params.bollinger_period, params.bollinger_std_dev);
        set.insert("bb_upper", bb.upper, bb_available);
        set.insert("bb_middle", bb.middle, bb_available);
        set.insert("bb_lower", bb.lower, bb_available);

        let stoch_available = n >= params.stochastic_period;
        let stoch = if options.smoothed_signal_lines {
            stochastic_smoothed(bars, params.stochastic_period, STOCHASTIC_D_PERIOD)
        } else {
            stochastic(bars, params.stochastic_period)
        };
        set.insert("stoch_k", stoch.k, stoch_available);
        set.insert("stoch_d", stoch.d, stoch_available);
        set.insert("williams_r", williams_r(bars, params.williams_period), n >= params.williams_period);
        set.insert("atr", atr(bars, params.atr_period), n > params.atr_period);

        set.insert("obv", obv(bars), n > 0);
        let obv_values = obv_series(bars);
        let obv_change = if n > params.volume_period {
            obv_values[n - 1] - obv_values[n - 1 - params.volume_period]
        } else {
            0.0
        };
        set.insert("obv_change", obv_change, n > params.volume_period);
        set.insert("vpt", vpt(bars), n > 1);
        set.insert("ad_line", accumulation_distribution(bars), n > 0);
        set.insert("vwap", vwap(bars), n > 0);

        set.insert("volume_avg", sma(&volumes, params.volume_period), n >= params.volume_period);
        set.insert("volume_latest", volumes.last().copied().unwrap_or(0.0), n > 0);
        let price_change = if n >= 2 { closes[n - 1] - closes[n - 2] } else { 0.0 };
        set.insert("price_change", price_change, n >= 2);

        let levels = support_resistance(
            bars,
            params.sr_lookback,
            params.sr_max_levels,
            options.volume_filtered_levels,
        );
        set.insert("pivot", levels.pivot, n > 0);
        set.insert("support_1", levels.support_1, n > 0);
        set.insert("support_2", levels.support_2, n > 0);
        set.insert("resistance_1", levels.resistance_1, n > 0);
        set.insert("resistance_2", levels.resistance_2, n > 0);

        let price = closes.last().copied().unwrap_or(0.0);
        let nearest_support = levels.nearest_support(price);
        let nearest_resistance = levels.nearest_resistance(price);
        set.insert("nearest_support", nearest_support.unwrap_or(0.0), nearest_support.is_some());
        set.insert(
            "nearest_resistance",
            nearest_resistance.unwrap_or(0.0),
            nearest_resistance.is_some(),
        );

        set
    }

    fn insert(&mut self, name: &str, value: f64, available: bool) {
        // Non-finite readings (e.g. zero closes upstream) count as unavailable
        let available = available && value.is_finite();
        let value = if value.is_finite() { value } else { 0.0 };
        self.values.insert(name.to_string(), value);
        if !available {
            self.unavailable.insert(name.to_string());
        }
    }

    /// Value of an available indicator
    pub fn get(&self, name: &str) -> Option<f64> {
        if self.unavailable.contains(name) {
            return None;
        }
        self.values.get(name).copied()
    }

    /// Stored value including neutral defaults
    pub fn raw(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.values.contains_key(name) && !self.unavailable.contains(name)
    }

    /// Available indicators in name order
    pub fn available(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values
            .iter()
            .filter(|(name, _)| !self.unavailable.contains(*name))
            .map(|(name, value)| (name.as_str(), *value))
    }

    pub fn unavailable_count(&self) -> usize {
        self.unavailable.len()
    }
}
