use analysis_core::{AnalysisContext, Timeframe};
use serde::{Deserialize, Serialize};

/// Version of the period table below. Bump on any change to a value, since
/// every change shifts emitted scores.
pub const PARAMETER_TABLE_VERSION: &str = "2024.2";

/// Indicator periods and thresholds for one (context, timeframe) bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub sma_short: usize,
    pub sma_medium: usize,
    pub sma_long: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub atr_period: usize,
    pub stochastic_period: usize,
    pub williams_period: usize,
    pub volume_period: usize,
    pub sr_lookback: usize,
    pub sr_max_levels: usize,
}

const INVESTMENT: IndicatorParams = IndicatorParams {
    sma_short: 20,
    sma_medium: 50,
    sma_long: 200,
    ema_fast: 12,
    ema_slow: 26,
    macd_signal: 9,
    rsi_period: 14,
    rsi_oversold: 30.0,
    rsi_overbought: 70.0,
    bollinger_period: 20,
    bollinger_std_dev: 2.0,
    atr_period: 14,
    stochastic_period: 14,
    williams_period: 14,
    volume_period: 20,
    sr_lookback: 50,
    sr_max_levels: 3,
};

// Investment analysis asked for a short horizon: drop the 200-bar average
const INVESTMENT_SHORT_HORIZON: IndicatorParams = IndicatorParams {
    sma_long: 100,
    sr_lookback: 30,
    ..INVESTMENT
};

const TRADING: IndicatorParams = IndicatorParams {
    sma_short: 10,
    sma_medium: 20,
    sma_long: 50,
    ema_fast: 12,
    ema_slow: 26,
    macd_signal: 9,
    rsi_period: 14,
    rsi_oversold: 25.0,
    rsi_overbought: 75.0,
    bollinger_period: 20,
    bollinger_std_dev: 2.0,
    atr_period: 14,
    stochastic_period: 14,
    williams_period: 14,
    volume_period: 20,
    sr_lookback: 30,
    sr_max_levels: 3,
};

const TRADING_SWING: IndicatorParams = IndicatorParams {
    ema_fast: 8,
    ema_slow: 21,
    rsi_period: 9,
    bollinger_period: 15,
    atr_period: 10,
    stochastic_period: 10,
    williams_period: 10,
    volume_period: 15,
    sr_lookback: 20,
    ..TRADING
};

const TRADING_INTRADAY: IndicatorParams = IndicatorParams {
    sma_short: 5,
    sma_medium: 10,
    sma_long: 20,
    ema_fast: 5,
    ema_slow: 13,
    macd_signal: 5,
    rsi_period: 7,
    bollinger_period: 10,
    bollinger_std_dev: 1.5,
    atr_period: 7,
    stochastic_period: 9,
    williams_period: 9,
    volume_period: 10,
    sr_lookback: 10,
    sr_max_levels: 2,
    ..TRADING
};

impl IndicatorParams {
    /// Look up the static table entry for a context and optional timeframe
    pub fn resolve(context: AnalysisContext, timeframe: Option<Timeframe>) -> Self {
        match (context, timeframe) {
            (AnalysisContext::Trading, Some(Timeframe::OneDay)) => TRADING_INTRADAY,
            (AnalysisContext::Trading, Some(Timeframe::OneWeek)) => TRADING_SWING,
            (AnalysisContext::Trading, _) => TRADING,
            (AnalysisContext::Investment, Some(tf)) if tf.is_short_term() => INVESTMENT_SHORT_HORIZON,
            (AnalysisContext::Investment, _) => INVESTMENT,
        }
    }

    /// Longest lookback any indicator in this set needs
    pub fn longest_period(&self) -> usize {
        [
            self.sma_long,
            self.ema_slow + self.macd_signal,
            self.rsi_period + 1,
            self.bollinger_period,
            self.atr_period + 1,
            self.stochastic_period,
            self.williams_period,
            self.volume_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}
