//! Indicator engine: one accumulator per indicator, fed every sealed candle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Adx, Indicator, Macd, Rsi, Sma};
use crate::config::IndicatorConfig;
use crate::domain::Candle;

/// Indicator state after one sealed candle.
///
/// `None` means the indicator has not seen enough candles yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// Close time of the candle this snapshot was computed on.
    pub at: DateTime<Utc>,
    /// Close price of that candle.
    pub price: f64,
    pub candles_seen: usize,
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    /// Histogram one candle earlier, for zero-cross rules.
    pub macd_hist_prev: Option<f64>,
    pub ma_fast: Option<f64>,
    pub ma_slow: Option<f64>,
}

impl IndicatorSnapshot {
    /// Snapshot with every indicator not ready.
    pub fn warming_up(at: DateTime<Utc>, price: f64) -> Self {
        Self {
            at,
            price,
            candles_seen: 0,
            rsi: None,
            adx: None,
            macd_line: None,
            macd_signal: None,
            macd_hist: None,
            macd_hist_prev: None,
            ma_fast: None,
            ma_slow: None,
        }
    }

    /// True once every indicator reports a value.
    pub fn is_complete(&self) -> bool {
        self.rsi.is_some()
            && self.adx.is_some()
            && self.macd_hist.is_some()
            && self.macd_hist_prev.is_some()
            && self.ma_fast.is_some()
            && self.ma_slow.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    rsi: Rsi,
    adx: Adx,
    macd: Macd,
    ma_fast: Sma,
    ma_slow: Sma,
    candles_seen: usize,
    latest: Option<IndicatorSnapshot>,
}

impl IndicatorEngine {
    /// Build the accumulators. The config is expected to be validated.
    pub fn new(config: &IndicatorConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            adx: Adx::new(config.adx_period),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            ma_fast: Sma::new(config.ma_fast),
            ma_slow: Sma::new(config.ma_slow),
            candles_seen: 0,
            latest: None,
        }
    }

    /// Feed the next sealed candle.
    pub fn update(&mut self, candle: &Candle) -> IndicatorSnapshot {
        let macd_hist_prev = self.macd.value().map(|m| m.histogram);
        let macd = self.macd.update(candle);
        self.candles_seen += 1;

        let snapshot = IndicatorSnapshot {
            at: candle.end_time,
            price: candle.close,
            candles_seen: self.candles_seen,
            rsi: self.rsi.update(candle),
            adx: self.adx.update(candle),
            macd_line: macd.map(|m| m.line),
            macd_signal: macd.map(|m| m.signal),
            macd_hist: macd.map(|m| m.histogram),
            macd_hist_prev,
            ma_fast: self.ma_fast.update(candle),
            ma_slow: self.ma_slow.update(candle),
        };
        self.latest = Some(snapshot.clone());
        snapshot
    }

    /// Replay a candle history through fresh accumulators.
    ///
    /// Yields the same snapshot as feeding the candles one at a time.
    /// `None` for an empty history.
    pub fn compute(config: &IndicatorConfig, history: &[Candle]) -> Option<IndicatorSnapshot> {
        let mut engine = Self::new(config);
        history.iter().map(|c| engine.update(c)).last()
    }

    pub fn latest(&self) -> Option<&IndicatorSnapshot> {
        self.latest.as_ref()
    }

    pub fn candles_seen(&self) -> usize {
        self.candles_seen
    }

    /// Names of the underlying indicators, for logs and exports.
    pub fn indicator_names(&self) -> [&str; 4] {
        [
            self.rsi.name(),
            self.adx.name(),
            self.ma_fast.name(),
            self.ma_slow.name(),
        ]
    }
}
