//! MACD: difference of two close EMAs, with a signal EMA over the difference.
//!
//! line = EMA(fast) - EMA(slow); signal = EMA(signal_span) of line;
//! histogram = line - signal.
//! All three EMAs recurse from the first candle. The reading is reported
//! once the slow EMA has seen `slow` candles.

use serde::{Deserialize, Serialize};

use super::{Ema, Indicator};
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    slow_span: usize,
    latest: Option<MacdReading>,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "MACD fast span must be below slow span");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            slow_span: slow,
            latest: None,
        }
    }

    pub fn lookback(&self) -> usize {
        self.slow_span
    }

    pub fn update(&mut self, candle: &Candle) -> Option<MacdReading> {
        let line = self.fast.push(candle.close) - self.slow.push(candle.close);
        let signal = self.signal.push(line);
        self.latest = (self.slow.samples() >= self.slow_span).then_some(MacdReading {
            line,
            signal,
            histogram: line - signal,
        });
        self.latest
    }

    pub fn value(&self) -> Option<MacdReading> {
        self.latest
    }

    pub fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
        self.latest = None;
    }
}
