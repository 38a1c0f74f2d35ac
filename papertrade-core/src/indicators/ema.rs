//! Exponential Moving Average (EMA) by span.
//!
//! alpha = 2 / (span + 1)
//! EMA[0] = x[0]; EMA[t] = EMA[t-1] + alpha * (x[t] - EMA[t-1])
//! The recursion runs from the first sample; the value is reported once
//! `span` samples were seen.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    span: usize,
    alpha: f64,
    name: String,
    state: Option<f64>,
    count: usize,
}

impl Ema {
    pub fn new(span: usize) -> Self {
        assert!(span >= 1, "EMA span must be >= 1");
        Self {
            span,
            alpha: 2.0 / (span as f64 + 1.0),
            name: format!("ema_{span}"),
            state: None,
            count: 0,
        }
    }

    /// Feed one sample of an arbitrary series and return the raw EMA state.
    ///
    /// Composed indicators (MACD) use the raw state before the warmup gate.
    pub fn push(&mut self, x: f64) -> f64 {
        let next = match self.state {
            None => x,
            Some(prev) => prev + self.alpha * (x - prev),
        };
        self.state = Some(next);
        self.count += 1;
        next
    }

    /// Raw EMA state regardless of warmup.
    pub fn raw(&self) -> Option<f64> {
        self.state
    }

    pub fn samples(&self) -> usize {
        self.count
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.span
    }

    fn update(&mut self, candle: &Candle) -> Option<f64> {
        self.push(candle.close);
        self.value()
    }

    fn value(&self) -> Option<f64> {
        if self.count >= self.span {
            self.state
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.state = None;
        self.count = 0;
    }
}
