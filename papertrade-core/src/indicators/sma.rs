//! Simple Moving Average (SMA).
//!
//! Arithmetic mean of the last `period` closes.
//! Lookback: period (first value once `period` candles were fed).

use std::collections::VecDeque;

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
    window: VecDeque<f64>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
            window: VecDeque::with_capacity(period),
        }
    }

    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(value);
        self.current()
    }

    fn current(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        // Re-summed over the whole window on every update.
        Some(self.window.iter().sum::<f64>() / self.period as f64)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn update(&mut self, candle: &Candle) -> Option<f64> {
        self.push(candle.close)
    }

    fn value(&self) -> Option<f64> {
        self.current()
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, compute_series, make_candles, DEFAULT_EPSILON};

    #[test]
    fn sma_5_basic() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
        let result = compute_series(&mut Sma::new(5), &candles);

        assert_eq!(result.len(), 7);
        for (i, v) in result.iter().enumerate().take(4) {
            assert!(v.is_none(), "expected not-ready at index {i}");
        }
        // SMA[4] = mean(10,11,12,13,14) = 12.0
        assert_approx(result[4].unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(result[5].unwrap(), 13.0, DEFAULT_EPSILON);
        assert_approx(result[6].unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_1_is_close() {
        let candles = make_candles(&[100.0, 200.0, 300.0]);
        let result = compute_series(&mut Sma::new(1), &candles);
        assert_eq!(result, vec![Some(100.0), Some(200.0), Some(300.0)]);
    }

    #[test]
    fn sma_not_ready_one_short_of_window() {
        let candles = make_candles(&[1.0; 19]);
        let mut sma = Sma::new(20);
        compute_series(&mut sma, &candles);
        assert!(sma.value().is_none());
    }

    #[test]
    fn reset_clears_window() {
        let mut sma = Sma::new(2);
        sma.push(1.0);
        sma.push(2.0);
        assert!(sma.value().is_some());
        sma.reset();
        assert!(sma.value().is_none());
    }

    #[test]
    fn sma_lookback() {
        assert_eq!(Sma::new(20).lookback(), 20);
        assert_eq!(Sma::new(20).name(), "sma_20");
    }
}
