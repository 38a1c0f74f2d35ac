//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! Seed: plain mean of the first `period` close-to-close changes.
//! Then avg = (avg * (period - 1) + new) / period.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period + 1 candles (period changes).

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
    prev_close: Option<f64>,
    // Sums while seeding, Wilder averages once `changes == period`.
    avg_gain: f64,
    avg_loss: f64,
    changes: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
            prev_close: None,
            avg_gain: 0.0,
            avg_loss: 0.0,
            changes: 0,
        }
    }

    fn push(&mut self, close: f64) -> Option<f64> {
        let Some(prev) = self.prev_close.replace(close) else {
            return None;
        };
        let change = close - prev;
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };

        let n = self.period as f64;
        if self.changes < self.period {
            self.avg_gain += gain;
            self.avg_loss += loss;
            self.changes += 1;
            if self.changes == self.period {
                self.avg_gain /= n;
                self.avg_loss /= n;
            }
        } else {
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }
        self.value()
    }
}

/// RSI from smoothed averages.
///
/// Both zero → 50 (no movement); avg_loss zero → 100; avg_gain zero → 0.
pub fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain == 0.0 && avg_loss == 0.0 {
        return 50.0;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    if avg_gain == 0.0 {
        return 0.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn update(&mut self, candle: &Candle) -> Option<f64> {
        self.push(candle.close)
    }

    fn value(&self) -> Option<f64> {
        if self.changes < self.period {
            return None;
        }
        Some(compute_rsi(self.avg_gain, self.avg_loss))
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.avg_gain = 0.0;
        self.avg_loss = 0.0;
        self.changes = 0;
    }
}
