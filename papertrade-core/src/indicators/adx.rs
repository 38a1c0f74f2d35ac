//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. +DM and -DM and true range from consecutive candles
//! 2. Seed smoothed +DM, -DM and TR with the mean of the first `period` samples,
//!    then Wilder-smooth them: s = (s * (period - 1) + x) / period
//! 3. +DI = 100 * +DM / TR, -DI = 100 * -DM / TR
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when either denominator is 0
//! 5. ADX = mean of the first `period` DX values, then Wilder-smoothed DX
//!
//! Lookback: 2 * period candles.

use super::Indicator;
use crate::domain::Candle;

/// Wilder smoothing state: mean while seeding, then the recursive average.
#[derive(Debug, Clone, Default)]
struct Wilder {
    value: f64,
    samples: usize,
}

impl Wilder {
    fn push(&mut self, x: f64, period: usize) -> Option<f64> {
        let n = period as f64;
        if self.samples < period {
            self.value += x;
            self.samples += 1;
            if self.samples < period {
                return None;
            }
            self.value /= n;
        } else {
            self.value = (self.value * (n - 1.0) + x) / n;
        }
        Some(self.value)
    }
}

/// True range against the previous close.
pub fn true_range(candle: &Candle, prev_close: f64) -> f64 {
    let hl = candle.high - candle.low;
    let hc = (candle.high - prev_close).abs();
    let lc = (candle.low - prev_close).abs();
    hl.max(hc).max(lc)
}

/// (+DM, -DM) between two consecutive candles.
pub fn directional_movement(candle: &Candle, prev: &Candle) -> (f64, f64) {
    let up = candle.high - prev.high;
    let down = prev.low - candle.low;
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    (plus, minus)
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
    prev: Option<Candle>,
    tr: Wilder,
    plus_dm: Wilder,
    minus_dm: Wilder,
    adx: Wilder,
    latest: Option<f64>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
            prev: None,
            tr: Wilder::default(),
            plus_dm: Wilder::default(),
            minus_dm: Wilder::default(),
            adx: Wilder::default(),
            latest: None,
        }
    }
}

fn dx(plus_dm: f64, minus_dm: f64, tr: f64) -> f64 {
    if tr <= 0.0 {
        return 0.0;
    }
    let plus_di = 100.0 * plus_dm / tr;
    let minus_di = 100.0 * minus_dm / tr;
    let sum = plus_di + minus_di;
    if sum <= 0.0 {
        return 0.0;
    }
    100.0 * (plus_di - minus_di).abs() / sum
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period
    }

    fn update(&mut self, candle: &Candle) -> Option<f64> {
        let Some(prev) = self.prev.replace(candle.clone()) else {
            return None;
        };
        let (plus, minus) = directional_movement(candle, &prev);
        let tr = self.tr.push(true_range(candle, prev.close), self.period);
        let plus = self.plus_dm.push(plus, self.period);
        let minus = self.minus_dm.push(minus, self.period);

        if let (Some(tr), Some(plus), Some(minus)) = (tr, plus, minus) {
            self.latest = self.adx.push(dx(plus, minus, tr), self.period);
        }
        self.latest
    }

    fn value(&self) -> Option<f64> {
        self.latest
    }

    fn reset(&mut self) {
        *self = Self::new(self.period);
    }
}
