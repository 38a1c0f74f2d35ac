//! Incremental indicator implementations.
//!
//! Each indicator is a small accumulator fed one sealed candle at a time.
//! Wilder and EMA smoothing carry state from candle to candle, so the engine
//! constructs them once and feeds them every new candle instead of
//! recomputing from the bounded history.
//!
//! An indicator without enough history reports `None` ("not ready").
//! Downstream scoring treats `None` as contributing nothing.

pub mod adx;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use adx::Adx;
pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorSnapshot};
pub use macd::{Macd, MacdReading};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Candle;

/// A single-series indicator over sealed candles.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of candles needed before the first value.
    fn lookback(&self) -> usize;

    /// Feed the next sealed candle and return the updated value.
    fn update(&mut self, candle: &Candle) -> Option<f64>;

    /// Latest value, `None` until `lookback()` candles were fed.
    fn value(&self) -> Option<f64>;

    /// Forget all history.
    fn reset(&mut self);
}

/// Replay a candle series through a fresh indicator state.
///
/// Returns one entry per candle, `None` during warmup.
pub fn compute_series<I: Indicator + ?Sized>(indicator: &mut I, candles: &[Candle]) -> Vec<Option<f64>> {
    indicator.reset();
    candles.iter().map(|c| indicator.update(c)).collect()
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 0.5, low = min(open,close) - 0.5, volume = 100.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::{DateTime, Duration, Utc};
    let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let start = base + Duration::seconds(5 * i as i64);
            Candle {
                start_time: start,
                end_time: start + Duration::seconds(5),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 100.0,
                synthetic: false,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
