//! Candle — the OHLCV summary of one fixed-duration bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle covering `[start_time, end_time)`.
///
/// A candle is mutable while its bucket is open inside the aggregator and is
/// handed out only once sealed. `synthetic` marks a zero-movement candle the
/// aggregator inserted for an interval in which no tick arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub synthetic: bool,
}

impl Candle {
    /// Open a candle with open = high = low = close = `price`.
    pub fn open_at(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        price: f64,
        volume: f64,
    ) -> Self {
        Self {
            start_time,
            end_time,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            synthetic: false,
        }
    }

    /// A zero-movement, zero-volume candle pinned at the previous close.
    pub fn flat(start_time: DateTime<Utc>, end_time: DateTime<Utc>, price: f64) -> Self {
        Self {
            synthetic: true,
            ..Self::open_at(start_time, end_time, price, 0.0)
        }
    }

    /// Fold one more tick into an open candle.
    pub fn absorb(&mut self, price: f64, volume: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume;
    }

    /// Check if a timestamp falls inside this candle's bucket.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_time && at < self.end_time
    }

    /// OHLC sanity: low <= open, close <= high, and volume >= 0.
    pub fn is_sane(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.volume >= 0.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}
