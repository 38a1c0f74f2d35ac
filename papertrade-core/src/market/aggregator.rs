//! Candle aggregator — buckets ticks into fixed-duration OHLCV candles.
//!
//! Buckets are aligned to multiples of the interval since the Unix epoch.
//! Every interval boundary crossed seals exactly one candle: when ticks skip
//! whole intervals, a flat zero-volume candle at the previous close is sealed
//! for each skipped interval so the history keeps fixed time spacing.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::domain::{Candle, Tick};
use crate::error::InputError;

use super::history::CandleHistory;

#[derive(Debug, Clone)]
pub struct CandleAggregator {
    interval: Duration,
    forming: Option<Candle>,
    history: CandleHistory,
    last_tick: Option<DateTime<Utc>>,
}

impl CandleAggregator {
    pub fn new(interval: Duration, history_capacity: usize) -> Result<Self, InputError> {
        if interval <= Duration::zero() {
            return Err(InputError::config("candles.interval_secs", "must be > 0"));
        }
        if history_capacity == 0 {
            return Err(InputError::config("candles.history_capacity", "must be > 0"));
        }
        Ok(Self {
            interval,
            forming: None,
            history: CandleHistory::new(history_capacity),
            last_tick: None,
        })
    }

    /// Fold a tick into the forming candle.
    ///
    /// Returns the candles sealed by this tick, oldest first: empty while the
    /// tick stays inside the current bucket, one on a normal boundary, more
    /// when intervals were skipped. An invalid or out-of-order tick is
    /// rejected before any state changes.
    pub fn ingest(&mut self, tick: &Tick) -> Result<Vec<Candle>, InputError> {
        tick.validate()?;
        if let Some(last) = self.last_tick {
            if tick.timestamp < last {
                return Err(InputError::OutOfOrderTick {
                    tick: tick.timestamp,
                    last,
                });
            }
        }
        self.last_tick = Some(tick.timestamp);

        let bucket_start = self.bucket_start(tick.timestamp);
        let mut sealed = Vec::new();

        match self.forming.take() {
            None => {}
            Some(mut candle) if candle.contains(tick.timestamp) => {
                candle.absorb(tick.price, tick.volume);
                self.forming = Some(candle);
                return Ok(sealed);
            }
            Some(candle) => {
                let mut prev_close = candle.close;
                let mut next_start = candle.end_time;
                sealed.push(candle);

                while next_start < bucket_start {
                    let filler = Candle::flat(next_start, next_start + self.interval, prev_close);
                    prev_close = filler.close;
                    next_start = filler.end_time;
                    sealed.push(filler);
                }
                if sealed.len() > 1 {
                    warn!(
                        skipped = sealed.len() - 1,
                        resume = %bucket_start,
                        "ticks skipped candle intervals, sealing flat candles"
                    );
                }
            }
        }

        for candle in &sealed {
            debug!(
                start = %candle.start_time,
                open = candle.open,
                high = candle.high,
                low = candle.low,
                close = candle.close,
                synthetic = candle.synthetic,
                "candle sealed"
            );
            self.history.push(candle.clone());
        }

        self.forming = Some(Candle::open_at(
            bucket_start,
            bucket_start + self.interval,
            tick.price,
            tick.volume,
        ));
        Ok(sealed)
    }

    /// Start of the epoch-aligned bucket containing `at`.
    fn bucket_start(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let interval_ms = self.interval.num_milliseconds();
        let offset = at.timestamp_millis().rem_euclid(interval_ms);
        at - Duration::milliseconds(offset)
    }

    pub fn history(&self) -> &CandleHistory {
        &self.history
    }

    /// The candle still collecting ticks, if any.
    pub fn forming(&self) -> Option<&Candle> {
        self.forming.as_ref()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Timestamp of the last accepted tick.
    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.last_tick
    }
}
