//! Bounded, chronologically ordered history of sealed candles.

use std::collections::VecDeque;

use crate::domain::Candle;

/// FIFO ring of the most recent `capacity` sealed candles.
#[derive(Debug, Clone)]
pub struct CandleHistory {
    capacity: usize,
    candles: VecDeque<Candle>,
}

impl CandleHistory {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "history capacity must be >= 1");
        Self {
            capacity,
            candles: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sealed candle, returning the evicted oldest candle on overflow.
    pub fn push(&mut self, candle: Candle) -> Option<Candle> {
        let evicted = if self.candles.len() == self.capacity {
            self.candles.pop_front()
        } else {
            None
        };
        self.candles.push_back(candle);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Candle> + ExactSizeIterator {
        self.candles.iter()
    }

    /// The newest `n` candles, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Candle> {
        let skip = self.candles.len().saturating_sub(n);
        self.candles.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }
}
