//! Tick — one simulated price observation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// A price tick, produced and consumed within one driver cycle.
///
/// `volume` is the synthetic traded volume the tick adds to its candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
}

impl Tick {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// Reject prices and volumes that would corrupt a candle.
    pub fn validate(&self) -> Result<(), InputError> {
        if !self.price.is_finite() {
            return Err(InputError::NonFinitePrice(self.price));
        }
        if self.price <= 0.0 {
            return Err(InputError::NonPositivePrice(self.price));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(InputError::InvalidVolume(self.volume));
        }
        Ok(())
    }
}
