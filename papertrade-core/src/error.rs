//! Core error types.
//!
//! `InputError` is the only kind that stops the pipeline: bad configuration is
//! rejected at construction, bad ticks are rejected before any state changes.
//! Signal source and sink failures are recovered by the pipeline and reported
//! as step warnings.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("tick price is not finite: {0}")]
    NonFinitePrice(f64),
    #[error("tick price must be > 0, got {0}")]
    NonPositivePrice(f64),
    #[error("tick volume must be finite and >= 0, got {0}")]
    InvalidVolume(f64),
    #[error("tick at {tick} is older than the last accepted tick at {last}")]
    OutOfOrderTick {
        tick: DateTime<Utc>,
        last: DateTime<Utc>,
    },
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl InputError {
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Failure of a pluggable signal source. The pipeline falls back to rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalSourceError {
    #[error("request limit reached, cooling down until {until}")]
    RateLimited { until: DateTime<Utc> },
    #[error("signal service failed: {0}")]
    ServiceFailure(String),
}

/// Failure reported by a persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record sink failed: {0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(reason: impl std::fmt::Display) -> Self {
        Self(reason.to_string())
    }
}
