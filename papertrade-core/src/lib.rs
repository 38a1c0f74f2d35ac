//! Papertrade Core — simulated price feed, indicators, signal scoring, paper positions.
//!
//! This crate holds the numeric/decision pipeline:
//! - Synthetic price generator (sine waveform plus clipped Gaussian noise)
//! - Candle aggregator with a bounded, gap-free candle history
//! - Incremental indicator engine (RSI, MACD, ADX, fast/slow SMA)
//! - Rule-table signal engine and pluggable signal sources with rule fallback
//! - Paper position manager (sizing, expiry, HIT/MISS/NEUTRAL settlement)
//! - The single-threaded pipeline driver (`Pipeline::step`)
//!
//! Nothing in this crate performs I/O. Persistence is a `RecordSink` supplied
//! by the caller; scheduling belongs to whoever calls `step`.

pub mod config;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod market;
pub mod pipeline;
pub mod positions;
pub mod rng;
pub mod signal;
pub mod sink;

pub use config::{OperatingMode, PipelineConfig};
pub use error::InputError;
pub use pipeline::{Pipeline, PipelineError, PipelineWarning, StepOutput};
