//! Persistence hooks.
//!
//! The pipeline hands one `CandleRecord` per sealed candle and one
//! `PositionRecord` per settled position to a `RecordSink`. Writes are
//! best-effort: a failing sink produces a step warning and never rolls back
//! pipeline state. A sink that writes in the background reports its failures
//! later through `drain_failures`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Position};
use crate::error::SinkError;
use crate::indicators::IndicatorSnapshot;

/// A sealed candle together with the indicator readings computed on it.
///
/// Indicators that were not ready serialize as empty fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub synthetic: bool,
    pub rsi: Option<f64>,
    pub adx: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub ma_fast: Option<f64>,
    pub ma_slow: Option<f64>,
}

impl CandleRecord {
    pub fn new(candle: &Candle, snapshot: &IndicatorSnapshot) -> Self {
        Self {
            start_time: candle.start_time,
            end_time: candle.end_time,
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            synthetic: candle.synthetic,
            rsi: snapshot.rsi,
            adx: snapshot.adx,
            macd_line: snapshot.macd_line,
            macd_signal: snapshot.macd_signal,
            macd_hist: snapshot.macd_hist,
            ma_fast: snapshot.ma_fast,
            ma_slow: snapshot.ma_slow,
        }
    }
}

/// Flat view of a settled position for trade logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: String,
    pub opened_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub direction: String,
    pub confidence: f64,
    pub source: String,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub size: f64,
    pub status: String,
    pub pnl: Option<f64>,
    pub balance_before: f64,
    pub balance_after: Option<f64>,
}

impl From<&Position> for PositionRecord {
    fn from(p: &Position) -> Self {
        Self {
            id: p.id.to_string(),
            opened_at: p.opened_at,
            expires_at: p.expires_at,
            settled_at: p.settled_at,
            direction: p.side.direction().to_string(),
            confidence: p.confidence,
            source: p.origin.as_str().to_string(),
            entry_price: p.entry_price,
            exit_price: p.exit_price,
            size: p.size,
            status: p.status.as_str().to_string(),
            pnl: p.pnl,
            balance_before: p.balance_before,
            balance_after: p.balance_after,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Candle,
    Position,
}

/// A write that failed after the sink had accepted the record.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkFailure {
    pub record: RecordKind,
    pub error: SinkError,
}

pub trait RecordSink: Send {
    fn record_candle(&mut self, record: &CandleRecord) -> Result<(), SinkError>;

    fn record_position(&mut self, record: &PositionRecord) -> Result<(), SinkError>;

    /// Failures of previously accepted writes, oldest first.
    fn drain_failures(&mut self) -> Vec<SinkFailure> {
        Vec::new()
    }

    /// Block until every accepted record has been written.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn record_candle(&mut self, _record: &CandleRecord) -> Result<(), SinkError> {
        Ok(())
    }

    fn record_position(&mut self, _record: &PositionRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps records in memory. Used by tests and in-process consumers.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub candles: Vec<CandleRecord>,
    pub positions: Vec<PositionRecord>,
}

impl RecordSink for MemorySink {
    fn record_candle(&mut self, record: &CandleRecord) -> Result<(), SinkError> {
        self.candles.push(record.clone());
        Ok(())
    }

    fn record_position(&mut self, record: &PositionRecord) -> Result<(), SinkError> {
        self.positions.push(record.clone());
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn record_candle(&mut self, record: &CandleRecord) -> Result<(), SinkError> {
        (**self).record_candle(record)
    }

    fn record_position(&mut self, record: &PositionRecord) -> Result<(), SinkError> {
        (**self).record_position(record)
    }

    fn drain_failures(&mut self) -> Vec<SinkFailure> {
        (**self).drain_failures()
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        (**self).flush()
    }
}
