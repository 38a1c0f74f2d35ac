//! The pipeline driver.
//!
//! One `step(now)` runs a full cycle on the caller's thread:
//! 1. draw a tick from the price generator
//! 2. fold it into the forming candle, sealing zero or more candles
//! 3. feed every sealed candle to the indicator engine and the record sink
//! 4. if a candle sealed, ask the signal source for a fresh signal
//! 5. settle positions whose expiry has passed, then open on a fresh signal
//!
//! Settlement only happens inside `step`. A caller that stops stepping
//! leaves OPEN positions pending indefinitely: nothing settles them in the
//! background, and they resume settling on the next call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

use crate::config::{OperatingMode, PipelineConfig};
use crate::domain::{AccountState, Candle, Position, Signal, SignalOrigin, Tick};
use crate::error::{InputError, SinkError};
use crate::indicators::{IndicatorEngine, IndicatorSnapshot};
use crate::market::{CandleAggregator, CandleHistory, PriceGenerator};
use crate::positions::PositionManager;
use crate::rng::RngHierarchy;
use crate::signal::advisor::PROMPT_CANDLES;
use crate::signal::{build_source, FallbackSource, RuleEngine, SignalSource};
use crate::sink::{CandleRecord, PositionRecord, RecordKind, RecordSink};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Non-fatal condition a presentation layer may want to surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The configured signal source failed; the rule engine answered.
    SignalFallback { reason: String },
    /// The record sink rejected a write. In-memory state is unaffected.
    PersistenceFailure { record: RecordKind, reason: String },
    /// Ticks skipped candle intervals; this many flat candles were sealed.
    GapFilled { synthetic: usize },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignalFallback { reason } => write!(f, "signal fallback: {reason}"),
            Self::PersistenceFailure { record, reason } => {
                write!(f, "failed to record {record:?}: {reason}")
            }
            Self::GapFilled { synthetic } => write!(f, "{synthetic} empty candle interval(s) filled"),
        }
    }
}

/// Everything one step produced. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub at: DateTime<Utc>,
    pub tick: Tick,
    /// Candles sealed by this tick, oldest first.
    pub sealed: Vec<Candle>,
    /// Snapshot of the newest sealed candle, if any sealed this step.
    pub snapshot: Option<IndicatorSnapshot>,
    /// Latest published signal; repeated on steps where no candle sealed.
    pub signal: Option<Signal>,
    /// True when `signal` was produced by this step.
    pub fresh_signal: bool,
    pub opened: Option<Position>,
    pub settled: Vec<Position>,
    pub account: AccountState,
    pub warnings: Vec<PipelineWarning>,
}

pub struct Pipeline {
    config: PipelineConfig,
    generator: PriceGenerator,
    aggregator: CandleAggregator,
    indicators: IndicatorEngine,
    source: FallbackSource<Box<dyn SignalSource>>,
    positions: PositionManager,
    sink: Box<dyn RecordSink>,
    mode: OperatingMode,
    latest_signal: Option<Signal>,
    steps: u64,
}

impl Pipeline {
    /// Validate the config and build every stage.
    pub fn new(config: PipelineConfig, sink: Box<dyn RecordSink>) -> Result<Self, PipelineError> {
        config.validate()?;
        let rngs = RngHierarchy::new(config.seed);
        let generator = PriceGenerator::new(config.generator.clone(), &rngs)?;
        let aggregator =
            CandleAggregator::new(config.candles.interval(), config.candles.history_capacity)?;
        let source = FallbackSource::new(
            build_source(&config.signal, &rngs),
            RuleEngine::new(config.signal.clone()),
        );

        info!(
            seed = config.seed,
            mode = ?config.mode,
            source = source.name(),
            "pipeline initialized"
        );

        Ok(Self {
            generator,
            aggregator,
            indicators: IndicatorEngine::new(&config.indicators),
            source,
            positions: PositionManager::new(config.account, config.positions.expiry()),
            sink,
            mode: config.mode,
            latest_signal: None,
            steps: 0,
            config,
        })
    }

    /// Replace the primary signal source. Rule fallback still applies.
    pub fn with_source(mut self, source: Box<dyn SignalSource>) -> Self {
        self.source = FallbackSource::new(source, RuleEngine::new(self.config.signal.clone()));
        self
    }

    /// Advance one cycle at `now` with a generated tick.
    ///
    /// `now` must not move backwards between calls. OPEN positions are only
    /// settled here, so they stay pending for as long as `step` is not called.
    pub fn step(&mut self, now: DateTime<Utc>) -> Result<StepOutput, PipelineError> {
        if let Some(last) = self.aggregator.last_tick() {
            if now < last {
                return Err(InputError::OutOfOrderTick { tick: now, last }.into());
            }
        }
        let tick = self.generator.next_tick(now);
        self.ingest_tick(tick)
    }

    /// Advance one cycle with an externally supplied tick.
    ///
    /// An invalid or out-of-order tick is rejected before any state changes.
    pub fn ingest_tick(&mut self, tick: Tick) -> Result<StepOutput, PipelineError> {
        let now = tick.timestamp;
        let sealed = self.aggregator.ingest(&tick)?;
        self.steps += 1;

        let mut warnings: Vec<PipelineWarning> = self
            .sink
            .drain_failures()
            .into_iter()
            .map(|failure| {
                error!(error = %failure.error, record = ?failure.record, "background record write failed");
                PipelineWarning::PersistenceFailure {
                    record: failure.record,
                    reason: failure.error.to_string(),
                }
            })
            .collect();
        if sealed.len() > 1 {
            warnings.push(PipelineWarning::GapFilled {
                synthetic: sealed.len() - 1,
            });
        }

        let mut snapshot = None;
        for candle in &sealed {
            let snap = self.indicators.update(candle);
            if let Err(err) = self.sink.record_candle(&CandleRecord::new(candle, &snap)) {
                error!(error = %err, start = %candle.start_time, "failed to record candle");
                warnings.push(PipelineWarning::PersistenceFailure {
                    record: RecordKind::Candle,
                    reason: err.to_string(),
                });
            }
            snapshot = Some(snap);
        }

        let fresh_signal = match &snapshot {
            Some(snap) => {
                let recent = self.aggregator.history().recent(PROMPT_CANDLES);
                let signal = self.source.produce_or_fallback(snap, &recent);
                if signal.origin == SignalOrigin::RulesFallback {
                    warnings.push(PipelineWarning::SignalFallback {
                        reason: signal.fallback_reason.clone().unwrap_or_default(),
                    });
                }
                info!(
                    direction = %signal.direction,
                    confidence = signal.confidence,
                    net = signal.net_score,
                    origin = signal.origin.as_str(),
                    "signal"
                );
                self.latest_signal = Some(signal);
                true
            }
            None => false,
        };

        let settled = self.positions.settle_due(now, tick.price);
        for position in &settled {
            if let Err(err) = self.sink.record_position(&PositionRecord::from(position)) {
                error!(error = %err, id = %position.id, "failed to record position");
                warnings.push(PipelineWarning::PersistenceFailure {
                    record: RecordKind::Position,
                    reason: err.to_string(),
                });
            }
        }

        let opened = match (&self.latest_signal, fresh_signal) {
            (Some(signal), true) => self.positions.try_open(signal, tick.price, now, self.mode),
            _ => None,
        };

        Ok(StepOutput {
            at: now,
            tick,
            sealed,
            snapshot,
            signal: self.latest_signal.clone(),
            fresh_signal,
            opened,
            settled,
            account: *self.positions.account(),
            warnings,
        })
    }

    /// Wait for the record sink to write everything it has accepted.
    pub fn flush_records(&mut self) -> Result<(), SinkError> {
        self.sink.flush()
    }

    /// Switch operating mode. Open positions keep settling as before.
    pub fn set_mode(&mut self, mode: OperatingMode) {
        if mode != self.mode {
            info!(from = ?self.mode, to = ?mode, "operating mode changed");
            self.mode = mode;
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn history(&self) -> &CandleHistory {
        self.aggregator.history()
    }

    pub fn forming_candle(&self) -> Option<&Candle> {
        self.aggregator.forming()
    }

    pub fn latest_snapshot(&self) -> Option<&IndicatorSnapshot> {
        self.indicators.latest()
    }

    pub fn latest_signal(&self) -> Option<&Signal> {
        self.latest_signal.as_ref()
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    pub fn account(&self) -> &AccountState {
        self.positions.account()
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("mode", &self.mode)
            .field("source", &self.source.name())
            .field("steps", &self.steps)
            .field("candles", &self.aggregator.history().len())
            .field("account", self.positions.account())
            .finish_non_exhaustive()
    }
}
