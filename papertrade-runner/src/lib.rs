//! Papertrade Runner — session orchestration on top of `papertrade-core`.
//!
//! This crate provides:
//! - TOML session configuration with validation and content-hash ids
//! - The CSV journal (market and trade logs) written on a background thread
//! - Account persistence between sessions
//! - Simulated-clock sessions and a background wall-clock session worker
//! - Performance summaries, parallel multi-seed batches, report export

pub mod account;
pub mod batch;
pub mod config;
pub mod export;
pub mod journal;
pub mod session;
pub mod summary;
pub mod writer;

pub use batch::{run_batch, seed_range, SeedOutcome};
pub use config::{ConfigError, JournalConfig, SessionConfig};
pub use journal::{CsvJournal, JournalError};
pub use session::{
    spawn_session, Session, SessionCommand, SessionError, SessionEvent, SessionHandle,
    SessionReport,
};
pub use summary::PerformanceSummary;
pub use writer::BackgroundSink;
