//! CSV journal: the append-only market and trade logs.
//!
//! One row per sealed candle in the market log, one row per settled
//! position in the trade log. Files are opened in append mode and the
//! header is written only when a file is new or empty, so restarting a
//! session extends the existing logs.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use papertrade_core::error::SinkError;
use papertrade_core::sink::{CandleRecord, PositionRecord, RecordSink};

use crate::config::JournalConfig;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("journal CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub struct CsvJournal {
    market_path: PathBuf,
    trade_path: PathBuf,
    market: csv::Writer<File>,
    trades: csv::Writer<File>,
}

impl CsvJournal {
    pub fn open(config: &JournalConfig) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir).map_err(|source| JournalError::Io {
            path: config.dir.clone(),
            source,
        })?;
        let market_path = config.market_path();
        let trade_path = config.trade_path();
        Ok(Self {
            market: open_appending(&market_path)?,
            trades: open_appending(&trade_path)?,
            market_path,
            trade_path,
        })
    }

    pub fn market_path(&self) -> &Path {
        &self.market_path
    }

    pub fn trade_path(&self) -> &Path {
        &self.trade_path
    }

    pub fn append_candle(&mut self, record: &CandleRecord) -> Result<(), JournalError> {
        append(&mut self.market, &self.market_path, record)
    }

    pub fn append_position(&mut self, record: &PositionRecord) -> Result<(), JournalError> {
        append(&mut self.trades, &self.trade_path, record)
    }
}

fn open_appending(path: &Path) -> Result<csv::Writer<File>, JournalError> {
    let io_err = |source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    };
    let needs_header = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => return Err(io_err(e)),
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    debug!(path = %path.display(), needs_header, "journal file opened");
    Ok(csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file))
}

fn append<T: serde::Serialize>(
    writer: &mut csv::Writer<File>,
    path: &Path,
    record: &T,
) -> Result<(), JournalError> {
    writer.serialize(record)?;
    writer.flush().map_err(|source| JournalError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl RecordSink for CsvJournal {
    fn record_candle(&mut self, record: &CandleRecord) -> Result<(), SinkError> {
        self.append_candle(record).map_err(SinkError::new)
    }

    fn record_position(&mut self, record: &PositionRecord) -> Result<(), SinkError> {
        self.append_position(record).map_err(SinkError::new)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        for (writer, path) in [
            (&mut self.market, &self.market_path),
            (&mut self.trades, &self.trade_path),
        ] {
            writer
                .flush()
                .map_err(|e| SinkError::new(format!("{}: {e}", path.display())))?;
        }
        Ok(())
    }
}

/// Read every row of a journal file.
pub fn read_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, JournalError> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(JournalError::from)
}
