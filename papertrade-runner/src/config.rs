//! Session configuration: the core pipeline config plus driver and journal settings.
//!
//! Loaded from TOML. Every field has a default, so an empty file is a valid
//! session: 300 steps of 2 s ticks in paper-trading mode.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use papertrade_core::config::MAX_DURATION_SECS;
use papertrade_core::{InputError, PipelineConfig};

const MAX_TICK_INTERVAL_MS: u64 = MAX_DURATION_SECS * 1_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to hash config: {0}")]
    Hash(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] InputError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub market_log: String,
    pub trade_log: String,
    /// Account state carried from one session to the next.
    pub account_file: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("."),
            market_log: "market_data_log.csv".into(),
            trade_log: "trade_log.csv".into(),
            account_file: "paper_trading_account.json".into(),
        }
    }
}

impl JournalConfig {
    pub fn market_path(&self) -> PathBuf {
        self.dir.join(&self.market_log)
    }

    pub fn trade_path(&self) -> PathBuf {
        self.dir.join(&self.trade_log)
    }

    pub fn account_path(&self) -> PathBuf {
        self.dir.join(&self.account_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Driver period between steps.
    pub tick_interval_ms: u64,
    /// Steps to run; 0 means until stopped (background worker only).
    pub steps: u64,
    /// Simulated clock origin (RFC 3339). Wall-clock now when absent.
    pub start_time: Option<DateTime<Utc>>,
    pub journal: JournalConfig,
    pub pipeline: PipelineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2_000,
            steps: 300,
            start_time: None,
            journal: JournalConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.tick_interval_ms == 0 {
            return Err(InputError::config("tick_interval_ms", "must be > 0"));
        }
        if self.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            return Err(InputError::config(
                "tick_interval_ms",
                format!("must be at most {MAX_TICK_INTERVAL_MS}, got {}", self.tick_interval_ms),
            ));
        }
        if self.journal.enabled
            && [&self.journal.market_log, &self.journal.trade_log, &self.journal.account_file]
                .iter()
                .any(|name| name.trim().is_empty())
        {
            return Err(InputError::config("journal", "file names must not be empty"));
        }
        self.pipeline.validate()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::milliseconds(self.tick_interval_ms.min(MAX_TICK_INTERVAL_MS) as i64)
    }

    /// Content hash of the canonical JSON form: same config, same id.
    pub fn session_id(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papertrade_core::OperatingMode;

    #[test]
    fn empty_toml_is_default() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn nested_sections_override_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            steps = 50
            start_time = "2024-01-02T09:30:00Z"

            [journal]
            enabled = false

            [pipeline]
            seed = 7
            mode = "prediction"

            [pipeline.candles]
            interval_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.steps, 50);
        assert!(!config.journal.enabled);
        assert_eq!(config.pipeline.seed, 7);
        assert_eq!(config.pipeline.mode, OperatingMode::Prediction);
        assert_eq!(config.pipeline.candles.interval_secs, 10);
        assert_eq!(config.pipeline.candles.history_capacity, 100);
        assert_eq!(
            config.start_time.unwrap().to_rfc3339(),
            "2024-01-02T09:30:00+00:00"
        );
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        let err = SessionConfig::from_toml_str("tick_interval_ms = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SessionConfig::from_toml_str("[pipeline.indicators]\nma_fast = 200").unwrap_err();
        assert!(err.to_string().contains("ma_fast"));
    }

    #[test]
    fn oversized_tick_interval_is_rejected() {
        for ms in [MAX_TICK_INTERVAL_MS + 1, u64::MAX] {
            let config = SessionConfig {
                tick_interval_ms: ms,
                ..SessionConfig::default()
            };
            assert!(config.validate().is_err());
            assert!(config.tick_interval() > Duration::zero());
        }
        let err = SessionConfig::from_toml_str("[pipeline.positions]\nexpiry_secs = 10000000000000000")
            .unwrap_err();
        assert!(err.to_string().contains("positions.expiry_secs"));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = SessionConfig::from_toml_str("steps = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn session_id_is_content_hash() {
        let a = SessionConfig::default();
        let mut b = SessionConfig::default();
        assert_eq!(a.session_id().unwrap(), b.session_id().unwrap());
        b.pipeline.seed = 43;
        assert_ne!(a.session_id().unwrap(), b.session_id().unwrap());
        assert_eq!(a.session_id().unwrap().len(), 64);
    }

    #[test]
    fn toml_round_trip() {
        let config = SessionConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(SessionConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SessionConfig::from_file("/nonexistent/papertrade.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
