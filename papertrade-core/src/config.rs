//! Pipeline configuration.
//!
//! Plain values supplied by a settings layer. Every section has defaults, so
//! an empty TOML document is a valid configuration. `validate()` is the
//! configuration boundary: the pipeline refuses to start on invalid values.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::AccountState;
use crate::error::InputError;
use crate::signal::rules::ScoringRule;

/// Upper bound for every configured duration (one week).
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// What the pipeline does with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Candles and indicators only; signals never open positions.
    DataCollection,
    /// Positions are opened and classified but stake nothing.
    Prediction,
    /// Positions are sized from the account and settle into the balance.
    PaperTrading,
}

impl OperatingMode {
    pub fn trades_automatically(self) -> bool {
        !matches!(self, Self::DataCollection)
    }

    pub fn moves_money(self) -> bool {
        matches!(self, Self::PaperTrading)
    }
}

/// Which producer answers the signal request each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSourceKind {
    Rules,
    SimulatedExternal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: OperatingMode,
    /// Master seed for every RNG stream.
    pub seed: u64,
    pub generator: GeneratorConfig,
    pub candles: CandleConfig,
    pub indicators: IndicatorConfig,
    pub signal: SignalConfig,
    pub account: AccountState,
    pub positions: PositionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::PaperTrading,
            seed: 42,
            generator: GeneratorConfig::default(),
            candles: CandleConfig::default(),
            indicators: IndicatorConfig::default(),
            signal: SignalConfig::default(),
            account: AccountState::default(),
            positions: PositionConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), InputError> {
        self.generator.validate()?;
        self.candles.validate()?;
        self.indicators.validate()?;
        self.signal.validate()?;
        validate_account(&self.account)?;
        self.positions.validate()?;

        if self.candles.history_capacity < self.indicators.ma_slow {
            return Err(InputError::config(
                "candles.history_capacity",
                format!(
                    "must hold at least the slow MA window ({}), got {}",
                    self.indicators.ma_slow, self.candles.history_capacity
                ),
            ));
        }
        Ok(())
    }
}

/// Synthetic waveform: `base + amplitude * sin(frequency * t + phase) + noise`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub base_price: f64,
    pub amplitude: f64,
    /// Angular frequency in radians per second of simulated time.
    pub frequency: f64,
    pub phase: f64,
    pub noise_std: f64,
    /// Noise is clipped to `±noise_clip * noise_std`.
    pub noise_clip: f64,
    /// Floor applied when a draw would push the price to or below zero.
    pub min_price: f64,
    pub volume_min: f64,
    pub volume_max: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_price: 60_000.0,
            amplitude: 250.0,
            frequency: 0.1,
            phase: 0.0,
            noise_std: 15.0,
            noise_clip: 3.0,
            min_price: 0.01,
            volume_min: 10.0,
            volume_max: 200.0,
        }
    }
}

impl GeneratorConfig {
    fn validate(&self) -> Result<(), InputError> {
        require_finite("generator.base_price", self.base_price)?;
        require_finite("generator.amplitude", self.amplitude)?;
        require_finite("generator.frequency", self.frequency)?;
        require_finite("generator.phase", self.phase)?;
        require_finite("generator.noise_std", self.noise_std)?;
        require_finite("generator.noise_clip", self.noise_clip)?;
        if self.base_price <= 0.0 {
            return Err(InputError::config("generator.base_price", "must be > 0"));
        }
        if self.noise_std < 0.0 {
            return Err(InputError::config("generator.noise_std", "must be >= 0"));
        }
        if self.noise_clip <= 0.0 {
            return Err(InputError::config("generator.noise_clip", "must be > 0"));
        }
        if !(self.min_price > 0.0 && self.min_price.is_finite()) {
            return Err(InputError::config("generator.min_price", "must be > 0"));
        }
        if !(self.volume_min >= 0.0 && self.volume_min <= self.volume_max)
            || !self.volume_max.is_finite()
        {
            return Err(InputError::config(
                "generator.volume_min",
                "volume range must satisfy 0 <= volume_min <= volume_max",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleConfig {
    pub interval_secs: u64,
    pub history_capacity: usize,
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            history_capacity: 100,
        }
    }
}

impl CandleConfig {
    pub fn interval(&self) -> Duration {
        clamped_seconds(self.interval_secs)
    }

    fn validate(&self) -> Result<(), InputError> {
        checked_seconds("candles.interval_secs", self.interval_secs)?;
        if self.history_capacity == 0 {
            return Err(InputError::config("candles.history_capacity", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub adx_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ma_fast: usize,
    pub ma_slow: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            adx_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ma_fast: 20,
            ma_slow: 100,
        }
    }
}

impl IndicatorConfig {
    fn validate(&self) -> Result<(), InputError> {
        let windows = [
            ("indicators.rsi_period", self.rsi_period),
            ("indicators.adx_period", self.adx_period),
            ("indicators.macd_fast", self.macd_fast),
            ("indicators.macd_slow", self.macd_slow),
            ("indicators.macd_signal", self.macd_signal),
            ("indicators.ma_fast", self.ma_fast),
            ("indicators.ma_slow", self.ma_slow),
        ];
        for (field, window) in windows {
            if window == 0 {
                return Err(InputError::config(field, "window must be >= 1"));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(InputError::config(
                "indicators.macd_fast",
                "must be shorter than macd_slow",
            ));
        }
        if self.ma_fast > self.ma_slow {
            return Err(InputError::config(
                "indicators.ma_fast",
                "must not be longer than ma_slow",
            ));
        }
        Ok(())
    }

    /// Longest history any indicator needs before it reports a value.
    pub fn longest_lookback(&self) -> usize {
        self.ma_slow
            .max(self.macd_slow)
            .max(self.rsi_period + 1)
            .max(2 * self.adx_period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// `net >= threshold` is BUY_CALL, `net <= -threshold` is BUY_PUT.
    pub threshold: f64,
    pub trend_adx: f64,
    pub trend_factor: f64,
    pub weak_adx: f64,
    pub weak_factor: f64,
    /// `|net|` at which confidence saturates at 100.
    pub max_score: f64,
    pub expiry_secs: u64,
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub source: SignalSourceKind,
    /// Replaces the default rule table when present.
    pub rules: Option<Vec<ScoringRule>>,
    pub external: ExternalConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            threshold: 1.5,
            trend_adx: 25.0,
            trend_factor: 1.2,
            weak_adx: 20.0,
            weak_factor: 0.8,
            max_score: 5.0,
            expiry_secs: 60,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            source: SignalSourceKind::Rules,
            rules: None,
            external: ExternalConfig::default(),
        }
    }
}

impl SignalConfig {
    pub fn expiry(&self) -> Duration {
        clamped_seconds(self.expiry_secs)
    }

    fn validate(&self) -> Result<(), InputError> {
        for (field, value) in [
            ("signal.threshold", self.threshold),
            ("signal.trend_adx", self.trend_adx),
            ("signal.trend_factor", self.trend_factor),
            ("signal.weak_adx", self.weak_adx),
            ("signal.weak_factor", self.weak_factor),
            ("signal.max_score", self.max_score),
            ("signal.rsi_oversold", self.rsi_oversold),
            ("signal.rsi_overbought", self.rsi_overbought),
        ] {
            require_finite(field, value)?;
        }
        if self.threshold <= 0.0 {
            return Err(InputError::config("signal.threshold", "must be > 0"));
        }
        if self.trend_factor <= 1.0 {
            return Err(InputError::config("signal.trend_factor", "must be > 1"));
        }
        if !(self.weak_factor > 0.0 && self.weak_factor <= 1.0) {
            return Err(InputError::config("signal.weak_factor", "must be in (0, 1]"));
        }
        if self.weak_adx > self.trend_adx {
            return Err(InputError::config(
                "signal.weak_adx",
                "must not exceed trend_adx",
            ));
        }
        if self.max_score <= 0.0 {
            return Err(InputError::config("signal.max_score", "must be > 0"));
        }
        checked_seconds("signal.expiry_secs", self.expiry_secs)?;
        if !(0.0..=100.0).contains(&self.rsi_oversold)
            || !(0.0..=100.0).contains(&self.rsi_overbought)
            || self.rsi_oversold >= self.rsi_overbought
        {
            return Err(InputError::config(
                "signal.rsi_oversold",
                "RSI levels must lie in [0, 100] with oversold < overbought",
            ));
        }
        if let Some(rules) = &self.rules {
            if let Some(rule) = rules.iter().find(|r| !r.weight.is_finite()) {
                return Err(InputError::config(
                    "signal.rules",
                    format!("rule `{}` has a non-finite weight", rule.description),
                ));
            }
        }
        self.external.validate()
    }
}

/// Limits of the simulated external signal service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Requests accepted before the service starts refusing.
    pub request_limit: u32,
    pub cooldown_secs: u64,
    /// Probability in [0, 1] that a request fails with a simulated network error.
    pub failure_rate: f64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            request_limit: 60,
            cooldown_secs: 60,
            failure_rate: 0.0,
        }
    }
}

impl ExternalConfig {
    pub fn cooldown(&self) -> Duration {
        clamped_seconds(self.cooldown_secs)
    }

    fn validate(&self) -> Result<(), InputError> {
        checked_seconds("signal.external.cooldown_secs", self.cooldown_secs)?;
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(InputError::config(
                "signal.external.failure_rate",
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub expiry_secs: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self { expiry_secs: 60 }
    }
}

impl PositionConfig {
    pub fn expiry(&self) -> Duration {
        clamped_seconds(self.expiry_secs)
    }

    fn validate(&self) -> Result<(), InputError> {
        checked_seconds("positions.expiry_secs", self.expiry_secs)?;
        Ok(())
    }
}

fn validate_account(account: &AccountState) -> Result<(), InputError> {
    require_finite("account.balance", account.balance)?;
    if !(account.risk_per_trade_pct > 0.0 && account.risk_per_trade_pct <= 1.0) {
        return Err(InputError::config(
            "account.risk_per_trade_pct",
            "must be a fraction in (0, 1]",
        ));
    }
    if !(account.payout_pct >= 0.0 && account.payout_pct.is_finite()) {
        return Err(InputError::config("account.payout_pct", "must be >= 0"));
    }
    Ok(())
}

/// Validate a duration field: non-zero and at most `MAX_DURATION_SECS`.
pub fn checked_seconds(field: &'static str, secs: u64) -> Result<Duration, InputError> {
    if secs == 0 {
        return Err(InputError::config(field, "must be > 0"));
    }
    if secs > MAX_DURATION_SECS {
        return Err(InputError::config(
            field,
            format!("must be at most {MAX_DURATION_SECS} seconds, got {secs}"),
        ));
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| InputError::config(field, format!("out of range: {secs}")))
}

/// Accessor form for already-validated fields; never panics or wraps.
fn clamped_seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_DURATION_SECS) as i64)
}

fn require_finite(field: &'static str, value: f64) -> Result<(), InputError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(InputError::config(field, format!("must be finite, got {value}")))
    }
}
