//! Simulated external AI advisor.
//!
//! Stands in for a remote analyst service: it builds the prompt such a
//! service would receive, enforces a request budget with a cooldown, fails
//! at a configured rate, and otherwise answers with the rule engine's
//! decision phrased as a narrative. No network I/O happens here.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{ExternalConfig, SignalConfig};
use crate::domain::{Candle, Signal, SignalDirection, SignalOrigin};
use crate::error::SignalSourceError;
use crate::indicators::IndicatorSnapshot;
use crate::rng::{RngHierarchy, EXTERNAL_FAILURE_STREAM};

use super::engine::RuleEngine;
use super::source::SignalSource;

/// Candles included in the prompt.
pub const PROMPT_CANDLES: usize = 10;

pub struct SimulatedAdvisor {
    rules: RuleEngine,
    external: ExternalConfig,
    requests: u32,
    cooldown_until: Option<DateTime<Utc>>,
    failure_rng: StdRng,
}

impl SimulatedAdvisor {
    pub fn new(config: SignalConfig, rng: &RngHierarchy) -> Self {
        Self {
            external: config.external.clone(),
            rules: RuleEngine::new(config),
            requests: 0,
            cooldown_until: None,
            failure_rng: rng.stream(EXTERNAL_FAILURE_STREAM),
        }
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    pub fn requests_in_window(&self) -> u32 {
        self.requests
    }

    /// Count one request at `now`, refusing while cooling down.
    ///
    /// The request that exceeds the limit starts the cooldown and is itself
    /// refused. The first request after the cooldown resets the count.
    fn admit(&mut self, now: DateTime<Utc>) -> Result<(), SignalSourceError> {
        if let Some(until) = self.cooldown_until {
            if now < until {
                return Err(SignalSourceError::RateLimited { until });
            }
            self.cooldown_until = None;
            self.requests = 0;
            info!("external advisor cooldown finished");
        }

        self.requests += 1;
        if self.requests > self.external.request_limit {
            let until = now + self.external.cooldown();
            self.cooldown_until = Some(until);
            warn!(
                limit = self.external.request_limit,
                until = %until,
                "external advisor request limit reached, cooling down"
            );
            return Err(SignalSourceError::RateLimited { until });
        }
        Ok(())
    }

    fn narrative(signal: &Signal, snapshot: &IndicatorSnapshot) -> String {
        let adx = fmt_reading(snapshot.adx, 1);
        match signal.direction {
            SignalDirection::BuyCall => format!(
                "Bullish confluence: momentum favours upside and price holds above its \
                 short-term average. ADX {adx} puts strength behind the move."
            ),
            SignalDirection::BuyPut => format!(
                "Bearish outlook: MACD sits below its signal line and price trades under \
                 its short-term average. ADX {adx}."
            ),
            SignalDirection::Hold => format!(
                "Neutral stance: signals conflict and ADX {adx} shows no clear trend. \
                 Wait for a cleaner structure."
            ),
        }
    }
}

/// Prompt text for the analyst service.
pub fn build_prompt(snapshot: &IndicatorSnapshot, recent: &[Candle], horizon_secs: u64) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You are a financial analyst for short-term binary options on BTC/USDT."
    );
    let _ = writeln!(
        prompt,
        "Decide BUY_CALL (up), BUY_PUT (down) or HOLD for the next {horizon_secs} seconds."
    );
    let _ = writeln!(prompt, "- Current price: {:.2}", snapshot.price);
    let _ = writeln!(prompt, "- RSI: {}", fmt_reading(snapshot.rsi, 2));
    let _ = writeln!(prompt, "- ADX: {}", fmt_reading(snapshot.adx, 2));
    let _ = writeln!(
        prompt,
        "- MACD line: {}, signal: {}",
        fmt_reading(snapshot.macd_line, 4),
        fmt_reading(snapshot.macd_signal, 4)
    );
    let _ = writeln!(
        prompt,
        "- MA fast: {}, MA slow: {}",
        fmt_reading(snapshot.ma_fast, 2),
        fmt_reading(snapshot.ma_slow, 2)
    );
    let tail = &recent[recent.len().saturating_sub(PROMPT_CANDLES)..];
    let _ = writeln!(prompt, "- Last {} candles (O, H, L, C):", tail.len());
    for (i, c) in tail.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "  T-{}: O={:.2} H={:.2} L={:.2} C={:.2}",
            tail.len() - i,
            c.open,
            c.high,
            c.low,
            c.close
        );
    }
    let _ = writeln!(
        prompt,
        "Answer in JSON with \"signal\", \"confidence\" and \"reasoning\"."
    );
    prompt
}

fn fmt_reading(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

impl SignalSource for SimulatedAdvisor {
    fn name(&self) -> &str {
        "simulated_external"
    }

    fn produce(
        &mut self,
        snapshot: &IndicatorSnapshot,
        recent: &[Candle],
    ) -> Result<Signal, SignalSourceError> {
        self.admit(snapshot.at)?;

        if self.failure_rng.gen_bool(self.external.failure_rate) {
            return Err(SignalSourceError::ServiceFailure(
                "simulated service outage".into(),
            ));
        }

        let prompt = build_prompt(snapshot, recent, self.rules.config().expiry_secs);
        debug!(prompt_len = prompt.len(), "simulated external request");

        let mut signal = self.rules.evaluate(snapshot);
        signal.rationale = vec![Self::narrative(&signal, snapshot)];
        signal.origin = SignalOrigin::SimulatedExternal;
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn snapshot_at(secs: i64) -> IndicatorSnapshot {
        IndicatorSnapshot::warming_up(t0() + Duration::seconds(secs), 100.0)
    }

    fn advisor(limit: u32, cooldown_secs: u64, failure_rate: f64) -> SimulatedAdvisor {
        let mut config = SignalConfig::default();
        config.external = ExternalConfig {
            request_limit: limit,
            cooldown_secs,
            failure_rate,
        };
        SimulatedAdvisor::new(config, &RngHierarchy::new(7))
    }

    #[test]
    fn answers_with_rule_decision() {
        let mut adv = advisor(60, 60, 0.0);
        let mut s = snapshot_at(0);
        s.macd_line = Some(1.0);
        s.macd_signal = Some(0.0);
        s.ma_fast = Some(90.0);
        let rules = RuleEngine::new(SignalConfig::default()).evaluate(&s);

        let signal = adv.produce(&s, &[]).unwrap();
        assert_eq!(signal.direction, rules.direction);
        assert_eq!(signal.confidence, rules.confidence);
        assert_eq!(signal.origin, SignalOrigin::SimulatedExternal);
        assert_eq!(signal.rationale.len(), 1);
        assert!(signal.rationale[0].starts_with("Bullish confluence"));
    }

    #[test]
    fn request_over_limit_starts_cooldown() {
        let mut adv = advisor(2, 30, 0.0);
        assert!(adv.produce(&snapshot_at(0), &[]).is_ok());
        assert!(adv.produce(&snapshot_at(1), &[]).is_ok());

        let err = adv.produce(&snapshot_at(2), &[]).unwrap_err();
        assert_eq!(
            err,
            SignalSourceError::RateLimited {
                until: t0() + Duration::seconds(32)
            }
        );
        // Still cooling down.
        assert!(adv.produce(&snapshot_at(20), &[]).is_err());
        assert_eq!(adv.cooldown_until(), Some(t0() + Duration::seconds(32)));
    }

    #[test]
    fn cooldown_expiry_resets_budget() {
        let mut adv = advisor(1, 10, 0.0);
        adv.produce(&snapshot_at(0), &[]).unwrap();
        assert!(adv.produce(&snapshot_at(1), &[]).is_err());

        assert!(adv.produce(&snapshot_at(11), &[]).is_ok());
        assert_eq!(adv.requests_in_window(), 1);
        assert!(adv.cooldown_until().is_none());
    }

    #[test]
    fn certain_failure_rate_always_fails() {
        let mut adv = advisor(60, 60, 1.0);
        for i in 0..5 {
            assert!(matches!(
                adv.produce(&snapshot_at(i), &[]),
                Err(SignalSourceError::ServiceFailure(_))
            ));
        }
    }

    #[test]
    fn failures_are_deterministic_per_seed() {
        let outcomes = |seed: u64| {
            let mut config = SignalConfig::default();
            config.external.failure_rate = 0.5;
            let mut adv = SimulatedAdvisor::new(config, &RngHierarchy::new(seed));
            (0..20)
                .map(|i| adv.produce(&snapshot_at(i), &[]).is_ok())
                .collect::<Vec<_>>()
        };
        assert_eq!(outcomes(3), outcomes(3));
    }

    #[test]
    fn prompt_lists_last_ten_candles() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);
        let prompt = build_prompt(&snapshot_at(0), &candles, 60);
        assert!(prompt.contains("Last 10 candles"));
        assert!(prompt.contains("T-10: O=104.00"));
        assert!(prompt.contains("T-1: O=113.00 H=114.50 L=112.50 C=114.00"));
        assert!(prompt.contains("RSI: n/a"));
    }
}
