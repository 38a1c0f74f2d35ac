//! Pluggable signal sources.
//!
//! A source turns the latest snapshot (plus recent candles, for sources that
//! want raw context) into a `Signal`. The rule engine is the always-available
//! source; `FallbackSource` composes any other source with it.

use tracing::warn;

use crate::config::{SignalConfig, SignalSourceKind};
use crate::domain::{Candle, Signal, SignalOrigin};
use crate::error::SignalSourceError;
use crate::indicators::IndicatorSnapshot;
use crate::rng::RngHierarchy;

use super::advisor::SimulatedAdvisor;
use super::engine::RuleEngine;

pub trait SignalSource: Send {
    fn name(&self) -> &str;

    fn produce(
        &mut self,
        snapshot: &IndicatorSnapshot,
        recent: &[Candle],
    ) -> Result<Signal, SignalSourceError>;
}

impl SignalSource for RuleEngine {
    fn name(&self) -> &str {
        "rules"
    }

    fn produce(
        &mut self,
        snapshot: &IndicatorSnapshot,
        _recent: &[Candle],
    ) -> Result<Signal, SignalSourceError> {
        Ok(self.evaluate(snapshot))
    }
}

/// Wraps a primary source; on failure answers with the rule engine instead.
///
/// The fallback signal has origin `RulesFallback`, carries the failure in
/// `fallback_reason`, and leads its rationale with the reason.
pub struct FallbackSource<P> {
    primary: P,
    rules: RuleEngine,
    name: String,
}

impl<P: SignalSource> FallbackSource<P> {
    pub fn new(primary: P, rules: RuleEngine) -> Self {
        let name = format!("{}+rules_fallback", primary.name());
        Self {
            primary,
            rules,
            name,
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// Ask the primary source; on error score the snapshot with the rules.
    pub fn produce_or_fallback(&mut self, snapshot: &IndicatorSnapshot, recent: &[Candle]) -> Signal {
        match self.primary.produce(snapshot, recent) {
            Ok(signal) => signal,
            Err(err) => {
                let reason = err.to_string();
                warn!(source = self.primary.name(), %reason, "signal source failed, using rules");
                let mut signal = self.rules.evaluate(snapshot);
                signal.origin = SignalOrigin::RulesFallback;
                signal.rationale.insert(0, format!("Fallback to rules: {reason}"));
                signal.fallback_reason = Some(reason);
                signal
            }
        }
    }
}

impl<P: SignalSource> SignalSource for FallbackSource<P> {
    fn name(&self) -> &str {
        &self.name
    }

    fn produce(
        &mut self,
        snapshot: &IndicatorSnapshot,
        recent: &[Candle],
    ) -> Result<Signal, SignalSourceError> {
        Ok(self.produce_or_fallback(snapshot, recent))
    }
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn produce(
        &mut self,
        snapshot: &IndicatorSnapshot,
        recent: &[Candle],
    ) -> Result<Signal, SignalSourceError> {
        (**self).produce(snapshot, recent)
    }
}

/// Build the primary source selected by `config.source`.
///
/// The pipeline wraps whatever this returns in a `FallbackSource`.
pub fn build_source(config: &SignalConfig, rng: &RngHierarchy) -> Box<dyn SignalSource> {
    match config.source {
        SignalSourceKind::Rules => Box::new(RuleEngine::new(config.clone())),
        SignalSourceKind::SimulatedExternal => Box::new(SimulatedAdvisor::new(config.clone(), rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalDirection;
    use chrono::DateTime;

    struct AlwaysFails;

    impl SignalSource for AlwaysFails {
        fn name(&self) -> &str {
            "always_fails"
        }

        fn produce(
            &mut self,
            _snapshot: &IndicatorSnapshot,
            _recent: &[Candle],
        ) -> Result<Signal, SignalSourceError> {
            Err(SignalSourceError::ServiceFailure("timeout".into()))
        }
    }

    fn snapshot() -> IndicatorSnapshot {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut s = IndicatorSnapshot::warming_up(at, 100.0);
        s.macd_line = Some(2.0);
        s.macd_signal = Some(1.0);
        s.ma_fast = Some(95.0);
        s
    }

    #[test]
    fn fallback_uses_rule_decision() {
        let rules = RuleEngine::new(SignalConfig::default());
        let expected = rules.evaluate(&snapshot());
        let mut source = FallbackSource::new(AlwaysFails, rules);

        let signal = source.produce(&snapshot(), &[]).unwrap();
        assert_eq!(signal.direction, expected.direction);
        assert_eq!(signal.net_score, expected.net_score);
        assert_eq!(signal.origin, SignalOrigin::RulesFallback);
        assert_eq!(
            signal.fallback_reason.as_deref(),
            Some("signal service failed: timeout")
        );
        assert!(signal.rationale[0].starts_with("Fallback to rules"));
        assert_eq!(&signal.rationale[1..], expected.rationale.as_slice());
    }

    #[test]
    fn rules_source_matches_evaluate() {
        let mut engine = RuleEngine::new(SignalConfig::default());
        let direct = engine.evaluate(&snapshot());
        assert_eq!(engine.produce(&snapshot(), &[]).unwrap(), direct);
        assert_eq!(direct.direction, SignalDirection::BuyCall);
    }

    #[test]
    fn build_source_follows_config() {
        let rng = RngHierarchy::new(1);
        let rules = build_source(&SignalConfig::default(), &rng);
        assert_eq!(rules.name(), "rules");

        let config = SignalConfig {
            source: SignalSourceKind::SimulatedExternal,
            ..SignalConfig::default()
        };
        let external = build_source(&config, &rng);
        assert_eq!(external.name(), "simulated_external");

        let wrapped = FallbackSource::new(external, RuleEngine::new(config));
        assert_eq!(wrapped.name(), "simulated_external+rules_fallback");
    }
}
