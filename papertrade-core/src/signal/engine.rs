//! Rule engine: scores one indicator snapshot into a `Signal`.
//!
//! net = Σ weight of rules that hold, in table order, then scaled by the
//! ADX factor (trend_factor above `trend_adx`, weak_factor below `weak_adx`).
//! Direction: net >= threshold → BUY_CALL, net <= -threshold → BUY_PUT,
//! otherwise HOLD. Confidence = |net| * 100 / max_score, clamped to [0, 100].

use crate::config::SignalConfig;
use crate::domain::{Signal, SignalDirection, SignalOrigin};
use crate::indicators::IndicatorSnapshot;

use super::rules::{default_rules, ScoringRule};

#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: SignalConfig,
    rules: Vec<ScoringRule>,
}

impl RuleEngine {
    pub fn new(config: SignalConfig) -> Self {
        let rules = config
            .rules
            .clone()
            .unwrap_or_else(|| default_rules(&config));
        Self { config, rules }
    }

    pub fn rules(&self) -> &[ScoringRule] {
        &self.rules
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Score a snapshot. Pure: the same snapshot always yields the same signal.
    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> Signal {
        let mut net = 0.0;
        let mut rationale = Vec::new();
        for rule in &self.rules {
            if rule.condition.holds(snapshot) {
                net += rule.weight;
                rationale.push(rule.describe(snapshot));
            }
        }

        if let Some(adx) = snapshot.adx {
            if net != 0.0 && adx > self.config.trend_adx {
                net *= self.config.trend_factor;
                rationale.push(format!(
                    "Strong trend (ADX {adx:.1}), score x{}",
                    self.config.trend_factor
                ));
            } else if net != 0.0 && adx < self.config.weak_adx {
                net *= self.config.weak_factor;
                rationale.push(format!(
                    "Weak trend (ADX {adx:.1}), score x{}",
                    self.config.weak_factor
                ));
            }
        }

        let direction = if net >= self.config.threshold {
            SignalDirection::BuyCall
        } else if net <= -self.config.threshold {
            SignalDirection::BuyPut
        } else {
            SignalDirection::Hold
        };

        Signal {
            direction,
            confidence: self.confidence(net),
            net_score: net,
            rationale,
            generated_at: snapshot.at,
            expires_at: snapshot.at + self.config.expiry(),
            origin: SignalOrigin::Rules,
            fallback_reason: None,
        }
    }

    fn confidence(&self, net: f64) -> f64 {
        let c = net.abs() * 100.0 / self.config.max_score;
        if c.is_finite() {
            c.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}
