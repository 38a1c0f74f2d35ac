//! Scoring rules: ordered (condition, signed weight, description) entries.
//!
//! Conditions read a single `IndicatorSnapshot`. A condition over an
//! indicator that is not ready never holds, so it contributes nothing.

use serde::{Deserialize, Serialize};

use crate::config::SignalConfig;
use crate::indicators::IndicatorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Histogram moved from <= 0 on the previous candle to > 0.
    MacdHistCrossAbove,
    /// Histogram moved from >= 0 on the previous candle to < 0.
    MacdHistCrossBelow,
    MacdAboveSignal,
    MacdBelowSignal,
    RsiBelow { level: f64 },
    RsiAbove { level: f64 },
    FastMaAboveSlow,
    FastMaBelowSlow,
    PriceAboveFastMa,
    PriceBelowFastMa,
}

impl RuleCondition {
    pub fn holds(&self, s: &IndicatorSnapshot) -> bool {
        match *self {
            Self::MacdHistCrossAbove => matches!(
                (s.macd_hist_prev, s.macd_hist),
                (Some(prev), Some(now)) if prev <= 0.0 && now > 0.0
            ),
            Self::MacdHistCrossBelow => matches!(
                (s.macd_hist_prev, s.macd_hist),
                (Some(prev), Some(now)) if prev >= 0.0 && now < 0.0
            ),
            Self::MacdAboveSignal => above(s.macd_line, s.macd_signal),
            Self::MacdBelowSignal => above(s.macd_signal, s.macd_line),
            Self::RsiBelow { level } => s.rsi.is_some_and(|rsi| rsi < level),
            Self::RsiAbove { level } => s.rsi.is_some_and(|rsi| rsi > level),
            Self::FastMaAboveSlow => above(s.ma_fast, s.ma_slow),
            Self::FastMaBelowSlow => above(s.ma_slow, s.ma_fast),
            Self::PriceAboveFastMa => above(Some(s.price), s.ma_fast),
            Self::PriceBelowFastMa => above(s.ma_fast, Some(s.price)),
        }
    }

    /// Reading that made the condition hold, for the rationale line.
    fn detail(&self, s: &IndicatorSnapshot) -> Option<String> {
        match self {
            Self::RsiBelow { .. } | Self::RsiAbove { .. } => s.rsi.map(|v| format!("RSI {v:.1}")),
            Self::MacdHistCrossAbove | Self::MacdHistCrossBelow => {
                s.macd_hist.map(|v| format!("hist {v:.4}"))
            }
            _ => None,
        }
    }
}

fn above(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

/// One entry of the rule table. Positive weights are bullish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    #[serde(flatten)]
    pub condition: RuleCondition,
    pub weight: f64,
    pub description: String,
}

impl ScoringRule {
    pub fn new(condition: RuleCondition, weight: f64, description: impl Into<String>) -> Self {
        Self {
            condition,
            weight,
            description: description.into(),
        }
    }

    /// Rationale line for a rule that fired.
    pub fn describe(&self, s: &IndicatorSnapshot) -> String {
        match self.condition.detail(s) {
            Some(detail) => format!("{} ({detail})", self.description),
            None => self.description.clone(),
        }
    }
}

/// The built-in rule table, in evaluation order.
pub fn default_rules(config: &SignalConfig) -> Vec<ScoringRule> {
    use RuleCondition::*;
    vec![
        ScoringRule::new(MacdHistCrossAbove, 2.0, "MACD histogram crossed above zero"),
        ScoringRule::new(MacdHistCrossBelow, -2.0, "MACD histogram crossed below zero"),
        ScoringRule::new(MacdAboveSignal, 1.5, "MACD line above signal line"),
        ScoringRule::new(MacdBelowSignal, -1.5, "MACD line below signal line"),
        ScoringRule::new(
            RsiBelow {
                level: config.rsi_oversold,
            },
            1.0,
            "RSI oversold",
        ),
        ScoringRule::new(
            RsiAbove {
                level: config.rsi_overbought,
            },
            -1.0,
            "RSI overbought",
        ),
        ScoringRule::new(FastMaAboveSlow, 1.0, "Fast MA above slow MA"),
        ScoringRule::new(FastMaBelowSlow, -1.0, "Fast MA below slow MA"),
        ScoringRule::new(PriceAboveFastMa, 1.0, "Price above fast MA"),
        ScoringRule::new(PriceBelowFastMa, -1.0, "Price below fast MA"),
    ]
}
