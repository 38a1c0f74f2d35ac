//! Signal — a directional call with confidence and rationale.
//!
//! Signals are immutable once produced: the next cycle supersedes a signal,
//! it never edits one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::PositionSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    BuyCall,
    BuyPut,
    Hold,
}

impl SignalDirection {
    /// The position side this direction opens, if any.
    pub fn side(self) -> Option<PositionSide> {
        match self {
            Self::BuyCall => Some(PositionSide::Call),
            Self::BuyPut => Some(PositionSide::Put),
            Self::Hold => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BuyCall => "BUY_CALL",
            Self::BuyPut => "BUY_PUT",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which producer a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOrigin {
    Rules,
    SimulatedExternal,
    /// The configured producer failed and the rule engine answered instead.
    RulesFallback,
}

impl SignalOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::SimulatedExternal => "simulated_external",
            Self::RulesFallback => "rules_fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: SignalDirection,
    /// 0.0 to 100.0, monotonic in `|net_score|`.
    pub confidence: f64,
    /// Signed rule score after the trend factor (bullish positive).
    pub net_score: f64,
    /// Descriptions of the rules that fired, in evaluation order.
    pub rationale: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub origin: SignalOrigin,
    #[serde(default)]
    pub fallback_reason: Option<String>,
}

impl Signal {
    pub fn is_actionable(&self) -> bool {
        self.direction != SignalDirection::Hold
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
