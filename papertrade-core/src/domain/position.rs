//! Paper position — one simulated binary trade from open to outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::signal::{SignalDirection, SignalOrigin};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{:06}", self.0)
    }
}

/// Direction slot a position occupies. At most one OPEN position per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionSide {
    Call,
    Put,
}

impl PositionSide {
    pub fn direction(self) -> SignalDirection {
        match self {
            Self::Call => SignalDirection::BuyCall,
            Self::Put => SignalDirection::BuyPut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Hit,
    Miss,
    Neutral,
}

impl PositionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Neutral => "NEUTRAL",
        }
    }
}

/// Outcome of a side given entry and exit prices.
///
/// A call hits when the price rose, a put when it fell; an unchanged price
/// is neutral for both.
pub fn classify_outcome(side: PositionSide, entry_price: f64, exit_price: f64) -> PositionStatus {
    if exit_price == entry_price {
        return PositionStatus::Neutral;
    }
    let rose = exit_price > entry_price;
    match (side, rose) {
        (PositionSide::Call, true) | (PositionSide::Put, false) => PositionStatus::Hit,
        _ => PositionStatus::Miss,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: PositionSide,
    pub entry_price: f64,
    /// Stake; zero for tracked predictions that move no money.
    pub size: f64,
    pub opened_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: PositionStatus,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub settled_at: Option<DateTime<Utc>>,
    /// Confidence and origin of the signal that opened the position.
    pub confidence: f64,
    pub origin: SignalOrigin,
    pub balance_before: f64,
    pub balance_after: Option<f64>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now >= self.expires_at
    }

    /// Classify the outcome and fix the P&L.
    ///
    /// Returns the realized P&L, or `None` when the position is already
    /// terminal. A terminal position is never modified again, which is what
    /// keeps a balance from being credited twice.
    pub fn settle(&mut self, exit_price: f64, at: DateTime<Utc>, payout_pct: f64) -> Option<f64> {
        if self.status.is_terminal() {
            return None;
        }
        let status = classify_outcome(self.side, self.entry_price, exit_price);
        let pnl = match status {
            PositionStatus::Hit => self.size * payout_pct,
            PositionStatus::Miss => -self.size,
            _ => 0.0,
        };
        self.status = status;
        self.exit_price = Some(exit_price);
        self.pnl = Some(pnl);
        self.settled_at = Some(at);
        Some(pnl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn open(side: PositionSide, entry: f64, size: f64) -> Position {
        Position {
            id: PositionId(1),
            side,
            entry_price: entry,
            size,
            opened_at: at(),
            expires_at: at() + Duration::seconds(60),
            status: PositionStatus::Open,
            exit_price: None,
            pnl: None,
            settled_at: None,
            confidence: 50.0,
            origin: SignalOrigin::Rules,
            balance_before: 1_000.0,
            balance_after: None,
        }
    }

    #[test]
    fn classify_call_and_put() {
        use PositionStatus::*;
        assert_eq!(classify_outcome(PositionSide::Call, 100.0, 105.0), Hit);
        assert_eq!(classify_outcome(PositionSide::Call, 100.0, 95.0), Miss);
        assert_eq!(classify_outcome(PositionSide::Call, 100.0, 100.0), Neutral);
        assert_eq!(classify_outcome(PositionSide::Put, 100.0, 95.0), Hit);
        assert_eq!(classify_outcome(PositionSide::Put, 100.0, 105.0), Miss);
        assert_eq!(classify_outcome(PositionSide::Put, 100.0, 100.0), Neutral);
    }

    #[test]
    fn call_hit_pays_payout_fraction() {
        let mut p = open(PositionSide::Call, 100.0, 10.0);
        let pnl = p.settle(105.0, at() + Duration::seconds(60), 0.8);
        assert_eq!(pnl, Some(8.0));
        assert_eq!(p.status, PositionStatus::Hit);
        assert_eq!(p.exit_price, Some(105.0));
    }

    #[test]
    fn miss_loses_stake() {
        let mut p = open(PositionSide::Put, 100.0, 10.0);
        assert_eq!(p.settle(101.0, at(), 0.8), Some(-10.0));
        assert_eq!(p.status, PositionStatus::Miss);
    }

    #[test]
    fn settle_twice_is_noop() {
        let mut p = open(PositionSide::Put, 100.0, 10.0);
        assert_eq!(p.settle(100.0, at(), 0.8), Some(0.0));
        assert_eq!(p.status, PositionStatus::Neutral);
        let snapshot = p.clone();
        assert_eq!(p.settle(90.0, at() + Duration::seconds(5), 0.8), None);
        assert_eq!(p, snapshot);
    }

    #[test]
    fn due_only_when_open_and_expired() {
        let mut p = open(PositionSide::Call, 100.0, 1.0);
        assert!(!p.is_due(at()));
        assert!(p.is_due(at() + Duration::seconds(60)));
        p.settle(101.0, at() + Duration::seconds(60), 0.8);
        assert!(!p.is_due(at() + Duration::seconds(120)));
    }

    #[test]
    fn id_display_is_zero_padded() {
        assert_eq!(PositionId(42).to_string(), "P-000042");
    }
}
