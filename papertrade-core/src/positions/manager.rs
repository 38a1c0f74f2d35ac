//! Position manager: opens paper positions from signals and settles them at expiry.
//!
//! Each side (call, put) is a slot: IDLE → OPEN → HIT/MISS/NEUTRAL → IDLE.
//! At most one OPEN position per side. Settlement needs someone to call
//! `settle_due`; a position past expiry stays OPEN until then.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::config::OperatingMode;
use crate::domain::{AccountState, Position, PositionId, PositionSide, PositionStatus, Signal};

#[derive(Debug, Clone)]
pub struct PositionManager {
    account: AccountState,
    starting_balance: f64,
    expiry: Duration,
    positions: Vec<Position>,
    next_id: u64,
}

impl PositionManager {
    pub fn new(account: AccountState, expiry: Duration) -> Self {
        Self {
            starting_balance: account.balance,
            account,
            expiry,
            positions: Vec::new(),
            next_id: 1,
        }
    }

    /// Open a position for an actionable signal if its side is idle.
    ///
    /// `DataCollection` never opens. `Prediction` opens with size 0 so the
    /// outcome is tracked without touching the balance. `PaperTrading` stakes
    /// `balance * risk_per_trade_pct` and refuses when that is not positive.
    pub fn try_open(
        &mut self,
        signal: &Signal,
        price: f64,
        now: DateTime<Utc>,
        mode: OperatingMode,
    ) -> Option<Position> {
        if !mode.trades_automatically() {
            return None;
        }
        let side = signal.direction.side()?;
        if signal.is_expired(now) {
            debug!(direction = %signal.direction, "signal expired, not opening");
            return None;
        }
        if !self.is_slot_open(side) {
            debug!(?side, "slot busy, not opening");
            return None;
        }

        let size = if mode.moves_money() {
            let stake = self.account.stake();
            if stake <= 0.0 {
                warn!(balance = self.account.balance, "no stake available, not opening");
                return None;
            }
            stake
        } else {
            0.0
        };

        let position = Position {
            id: PositionId(self.next_id),
            side,
            entry_price: price,
            size,
            opened_at: now,
            expires_at: now + self.expiry,
            status: PositionStatus::Open,
            exit_price: None,
            pnl: None,
            settled_at: None,
            confidence: signal.confidence,
            origin: signal.origin,
            balance_before: self.account.balance,
            balance_after: None,
        };
        self.next_id += 1;

        info!(
            id = %position.id,
            direction = %signal.direction,
            entry = price,
            size,
            confidence = signal.confidence,
            expires = %position.expires_at,
            "position opened"
        );
        self.positions.push(position.clone());
        Some(position)
    }

    /// Settle every OPEN position whose expiry is at or before `now`.
    ///
    /// Returns only positions settled by this call, each exactly once.
    pub fn settle_due(&mut self, now: DateTime<Utc>, price: f64) -> Vec<Position> {
        let due: Vec<PositionId> = self
            .positions
            .iter()
            .filter(|p| p.is_due(now))
            .map(|p| p.id)
            .collect();
        due.into_iter()
            .filter_map(|id| self.settle_position(id, price, now))
            .collect()
    }

    /// Settle one position at `exit_price`.
    ///
    /// `None` when the id is unknown or the position is already terminal, so
    /// calling this twice never credits the balance twice.
    pub fn settle_position(
        &mut self,
        id: PositionId,
        exit_price: f64,
        at: DateTime<Utc>,
    ) -> Option<Position> {
        let payout = self.account.payout_pct;
        let position = self.positions.iter_mut().find(|p| p.id == id)?;
        let pnl = position.settle(exit_price, at, payout)?;
        self.account.apply_pnl(pnl);
        position.balance_after = Some(self.account.balance);

        info!(
            id = %position.id,
            status = position.status.as_str(),
            entry = position.entry_price,
            exit = exit_price,
            pnl,
            balance = self.account.balance,
            "position settled"
        );
        Some(position.clone())
    }

    pub fn is_slot_open(&self, side: PositionSide) -> bool {
        !self.positions.iter().any(|p| p.side == side && p.is_open())
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    pub fn settled_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.status.is_terminal())
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn starting_balance(&self) -> f64 {
        self.starting_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SignalDirection, SignalOrigin};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn signal(direction: SignalDirection) -> Signal {
        Signal {
            direction,
            confidence: 60.0,
            net_score: 3.0,
            rationale: vec![],
            generated_at: t0(),
            expires_at: t0() + Duration::seconds(60),
            origin: SignalOrigin::Rules,
            fallback_reason: None,
        }
    }

    fn manager() -> PositionManager {
        PositionManager::new(AccountState::new(1_000.0, 0.01, 0.8), Duration::seconds(60))
    }

    #[test]
    fn opens_sized_position() {
        let mut m = manager();
        let p = m
            .try_open(&signal(SignalDirection::BuyCall), 100.0, t0(), OperatingMode::PaperTrading)
            .unwrap();
        assert_eq!(p.size, 10.0);
        assert_eq!(p.side, PositionSide::Call);
        assert_eq!(p.expires_at, t0() + Duration::seconds(60));
        assert_eq!(p.balance_before, 1_000.0);
        assert!(!m.is_slot_open(PositionSide::Call));
        assert!(m.is_slot_open(PositionSide::Put));
    }

    #[test]
    fn hold_never_opens() {
        let mut m = manager();
        assert!(m
            .try_open(&signal(SignalDirection::Hold), 100.0, t0(), OperatingMode::PaperTrading)
            .is_none());
    }

    #[test]
    fn one_open_position_per_side() {
        let mut m = manager();
        let call = signal(SignalDirection::BuyCall);
        let put = signal(SignalDirection::BuyPut);
        assert!(m.try_open(&call, 100.0, t0(), OperatingMode::PaperTrading).is_some());
        assert!(m.try_open(&call, 101.0, t0(), OperatingMode::PaperTrading).is_none());
        assert!(m.try_open(&put, 101.0, t0(), OperatingMode::PaperTrading).is_some());
        assert_eq!(m.open_positions().count(), 2);
    }

    #[test]
    fn data_collection_never_opens() {
        let mut m = manager();
        assert!(m
            .try_open(&signal(SignalDirection::BuyCall), 100.0, t0(), OperatingMode::DataCollection)
            .is_none());
    }

    #[test]
    fn prediction_mode_tracks_without_money() {
        let mut m = manager();
        let p = m
            .try_open(&signal(SignalDirection::BuyPut), 100.0, t0(), OperatingMode::Prediction)
            .unwrap();
        assert_eq!(p.size, 0.0);
        let settled = m.settle_due(t0() + Duration::seconds(60), 90.0);
        assert_eq!(settled[0].status, PositionStatus::Hit);
        assert_eq!(settled[0].pnl, Some(0.0));
        assert_eq!(m.account().balance, 1_000.0);
    }

    #[test]
    fn expired_signal_does_not_open() {
        let mut m = manager();
        let late = t0() + Duration::seconds(61);
        assert!(m
            .try_open(&signal(SignalDirection::BuyCall), 100.0, late, OperatingMode::PaperTrading)
            .is_none());
    }

    #[test]
    fn settles_only_at_or_after_expiry() {
        let mut m = manager();
        m.try_open(&signal(SignalDirection::BuyCall), 100.0, t0(), OperatingMode::PaperTrading);
        assert!(m.settle_due(t0() + Duration::seconds(59), 120.0).is_empty());

        let settled = m.settle_due(t0() + Duration::seconds(60), 105.0);
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].status, PositionStatus::Hit);
        assert_eq!(settled[0].pnl, Some(8.0));
        assert_eq!(settled[0].balance_after, Some(1_008.0));
        assert_eq!(m.account().balance, 1_008.0);
        assert!(m.is_slot_open(PositionSide::Call));
    }

    #[test]
    fn settling_twice_credits_once() {
        let mut m = manager();
        let p = m
            .try_open(&signal(SignalDirection::BuyCall), 100.0, t0(), OperatingMode::PaperTrading)
            .unwrap();
        let later = t0() + Duration::seconds(60);
        assert!(m.settle_position(p.id, 90.0, later).is_some());
        assert!(m.settle_position(p.id, 150.0, later).is_none());
        assert!(m.settle_due(later, 150.0).is_empty());
        assert_eq!(m.account().balance, 990.0);
    }

    #[test]
    fn unknown_id_is_ignored() {
        let mut m = manager();
        assert!(m.settle_position(PositionId(99), 100.0, t0()).is_none());
    }

    #[test]
    fn ids_are_sequential() {
        let mut m = manager();
        let a = m
            .try_open(&signal(SignalDirection::BuyCall), 100.0, t0(), OperatingMode::PaperTrading)
            .unwrap();
        let b = m
            .try_open(&signal(SignalDirection::BuyPut), 100.0, t0(), OperatingMode::PaperTrading)
            .unwrap();
        assert_eq!(a.id, PositionId(1));
        assert_eq!(b.id, PositionId(2));
        assert_eq!(b.id.to_string(), "P-000002");
    }
}
