//! Paper trading account.

use serde::{Deserialize, Serialize};

/// Balance plus the two risk parameters that size and pay out positions.
///
/// Both percentages are fractions: `risk_per_trade_pct = 0.02` stakes 2% of
/// the balance, `payout_pct = 0.85` pays 85% of the stake on a HIT.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountState {
    pub balance: f64,
    pub risk_per_trade_pct: f64,
    pub payout_pct: f64,
}

impl AccountState {
    pub fn new(balance: f64, risk_per_trade_pct: f64, payout_pct: f64) -> Self {
        Self {
            balance,
            risk_per_trade_pct,
            payout_pct,
        }
    }

    /// Stake for a new position; zero when the balance is exhausted.
    pub fn stake(&self) -> f64 {
        if self.balance <= 0.0 {
            return 0.0;
        }
        self.balance * self.risk_per_trade_pct
    }

    pub fn apply_pnl(&mut self, pnl: f64) {
        self.balance += pnl;
    }
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new(10_000.0, 0.02, 0.85)
    }
}
