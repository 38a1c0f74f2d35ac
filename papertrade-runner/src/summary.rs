//! Session performance summary.

use serde::{Deserialize, Serialize};

use papertrade_core::domain::{Position, PositionStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_settled: usize,
    pub wins: usize,
    pub losses: usize,
    pub neutrals: usize,
    pub still_open: usize,
    /// wins / (wins + losses), 0 when nothing was decided.
    pub win_rate: f64,
    pub net_pnl: f64,
    pub starting_balance: f64,
    pub current_balance: f64,
}

impl PerformanceSummary {
    pub fn from_positions<'a>(
        positions: impl IntoIterator<Item = &'a Position>,
        starting_balance: f64,
        current_balance: f64,
    ) -> Self {
        let mut summary = Self {
            total_settled: 0,
            wins: 0,
            losses: 0,
            neutrals: 0,
            still_open: 0,
            win_rate: 0.0,
            net_pnl: 0.0,
            starting_balance,
            current_balance,
        };
        for p in positions {
            match p.status {
                PositionStatus::Open => {
                    summary.still_open += 1;
                    continue;
                }
                PositionStatus::Hit => summary.wins += 1,
                PositionStatus::Miss => summary.losses += 1,
                PositionStatus::Neutral => summary.neutrals += 1,
            }
            summary.total_settled += 1;
            summary.net_pnl += p.pnl.unwrap_or(0.0);
        }
        let decided = summary.wins + summary.losses;
        if decided > 0 {
            summary.win_rate = summary.wins as f64 / decided as f64;
        }
        summary
    }

    pub fn return_pct(&self) -> f64 {
        if self.starting_balance <= 0.0 {
            return 0.0;
        }
        (self.current_balance - self.starting_balance) / self.starting_balance * 100.0
    }
}
