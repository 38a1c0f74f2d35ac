//! Parallel multi-seed batches.
//!
//! Runs the same session config once per seed on the rayon pool. Batch runs
//! never write journals: each seed would otherwise append to the same files.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use papertrade_core::sink::NullSink;

use crate::config::SessionConfig;
use crate::session::{Session, SessionError};
use crate::summary::PerformanceSummary;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedOutcome {
    pub seed: u64,
    pub session_id: String,
    pub summary: PerformanceSummary,
}

/// Run `config` once per seed. Results come back in seed-list order.
pub fn run_batch(config: &SessionConfig, seeds: &[u64]) -> Result<Vec<SeedOutcome>, SessionError> {
    info!(runs = seeds.len(), steps = config.steps, "batch started");
    let outcomes = seeds
        .par_iter()
        .map(|&seed| {
            let mut cfg = config.clone();
            cfg.pipeline.seed = seed;
            cfg.journal.enabled = false;
            let report = Session::with_sink(cfg, Box::new(NullSink))?.run()?;
            Ok(SeedOutcome {
                seed,
                session_id: report.session_id,
                summary: report.summary,
            })
        })
        .collect::<Result<Vec<_>, SessionError>>()?;
    info!(runs = outcomes.len(), "batch finished");
    Ok(outcomes)
}

/// Seeds `base, base + 1, ..., base + count - 1`.
pub fn seed_range(base: u64, count: usize) -> Vec<u64> {
    (0..count as u64).map(|i| base.wrapping_add(i)).collect()
}
