//! Deterministic RNG hierarchy.
//!
//! A master seed generates one independent sub-seed per named stream
//! (price noise, tick volume, simulated service failures). Sub-seeds are
//! derived via BLAKE3 hashing, so adding draws to one stream never shifts
//! the values another stream produces.

use rand::rngs::StdRng;
use rand::SeedableRng;

pub const PRICE_NOISE_STREAM: &str = "price_noise";
pub const TICK_VOLUME_STREAM: &str = "tick_volume";
pub const EXTERNAL_FAILURE_STREAM: &str = "external_failure";

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a named stream.
    pub fn sub_seed(&self, stream: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng for a named stream.
    pub fn stream(&self, stream: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream))
    }
}
