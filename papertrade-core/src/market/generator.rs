//! Synthetic price generator.
//!
//! price(t) = base + amplitude * sin(frequency * t + phase) + noise
//!
//! `t` is elapsed simulated time in seconds since the first tick. Noise is
//! Gaussian, clipped to `±noise_clip * noise_std`, and drawn from its own RNG
//! stream. The result is floored at `min_price` so a price is always > 0.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::GeneratorConfig;
use crate::domain::Tick;
use crate::error::InputError;
use crate::rng::{RngHierarchy, PRICE_NOISE_STREAM, TICK_VOLUME_STREAM};

#[derive(Debug, Clone)]
pub struct PriceGenerator {
    config: GeneratorConfig,
    noise: Normal<f64>,
    noise_rng: StdRng,
    volume_rng: StdRng,
    origin: Option<DateTime<Utc>>,
}

impl PriceGenerator {
    pub fn new(config: GeneratorConfig, rngs: &RngHierarchy) -> Result<Self, InputError> {
        let noise = Normal::new(0.0, config.noise_std)
            .map_err(|e| InputError::config("generator.noise_std", e.to_string()))?;
        Ok(Self {
            config,
            noise,
            noise_rng: rngs.stream(PRICE_NOISE_STREAM),
            volume_rng: rngs.stream(TICK_VOLUME_STREAM),
            origin: None,
        })
    }

    /// Produce the tick for wall or simulated time `at`.
    ///
    /// The first call fixes the time origin; later calls measure elapsed
    /// seconds from it.
    pub fn next_tick(&mut self, at: DateTime<Utc>) -> Tick {
        let origin = *self.origin.get_or_insert(at);
        let elapsed = (at - origin).num_milliseconds() as f64 / 1_000.0;
        let price = self.price_at(elapsed);
        let volume = self
            .volume_rng
            .gen_range(self.config.volume_min..=self.config.volume_max);
        Tick::new(at, price, volume)
    }

    /// Price at `t` seconds of elapsed simulated time, consuming one noise draw.
    pub fn price_at(&mut self, t: f64) -> f64 {
        debug_assert!(t.is_finite(), "elapsed time must be finite");
        let c = &self.config;
        let wave = c.base_price + c.amplitude * (c.frequency * t + c.phase).sin();
        let bound = c.noise_clip * c.noise_std;
        let noise = self.noise.sample(&mut self.noise_rng).clamp(-bound, bound);
        let price = wave + noise;
        if price.is_finite() && price > c.min_price {
            price
        } else {
            c.min_price
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn noiseless_generator_follows_waveform() {
        let config = GeneratorConfig {
            base_price: 100.0,
            amplitude: 10.0,
            frequency: 0.5,
            noise_std: 0.0,
            ..GeneratorConfig::default()
        };
        let mut g = PriceGenerator::new(config, &RngHierarchy::new(1)).unwrap();
        let t: f64 = 3.0;
        let expected = 100.0 + 10.0 * (0.5 * t).sin();
        assert!((g.price_at(t) - expected).abs() < 1e-12);
    }

    #[test]
    fn noise_is_clipped() {
        let config = GeneratorConfig {
            base_price: 100.0,
            amplitude: 0.0,
            noise_std: 2.0,
            noise_clip: 1.0,
            ..GeneratorConfig::default()
        };
        let mut g = PriceGenerator::new(config, &RngHierarchy::new(9)).unwrap();
        for i in 0..1_000 {
            let p = g.price_at(i as f64);
            assert!((98.0..=102.0).contains(&p), "price {p} escaped the noise clip");
        }
    }

    #[test]
    fn price_is_floored_when_wave_goes_negative() {
        let config = GeneratorConfig {
            base_price: 1.0,
            amplitude: 50.0,
            phase: -std::f64::consts::FRAC_PI_2,
            noise_std: 0.0,
            min_price: 0.5,
            ..GeneratorConfig::default()
        };
        let mut g = PriceGenerator::new(config, &RngHierarchy::new(3)).unwrap();
        assert_eq!(g.price_at(0.0), 0.5);
    }

    #[test]
    fn same_seed_same_ticks() {
        let mut a = PriceGenerator::new(GeneratorConfig::default(), &RngHierarchy::new(5)).unwrap();
        let mut b = PriceGenerator::new(GeneratorConfig::default(), &RngHierarchy::new(5)).unwrap();
        for i in 0..50 {
            let t = at() + Duration::seconds(2 * i);
            assert_eq!(a.next_tick(t), b.next_tick(t));
        }
    }

    #[test]
    fn successive_ticks_differ() {
        let mut g = PriceGenerator::new(GeneratorConfig::default(), &RngHierarchy::new(11)).unwrap();
        let first = g.next_tick(at());
        let second = g.next_tick(at() + Duration::seconds(2));
        assert_ne!(first.price, second.price);
    }

    #[test]
    fn tick_volume_stays_in_range() {
        let mut g = PriceGenerator::new(GeneratorConfig::default(), &RngHierarchy::new(2)).unwrap();
        for i in 0..200 {
            let tick = g.next_tick(at() + Duration::seconds(i));
            assert!((10.0..=200.0).contains(&tick.volume));
        }
    }
}
