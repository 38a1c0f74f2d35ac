//! Simulated market: price ticks and their aggregation into candles.

pub mod aggregator;
pub mod generator;
pub mod history;

pub use aggregator::CandleAggregator;
pub use generator::PriceGenerator;
pub use history::CandleHistory;
