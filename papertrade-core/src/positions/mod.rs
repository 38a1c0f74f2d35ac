//! Paper position lifecycle.

pub mod manager;

pub use manager::PositionManager;
