//! Domain types for the papertrade pipeline.

pub mod account;
pub mod candle;
pub mod position;
pub mod signal;
pub mod tick;

pub use account::AccountState;
pub use candle::Candle;
pub use position::{classify_outcome, Position, PositionId, PositionSide, PositionStatus};
pub use signal::{Signal, SignalDirection, SignalOrigin};
pub use tick::Tick;
