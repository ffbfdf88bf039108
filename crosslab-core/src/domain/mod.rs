//! Domain types for CrossLab

pub mod bar;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::{Bar, RawBar};
pub use portfolio::PortfolioSnapshot;
pub use position::{PositionSide, PositionState};
pub use signal::Signal;
pub use trade::{Trade, TradeSide};
