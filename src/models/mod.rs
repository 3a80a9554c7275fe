//! Data models for bars, trades, the entry band, and performance summaries.

mod band;
mod bar;
mod metrics;
mod trade;

pub use band::RsiBand;
pub use bar::{closes, Bar};
pub use metrics::{BuyAndHold, MonthlyStats, TradeSummary};
pub use trade::{Direction, Trade};
