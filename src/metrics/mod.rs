//! Performance metrics over simulated trades.

mod calculator;

pub use calculator::MetricsCalculator;
