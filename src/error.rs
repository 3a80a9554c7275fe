//! Error types for the indicator engine and trade simulator.

use thiserror::Error;

/// Result type alias using the backtest error type.
pub type Result<T> = std::result::Result<T, BacktestError>;

/// Errors raised by the core engine.
///
/// Data-quality problems (bad rows, short series, warm-up windows) are not
/// errors; only caller mistakes are.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    /// Unsupported parameter value, e.g. an unknown trade direction
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BacktestError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
