//! Trade model: one completed round trip produced by the simulator.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::BacktestError;

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// Signed profit of moving from `entry` to `exit` in this direction.
    pub fn signed_move(&self, entry: f64, exit: f64) -> f64 {
        match self {
            Direction::Long => exit - entry,
            Direction::Short => entry - exit,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(BacktestError::invalid(format!(
                "unsupported direction '{other}' (expected 'long' or 'short')"
            ))),
        }
    }
}

/// A completed entry/exit pair.
///
/// `point_gain` is the profit in index points: `exit - entry` for longs and
/// `entry - exit` for shorts, so a positive value is a winning trade in
/// either direction. `return_pct` follows the same sign convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Bar on which the entry condition fired
    pub signal_date: NaiveDate,

    /// Bar on which the position was filled
    pub entry_date: NaiveDate,

    /// Bar on which the position was closed
    pub exit_date: NaiveDate,

    pub direction: Direction,

    pub entry_price: f64,

    pub exit_price: f64,

    /// Signed percentage return
    pub return_pct: f64,

    /// Signed price-unit delta
    pub point_gain: f64,

    /// Oscillator reading on the signal bar, when it was defined
    #[serde(default)]
    pub rsi_at_signal: Option<f64>,
}

impl Trade {
    /// Build a trade, deriving the return fields from the prices.
    pub fn new(
        direction: Direction,
        signal_date: NaiveDate,
        entry_date: NaiveDate,
        entry_price: f64,
        exit_date: NaiveDate,
        exit_price: f64,
    ) -> Self {
        let point_gain = direction.signed_move(entry_price, exit_price);
        let return_pct = if entry_price != 0.0 {
            point_gain / entry_price * 100.0
        } else {
            0.0
        };

        Self {
            signal_date,
            entry_date,
            exit_date,
            direction,
            entry_price,
            exit_price,
            return_pct,
            point_gain,
            rsi_at_signal: None,
        }
    }

    pub fn is_win(&self) -> bool {
        self.return_pct > 0.0
    }

    /// Calendar days between entry and exit.
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}
