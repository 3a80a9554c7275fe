//! Simulator configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BacktestError, Result};
use crate::models::RsiBand;

/// Which bar condition opens a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryRule {
    /// `cross_up` opens longs, `cross_down` opens shorts
    Crossover,

    /// Crossover with `rsi_ma` inside the band on the signal bar
    Banded { band: RsiBand },

    /// `robust_long` / `robust_short`
    Robust,
}

impl EntryRule {
    pub fn name(&self) -> &'static str {
        match self {
            EntryRule::Crossover => "crossover",
            EntryRule::Banded { .. } => "banded",
            EntryRule::Robust => "robust",
        }
    }
}

impl fmt::Display for EntryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRule::Banded { band } => write!(f, "banded [{}, {}]", band.low, band.high),
            other => f.write_str(other.name()),
        }
    }
}

/// Where the entry is filled relative to the signal bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryTiming {
    /// Open of the bar after the signal. The signal needs the signal bar's
    /// close, so this is the earliest fill that does not look ahead.
    #[default]
    NextBarOpen,

    /// Open of the signal bar itself
    SignalBarOpen,

    /// Close of the signal bar itself
    SignalBarClose,
}

impl EntryTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryTiming::NextBarOpen => "next-open",
            EntryTiming::SignalBarOpen => "signal-open",
            EntryTiming::SignalBarClose => "signal-close",
        }
    }
}

impl FromStr for EntryTiming {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "next-open" | "next_bar_open" | "next" => Ok(EntryTiming::NextBarOpen),
            "signal-open" | "signal_bar_open" => Ok(EntryTiming::SignalBarOpen),
            "signal-close" | "signal_bar_close" => Ok(EntryTiming::SignalBarClose),
            other => Err(BacktestError::invalid(format!("unknown entry timing '{other}'"))),
        }
    }
}

/// What closes an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRule {
    /// Close of the first bar with the opposite cross
    #[default]
    OppositeCross,

    /// Close of the entry bar (a one-session hold)
    EntryBarClose,
}

impl ExitRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitRule::OppositeCross => "opposite-cross",
            ExitRule::EntryBarClose => "entry-bar-close",
        }
    }
}

impl FromStr for ExitRule {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "opposite-cross" | "opposite_cross" | "cross" => Ok(ExitRule::OppositeCross),
            "entry-bar-close" | "entry_bar_close" | "same-bar" => Ok(ExitRule::EntryBarClose),
            other => Err(BacktestError::invalid(format!("unknown exit rule '{other}'"))),
        }
    }
}

/// Configuration of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub entry_rule: EntryRule,
    pub entry_timing: EntryTiming,
    pub exit_rule: ExitRule,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            entry_rule: EntryRule::Crossover,
            entry_timing: EntryTiming::NextBarOpen,
            exit_rule: ExitRule::OppositeCross,
        }
    }
}

impl SimulatorConfig {
    #[cfg(test)]
    pub fn with_rule(entry_rule: EntryRule) -> Self {
        Self {
            entry_rule,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let EntryRule::Banded { band } = &self.entry_rule {
            if !band.is_valid() {
                return Err(BacktestError::invalid(format!(
                    "band [{}, {}] is not a valid range",
                    band.low, band.high
                )));
            }
        }

        if self.exit_rule == ExitRule::EntryBarClose && self.entry_timing == EntryTiming::SignalBarClose {
            return Err(BacktestError::invalid(
                "entry-bar-close exits need an entry filled at an open price",
            ));
        }

        Ok(())
    }
}
