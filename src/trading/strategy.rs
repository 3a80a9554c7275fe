//! Entry and exit conditions of the RSI-of-MA rule.
//!
//! The strategy only reads flags off an annotated bar. It holds no state;
//! position tracking lives in the simulator.

use crate::indicators::IndicatorBar;
use crate::models::Direction;

use super::config::{EntryRule, ExitRule, SimulatorConfig};

/// Stateless evaluator of entry/exit conditions for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    entry_rule: EntryRule,
    exit_rule: ExitRule,
}

impl Strategy {
    pub fn new(config: &SimulatorConfig) -> Self {
        Self {
            entry_rule: config.entry_rule,
            exit_rule: config.exit_rule,
        }
    }

    /// Whether `bar` is a signal bar for opening a `direction` position.
    pub fn entry_signal(&self, bar: &IndicatorBar, direction: Direction) -> bool {
        let flags = &bar.flags;
        let crossed = match direction {
            Direction::Long => flags.cross_up,
            Direction::Short => flags.cross_down,
        };

        match self.entry_rule {
            EntryRule::Crossover => crossed,
            EntryRule::Banded { band } => crossed && band.contains(bar.rsi_ma),
            EntryRule::Robust => match direction {
                Direction::Long => flags.robust_long,
                Direction::Short => flags.robust_short,
            },
        }
    }

    /// Whether a `direction` position filled on bar `entry_index` closes on
    /// bar `index`.
    pub fn exit_signal(
        &self,
        bar: &IndicatorBar,
        index: usize,
        entry_index: usize,
        direction: Direction,
    ) -> bool {
        match self.exit_rule {
            ExitRule::OppositeCross => match direction {
                Direction::Long => bar.flags.cross_down,
                Direction::Short => bar.flags.cross_up,
            },
            ExitRule::EntryBarClose => index == entry_index,
        }
    }
}
