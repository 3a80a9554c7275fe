//! Trading logic: entry/exit rules and the trade simulator.

mod config;
mod simulator;
mod strategy;

pub use config::{EntryRule, EntryTiming, ExitRule, SimulatorConfig};
pub use simulator::{generate_trades_for, simulate, OpenPosition};

#[cfg(test)]
pub use simulator::generate_trades;
