//! Trade simulator: turns an annotated series into completed round trips.
//!
//! One left-to-right pass per direction. The position state machine is
//!
//! ```text
//! Flat ──signal──▶ AwaitingFill ──next bar open──▶ Open ──exit──▶ Flat
//!   └───────────── signal (same-bar fill) ────────▶ Open
//! ```
//!
//! A position still open when the series ends is not a trade. It is handed
//! back separately so callers can show it, but never enters any statistics.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::indicators::IndicatorBar;
use crate::models::{Direction, Trade};

use super::config::{EntryTiming, ExitRule, SimulatorConfig};
use super::strategy::Strategy;

/// A filled position that has not been closed yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpenPosition {
    pub direction: Direction,
    pub signal_date: NaiveDate,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub rsi_at_signal: Option<f64>,
    #[serde(skip)]
    entry_index: usize,
}

impl OpenPosition {
    fn fill(direction: Direction, signal: &IndicatorBar, entry: &IndicatorBar, entry_index: usize, price: f64) -> Self {
        Self {
            direction,
            signal_date: signal.bar.date,
            entry_date: entry.bar.date,
            entry_price: price,
            rsi_at_signal: Some(signal.rsi_ma).filter(|r| r.is_finite()),
            entry_index,
        }
    }

    fn close(&self, exit: &IndicatorBar) -> Trade {
        Trade {
            rsi_at_signal: self.rsi_at_signal,
            ..Trade::new(
                self.direction,
                self.signal_date,
                self.entry_date,
                self.entry_price,
                exit.bar.date,
                exit.bar.close,
            )
        }
    }

    /// Signed open profit, in percent, at `price`.
    pub fn unrealized_pct(&self, price: f64) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.direction.signed_move(self.entry_price, price) / self.entry_price * 100.0
    }
}

#[derive(Debug, Clone, Copy)]
enum PositionState {
    Flat,
    AwaitingFill { signal_index: usize },
    Open(OpenPosition),
}

/// Everything one simulation produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub direction: Direction,

    /// Completed trades, ordered by entry date
    pub trades: Vec<Trade>,

    /// Position left open at the end of the series
    pub open_position: Option<OpenPosition>,

    /// Signal on the final bar still waiting for a next-bar fill
    pub unfilled_signal: Option<NaiveDate>,
}

/// Run the state machine for `direction` over `series`.
pub fn simulate(
    series: &[IndicatorBar],
    direction: Direction,
    config: &SimulatorConfig,
) -> Result<SimulationOutcome> {
    config.validate()?;

    let strategy = Strategy::new(config);
    let mut state = PositionState::Flat;
    let mut trades = Vec::new();

    for (idx, bar) in series.iter().enumerate() {
        if let PositionState::AwaitingFill { signal_index } = state {
            let position = OpenPosition::fill(direction, &series[signal_index], bar, idx, bar.bar.open);
            debug!(
                direction = %direction,
                date = %bar.bar.date,
                price = position.entry_price,
                "Opened position"
            );
            state = PositionState::Open(position);
        }

        if let PositionState::Open(position) = state {
            if strategy.exit_signal(bar, idx, position.entry_index, direction) {
                let trade = position.close(bar);
                debug!(
                    direction = %direction,
                    date = %bar.bar.date,
                    return_pct = trade.return_pct,
                    "Closed position"
                );
                trades.push(trade);
                state = PositionState::Flat;
            }
        }

        if matches!(state, PositionState::Flat) && strategy.entry_signal(bar, direction) {
            state = match config.entry_timing {
                EntryTiming::NextBarOpen => PositionState::AwaitingFill { signal_index: idx },
                EntryTiming::SignalBarOpen => {
                    PositionState::Open(OpenPosition::fill(direction, bar, bar, idx, bar.bar.open))
                }
                EntryTiming::SignalBarClose => {
                    PositionState::Open(OpenPosition::fill(direction, bar, bar, idx, bar.bar.close))
                }
            };

            // A signal-bar-open fill with a same-bar exit completes right here.
            if let PositionState::Open(position) = state {
                if config.exit_rule == ExitRule::EntryBarClose {
                    trades.push(position.close(bar));
                    state = PositionState::Flat;
                }
            }
        }
    }

    let (open_position, unfilled_signal) = match state {
        PositionState::Flat => (None, None),
        PositionState::AwaitingFill { signal_index } => (None, Some(series[signal_index].bar.date)),
        PositionState::Open(position) => (Some(position), None),
    };

    debug!(
        direction = %direction,
        trades = trades.len(),
        open = open_position.is_some(),
        "Simulation finished"
    );

    Ok(SimulationOutcome {
        direction,
        trades,
        open_position,
        unfilled_signal,
    })
}

/// Completed trades for `direction`; open positions are dropped.
pub fn generate_trades(
    series: &[IndicatorBar],
    direction: Direction,
    config: &SimulatorConfig,
) -> Result<Vec<Trade>> {
    Ok(simulate(series, direction, config)?.trades)
}

/// Like [`generate_trades`] with a textual direction, which is validated
/// before the scan starts.
pub fn generate_trades_for(
    series: &[IndicatorBar],
    direction: &str,
    config: &SimulatorConfig,
) -> Result<Vec<Trade>> {
    let direction: Direction = direction.parse()?;
    generate_trades(series, direction, config)
}
