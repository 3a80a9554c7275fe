//! Performance summaries of simulated trades.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Aggregate statistics over a list of trades.
///
/// All percentages are in percent units (`2.5` means 2.5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    // === Counts ===
    /// Number of completed trades
    pub trades: usize,

    /// Trades with a positive return
    pub wins: usize,

    /// Trades with a negative return
    pub losses: usize,

    /// Share of winning trades
    pub win_rate_pct: f64,

    // === Returns ===
    pub avg_return_pct: f64,

    pub median_return_pct: f64,

    pub best_return_pct: f64,

    pub worst_return_pct: f64,

    /// Product of (1 + r) over all trades, minus one
    pub compounded_return_pct: f64,

    /// Plain sum of per-trade returns
    pub summed_return_pct: f64,

    /// Sum of point gains
    pub total_points: f64,

    // === Risk ===
    /// Gross winning return over gross losing return; `None` when there are
    /// winners but no losers
    pub profit_factor: Option<f64>,

    /// Deepest fall of the compounded trade equity curve from its peak
    pub max_drawdown_pct: f64,

    /// Mean calendar days from entry to exit
    pub avg_holding_days: f64,
}

impl TradeSummary {
    pub fn is_empty(&self) -> bool {
        self.trades == 0
    }
}

impl fmt::Display for TradeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No trades generated.");
        }

        writeln!(f, "Number of trades:      {}", self.trades)?;
        writeln!(f, "Wins:                  {}", self.wins)?;
        writeln!(f, "Losses:                {}", self.losses)?;
        writeln!(f, "Win ratio:             {:6.2}%", self.win_rate_pct)?;
        writeln!(f, "Average trade return:  {:6.3}%", self.avg_return_pct)?;
        writeln!(f, "Median trade return:   {:6.3}%", self.median_return_pct)?;
        writeln!(f, "Best / worst trade:    {:.2}% / {:.2}%", self.best_return_pct, self.worst_return_pct)?;
        writeln!(f, "Total compounded P&L:  {:6.2}%", self.compounded_return_pct)?;
        writeln!(f, "Sum of returns:        {:6.2}%", self.summed_return_pct)?;
        writeln!(f, "Total points:          {:.2}", self.total_points)?;
        match self.profit_factor {
            Some(pf) => writeln!(f, "Profit factor:         {:.2}", pf)?,
            None => writeln!(f, "Profit factor:         no losing trades")?,
        }
        writeln!(f, "Max drawdown:          {:.2}%", self.max_drawdown_pct)?;
        writeln!(f, "Avg hold:              {:.1} days", self.avg_holding_days)
    }
}

/// Buy at the first open, sell at the last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyAndHold {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub first_open: f64,
    pub last_close: f64,
    pub total_return_pct: f64,
    pub years: f64,
    /// `None` when the series spans no time
    pub cagr_pct: Option<f64>,
}

impl fmt::Display for BuyAndHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "From {} to {}", self.start, self.end)?;
        writeln!(f, "Total return:          {:6.2}%", self.total_return_pct)?;
        if let Some(cagr) = self.cagr_pct {
            writeln!(f, "Approx. CAGR:          {:6.2}%", cagr)?;
        }
        Ok(())
    }
}

/// Trade results of one calendar month, keyed by exit date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStats {
    /// `YYYY-MM`
    pub month: String,
    pub long_count: usize,
    pub long_return_pct: f64,
    pub short_count: usize,
    pub short_return_pct: f64,
    pub net_return_pct: f64,
}
