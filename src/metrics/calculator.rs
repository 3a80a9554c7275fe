//! Calculator for trade performance: win rate, compounded P&L, drawdown, etc.

use std::collections::BTreeMap;

use chrono::Datelike;
use statrs::statistics::{Data, Median, Statistics};

use crate::models::{Bar, BuyAndHold, Direction, MonthlyStats, Trade, TradeSummary};

/// Calculator for strategy performance metrics.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Summarize a list of completed trades.
    pub fn summarize(trades: &[Trade]) -> TradeSummary {
        let mut summary = TradeSummary::default();

        if trades.is_empty() {
            summary.profit_factor = Some(0.0);
            return summary;
        }

        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();

        summary.trades = trades.len();
        summary.wins = trades.iter().filter(|t| t.is_win()).count();
        summary.losses = returns.iter().filter(|&&r| r < 0.0).count();
        summary.win_rate_pct = summary.wins as f64 / summary.trades as f64 * 100.0;

        summary.avg_return_pct = returns.clone().mean();
        summary.median_return_pct = Data::new(returns.clone()).median();
        summary.best_return_pct = returns.clone().max();
        summary.worst_return_pct = returns.clone().min();

        summary.summed_return_pct = returns.iter().sum();
        summary.total_points = trades.iter().map(|t| t.point_gain).sum();

        Self::calculate_profit_factor(&mut summary, &returns);
        Self::calculate_equity(&mut summary, &returns);

        summary.avg_holding_days = trades
            .iter()
            .map(|t| t.holding_days() as f64)
            .sum::<f64>()
            / trades.len() as f64;

        summary
    }

    fn calculate_profit_factor(summary: &mut TradeSummary, returns: &[f64]) {
        let gross_win: f64 = returns.iter().filter(|&&r| r > 0.0).sum();
        let gross_loss: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r.abs()).sum();

        summary.profit_factor = if gross_loss > 0.0 {
            Some(gross_win / gross_loss)
        } else if gross_win > 0.0 {
            None
        } else {
            Some(0.0)
        };
    }

    /// Compound the trades one after another and track the drawdown.
    fn calculate_equity(summary: &mut TradeSummary, returns: &[f64]) {
        let mut equity = 1.0_f64;
        let mut peak = 1.0_f64;
        let mut max_dd = 0.0_f64;

        for r in returns {
            equity *= 1.0 + r / 100.0;
            if equity > peak {
                peak = equity;
            }
            let dd = (peak - equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }

        summary.compounded_return_pct = (equity - 1.0) * 100.0;
        summary.max_drawdown_pct = max_dd * 100.0;
    }

    /// Buy-and-hold over the whole series; `None` for an empty series.
    pub fn buy_and_hold(bars: &[Bar]) -> Option<BuyAndHold> {
        let first = bars.first()?;
        let last = bars.last()?;

        let total_return = (last.close - first.open) / first.open;
        let years = (last.date - first.date).num_days() as f64 / 365.25;
        let cagr_pct = (years > 0.0).then(|| ((1.0 + total_return).powf(1.0 / years) - 1.0) * 100.0);

        Some(BuyAndHold {
            start: first.date,
            end: last.date,
            first_open: first.open,
            last_close: last.close,
            total_return_pct: total_return * 100.0,
            years,
            cagr_pct,
        })
    }

    /// Month-by-month results keyed by exit month, oldest first.
    pub fn monthly_breakdown(trades: &[Trade]) -> Vec<MonthlyStats> {
        let mut months: BTreeMap<(i32, u32), MonthlyStats> = BTreeMap::new();

        for trade in trades {
            let key = (trade.exit_date.year(), trade.exit_date.month());
            let entry = months.entry(key).or_insert_with(|| MonthlyStats {
                month: format!("{:04}-{:02}", key.0, key.1),
                long_count: 0,
                long_return_pct: 0.0,
                short_count: 0,
                short_return_pct: 0.0,
                net_return_pct: 0.0,
            });

            match trade.direction {
                Direction::Long => {
                    entry.long_count += 1;
                    entry.long_return_pct += trade.return_pct;
                }
                Direction::Short => {
                    entry.short_count += 1;
                    entry.short_return_pct += trade.return_pct;
                }
            }
            entry.net_return_pct += trade.return_pct;
        }

        months.into_values().collect()
    }
}
