//! Backtesting engine for the RSI-of-MA crossover rule.
//!
//! Features:
//! - Annotate the price history once with the indicator series
//! - Simulate each configured direction over it
//! - Summarize trades, compare against buy-and-hold
//! - Break results down by exit month and classify the latest bar

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::indicators::{compute_indicators, latest_signal, IndicatorConfig, LatestSignal};
use crate::metrics::MetricsCalculator;
use crate::models::{Bar, BuyAndHold, Direction, MonthlyStats, Trade, TradeSummary};
use crate::trading::{simulate, OpenPosition, SimulatorConfig};

/// Backtesting configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestConfig {
    /// Indicator parameters
    pub indicators: IndicatorConfig,

    /// Entry rule, fill timing and exit rule
    pub simulator: SimulatorConfig,

    /// Directions to simulate, each independently
    pub directions: Vec<Direction>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorConfig::default(),
            simulator: SimulatorConfig::default(),
            directions: vec![Direction::Long, Direction::Short],
        }
    }
}

/// Results of one direction.
#[derive(Debug, Clone, Serialize)]
pub struct DirectionReport {
    pub direction: Direction,
    pub summary: TradeSummary,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub unfilled_signal: Option<NaiveDate>,
}

/// Backtest results summary.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResults {
    pub config: BacktestConfig,

    /// First and last bar dates, `None` for an empty history
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,

    /// Number of bars the indicators ran over
    pub bars: usize,

    /// One report per simulated direction, in configured order
    pub reports: Vec<DirectionReport>,

    /// Summary over the trades of all directions
    pub combined: TradeSummary,

    pub buy_and_hold: Option<BuyAndHold>,

    /// All trades by exit month
    pub monthly: Vec<MonthlyStats>,

    /// Classification of the last bar
    pub latest_signal: Option<LatestSignal>,
}

impl BacktestResults {
    /// Trades of every direction, ordered by entry date.
    pub fn all_trades(&self) -> Vec<Trade> {
        let mut trades: Vec<Trade> = self.reports.iter().flat_map(|r| r.trades.iter().cloned()).collect();
        trades.sort_by_key(|t| (t.entry_date, t.exit_date));
        trades
    }
}

impl fmt::Display for BacktestResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ind = &self.config.indicators;
        let sim = &self.config.simulator;

        writeln!(f, "\n{:=^60}", " BACKTEST RESULTS ")?;
        writeln!(f)?;
        match (self.start, self.end) {
            (Some(start), Some(end)) => writeln!(f, "Period: {} to {} ({} bars)", start, end, self.bars)?,
            _ => writeln!(f, "Period: no data")?,
        }
        writeln!(f)?;
        writeln!(f, "--- Strategy ---")?;
        writeln!(
            f,
            "RSI({}) of EMA({}), signal EMA({}), {} smoothing",
            ind.rsi_length, ind.ma_length, ind.signal_length, ind.rsi_method
        )?;
        if ind.use_trend_filter {
            writeln!(f, "Trend filter: SMA({})", ind.trend_length)?;
        } else {
            writeln!(f, "Trend filter: off")?;
        }
        writeln!(f, "Entry: {} at {}", sim.entry_rule, sim.entry_timing.as_str())?;
        writeln!(f, "Exit:  {}", sim.exit_rule.as_str())?;

        for report in &self.reports {
            writeln!(f)?;
            writeln!(f, "--- {} trades ---", report.direction.as_str().to_uppercase())?;
            write!(f, "{}", report.summary)?;
            if let Some(open) = &report.open_position {
                let last_close = self.latest_signal.as_ref().map_or(open.entry_price, |s| s.close);
                writeln!(
                    f,
                    "Open position:         entered {} at {:.2}, {:+.2}% at last close (not counted)",
                    open.entry_date,
                    open.entry_price,
                    open.unrealized_pct(last_close)
                )?;
            }
            if let Some(date) = report.unfilled_signal {
                writeln!(f, "Pending signal:        {} (fills next session)", date)?;
            }
        }

        if self.reports.len() > 1 {
            writeln!(f)?;
            writeln!(f, "--- Combined ---")?;
            write!(f, "{}", self.combined)?;
        }

        if let Some(bh) = &self.buy_and_hold {
            writeln!(f)?;
            writeln!(f, "--- Buy & Hold ---")?;
            write!(f, "{}", bh)?;
        }

        if !self.monthly.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Monthly ---")?;
            writeln!(f, "{:<8} {:>6} {:>9} {:>6} {:>9} {:>9}", "MONTH", "LONGS", "LONG%", "SHORTS", "SHORT%", "NET%")?;
            for m in &self.monthly {
                writeln!(
                    f,
                    "{:<8} {:>6} {:>9.2} {:>6} {:>9.2} {:>9.2}",
                    m.month, m.long_count, m.long_return_pct, m.short_count, m.short_return_pct, m.net_return_pct
                )?;
            }
        }

        if let Some(signal) = &self.latest_signal {
            writeln!(f)?;
            writeln!(f, "--- Latest Signal ---")?;
            writeln!(f, "{}", signal)?;
        }

        writeln!(f, "{:=^60}", "")?;
        Ok(())
    }
}

/// Backtesting engine.
pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    /// Create a new backtester. Invalid parameters are rejected here, before
    /// any data is touched.
    pub fn new(config: BacktestConfig) -> Result<Self> {
        config.indicators.validate()?;
        config.simulator.validate()?;
        Ok(Self { config })
    }

    /// Run the backtest over `bars`, which must be sorted by date.
    pub fn run(&self, bars: &[Bar]) -> Result<BacktestResults> {
        info!(
            bars = bars.len(),
            rule = %self.config.simulator.entry_rule,
            entry = self.config.simulator.entry_timing.as_str(),
            exit = self.config.simulator.exit_rule.as_str(),
            "Starting backtest"
        );

        let series = compute_indicators(bars, &self.config.indicators)?;

        let mut reports = Vec::with_capacity(self.config.directions.len());
        for &direction in &self.config.directions {
            let outcome = simulate(&series, direction, &self.config.simulator)?;
            let summary = MetricsCalculator::summarize(&outcome.trades);

            info!(
                direction = %direction,
                trades = summary.trades,
                win_rate_pct = summary.win_rate_pct,
                compounded_pct = summary.compounded_return_pct,
                "Direction complete"
            );

            reports.push(DirectionReport {
                direction,
                summary,
                trades: outcome.trades,
                open_position: outcome.open_position,
                unfilled_signal: outcome.unfilled_signal,
            });
        }

        let mut results = BacktestResults {
            config: self.config.clone(),
            start: bars.first().map(|b| b.date),
            end: bars.last().map(|b| b.date),
            bars: bars.len(),
            reports,
            combined: TradeSummary::default(),
            buy_and_hold: MetricsCalculator::buy_and_hold(bars),
            monthly: Vec::new(),
            latest_signal: latest_signal(&series),
        };

        let all_trades = results.all_trades();
        results.combined = MetricsCalculator::summarize(&all_trades);
        results.monthly = MetricsCalculator::monthly_breakdown(&all_trades);

        info!(
            trades = results.combined.trades,
            compounded_pct = results.combined.compounded_return_pct,
            "Backtest complete"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BacktestError;
    use crate::test_support::{bars_from_closes, wavy_closes};
    use crate::trading::{generate_trades, EntryRule, EntryTiming, ExitRule};

    fn report(results: &BacktestResults, direction: Direction) -> Option<&DirectionReport> {
        results.reports.iter().find(|r| r.direction == direction)
    }

    #[test]
    fn test_run_both_directions() {
        let bars = bars_from_closes(&wavy_closes(600));
        let results = Backtester::new(BacktestConfig::default()).unwrap().run(&bars).unwrap();

        assert_eq!(results.bars, 600);
        assert_eq!(results.reports.len(), 2);
        assert_eq!(results.start, Some(bars[0].date));
        assert_eq!(results.end, Some(bars[599].date));

        let long = report(&results, Direction::Long).unwrap();
        let short = report(&results, Direction::Short).unwrap();
        assert!(long.summary.trades > 0);
        assert!(short.summary.trades > 0);
        assert_eq!(results.combined.trades, long.summary.trades + short.summary.trades);

        let monthly_net: f64 = results.monthly.iter().map(|m| m.net_return_pct).sum();
        assert!((monthly_net - results.combined.summed_return_pct).abs() < 1e-6);

        assert!(results.buy_and_hold.is_some());
        assert!(results.latest_signal.is_some());
    }

    #[test]
    fn test_reports_match_simulator() {
        let bars = bars_from_closes(&wavy_closes(400));
        let config = BacktestConfig {
            directions: vec![Direction::Short],
            ..Default::default()
        };
        let results = Backtester::new(config.clone()).unwrap().run(&bars).unwrap();

        let series = compute_indicators(&bars, &config.indicators).unwrap();
        let expected = generate_trades(&series, Direction::Short, &config.simulator).unwrap();

        assert_eq!(results.reports.len(), 1);
        assert_eq!(results.reports[0].trades, expected);
        assert!(report(&results, Direction::Long).is_none());
    }

    #[test]
    fn test_all_trades_sorted_by_entry() {
        let bars = bars_from_closes(&wavy_closes(600));
        let results = Backtester::new(BacktestConfig::default()).unwrap().run(&bars).unwrap();

        let trades = results.all_trades();
        assert_eq!(trades.len(), results.combined.trades);
        assert!(trades.windows(2).all(|w| w[0].entry_date <= w[1].entry_date));
    }

    #[test]
    fn test_empty_history() {
        let results = Backtester::new(BacktestConfig::default()).unwrap().run(&[]).unwrap();

        assert_eq!(results.bars, 0);
        assert!(results.start.is_none());
        assert!(results.combined.is_empty());
        assert!(results.buy_and_hold.is_none());
        assert!(results.latest_signal.is_none());
        assert!(results.to_string().contains("no data"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = BacktestConfig::default();
        config.indicators.rsi_length = 0;
        assert!(matches!(Backtester::new(config), Err(BacktestError::InvalidArgument(_))));

        let mut config = BacktestConfig::default();
        config.simulator.entry_timing = EntryTiming::SignalBarClose;
        config.simulator.exit_rule = ExitRule::EntryBarClose;
        assert!(Backtester::new(config).is_err());
    }

    #[test]
    fn test_report_rendering() {
        let bars = bars_from_closes(&wavy_closes(300));
        let config = BacktestConfig {
            simulator: SimulatorConfig::with_rule(EntryRule::Robust),
            ..Default::default()
        };
        let results = Backtester::new(config).unwrap().run(&bars).unwrap();
        let text = results.to_string();

        assert!(text.contains("BACKTEST RESULTS"));
        assert!(text.contains("--- LONG trades ---"));
        assert!(text.contains("--- SHORT trades ---"));
        assert!(text.contains("Entry: robust at next-open"));
        assert!(text.contains("--- Buy & Hold ---"));
    }

    #[test]
    fn test_open_position_shown_with_unrealized_return() {
        // A steady climb with a one-bar MA crosses up once and never exits.
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let bars = bars_from_closes(&closes);
        let config = BacktestConfig {
            indicators: IndicatorConfig {
                ma_length: 1,
                ..Default::default()
            },
            directions: vec![Direction::Long],
            ..Default::default()
        };
        let results = Backtester::new(config).unwrap().run(&bars).unwrap();

        let open = results.reports[0].open_position.unwrap();
        assert!(results.combined.is_empty());
        assert!(open.unrealized_pct(closes[59]) > 0.0);
        assert!(results.to_string().contains("% at last close (not counted)"));
    }

    #[test]
    fn test_results_serialize() {
        let bars = bars_from_closes(&wavy_closes(200));
        let results = Backtester::new(BacktestConfig::default()).unwrap().run(&bars).unwrap();
        let json = serde_json::to_value(&results).unwrap();

        assert_eq!(json["bars"], 200);
        assert_eq!(json["reports"].as_array().unwrap().len(), 2);
        assert_eq!(json["config"]["indicators"]["ma_length"], 9);
    }
}
