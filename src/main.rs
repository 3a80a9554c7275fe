//! RSI-of-MA crossover backtester
//!
//! Runs an RSI over a moving average of close, trades the crossovers of that
//! RSI with its own signal line on daily bars, and reports how the trades did.

mod backtest;
mod data;
mod error;
mod indicators;
mod metrics;
mod models;
#[cfg(test)]
mod test_support;
mod trading;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::backtest::{BacktestConfig, BacktestResults, Backtester};
use crate::data::load_bars;
use crate::indicators::{compute_indicators, latest_signal, IndicatorConfig, RsiMethod};
use crate::models::{Direction, RsiBand, Trade};
use crate::trading::{generate_trades_for, EntryRule, EntryTiming, ExitRule, SimulatorConfig};

/// RSI-of-MA backtester CLI.
#[derive(Parser)]
#[command(name = "rsima")]
#[command(about = "Backtest RSI-of-MA signal-line crossovers on daily bars", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "RSIMA_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full backtest and print the report
    Backtest {
        /// Daily OHLC history (CSV with a header row)
        #[arg(short, long, env = "RSIMA_DATA")]
        data: PathBuf,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Print JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// List every completed trade
    Trades {
        /// Daily OHLC history (CSV with a header row)
        #[arg(short, long, env = "RSIMA_DATA")]
        data: PathBuf,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Classify the most recent bar
    Signal {
        /// Daily OHLC history (CSV with a header row)
        #[arg(short, long, env = "RSIMA_DATA")]
        data: PathBuf,

        #[command(flatten)]
        indicators: IndicatorArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        #[command(flatten)]
        strategy: StrategyArgs,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Indicator parameters.
#[derive(Args, Debug, Clone)]
struct IndicatorArgs {
    /// Span of the EMA applied to close
    #[arg(long, default_value = "9", env = "RSIMA_MA_LENGTH")]
    ma_length: usize,

    /// RSI lookback
    #[arg(long, default_value = "14", env = "RSIMA_RSI_LENGTH")]
    rsi_length: usize,

    /// Span of the signal-line EMA
    #[arg(long, default_value = "22", env = "RSIMA_SIGNAL_LENGTH")]
    signal_length: usize,

    /// Window of the trend SMA
    #[arg(long, default_value = "50", env = "RSIMA_TREND_LENGTH")]
    trend_length: usize,

    /// Upper RSI extreme for robust short entries
    #[arg(long, default_value = "80", env = "RSIMA_RSI_UPPER")]
    rsi_upper: f64,

    /// Lower RSI extreme for robust long entries
    #[arg(long, default_value = "20", env = "RSIMA_RSI_LOWER")]
    rsi_lower: f64,

    /// Treat every bar as both uptrend and downtrend
    #[arg(long, env = "RSIMA_NO_TREND_FILTER")]
    no_trend_filter: bool,

    /// RSI smoothing (wilder, rolling)
    #[arg(long, default_value = "wilder", env = "RSIMA_RSI_METHOD")]
    rsi_method: String,
}

impl IndicatorArgs {
    fn to_config(&self) -> Result<IndicatorConfig> {
        let config = IndicatorConfig {
            ma_length: self.ma_length,
            rsi_length: self.rsi_length,
            signal_length: self.signal_length,
            trend_length: self.trend_length,
            rsi_upper: self.rsi_upper,
            rsi_lower: self.rsi_lower,
            use_trend_filter: !self.no_trend_filter,
            rsi_method: self.rsi_method.parse::<RsiMethod>()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Indicator parameters plus entry and exit rules.
#[derive(Args, Debug, Clone)]
struct StrategyArgs {
    #[command(flatten)]
    indicators: IndicatorArgs,

    /// Entry rule (crossover, banded, robust)
    #[arg(long, default_value = "crossover", env = "RSIMA_RULE")]
    rule: String,

    /// JSON file with {"RSI_LOW": .., "RSI_HIGH": ..} for the banded rule
    #[arg(long, default_value = "rsi_band.json", env = "RSIMA_BAND_FILE")]
    band_file: PathBuf,

    /// Band lower bound, overrides the band file
    #[arg(long, requires = "band_high")]
    band_low: Option<f64>,

    /// Band upper bound, overrides the band file
    #[arg(long, requires = "band_low")]
    band_high: Option<f64>,

    /// Entry fill (next-open, signal-open, signal-close)
    #[arg(long, default_value = "next-open", env = "RSIMA_ENTRY")]
    entry: String,

    /// Exit rule (opposite-cross, entry-bar-close)
    #[arg(long, default_value = "opposite-cross", env = "RSIMA_EXIT")]
    exit: String,

    /// Direction to trade (long, short, both)
    #[arg(long, default_value = "both", env = "RSIMA_DIRECTION")]
    direction: String,
}

impl StrategyArgs {
    fn to_config(&self) -> Result<BacktestConfig> {
        let entry_rule = match self.rule.trim().to_lowercase().as_str() {
            "crossover" | "cross" => EntryRule::Crossover,
            "banded" | "band" => EntryRule::Banded { band: self.band() },
            "robust" => EntryRule::Robust,
            other => bail!("Unknown entry rule '{}'", other),
        };

        let directions = self
            .direction_names()
            .iter()
            .map(|d| d.parse::<Direction>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let simulator = SimulatorConfig {
            entry_rule,
            entry_timing: self.entry.parse::<EntryTiming>()?,
            exit_rule: self.exit.parse::<ExitRule>()?,
        };
        simulator.validate()?;

        Ok(BacktestConfig {
            indicators: self.indicators.to_config()?,
            simulator,
            directions,
        })
    }

    /// `--direction` expanded to one name per simulated direction.
    fn direction_names(&self) -> Vec<String> {
        match self.direction.trim().to_lowercase().as_str() {
            "both" | "all" => vec!["long".to_string(), "short".to_string()],
            other => vec![other.to_string()],
        }
    }

    fn band(&self) -> RsiBand {
        match (self.band_low, self.band_high) {
            (Some(low), Some(high)) => RsiBand::new(low, high),
            _ => RsiBand::load(&self.band_file),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Backtest { data, strategy, json } => {
            let results = run_backtest(&data, &strategy)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", results);
            }
        }

        Commands::Trades { data, strategy, json } => {
            let config = strategy.to_config()?;
            let bars = load_bars(&data)?;
            let series = compute_indicators(&bars, &config.indicators)?;

            let mut trades = Vec::new();
            for direction in strategy.direction_names() {
                trades.extend(generate_trades_for(&series, &direction, &config.simulator)?);
            }
            trades.sort_by_key(|t| (t.entry_date, t.exit_date));

            info!(trades = trades.len(), "Generated trades");

            if json {
                println!("{}", serde_json::to_string_pretty(&trades)?);
            } else {
                print_trades(&trades);
            }
        }

        Commands::Signal { data, indicators, json } => {
            let config = indicators.to_config()?;
            let bars = load_bars(&data)?;
            let series = compute_indicators(&bars, &config)?;

            match latest_signal(&series) {
                Some(signal) if json => println!("{}", serde_json::to_string_pretty(&signal)?),
                Some(signal) => {
                    println!("\n=== Latest Signal ===\n");
                    println!("{}", signal);
                }
                None => println!("No bars in {}", data.display()),
            }
        }

        Commands::Config { strategy, json } => {
            let config = strategy.to_config()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }

            let ind = &config.indicators;
            let sim = &config.simulator;

            println!("\n=== Indicator Configuration ===\n");
            println!("  MA Length:            {}", ind.ma_length);
            println!("  RSI Length:           {}", ind.rsi_length);
            println!("  Signal Length:        {}", ind.signal_length);
            println!("  RSI Method:           {}", ind.rsi_method);
            println!("  Trend Filter:         {}", ind.use_trend_filter);
            println!("  Trend Length:         {}", ind.trend_length);
            println!("  RSI Upper / Lower:    {} / {}", ind.rsi_upper, ind.rsi_lower);

            println!("\n=== Simulator Configuration ===\n");
            println!("  Entry Rule:           {}", sim.entry_rule);
            println!("  Entry Timing:         {}", sim.entry_timing.as_str());
            println!("  Exit Rule:            {}", sim.exit_rule.as_str());
            println!(
                "  Directions:           {}",
                config.directions.iter().map(|d| d.as_str()).collect::<Vec<_>>().join(", ")
            );
        }
    }

    Ok(())
}

fn run_backtest(data: &std::path::Path, strategy: &StrategyArgs) -> Result<BacktestResults> {
    let config = strategy.to_config()?;
    let backtester = Backtester::new(config)?;

    let bars = load_bars(data)?;
    if bars.is_empty() {
        bail!("No usable bars in {}", data.display());
    }

    info!(
        from = %bars[0].date,
        to = %bars[bars.len() - 1].date,
        "Running backtest"
    );

    Ok(backtester.run(&bars)?)
}

fn print_trades(trades: &[Trade]) {
    if trades.is_empty() {
        println!("No trades generated.");
        return;
    }

    println!(
        "\n{:<6} {:<10} {:<10} {:<10} {:>10} {:>10} {:>8} {:>9} {:>6}",
        "DIR", "SIGNAL", "ENTRY", "EXIT", "ENTRY PX", "EXIT PX", "RET%", "POINTS", "RSI"
    );
    println!("{}", "-".repeat(87));

    for t in trades {
        let rsi = t.rsi_at_signal.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<10} {:<10} {:<10} {:>10.2} {:>10.2} {:>8.2} {:>9.2} {:>6}",
            t.direction.as_str(), t.signal_date, t.entry_date, t.exit_date, t.entry_price, t.exit_price, t.return_pct, t.point_gain, rsi
        );
    }
}
