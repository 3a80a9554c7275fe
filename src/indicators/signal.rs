//! Classification of the most recent bar.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::series::IndicatorBar;

/// What the last bar says about the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalBias {
    /// rsi_ma crossed above the signal line on this bar
    FreshBuy,
    /// rsi_ma crossed below the signal line on this bar
    FreshSell,
    /// Above the line without a fresh cross
    Bullish,
    /// Below the line without a fresh cross
    Bearish,
    /// On the line, or readings undefined
    NoSignal,
}

impl SignalBias {
    pub fn label(&self) -> &'static str {
        match self {
            SignalBias::FreshBuy => "BUY (UP)",
            SignalBias::FreshSell => "SELL (DOWN)",
            SignalBias::Bullish => "BULLISH BIAS",
            SignalBias::Bearish => "BEARISH BIAS",
            SignalBias::NoSignal => "NO SIGNAL",
        }
    }

    pub fn comment(&self) -> &'static str {
        match self {
            SignalBias::FreshBuy => "RSI(MA) crossed above the signal line on the latest bar.",
            SignalBias::FreshSell => "RSI(MA) crossed below the signal line on the latest bar.",
            SignalBias::Bullish => "RSI(MA) is above the signal line, no fresh cross.",
            SignalBias::Bearish => "RSI(MA) is below the signal line, no fresh cross.",
            SignalBias::NoSignal => "No clear long or short signal on the latest bar.",
        }
    }
}

impl fmt::Display for SignalBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LatestSignal {
    pub as_of: NaiveDate,
    pub close: f64,
    pub rsi_ma: f64,
    pub rsi_signal: f64,
    pub bias: SignalBias,
}

impl LatestSignal {
    pub fn from_bar(bar: &IndicatorBar) -> Self {
        let bias = if bar.cross_up() {
            SignalBias::FreshBuy
        } else if bar.cross_down() {
            SignalBias::FreshSell
        } else if bar.rsi_ma > bar.rsi_signal {
            SignalBias::Bullish
        } else if bar.rsi_ma < bar.rsi_signal {
            SignalBias::Bearish
        } else {
            SignalBias::NoSignal
        };

        Self {
            as_of: bar.bar.date,
            close: bar.bar.close,
            rsi_ma: bar.rsi_ma,
            rsi_signal: bar.rsi_signal,
            bias,
        }
    }
}

impl fmt::Display for LatestSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "As of:       {}", self.as_of)?;
        writeln!(f, "Close:       {:.2}", self.close)?;
        writeln!(f, "RSI(MA):     {:.2}", self.rsi_ma)?;
        writeln!(f, "Signal line: {:.2}", self.rsi_signal)?;
        writeln!(f, "Direction:   {}", self.bias)?;
        write!(f, "             {}", self.bias.comment())
    }
}

/// Classify the last bar of `series`; `None` for an empty series.
pub fn latest_signal(series: &[IndicatorBar]) -> Option<LatestSignal> {
    series.last().map(LatestSignal::from_bar)
}
