//! Relative Strength Index.
//!
//! Both variants split the one-bar change into a gain and a loss leg:
//!
//! ```text
//! gain[t] = max(x[t] - x[t-1], 0)
//! loss[t] = max(x[t-1] - x[t], 0)
//! RS      = avg_gain / avg_loss
//! RSI     = 100 - 100 / (1 + RS)
//! ```
//!
//! Bar 0 has no previous value and contributes a zero gain and loss.
//!
//! - [`RsiMethod::Wilder`] averages the legs with exponential smoothing
//!   (`alpha = 1 / length`). It is defined from bar 0 on.
//! - [`RsiMethod::Rolling`] uses an arithmetic mean over the last `length`
//!   bars and is NaN for the first `length - 1` bars. Kept for comparing
//!   against results produced with the rolling formula.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ema::{ewm, sma};
use crate::error::BacktestError;

/// How the average gain and loss are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiMethod {
    #[default]
    Wilder,
    Rolling,
}

impl RsiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsiMethod::Wilder => "wilder",
            RsiMethod::Rolling => "rolling",
        }
    }

    pub fn compute(&self, values: &[f64], length: usize) -> Vec<f64> {
        match self {
            RsiMethod::Wilder => wilder_rsi(values, length),
            RsiMethod::Rolling => rolling_rsi(values, length),
        }
    }
}

impl fmt::Display for RsiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RsiMethod {
    type Err = BacktestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wilder" | "ewm" => Ok(RsiMethod::Wilder),
            "rolling" | "simple" | "sma" => Ok(RsiMethod::Rolling),
            other => Err(BacktestError::invalid(format!("unknown RSI method '{other}'"))),
        }
    }
}

/// Wilder-smoothed RSI, one value per input, no NaN warm-up.
pub fn wilder_rsi(values: &[f64], length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }

    let (gains, losses) = split_changes(values);
    let alpha = 1.0 / length as f64;
    let avg_gain = ewm(&gains, alpha);
    let avg_loss = ewm(&losses, alpha);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

/// Rolling-mean RSI, one value per input, NaN during the warm-up window.
pub fn rolling_rsi(values: &[f64], length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }

    let (gains, losses) = split_changes(values);
    let avg_gain = sma(&gains, length);
    let avg_loss = sma(&losses, length);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

fn split_changes(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        let delta = if i == 0 { 0.0 } else { values[i] - values[i - 1] };
        if !delta.is_finite() {
            gains.push(0.0);
            losses.push(0.0);
            continue;
        }
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    (gains, losses)
}

/// RSI from the two averages.
///
/// A zero average loss gives 100 when there has been any gain, and 0 when
/// there has been no movement at all (the ratio is undefined there).
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return f64::NAN;
    }

    if avg_loss == 0.0 {
        return if avg_gain > 0.0 { 100.0 } else { 0.0 };
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
