//! Indicator engine: moving averages, RSI, and the annotated bar series.
//!
//! Every function here is pure. Inputs are borrowed, outputs are freshly
//! allocated, and the same input always gives the same output.

mod ema;
mod rsi;
mod series;
mod signal;

pub use rsi::RsiMethod;
pub use series::{compute_indicators, IndicatorBar, IndicatorConfig};
pub use signal::{latest_signal, LatestSignal};

#[cfg(test)]
pub use series::SignalFlags;
