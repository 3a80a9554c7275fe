//! The indicator-annotated bar series.
//!
//! Pipeline per series:
//!
//! ```text
//! close ──EMA(ma_length)──▶ ma ──RSI(rsi_length)──▶ rsi_ma ──EMA(signal_length)──▶ rsi_signal
//! close ──SMA(trend_length)──▶ trend_ma ──▶ uptrend / downtrend
//! ```
//!
//! Flags are derived bar by bar from the current and the previous reading of
//! `rsi_ma` / `rsi_signal`, so nothing looks ahead.

use serde::{Deserialize, Serialize};

use super::ema::{ema, sma};
use super::rsi::RsiMethod;
use crate::error::{BacktestError, Result};
use crate::models::{closes, Bar};

/// Parameters of the RSI-of-MA rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Span of the price EMA
    pub ma_length: usize,

    /// Lookback of the RSI applied to the price EMA
    pub rsi_length: usize,

    /// Span of the signal-line EMA of the RSI
    pub signal_length: usize,

    /// Window of the trend SMA of close
    pub trend_length: usize,

    /// Short-side extreme for robust signals
    pub rsi_upper: f64,

    /// Long-side extreme for robust signals
    pub rsi_lower: f64,

    /// When false, uptrend and downtrend are always true
    pub use_trend_filter: bool,

    pub rsi_method: RsiMethod,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_length: 9,
            rsi_length: 14,
            signal_length: 22,
            trend_length: 50,
            rsi_upper: 80.0,
            rsi_lower: 20.0,
            use_trend_filter: true,
            rsi_method: RsiMethod::Wilder,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("ma_length", self.ma_length),
            ("rsi_length", self.rsi_length),
            ("signal_length", self.signal_length),
            ("trend_length", self.trend_length),
        ];
        for (name, value) in lengths {
            if value == 0 {
                return Err(BacktestError::invalid(format!("{name} must be at least 1")));
            }
        }

        if !self.rsi_lower.is_finite() || !self.rsi_upper.is_finite() {
            return Err(BacktestError::invalid("RSI thresholds must be finite"));
        }
        if self.rsi_lower >= self.rsi_upper {
            return Err(BacktestError::invalid(format!(
                "rsi_lower ({}) must be below rsi_upper ({})",
                self.rsi_lower, self.rsi_upper
            )));
        }

        Ok(())
    }

    /// Bars needed before any smoothing window has filled. Bars earlier than
    /// this carry no signals.
    pub fn min_history(&self) -> usize {
        let mut min = self.ma_length.min(self.rsi_length).min(self.signal_length);
        if self.use_trend_filter {
            min = min.min(self.trend_length);
        }
        min
    }
}

/// Boolean signal state of one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalFlags {
    /// rsi_ma moved from <= to > rsi_signal on this bar
    pub cross_up: bool,

    /// rsi_ma moved from >= to < rsi_signal on this bar
    pub cross_down: bool,

    /// rsi_ma above rsi_signal
    pub pal: bool,

    /// rsi_ma below rsi_signal
    pub pas: bool,

    /// Regime turned PAL on this bar
    pub chg_pal: bool,

    /// Regime turned PAS on this bar
    pub chg_pas: bool,

    pub robust_long: bool,

    pub robust_short: bool,
}

impl SignalFlags {
    /// Derive the flags of the current bar.
    ///
    /// `prev` is the previous bar's `(rsi_ma, rsi_signal)`, `None` on bar 0.
    /// Any NaN reading makes the comparisons it takes part in false.
    pub fn derive(
        prev: Option<(f64, f64)>,
        rsi: f64,
        signal: f64,
        uptrend: bool,
        downtrend: bool,
        config: &IndicatorConfig,
    ) -> Self {
        let pal = rsi > signal;
        let pas = rsi < signal;

        let (cross_up, cross_down, chg_pal, chg_pas) = match prev {
            Some((prev_rsi, prev_signal)) => (
                prev_rsi <= prev_signal && pal,
                prev_rsi >= prev_signal && pas,
                pal && !(prev_rsi > prev_signal),
                pas && !(prev_rsi < prev_signal),
            ),
            None => (false, false, false, false),
        };

        Self {
            cross_up,
            cross_down,
            pal,
            pas,
            chg_pal,
            chg_pas,
            robust_long: chg_pal && rsi < config.rsi_lower && uptrend,
            robust_short: chg_pas && rsi > config.rsi_upper && downtrend,
        }
    }
}

/// A bar with its derived indicator values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorBar {
    #[serde(flatten)]
    pub bar: Bar,

    pub ma: f64,

    pub rsi_ma: f64,

    pub rsi_signal: f64,

    /// `None` until the trend window has filled
    pub trend_ma: Option<f64>,

    pub uptrend: bool,

    pub downtrend: bool,

    #[serde(flatten)]
    pub flags: SignalFlags,
}

impl IndicatorBar {
    pub fn cross_up(&self) -> bool {
        self.flags.cross_up
    }

    pub fn cross_down(&self) -> bool {
        self.flags.cross_down
    }
}

/// Annotate `bars` with the RSI-of-MA indicators.
///
/// `bars` must already be sorted by date. An empty input gives an empty
/// output. Bars before index `min_history() - 1` keep their indicator values
/// but carry no signal flags, so a series shorter than
/// [`IndicatorConfig::min_history`] has none at all.
pub fn compute_indicators(bars: &[Bar], config: &IndicatorConfig) -> Result<Vec<IndicatorBar>> {
    config.validate()?;

    if bars.is_empty() {
        return Ok(Vec::new());
    }

    let close = closes(bars);
    let ma = ema(&close, config.ma_length);
    let rsi_ma = config.rsi_method.compute(&ma, config.rsi_length);
    let rsi_signal = ema(&rsi_ma, config.signal_length);
    let trend_ma = sma(&close, config.trend_length);

    let min_history = config.min_history();

    let mut series = Vec::with_capacity(bars.len());
    let mut prev: Option<(f64, f64)> = None;

    for (i, bar) in bars.iter().enumerate() {
        let trend = Some(trend_ma[i]).filter(|t| t.is_finite());

        let (uptrend, downtrend) = if config.use_trend_filter {
            (
                trend.is_some_and(|t| bar.close > t),
                trend.is_some_and(|t| bar.close < t),
            )
        } else {
            (true, true)
        };

        // Gate on the bar's own position so appending bars never changes it.
        let flags = if i + 1 >= min_history {
            SignalFlags::derive(prev, rsi_ma[i], rsi_signal[i], uptrend, downtrend, config)
        } else {
            SignalFlags::default()
        };

        series.push(IndicatorBar {
            bar: *bar,
            ma: ma[i],
            rsi_ma: rsi_ma[i],
            rsi_signal: rsi_signal[i],
            trend_ma: trend,
            uptrend,
            downtrend,
            flags,
        });

        prev = Some((rsi_ma[i], rsi_signal[i]));
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bars_from_closes, wavy_closes};

    #[test]
    fn test_empty_input_gives_empty_series() {
        let series = compute_indicators(&[], &IndicatorConfig::default()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_invalid_lengths_are_rejected() {
        let config = IndicatorConfig {
            rsi_length: 0,
            ..Default::default()
        };
        let err = compute_indicators(&bars_from_closes(&[1.0, 2.0]), &config).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidArgument(_)));

        let config = IndicatorConfig {
            rsi_lower: 80.0,
            rsi_upper: 20.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deterministic_output() {
        let bars = bars_from_closes(&wavy_closes(300));
        let config = IndicatorConfig::default();
        let a = compute_indicators(&bars, &config).unwrap();
        let b = compute_indicators(&bars, &config).unwrap();

        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.rsi_ma.to_bits(), y.rsi_ma.to_bits());
            assert_eq!(x.rsi_signal.to_bits(), y.rsi_signal.to_bits());
            assert_eq!(x.flags, y.flags);
        }
    }

    #[test]
    fn test_crosses_are_exclusive_and_absent_on_bar_zero() {
        let bars = bars_from_closes(&wavy_closes(400));
        for method in [RsiMethod::Wilder, RsiMethod::Rolling] {
            let config = IndicatorConfig {
                rsi_method: method,
                ..Default::default()
            };
            let series = compute_indicators(&bars, &config).unwrap();

            assert!(!series[0].cross_up());
            assert!(!series[0].cross_down());
            assert!(series.iter().any(|b| b.cross_up()));
            assert!(series.iter().any(|b| b.cross_down()));
            for b in &series {
                assert!(!(b.cross_up() && b.cross_down()), "both crosses on {}", b.bar.date);
            }
        }
    }

    #[test]
    fn test_crosses_alternate() {
        let bars = bars_from_closes(&wavy_closes(400));
        let series = compute_indicators(&bars, &IndicatorConfig::default()).unwrap();

        let crosses: Vec<bool> = series
            .iter()
            .filter(|b| b.cross_up() || b.cross_down())
            .map(|b| b.cross_up())
            .collect();
        for pair in crosses.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_flags_ignore_later_bars() {
        let closes = [100.0, 105.0, 103.0, 108.0, 107.0, 110.0, 112.0, 115.0, 118.0, 120.0];
        let config = IndicatorConfig::default();
        let full = compute_indicators(&bars_from_closes(&closes), &config).unwrap();

        for len in 1..closes.len() {
            let prefix = compute_indicators(&bars_from_closes(&closes[..len]), &config).unwrap();
            for (a, b) in prefix.iter().zip(&full) {
                assert_eq!(a.flags, b.flags, "flags on {} changed when bars were appended", a.bar.date);
            }
        }

        // Gated until the ninth bar, so the bar-1 rise raises nothing.
        assert_eq!(config.min_history(), 9);
        assert!(full[..8].iter().all(|b| b.flags == SignalFlags::default()));
    }

    #[test]
    fn test_no_lookahead() {
        let closes = wavy_closes(200);
        let config = IndicatorConfig::default();
        let full = compute_indicators(&bars_from_closes(&closes), &config).unwrap();
        for len in [5, 8, 9, 60, 120] {
            let prefix = compute_indicators(&bars_from_closes(&closes[..len]), &config).unwrap();

            for (a, b) in prefix.iter().zip(&full) {
                assert_eq!(a.rsi_ma.to_bits(), b.rsi_ma.to_bits());
                assert_eq!(a.flags, b.flags);
                assert_eq!(a.trend_ma, b.trend_ma);
            }
        }
    }

    #[test]
    fn test_trend_filter_warm_up() {
        let bars = bars_from_closes(&wavy_closes(80));
        let series = compute_indicators(&bars, &IndicatorConfig::default()).unwrap();

        for b in &series[..49] {
            assert!(b.trend_ma.is_none());
            assert!(!b.uptrend && !b.downtrend);
            assert!(!b.flags.robust_long && !b.flags.robust_short);
        }
        assert!(series[49].trend_ma.is_some());
    }

    #[test]
    fn test_trend_filter_disabled() {
        let config = IndicatorConfig {
            use_trend_filter: false,
            ..Default::default()
        };
        let series = compute_indicators(&bars_from_closes(&wavy_closes(30)), &config).unwrap();
        assert!(series.iter().all(|b| b.uptrend && b.downtrend));
    }

    #[test]
    fn test_short_series_has_no_flags() {
        let closes = [100.0, 105.0, 103.0, 108.0, 107.0];
        let series = compute_indicators(&bars_from_closes(&closes), &IndicatorConfig::default()).unwrap();

        assert_eq!(series.len(), 5);
        assert!(series.iter().all(|b| b.flags == SignalFlags::default()));
        assert!(series.iter().all(|b| b.rsi_ma.is_finite()));
    }

    #[test]
    fn test_ma_length_one_tracks_close() {
        let closes = [100.0, 105.0, 103.0, 108.0, 107.0];
        let config = IndicatorConfig {
            ma_length: 1,
            ..Default::default()
        };
        let series = compute_indicators(&bars_from_closes(&closes), &config).unwrap();

        for (b, c) in series.iter().zip(closes) {
            assert_eq!(b.ma, c);
        }
        // First rise takes rsi_ma from 0 to 100, above the lagging signal line.
        assert!(series[1].cross_up());
        assert_eq!(series.iter().filter(|b| b.cross_up()).count(), 1);
    }

    #[test]
    fn test_downward_flip_below_lower_threshold_is_not_robust_long() {
        let config = IndicatorConfig::default();

        // Previous bar above the line, current bar at 15 below it, uptrend active.
        let flags = SignalFlags::derive(Some((25.0, 20.0)), 15.0, 20.0, true, false, &config);
        assert!(flags.cross_down);
        assert!(flags.chg_pas);
        assert!(!flags.robust_long);
        assert!(!flags.robust_short);

        // Upward flip at 15 with uptrend is robust.
        let flags = SignalFlags::derive(Some((10.0, 12.0)), 15.0, 12.0, true, false, &config);
        assert!(flags.cross_up);
        assert!(flags.robust_long);

        // Same upward flip against the trend is not.
        let flags = SignalFlags::derive(Some((10.0, 12.0)), 15.0, 12.0, false, true, &config);
        assert!(!flags.robust_long);
    }

    #[test]
    fn test_upward_flip_above_upper_threshold_is_not_robust_short() {
        let config = IndicatorConfig::default();

        let flags = SignalFlags::derive(Some((80.0, 84.0)), 90.0, 84.0, false, true, &config);
        assert!(flags.chg_pal);
        assert!(!flags.robust_short);

        let flags = SignalFlags::derive(Some((92.0, 88.0)), 85.0, 88.0, false, true, &config);
        assert!(flags.chg_pas);
        assert!(flags.robust_short);
    }

    #[test]
    fn test_nan_readings_raise_no_flags() {
        let config = IndicatorConfig::default();
        let flags = SignalFlags::derive(Some((f64::NAN, f64::NAN)), 30.0, 25.0, true, true, &config);
        assert!(!flags.cross_up);
        assert!(flags.pal);

        let flags = SignalFlags::derive(Some((30.0, 25.0)), f64::NAN, 25.0, true, true, &config);
        assert_eq!(flags, SignalFlags::default());
    }
}
