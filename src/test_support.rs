//! Synthetic bar builders shared by unit tests.

use chrono::{Duration, NaiveDate};

use crate::models::Bar;

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

/// One bar per calendar day; each open sits half a point below its close.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = close - 0.5;
            Bar::new(
                start_date() + Duration::days(i as i64),
                open,
                close.max(open) + 1.0,
                close.min(open) - 1.0,
                close,
                1_000.0,
            )
        })
        .collect()
}

/// Drifting, oscillating price path that crosses its signal line many times.
pub fn wavy_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            1_000.0 + 50.0 * (t * 0.15).sin() + 20.0 * (t * 0.041).sin() + t * 0.3
        })
        .collect()
}
