//! CSV ingestion of daily bars.
//!
//! Expected layout is a header row followed by one row per day:
//!
//! ```text
//! Date,Open,High,Low,Close,AdjClose,Volume
//! 02-01-2024,21727.75,21755.60,21555.65,21665.80,21665.80,0
//! ```
//!
//! Column names are matched case-insensitively and extra columns are
//! ignored. Rows with an unreadable date or price are dropped, not fatal.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::models::Bar;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// What happened while reading a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows seen
    pub rows: usize,

    /// Rows excluded for a bad date or price
    pub dropped: usize,

    /// Rows replaced by a later row with the same date
    pub duplicates: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let h = h.trim().to_lowercase();
                names.iter().any(|n| *n == h)
            })
        };
        let require = |names: &[&str]| {
            find(names).with_context(|| format!("Missing required column '{}'", names[0]))
        };

        Ok(Self {
            date: require(&["date", "datetime", "timestamp"])?,
            open: require(&["open"])?,
            high: require(&["high"])?,
            low: require(&["low"])?,
            close: require(&["close"])?,
            volume: find(&["volume", "vol"]),
        })
    }
}

/// Load bars from a CSV file, sorted by date and de-duplicated.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let (bars, stats) =
        read_bars(file).with_context(|| format!("Failed to read bars from {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = stats.rows,
        bars = bars.len(),
        dropped = stats.dropped,
        duplicates = stats.duplicates,
        "Loaded price history"
    );

    Ok(bars)
}

/// Read bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<(Vec<Bar>, LoadStats)> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers().context("Failed to read CSV header")?.clone();
    let columns = Columns::from_headers(&headers)?;

    let mut stats = LoadStats::default();
    let mut by_date: BTreeMap<NaiveDate, Bar> = BTreeMap::new();

    for (line, result) in csv_reader.records().enumerate() {
        stats.rows += 1;

        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(row = line + 1, error = %e, "Skipping unreadable row");
                stats.dropped += 1;
                continue;
            }
        };

        match parse_row(&record, &columns) {
            Some(bar) => {
                if by_date.insert(bar.date, bar).is_some() {
                    stats.duplicates += 1;
                }
            }
            None => {
                debug!(row = line + 1, "Dropping row with bad date or price");
                stats.dropped += 1;
            }
        }
    }

    if stats.dropped > 0 {
        warn!(dropped = stats.dropped, "Dropped rows with non-numeric values");
    }

    Ok((by_date.into_values().collect(), stats))
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Option<Bar> {
    let date = parse_date(record.get(columns.date)?)?;
    let open = parse_number(record.get(columns.open)?)?;
    let high = parse_number(record.get(columns.high)?)?;
    let low = parse_number(record.get(columns.low)?)?;
    let close = parse_number(record.get(columns.close)?)?;
    let volume = columns
        .volume
        .and_then(|idx| record.get(idx))
        .and_then(parse_number)
        .filter(|v| *v >= 0.0)
        .unwrap_or(0.0);

    let bar = Bar::new(date, open, high, low, close, volume);
    bar.is_valid().then_some(bar)
}

/// Parse a calendar date in one of the accepted layouts. Timestamps are cut
/// to their date part.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    // "2024-01-02 00:00:00+05:30" and similar
    text.get(..10)
        .filter(|_| text.len() > 10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Parse a price cell. Thousands separators are accepted; anything else
/// non-numeric, and non-finite values, are rejected.
fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
