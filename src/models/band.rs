//! Oscillator band constraining the RSI(MA) reading allowed at entry.
//!
//! The band is fitted by an external calibration job and persisted as JSON:
//!
//! ```json
//! { "RSI_LOW": 35.0, "RSI_HIGH": 65.0 }
//! ```
//!
//! Loading never fails: a missing or broken file falls back to the default
//! 30-70 band.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Inclusive `[low, high]` range of acceptable `rsi_ma` values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBand {
    #[serde(rename = "RSI_LOW", alias = "low")]
    pub low: f64,

    #[serde(rename = "RSI_HIGH", alias = "high")]
    pub high: f64,
}

impl Default for RsiBand {
    fn default() -> Self {
        Self {
            low: 30.0,
            high: 70.0,
        }
    }
}

impl RsiBand {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// True when `rsi` lies inside the band. NaN is never inside.
    pub fn contains(&self, rsi: f64) -> bool {
        self.low <= rsi && rsi <= self.high
    }

    pub fn is_valid(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low < self.high
    }

    /// Load a band file, falling back to the default band when the file is
    /// absent, unreadable, malformed or describes an empty range.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No band file, using default band");
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(band) => {
                debug!(low = band.low, high = band.high, "Loaded RSI band");
                band
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring band file, using default band");
                Self::default()
            }
        }
    }

    /// Strict variant of [`RsiBand::load`] that reports what went wrong.
    pub fn try_load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read band file {}", path.display()))?;
        let band: RsiBand = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse band file {}", path.display()))?;

        if !band.is_valid() {
            anyhow::bail!("Band [{}, {}] is not a valid range", band.low, band.high);
        }

        Ok(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_contains_is_inclusive() {
        let band = RsiBand::new(30.0, 70.0);
        assert!(band.contains(30.0));
        assert!(band.contains(70.0));
        assert!(band.contains(50.0));
        assert!(!band.contains(29.99));
        assert!(!band.contains(f64::NAN));
    }

    #[test]
    fn test_load_upper_case_keys() {
        let file = write_temp(r#"{ "RSI_LOW": 35.0, "RSI_HIGH": 65.0 }"#);
        let band = RsiBand::load(file.path());
        assert_eq!(band, RsiBand::new(35.0, 65.0));
    }

    #[test]
    fn test_load_lower_case_keys() {
        let file = write_temp(r#"{ "low": 25, "high": 60 }"#);
        assert_eq!(RsiBand::load(file.path()), RsiBand::new(25.0, 60.0));
    }

    #[test]
    fn test_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        let band = RsiBand::load(&dir.path().join("rsi_params.json"));
        assert_eq!(band, RsiBand::default());
    }

    #[test]
    fn test_malformed_file_gives_default() {
        let file = write_temp("{ not json");
        assert_eq!(RsiBand::load(file.path()), RsiBand::default());

        let file = write_temp(r#"{ "RSI_LOW": 40.0 }"#);
        assert_eq!(RsiBand::load(file.path()), RsiBand::default());
    }

    #[test]
    fn test_inverted_band_gives_default() {
        let file = write_temp(r#"{ "RSI_LOW": 70.0, "RSI_HIGH": 30.0 }"#);
        assert!(RsiBand::try_load(file.path()).is_err());
        assert_eq!(RsiBand::load(file.path()), RsiBand::default());
    }
}
