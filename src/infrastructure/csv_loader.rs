//! CSV-backed historical data collaborator.
//!
//! Loads a `{timestamp, ratio}` series from disk. The core never owns a file
//! format; this is the boundary adapter feeding it validated observations.

use crate::domain::market::{PriceObservation, PriceSeries};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RatioRow {
    timestamp: i64,
    ratio: f64,
}

/// Load a price-ratio series from a CSV file with `timestamp,ratio` columns.
///
/// Timestamps are unix seconds and must be strictly increasing; validation
/// happens in [`PriceSeries::new`], so a malformed file fails loudly here
/// rather than corrupting a run.
pub fn load_ratio_series(path: &Path) -> Result<PriceSeries> {
    let mut reader = csv::Reader::from_path(path)
        .context(format!("Failed to open ratio series file: {:?}", path))?;

    let mut observations = Vec::new();
    for (line, row) in reader.deserialize().enumerate() {
        let row: RatioRow =
            row.context(format!("Failed to parse row {} of {:?}", line + 1, path))?;
        observations.push(PriceObservation {
            timestamp: row.timestamp,
            ratio: row.ratio,
        });
    }

    PriceSeries::new(observations)
        .context(format!("Ratio series in {:?} failed validation", path))
}
