//! CSV export of simulated BAC series for charting.

use crate::stage::BacStage;
use crate::{BacSample, Result};
use chrono::{DateTime, SecondsFormat};
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    time_ms: i64,
    time: String,
    bac: f64,
    stage: BacStage,
}

impl From<&BacSample> for CsvRow {
    fn from(sample: &BacSample) -> Self {
        CsvRow {
            time_ms: sample.time_ms,
            time: DateTime::from_timestamp_millis(sample.time_ms)
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            bac: sample.bac,
            stage: BacStage::classify(sample.bac),
        }
    }
}

/// Write samples as CSV (with headers) to any writer
pub fn write_series<W: Write>(samples: &[BacSample], writer: W) -> Result<usize> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for sample in samples {
        csv_writer.serialize(CsvRow::from(sample))?;
    }
    csv_writer.flush()?;

    Ok(samples.len())
}

/// Write samples to a CSV file, replacing any existing file
pub fn write_series_csv(samples: &[BacSample], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    let count = write_series(samples, &file)?;
    file.sync_all()?;

    tracing::info!("Exported {} samples to {:?}", count, path);
    Ok(count)
}
