use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::identifiers::DatasetFingerprint;

pub const PERCENTILE_RANGES_FILE: &str = "csv/percentile_ranges.csv";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("percentile dataset missing: {0}")]
    Missing(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One row of the historical score distribution table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileRow {
    pub mark: f64,
    pub year: i32,
    pub max_percentile: f64,
    pub min_rank: f64,
    #[serde(default)]
    pub total_students: Option<f64>,
}

impl PercentileRow {
    fn is_usable(&self) -> bool {
        self.mark.is_finite() && self.max_percentile.is_finite() && self.min_rank.is_finite()
    }
}

/// The training table plus enough provenance to detect staleness.
#[derive(Debug, Clone)]
pub struct PercentileDataset {
    rows: Vec<PercentileRow>,
    source: Option<PathBuf>,
    modified_at: Option<DateTime<Utc>>,
    fingerprint: DatasetFingerprint,
}

impl PercentileDataset {
    /// In-memory dataset without a backing file.
    pub fn from_rows(rows: Vec<PercentileRow>) -> Self {
        let rows: Vec<PercentileRow> = rows.into_iter().filter(PercentileRow::is_usable).collect();
        let fingerprint = fingerprint_rows(&rows);
        Self {
            rows,
            source: None,
            modified_at: None,
            fingerprint,
        }
    }

    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::Missing(path.to_path_buf()));
        }
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in reader.deserialize::<PercentileRow>() {
            match record {
                Ok(row) if row.is_usable() => rows.push(row),
                Ok(_) | Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, path = %path.display(), "skipped malformed percentile rows");
        }

        let mut dataset = Self::from_rows(rows);
        dataset.source = Some(path.to_path_buf());
        dataset.modified_at = Some(file_modified_at(path)?);
        info!(rows = dataset.len(), years = dataset.years().len(), "loaded percentile dataset");
        Ok(dataset)
    }

    /// Re-read the backing file, if there is one.
    pub fn reload(&self) -> Result<Option<Self>, DatasetError> {
        match &self.source {
            Some(path) => Self::load(path).map(Some),
            None => Ok(None),
        }
    }

    /// Current modification time of the backing file, read fresh from disk.
    pub fn source_modified_at(&self) -> Option<DateTime<Utc>> {
        let path = self.source.as_ref()?;
        file_modified_at(path).ok()
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    pub fn fingerprint(&self) -> &DatasetFingerprint {
        &self.fingerprint
    }

    pub fn rows(&self) -> &[PercentileRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.rows.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }

    pub fn latest_year(&self) -> Option<i32> {
        self.rows.iter().map(|r| r.year).max()
    }

    /// First reported candidate total per year (row order), ascending by year.
    pub fn year_totals(&self) -> Vec<(i32, f64)> {
        self.years()
            .into_iter()
            .filter_map(|year| {
                self.rows
                    .iter()
                    .filter(|r| r.year == year)
                    .find_map(|r| r.total_students.filter(|t| t.is_finite()))
                    .map(|total| (year, total))
            })
            .collect()
    }
}

fn fingerprint_rows(rows: &[PercentileRow]) -> DatasetFingerprint {
    let mut content = Vec::with_capacity(rows.len() * 48);
    for row in rows {
        let line = format!(
            "{}|{}|{}|{}|{:?}\n",
            row.mark, row.year, row.max_percentile, row.min_rank, row.total_students
        );
        content.extend_from_slice(line.as_bytes());
    }
    DatasetFingerprint::from_content(&content)
}

fn file_modified_at(path: &Path) -> Result<DateTime<Utc>, DatasetError> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(DateTime::<Utc>::from(modified))
}
