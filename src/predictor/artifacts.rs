use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::predictor::boosting::{BoostedModel, BoostingParams};
use crate::predictor::interpolation::RankTable;
use crate::types::identifiers::{ArtifactDigest, DatasetFingerprint, VersionId};

pub const FORMAT_VERSION: &str = "1";

pub const POINT_FILE: &str = "point.json";
pub const LOWER_FILE: &str = "lower.json";
pub const UPPER_FILE: &str = "upper.json";
pub const RANK_TABLE_FILE: &str = "rank_table.json";
pub const META_FILE: &str = "meta.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Every artifact a complete version must carry.
pub const REQUIRED_ARTIFACTS: [&str; 5] = [POINT_FILE, LOWER_FILE, UPPER_FILE, RANK_TABLE_FILE, META_FILE];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub fitted_at: DateTime<Utc>,
    pub dataset_fingerprint: DatasetFingerprint,
    pub latest_year: i32,
    /// Candidate pool of the most recent year.
    pub total_pool: u64,
    pub training_rows: usize,
    pub params: BoostingParams,
}

/// Immutable bundle produced by one training run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVersion {
    pub id: VersionId,
    pub point: BoostedModel,
    pub lower: BoostedModel,
    pub upper: BoostedModel,
    pub rank_table: RankTable,
    pub meta: ModelMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub file: String,
    pub digest: ArtifactDigest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionManifest {
    pub version: VersionId,
    pub format: String,
    pub created_at: DateTime<Utc>, // informational only
    pub artifacts: Vec<ArtifactEntry>,
}

impl VersionManifest {
    pub fn entry(&self, file: &str) -> Option<&ArtifactEntry> {
        self.artifacts.iter().find(|a| a.file == file)
    }

    /// True when every required artifact is listed.
    pub fn is_complete(&self) -> bool {
        REQUIRED_ARTIFACTS.iter().all(|file| self.entry(file).is_some())
    }
}
