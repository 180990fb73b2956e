// Versions are write-once. A version directory only appears under its final
// name after every file in it has been synced, and the `latest` pointer is
// only swapped after that rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::predictor::artifacts::{
    ArtifactEntry, ModelVersion, VersionManifest, FORMAT_VERSION, LOWER_FILE,
    MANIFEST_FILE, META_FILE, POINT_FILE, RANK_TABLE_FILE, UPPER_FILE,
};
use crate::types::identifiers::{ArtifactDigest, VersionId};

const VERSIONS_DIR: &str = "versions";
const POINTER_FILE: &str = "latest";

#[derive(Debug, Error)]
pub enum ModelStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Version already exists: {0}")]
    VersionExists(String),
    #[error("Version is not published: {0}")]
    NotPublished(String),
}

/// Filesystem layout: `versions/<id>/...` plus a `latest` pointer file.
#[derive(Debug, Clone)]
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ModelStoreError> {
        let root = root.into();
        fs::create_dir_all(root.join(VERSIONS_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, id: &VersionId) -> PathBuf {
        self.root.join(VERSIONS_DIR).join(id.as_str())
    }

    fn temp_dir(&self, id: &VersionId) -> PathBuf {
        self.root.join(VERSIONS_DIR).join(format!("{}.tmp", id.as_str()))
    }

    /// First free identifier derived from `base`.
    pub fn allocate_id(&self, base: VersionId) -> VersionId {
        let mut candidate = base.clone();
        let mut n = 1;
        while self.version_dir(&candidate).exists() || self.temp_dir(&candidate).exists() {
            candidate = base.with_suffix(n);
            n += 1;
        }
        candidate
    }

    /// Write all artifacts of `version` and move them into place.
    pub fn write_version(&self, version: &ModelVersion) -> Result<(), ModelStoreError> {
        let final_dir = self.version_dir(&version.id);
        if final_dir.exists() {
            return Err(ModelStoreError::VersionExists(version.id.as_str().to_string()));
        }

        // Serialize everything before touching the filesystem
        let artifacts: Vec<(&str, Vec<u8>)> = vec![
            (POINT_FILE, serde_json::to_vec(&version.point)?),
            (LOWER_FILE, serde_json::to_vec(&version.lower)?),
            (UPPER_FILE, serde_json::to_vec(&version.upper)?),
            (RANK_TABLE_FILE, serde_json::to_vec(&version.rank_table)?),
            (META_FILE, serde_json::to_vec_pretty(&version.meta)?),
        ];

        let manifest = VersionManifest {
            version: version.id.clone(),
            format: FORMAT_VERSION.to_string(),
            created_at: Utc::now(),
            artifacts: artifacts
                .iter()
                .map(|(file, bytes)| ArtifactEntry {
                    file: file.to_string(),
                    digest: ArtifactDigest::from_content(bytes),
                })
                .collect(),
        };

        let temp_dir = self.temp_dir(&version.id);
        // Leftover from a crashed run of this same id
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir)?;
        }

        let result = (|| -> Result<(), ModelStoreError> {
            fs::create_dir_all(&temp_dir)?;
            for (file, bytes) in &artifacts {
                write_synced(&temp_dir.join(file), bytes)?;
            }
            write_synced(&temp_dir.join(MANIFEST_FILE), &serde_json::to_vec_pretty(&manifest)?)?;
            fs::rename(&temp_dir, &final_dir)?;
            Ok(())
        })();

        if result.is_err() && temp_dir.exists() {
            let _ = fs::remove_dir_all(&temp_dir);
        }
        result
    }

    /// Atomically point `latest` at a fully written version.
    pub fn publish(&self, id: &VersionId) -> Result<(), ModelStoreError> {
        if !self.version_dir(id).join(MANIFEST_FILE).exists() {
            return Err(ModelStoreError::NotPublished(id.as_str().to_string()));
        }
        let temp_pointer = self.root.join(format!("{POINTER_FILE}.tmp"));
        write_synced(&temp_pointer, id.as_str().as_bytes())?;
        fs::rename(&temp_pointer, self.root.join(POINTER_FILE))?;
        debug!(version = %id, "published latest pointer");
        Ok(())
    }

    /// Version named by the pointer; `None` when absent or unreadable.
    pub fn latest(&self) -> Result<Option<VersionId>, ModelStoreError> {
        let path = self.root.join(POINTER_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)?;
        let id = VersionId::from_pointer(&raw);
        if id.is_none() {
            warn!(pointer = %raw.trim(), "ignoring malformed latest pointer");
        }
        Ok(id)
    }

    /// Published version ids, ascending.
    pub fn list_versions(&self) -> Result<Vec<VersionId>, ModelStoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.root.join(VERSIONS_DIR))? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            // Temp dirs carry a `.tmp` suffix and fail the id check
            if let Some(id) = entry.file_name().to_str().and_then(VersionId::from_pointer) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Load and verify a version. Any missing, altered or unreadable artifact
    /// yields `None`, so the caller can fall back to training.
    pub fn load(&self, id: &VersionId) -> Option<ModelVersion> {
        match self.try_load(id) {
            Ok(version) => Some(version),
            Err(reason) => {
                warn!(version = %id, %reason, "model version unusable");
                None
            }
        }
    }

    fn try_load(&self, id: &VersionId) -> Result<ModelVersion, String> {
        let dir = self.version_dir(id);
        let manifest: VersionManifest = read_artifact(&dir.join(MANIFEST_FILE))?;
        if manifest.version != *id {
            return Err("manifest names a different version".into());
        }
        if !manifest.is_complete() {
            return Err("manifest is missing required artifacts".into());
        }

        Ok(ModelVersion {
            id: id.clone(),
            point: verified_artifact(&dir, &manifest, POINT_FILE)?,
            lower: verified_artifact(&dir, &manifest, LOWER_FILE)?,
            upper: verified_artifact(&dir, &manifest, UPPER_FILE)?,
            rank_table: verified_artifact(&dir, &manifest, RANK_TABLE_FILE)?,
            meta: verified_artifact(&dir, &manifest, META_FILE)?,
        })
    }
}

/// Read one artifact, check it against the manifest digest, then decode it.
fn verified_artifact<T: DeserializeOwned>(
    dir: &Path,
    manifest: &VersionManifest,
    file: &str,
) -> Result<T, String> {
    let entry = manifest
        .entry(file)
        .ok_or_else(|| format!("{file} not in manifest"))?;
    let bytes = fs::read(dir.join(file)).map_err(|e| format!("{file}: {e}"))?;
    if ArtifactDigest::from_content(&bytes) != entry.digest {
        return Err(format!("{file}: digest mismatch"));
    }
    serde_json::from_slice(&bytes).map_err(|e| format!("{file}: {e}"))
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("{}: {e}", path.display()))
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    let mut f = fs::File::create(path)?;
    f.write_all(bytes)?;
    f.sync_all()
}
