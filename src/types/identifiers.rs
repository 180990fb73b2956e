use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Institution key used by every index.
///
/// Known identifiers are all-digit codes and are canonicalised (trimmed,
/// leading zeros stripped). Anything else is kept verbatim so a malformed
/// row still lands in the index under the key it was declared with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstitutionId(String);

impl InstitutionId {
    /// Parse a declared identifier, falling back to the raw string.
    pub fn parse(raw: &str) -> Self {
        match canonical_code(raw) {
            Some(code) => InstitutionId(code),
            None => InstitutionId(raw.to_string()),
        }
    }

    pub fn from_number(code: i64) -> Self {
        InstitutionId(code.to_string())
    }

    /// True when the identifier did not parse to the known code format.
    pub fn is_raw(&self) -> bool {
        canonical_code(&self.0).as_deref() != Some(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstitutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = trimmed.trim_start_matches('0');
    Some(if stripped.is_empty() { "0".to_string() } else { stripped.to_string() })
}

/// Identifier of one immutable model version directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// `v_<timestamp>_<fingerprint prefix>`; the timestamp keeps ids sortable.
    pub fn new(fitted_at: DateTime<Utc>, fingerprint: &DatasetFingerprint) -> Self {
        let hash = fingerprint
            .as_str()
            .strip_prefix("sha256:")
            .unwrap_or(fingerprint.as_str());
        let short = &hash[..hash.len().min(12)];
        VersionId(format!(
            "v_{}_{}",
            fitted_at.format("%Y%m%d_%H%M%S_%6f"),
            short
        ))
    }

    pub fn with_suffix(&self, n: usize) -> Self {
        VersionId(format!("{}-{}", self.0, n))
    }

    /// Accepts only names that are safe as a single path component.
    pub fn from_pointer(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let valid = trimmed.starts_with("v_")
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| VersionId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content hash of a model artifact or of the training table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetFingerprint(String);

impl DatasetFingerprint {
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);

        let hash = hasher.finalize();
        let hex = hex::encode(hash);

        DatasetFingerprint(format!("sha256:{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub type ArtifactDigest = DatasetFingerprint;
