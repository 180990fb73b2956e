use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predictor::{DatasetError, ModelStoreError, PercentileEstimate, PredictorError};
use crate::records::RecordLoadError;
use crate::tiering::TieredOptions;
use crate::types::identifiers::VersionId;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 200.0;
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// What the conversational layer asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub score: f64,
    pub target_year: i32,
    /// Applicant category code; the configured default when absent.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location_text: Option<String>,
    #[serde(default)]
    pub program_filter: Option<String>,
}

impl RecommendationRequest {
    pub fn new(score: f64, target_year: i32) -> Self {
        Self {
            score,
            target_year,
            category: None,
            location_text: None,
            program_filter: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location_text = Some(location.into());
        self
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program_filter = Some(program.into());
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&self.score) {
            return Err(EngineError::InvalidScore(self.score));
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.target_year) {
            return Err(EngineError::InvalidYear(self.target_year));
        }
        Ok(())
    }
}

/// Recoverable condition that broadened or emptied the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Location text matched nothing; all institutions were considered.
    LocationNotResolved { query: String },
    /// Location resolved but nothing lies within the radius; all
    /// institutions were considered.
    NoCandidatesInRadius { query: String, radius_km: f64 },
    /// The program filter left no options.
    NoProgramMatch { filter: String },
    /// Some thresholds came from the default category.
    CategoryFallback { requested: String, used: String, options: usize },
}

impl Degradation {
    pub fn message(&self) -> String {
        match self {
            Degradation::LocationNotResolved { query } => {
                format!("location {query:?} not resolved, showing all candidates")
            }
            Degradation::NoCandidatesInRadius { query, radius_km } => {
                format!("no institutions within {radius_km} km of {query:?}, showing all candidates")
            }
            Degradation::NoProgramMatch { filter } => {
                format!("no programs match {filter:?}")
            }
            Degradation::CategoryFallback {
                requested,
                used,
                options,
            } => format!("{options} options have no {requested} threshold, using {used}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub percentile: PercentileEstimate,
    pub rank: u64,
    pub pool_size: u64,
    pub tiers: TieredOptions,
    /// Options dropped for being too far out of reach.
    pub excluded_count: usize,
    pub degradations: Vec<Degradation>,
    pub model_version: VersionId,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("model not ready")]
    ModelUnready,

    #[error("invalid score {0}: expected a finite value in [0, 200]")]
    InvalidScore(f64),

    #[error("invalid target year {0}")]
    InvalidYear(i32),

    #[error("training cancelled")]
    TrainingCancelled,

    #[error("record load error: {0}")]
    Records(RecordLoadError),

    #[error("dataset error: {0}")]
    Dataset(DatasetError),

    #[error("model store error: {0}")]
    Store(#[from] ModelStoreError),
}

impl From<PredictorError> for EngineError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::DataUnavailable(reason) => EngineError::DataUnavailable(reason),
            PredictorError::ModelUnready => EngineError::ModelUnready,
            PredictorError::Cancelled(_) => EngineError::TrainingCancelled,
            PredictorError::Store(err) => EngineError::Store(err),
            PredictorError::Dataset(err) => err.into(),
        }
    }
}

impl From<RecordLoadError> for EngineError {
    fn from(err: RecordLoadError) -> Self {
        match err {
            RecordLoadError::Missing(path) => {
                EngineError::DataUnavailable(format!("missing {}", path.display()))
            }
            RecordLoadError::Empty(what) => EngineError::DataUnavailable(format!("{what} collection is empty")),
            err => EngineError::Records(err),
        }
    }
}

impl From<DatasetError> for EngineError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Missing(path) => {
                EngineError::DataUnavailable(format!("missing {}", path.display()))
            }
            err => EngineError::Dataset(err),
        }
    }
}
