pub mod artifacts;
pub mod boosting;
pub mod dataset;
pub mod interpolation;
pub mod pool;
pub mod store;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::identifiers::VersionId;

pub use artifacts::{ModelMeta, ModelVersion, VersionManifest};
pub use boosting::{BoostedModel, BoostingParams, CancelToken, Loss, TrainingCancelled};
pub use dataset::{DatasetError, PercentileDataset, PercentileRow, PERCENTILE_RANGES_FILE};
pub use interpolation::RankTable;
pub use pool::extrapolate_pool;
pub use store::{ModelStore, ModelStoreError};

pub const LOWER_QUANTILE: f64 = 0.05;
pub const UPPER_QUANTILE: f64 = 0.95;
pub const DEFAULT_POOL_SIZE: u64 = 200_000;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("historical dataset unavailable: {0}")]
    DataUnavailable(String),
    #[error("no model version is loaded")]
    ModelUnready,
    #[error(transparent)]
    Cancelled(#[from] TrainingCancelled),
    #[error("model store error: {0}")]
    Store(#[from] ModelStoreError),
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Point estimate with its uncertainty band, all in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileEstimate {
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

impl PercentileEstimate {
    /// Enforce `0 <= lower <= point <= upper <= 100` on raw model output.
    /// A bound on the wrong side of the point collapses onto the point.
    pub fn from_raw(point: f64, lower: f64, upper: f64) -> Self {
        let point = round3(point.clamp(0.0, 100.0));
        let lower = round3(lower.min(point).max(0.0));
        let upper = round3(upper.max(point).min(100.0));
        Self { point, lower, upper }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictorSettings {
    pub params: BoostingParams,
    pub default_pool_size: u64,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        Self {
            params: BoostingParams::default(),
            default_pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Fit every artifact of a version from `dataset`. Pure; nothing is written.
pub fn fit_version(
    id: VersionId,
    dataset: &PercentileDataset,
    settings: &PredictorSettings,
    cancel: &CancelToken,
) -> Result<ModelVersion, PredictorError> {
    let latest_year = dataset
        .latest_year()
        .ok_or_else(|| PredictorError::DataUnavailable("percentile dataset is empty".into()))?;

    let features: Vec<[f64; 2]> = dataset.rows().iter().map(|r| [r.mark, r.year as f64]).collect();
    let targets: Vec<f64> = dataset.rows().iter().map(|r| r.max_percentile).collect();
    let params = &settings.params;

    let point = BoostedModel::fit(&features, &targets, Loss::SquaredError, params, cancel)?;
    let lower = BoostedModel::fit(&features, &targets, Loss::Quantile { alpha: LOWER_QUANTILE }, params, cancel)?;
    let upper = BoostedModel::fit(&features, &targets, Loss::Quantile { alpha: UPPER_QUANTILE }, params, cancel)?;

    // Rank distributions are only comparable within one year's pool
    let latest_rows = dataset.rows().iter().filter(|r| r.year == latest_year);
    let rank_table = RankTable::from_pairs(latest_rows.clone().map(|r| (r.max_percentile, r.min_rank)))
        .ok_or_else(|| PredictorError::DataUnavailable(format!("no rank data for {latest_year}")))?;
    let total_pool = latest_rows
        .filter_map(|r| r.total_students)
        .find(|t| t.is_finite() && *t > 0.0)
        .map(|t| t as u64)
        .unwrap_or(settings.default_pool_size);

    cancel.check()?;
    Ok(ModelVersion {
        id,
        point,
        lower,
        upper,
        rank_table,
        meta: ModelMeta {
            fitted_at: Utc::now(),
            dataset_fingerprint: dataset.fingerprint().clone(),
            latest_year,
            total_pool,
            training_rows: dataset.len(),
            params: params.clone(),
        },
    })
}

/// Versioned score -> percentile -> rank predictor.
///
/// Always holds a loaded version once constructed. Retraining builds and
/// publishes a new version off to the side; readers keep using the previous
/// `Arc<ModelVersion>` until the swap.
#[derive(Debug)]
pub struct RankPredictor {
    store: ModelStore,
    settings: PredictorSettings,
    dataset: RwLock<Arc<PercentileDataset>>,
    active: RwLock<Option<Arc<ModelVersion>>>,
    training: Mutex<()>,
}

impl RankPredictor {
    /// Load the latest fresh version, or train one. Blocks until a version
    /// is active.
    pub fn initialize(
        dataset: PercentileDataset,
        store: ModelStore,
        settings: PredictorSettings,
    ) -> Result<Self, PredictorError> {
        if dataset.is_empty() {
            return Err(PredictorError::DataUnavailable(
                "percentile dataset is empty".into(),
            ));
        }
        let predictor = Self {
            store,
            settings,
            dataset: RwLock::new(Arc::new(dataset)),
            active: RwLock::new(None),
            training: Mutex::new(()),
        };

        if let Some(id) = predictor.store.latest()? {
            match predictor.store.load(&id) {
                Some(version) if !predictor.is_stale(&version) => {
                    info!(version = %id, "loaded model version");
                    predictor.swap(Arc::new(version));
                    return Ok(predictor);
                }
                Some(_) => info!(version = %id, "latest model version is stale, retraining"),
                None => warn!(version = %id, "latest model version failed to load, retraining"),
            }
        }

        predictor.train()?;
        Ok(predictor)
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    /// Currently active version, if any.
    pub fn active_version(&self) -> Option<Arc<ModelVersion>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current(&self) -> Result<Arc<ModelVersion>, PredictorError> {
        self.active_version().ok_or(PredictorError::ModelUnready)
    }

    fn dataset(&self) -> Arc<PercentileDataset> {
        self.dataset
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, version: Arc<ModelVersion>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(version);
    }

    /// A version is stale when the dataset changed after it was fitted, or
    /// when it was fitted on different rows.
    pub fn is_stale(&self, version: &ModelVersion) -> bool {
        let dataset = self.dataset();
        let modified = dataset.source_modified_at().or(dataset.modified_at());
        if modified.is_some_and(|m| m > version.meta.fitted_at) {
            return true;
        }
        *dataset.fingerprint() != version.meta.dataset_fingerprint
    }

    /// Load a specific published version and make it active.
    /// Returns false when any artifact is missing or corrupt.
    pub fn load(&self, id: &VersionId) -> bool {
        match self.store.load(id) {
            Some(version) => {
                self.swap(Arc::new(version));
                true
            }
            None => false,
        }
    }

    pub fn train(&self) -> Result<Arc<ModelVersion>, PredictorError> {
        self.train_with_cancel(&CancelToken::new())
    }

    /// Fit, write, publish, then swap. A cancel or failure at any step leaves
    /// the previous version active and the pointer untouched.
    pub fn train_with_cancel(&self, cancel: &CancelToken) -> Result<Arc<ModelVersion>, PredictorError> {
        let _guard = self.training.lock().unwrap_or_else(PoisonError::into_inner);
        let dataset = self.dataset();
        if dataset.is_empty() {
            return Err(PredictorError::DataUnavailable(
                "percentile dataset is empty".into(),
            ));
        }

        let id = self
            .store
            .allocate_id(VersionId::new(Utc::now(), dataset.fingerprint()));

        info!(version = %id, rows = dataset.len(), "training model version");
        let version = fit_version(id, &dataset, &self.settings, cancel)?;
        cancel.check()?;

        self.store.write_version(&version)?;
        self.store.publish(&version.id)?;

        let version = Arc::new(version);
        self.swap(Arc::clone(&version));
        info!(version = %version.id, "published model version");
        Ok(version)
    }

    /// Reload the dataset and retrain when the backing file changed since the
    /// active version was fitted. Returns whether a retrain happened.
    pub fn refresh_if_stale(&self, cancel: &CancelToken) -> Result<bool, PredictorError> {
        let stale = match self.active_version() {
            Some(version) => self.is_stale(&version),
            None => true,
        };
        if !stale {
            return Ok(false);
        }

        if let Some(reloaded) = self.dataset().reload()? {
            if reloaded.is_empty() {
                return Err(PredictorError::DataUnavailable(
                    "percentile dataset is empty".into(),
                ));
            }
            *self.dataset.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(reloaded);
        }
        info!("model version stale, retraining");
        self.train_with_cancel(cancel)?;
        Ok(true)
    }

    pub fn predict_percentile(&self, score: f64, target_year: i32) -> Result<PercentileEstimate, PredictorError> {
        let version = self.current()?;
        let row = [score, target_year as f64];
        Ok(PercentileEstimate::from_raw(
            version.point.predict(&row),
            version.lower.predict(&row),
            version.upper.predict(&row),
        ))
    }

    /// Rank from the most recent year's distribution; never below 1.
    pub fn predict_rank(&self, percentile: f64) -> Result<u64, PredictorError> {
        let version = self.current()?;
        let percentile = if percentile.is_nan() { 0.0 } else { percentile.clamp(0.0, 100.0) };
        let rank = version.rank_table.interpolate(percentile);
        Ok(rank.max(1.0) as u64)
    }

    /// Total candidate pool extrapolated by a linear year trend, floored at
    /// the largest pool observed.
    pub fn predict_total_pool(&self, target_year: i32) -> u64 {
        let last_known = self
            .active_version()
            .map(|v| v.meta.total_pool)
            .unwrap_or(self.settings.default_pool_size);
        extrapolate_pool(&self.dataset().year_totals(), target_year, last_known)
    }
}
