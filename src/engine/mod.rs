//! Request orchestration: geo filter, enrichment, program filter,
//! prediction, then tiering.

pub mod programs;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::geo::GeoResolver;
use crate::predictor::{
    CancelToken, ModelStore, PercentileDataset, RankPredictor, PERCENTILE_RANGES_FILE,
};
use crate::records::{AdmissionRecord, DataSnapshot, Institution, RecordIndex};
use crate::tiering::{CompositeScorer, TieredOptions, TieringEngine};
use crate::trends::{self, ProgramTrend, RisingPrograms};
use crate::types::{
    CandidateOption, Degradation, EngineError, RecommendationRequest, RecommendationResponse,
    VersionId,
};

pub use programs::{ProgramFilter, PROGRAM_ALIASES};

/// An institution considered for a request, with its distance from the
/// resolved location when geo filtering applied.
type Considered<'a> = (&'a Institution, Option<f64>);

#[derive(Debug)]
pub struct AdmissionEngine {
    index: RecordIndex,
    geo: GeoResolver,
    predictor: RankPredictor,
    tiering: TieringEngine<CompositeScorer>,
    search_radius_km: f64,
    default_category: String,
}

impl AdmissionEngine {
    /// Load the snapshot and percentile table from `config.data_dir`, open the
    /// model store and bring a model version up. Blocks until ready.
    pub fn open(config: &EngineConfig) -> Result<Self, EngineError> {
        let snapshot = DataSnapshot::load(&config.data_dir)?;
        let dataset = PercentileDataset::load(&config.data_dir.join(PERCENTILE_RANGES_FILE))?;
        let store = ModelStore::open(&config.model_dir)?;
        Self::from_parts(snapshot, dataset, store, config)
    }

    pub fn from_parts(
        snapshot: DataSnapshot,
        dataset: PercentileDataset,
        store: ModelStore,
        config: &EngineConfig,
    ) -> Result<Self, EngineError> {
        let index = RecordIndex::build(&snapshot);
        let geo = GeoResolver::new(index.institutions());
        let predictor = RankPredictor::initialize(dataset, store, config.predictor.clone())?;
        let tiering = TieringEngine::new(
            CompositeScorer::new(config.weights.clone()),
            config.tiers.clone(),
        );

        Ok(Self {
            index,
            geo,
            predictor,
            tiering,
            search_radius_km: config.search_radius_km,
            default_category: config.default_category.to_uppercase(),
        })
    }

    pub fn index(&self) -> &RecordIndex {
        &self.index
    }

    pub fn geo(&self) -> &GeoResolver {
        &self.geo
    }

    pub fn predictor(&self) -> &RankPredictor {
        &self.predictor
    }

    pub fn tiering(&self) -> &TieringEngine<CompositeScorer> {
        &self.tiering
    }

    /// Train and publish a fresh model version regardless of staleness.
    pub fn train(&self) -> Result<VersionId, EngineError> {
        Ok(self.predictor.train()?.id.clone())
    }

    /// Retrain if the percentile table changed. Returns whether it did.
    pub fn refresh_models(&self, cancel: &CancelToken) -> Result<bool, EngineError> {
        Ok(self.predictor.refresh_if_stale(cancel)?)
    }

    pub fn program_trend(&self, program: &str, category: Option<&str>) -> Option<ProgramTrend> {
        trends::program_trend(&self.index, program, category.unwrap_or(&self.default_category))
    }

    pub fn rising_programs(&self, category: Option<&str>, top_n: usize) -> RisingPrograms {
        trends::rising_programs(&self.index, category.unwrap_or(&self.default_category), top_n)
    }

    pub fn recommend(&self, request: RecommendationRequest) -> Result<RecommendationResponse, EngineError> {
        request.validate()?;

        let model_version = self
            .predictor
            .active_version()
            .ok_or(EngineError::ModelUnready)?
            .id
            .clone();
        let category = request
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
            .unwrap_or_else(|| self.default_category.clone());
        let location = request
            .location_text
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());

        let mut degradations = Vec::new();
        let considered = self.considered_institutions(location, &mut degradations);

        let mut options = self.enrich(&considered, &category);
        let fallbacks = options.iter().filter(|o| o.category_fallback).count();
        if fallbacks > 0 {
            degradations.push(Degradation::CategoryFallback {
                requested: category.clone(),
                used: self.default_category.clone(),
                options: fallbacks,
            });
        }

        if let Some(filter) = request.program_filter.as_deref().and_then(ProgramFilter::parse) {
            options.retain(|o| filter.matches(&o.program_code, &o.program_name));
            if options.is_empty() {
                degradations.push(Degradation::NoProgramMatch {
                    filter: request.program_filter.clone().unwrap_or_default(),
                });
            }
        }

        let percentile = self.predictor.predict_percentile(request.score, request.target_year)?;
        let rank = self.predictor.predict_rank(percentile.point)?;
        let pool_size = self.predictor.predict_total_pool(request.target_year);

        let tiers: TieredOptions = self.tiering.categorize(request.score, options, location);
        let excluded_count = tiers.excluded;

        info!(
            score = request.score,
            year = request.target_year,
            %category,
            percentile = percentile.point,
            rank,
            safe = tiers.safe.len(),
            moderate = tiers.moderate.len(),
            ambitious = tiers.ambitious.len(),
            excluded = excluded_count,
            degradations = degradations.len(),
            "recommendation produced"
        );

        Ok(RecommendationResponse {
            percentile,
            rank,
            pool_size,
            tiers,
            excluded_count,
            degradations,
            model_version,
        })
    }

    /// Institutions near the resolved location, or all of them when the
    /// location is absent, unresolved or has nothing within the radius.
    fn considered_institutions(
        &self,
        location: Option<&str>,
        degradations: &mut Vec<Degradation>,
    ) -> Vec<Considered<'_>> {
        let Some(query) = location else {
            return self.all_institutions();
        };

        let resolution = match self.geo.resolve_location(query) {
            Ok(resolution) => resolution,
            Err(miss) => {
                info!(query = %miss.query, "location not resolved, considering all institutions");
                degradations.push(Degradation::LocationNotResolved {
                    query: miss.query,
                });
                return self.all_institutions();
            }
        };

        let nearby = self.geo.find_within_radius(
            resolution.coordinate,
            self.search_radius_km,
            self.index.institutions(),
        );
        if nearby.is_empty() {
            info!(
                query,
                radius_km = self.search_radius_km,
                "no institutions within radius, considering all institutions"
            );
            degradations.push(Degradation::NoCandidatesInRadius {
                query: query.to_string(),
                radius_km: self.search_radius_km,
            });
            return self.all_institutions();
        }

        debug!(query, within = nearby.len(), "geo filter applied");
        nearby
            .into_iter()
            .map(|n| (n.item, Some(n.distance_km)))
            .collect()
    }

    fn all_institutions(&self) -> Vec<Considered<'_>> {
        self.index.institutions().iter().map(|i| (i, None)).collect()
    }

    /// One option per (institution, program) from its most recent year.
    fn enrich(&self, considered: &[Considered<'_>], category: &str) -> Vec<CandidateOption> {
        let mut options = Vec::new();

        for &(institution, distance_km) in considered {
            for record in latest_per_program(self.index.admissions_for(&institution.id)) {
                let (threshold, category_fallback) = match record.threshold(category) {
                    Some(t) => (t, false),
                    None => match record.threshold(&self.default_category) {
                        Some(t) => (t, category != self.default_category),
                        None => continue,
                    },
                };
                let seats = self
                    .index
                    .total_seats(&institution.id, Some(&record.program_code));

                options.push(CandidateOption {
                    institution_id: institution.id.clone(),
                    institution_name: institution.name.clone(),
                    region: institution.region.clone(),
                    program_code: record.program_code.clone(),
                    program_name: record.program_name.clone(),
                    year: record.year,
                    category: if category_fallback {
                        self.default_category.clone()
                    } else {
                        category.to_string()
                    },
                    category_fallback,
                    threshold,
                    placement_rate: institution.placement_rate,
                    autonomous: institution.autonomous,
                    total_seats: (seats > 0).then_some(seats),
                    distance_km,
                });
            }
        }
        options
    }
}

/// Latest-year record per program, in first-seen program order. Equal years
/// keep the first record seen.
fn latest_per_program(records: &[AdmissionRecord]) -> Vec<&AdmissionRecord> {
    let mut latest: Vec<&AdmissionRecord> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for record in records {
        match slots.get(record.program_key()) {
            Some(&slot) => {
                if record.year > latest[slot].year {
                    latest[slot] = record;
                }
            }
            None => {
                slots.insert(record.program_key(), latest.len());
                latest.push(record);
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::types::InstitutionId;

    fn record(code: &str, year: i32, oc: f64) -> AdmissionRecord {
        AdmissionRecord {
            institution_id: InstitutionId::parse("1"),
            program_code: code.to_string(),
            program_name: format!("{code} program"),
            year,
            thresholds: BTreeMap::from([("OC".to_string(), Some(oc))]),
            ranks: BTreeMap::new(),
            region: None,
        }
    }

    #[test]
    fn latest_per_program_keeps_newest_year_and_first_tie() {
        let records = vec![
            record("CS", 2022, 190.0),
            record("EC", 2023, 180.0),
            record("CS", 2024, 195.0),
            record("CS", 2024, 150.0),
            record("CS", 2023, 192.0),
        ];
        let latest = latest_per_program(&records);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].program_code, "CS");
        assert_eq!(latest[0].threshold("OC"), Some(195.0));
        assert_eq!(latest[1].program_code, "EC");
    }
}
