pub mod centroids;
pub mod distance;
pub mod similarity;
pub mod strategies;

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use crate::records::Institution;

pub use centroids::{region_key, DistrictCentroids};
pub use distance::{find_within_radius, haversine_km, Coordinate, Located, Nearby, EARTH_RADIUS_KM};
pub use similarity::similarity_ratio;
pub use strategies::{
    default_cascade, ExactRegion, FuzzyRegion, GeoCatalog, InstitutionName, MatchKind,
    RegionSubstring, Resolution, ResolutionStrategy, DEFAULT_SIMILARITY_THRESHOLD,
};

/// Every strategy in the cascade failed. Callers fall back to
/// non-geographic filtering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("location not resolved: {query:?}")]
pub struct ResolutionMiss {
    pub query: String,
}

/// Maps free-text locations onto the closed set of known reference points.
pub struct GeoResolver {
    catalog: GeoCatalog,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl fmt::Debug for GeoResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cascade: Vec<MatchKind> = self.strategies.iter().map(|s| s.kind()).collect();
        f.debug_struct("GeoResolver")
            .field("regions", &self.catalog.centroids.len())
            .field("places", &self.catalog.places.len())
            .field("cascade", &cascade)
            .finish()
    }
}

impl GeoResolver {
    pub fn new(institutions: &[Institution]) -> Self {
        Self::with_strategies(institutions, default_cascade())
    }

    pub fn with_strategies(
        institutions: &[Institution],
        strategies: Vec<Box<dyn ResolutionStrategy>>,
    ) -> Self {
        let catalog = GeoCatalog::build(institutions);
        info!(
            regions = catalog.centroids.len(),
            located_institutions = catalog.places.len(),
            "built geo catalog"
        );
        Self { catalog, strategies }
    }

    pub fn centroids(&self) -> &DistrictCentroids {
        &self.catalog.centroids
    }

    /// Try each strategy in order; the first hit wins.
    pub fn resolve_location(&self, text: &str) -> Result<Resolution, ResolutionMiss> {
        let miss = || ResolutionMiss {
            query: text.to_string(),
        };
        let query = region_key(text);
        if query.is_empty() {
            return Err(miss());
        }

        for strategy in &self.strategies {
            if let Some(found) = strategy.resolve(&self.catalog, &query) {
                debug!(query = %text, kind = ?found.kind, matched = %found.matched, "resolved location");
                return Ok(found);
            }
        }
        Err(miss())
    }

    pub fn find_within_radius<T, I>(&self, center: Coordinate, radius_km: f64, candidates: I) -> Vec<Nearby<T>>
    where
        T: Located,
        I: IntoIterator<Item = T>,
    {
        find_within_radius(center, radius_km, candidates)
    }
}
