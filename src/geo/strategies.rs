use serde::{Deserialize, Serialize};

use crate::geo::centroids::{region_key, DistrictCentroids};
use crate::geo::distance::Coordinate;
use crate::geo::similarity::similarity_ratio;
use crate::records::Institution;
use crate::types::identifiers::InstitutionId;

/// Minimum similarity ratio accepted by the fuzzy strategies.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactRegion,
    RegionSubstring,
    FuzzyRegion,
    InstitutionName,
}

/// A successful location lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub coordinate: Coordinate,
    pub kind: MatchKind,
    /// Region label or institution name that matched.
    pub matched: String,
}

#[derive(Debug, Clone)]
pub struct Place {
    pub id: InstitutionId,
    pub key: String,
    pub name: String,
    pub coordinate: Coordinate,
}

/// Known reference points: region centroids and located institutions.
#[derive(Debug, Clone, Default)]
pub struct GeoCatalog {
    pub centroids: DistrictCentroids,
    pub places: Vec<Place>,
}

impl GeoCatalog {
    pub fn build(institutions: &[Institution]) -> Self {
        let places = institutions
            .iter()
            .filter_map(|institution| {
                Some(Place {
                    id: institution.id.clone(),
                    key: region_key(&institution.name),
                    name: institution.name.clone(),
                    coordinate: institution.coordinate?,
                })
            })
            .collect();
        Self {
            centroids: DistrictCentroids::build(institutions),
            places,
        }
    }
}

/// One step of the resolution cascade.
///
/// `query` arrives already normalised with [`region_key`] and non-empty.
pub trait ResolutionStrategy: Send + Sync {
    fn kind(&self) -> MatchKind;

    fn resolve(&self, catalog: &GeoCatalog, query: &str) -> Option<Resolution>;
}

fn resolution(kind: MatchKind, matched: &str, coordinate: Coordinate) -> Resolution {
    Resolution {
        coordinate,
        kind,
        matched: matched.to_string(),
    }
}

/// Highest ratio at or above `threshold`; the earliest candidate wins ties.
/// Returns the winning label together with its payload.
fn best_similar<'a, T, I>(query: &str, threshold: f64, candidates: I) -> Option<(&'a str, T)>
where
    I: IntoIterator<Item = (&'a str, T)>,
{
    let mut best: Option<(f64, &'a str, T)> = None;
    for (label, item) in candidates {
        let ratio = similarity_ratio(query, label);
        if ratio < threshold {
            continue;
        }
        if best.as_ref().map_or(true, |(top, _, _)| ratio > *top) {
            best = Some((ratio, label, item));
        }
    }
    best.map(|(_, label, item)| (label, item))
}

#[derive(Debug, Default)]
pub struct ExactRegion;

impl ResolutionStrategy for ExactRegion {
    fn kind(&self) -> MatchKind {
        MatchKind::ExactRegion
    }

    fn resolve(&self, catalog: &GeoCatalog, query: &str) -> Option<Resolution> {
        let coordinate = catalog.centroids.get(query)?;
        Some(resolution(self.kind(), query, coordinate))
    }
}

/// Query contains a region label, or a region label contains the query.
/// Labels are tried in lexical order.
#[derive(Debug, Default)]
pub struct RegionSubstring;

impl ResolutionStrategy for RegionSubstring {
    fn kind(&self) -> MatchKind {
        MatchKind::RegionSubstring
    }

    fn resolve(&self, catalog: &GeoCatalog, query: &str) -> Option<Resolution> {
        catalog
            .centroids
            .iter()
            .find(|(label, _)| label.contains(query) || query.contains(label))
            .map(|(label, coordinate)| resolution(self.kind(), label, coordinate))
    }
}

#[derive(Debug)]
pub struct FuzzyRegion {
    pub threshold: f64,
}

impl Default for FuzzyRegion {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl ResolutionStrategy for FuzzyRegion {
    fn kind(&self) -> MatchKind {
        MatchKind::FuzzyRegion
    }

    fn resolve(&self, catalog: &GeoCatalog, query: &str) -> Option<Resolution> {
        best_similar(query, self.threshold, catalog.centroids.iter())
            .map(|(label, coordinate)| resolution(self.kind(), label, coordinate))
    }
}

/// Substring match on institution names first, then similarity.
#[derive(Debug)]
pub struct InstitutionName {
    pub threshold: f64,
}

impl Default for InstitutionName {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl ResolutionStrategy for InstitutionName {
    fn kind(&self) -> MatchKind {
        MatchKind::InstitutionName
    }

    fn resolve(&self, catalog: &GeoCatalog, query: &str) -> Option<Resolution> {
        if let Some(place) = catalog
            .places
            .iter()
            .find(|place| place.key.contains(query) || query.contains(place.key.as_str()))
        {
            return Some(resolution(self.kind(), &place.name, place.coordinate));
        }

        let names = catalog.places.iter().map(|place| (place.key.as_str(), place));
        let (_, place) = best_similar(query, self.threshold, names)?;
        Some(resolution(self.kind(), &place.name, place.coordinate))
    }
}

/// The default cascade, in priority order.
pub fn default_cascade() -> Vec<Box<dyn ResolutionStrategy>> {
    vec![
        Box::new(ExactRegion),
        Box::new(RegionSubstring),
        Box::new(FuzzyRegion::default()),
        Box::new(InstitutionName::default()),
    ]
}
