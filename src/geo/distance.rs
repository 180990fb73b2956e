use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::records::Institution;

/// Mean Earth radius in km.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Validated constructor. Rejects out-of-range values and the `(0, 0)`
    /// placeholder that spreadsheets emit for unknown locations.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let in_range = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if !in_range || (lat == 0.0 && lng == 0.0) {
            return None;
        }
        Some(Self { lat, lng })
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Great-circle distance between two points in km.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Something that may sit at a known point.
pub trait Located {
    fn coordinate(&self) -> Option<Coordinate>;
}

impl Located for Institution {
    fn coordinate(&self) -> Option<Coordinate> {
        self.coordinate
    }
}

impl Located for Coordinate {
    fn coordinate(&self) -> Option<Coordinate> {
        Some(*self)
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn coordinate(&self) -> Option<Coordinate> {
        (**self).coordinate()
    }
}

/// A candidate with its distance from the query point attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Nearby<T> {
    pub item: T,
    pub distance_km: f64,
}

/// Candidates within `radius_km` of `center` (inclusive), nearest first.
///
/// Candidates without a coordinate are skipped. Equal distances keep their
/// input order.
pub fn find_within_radius<T, I>(center: Coordinate, radius_km: f64, candidates: I) -> Vec<Nearby<T>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let mut nearby: Vec<Nearby<T>> = candidates
        .into_iter()
        .filter_map(|item| {
            let distance_km = center.distance_km(&item.coordinate()?);
            (distance_km <= radius_km).then_some(Nearby { item, distance_km })
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.partial_cmp(&b.distance_km).unwrap_or(Ordering::Equal));
    nearby
}
