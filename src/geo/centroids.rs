use std::collections::BTreeMap;

use crate::geo::distance::Coordinate;
use crate::records::Institution;

/// Normalised region label used as the centroid key.
pub fn region_key(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// Mean coordinate of every located institution per region label.
///
/// Rebuilt wholesale from an institution collection; never updated in place.
/// Keys iterate in lexical order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistrictCentroids {
    centers: BTreeMap<String, Coordinate>,
}

impl DistrictCentroids {
    pub fn build(institutions: &[Institution]) -> Self {
        let mut sums: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
        for institution in institutions {
            let (Some(region), Some(coordinate)) = (&institution.region, institution.coordinate) else {
                continue;
            };
            let key = region_key(region);
            if key.is_empty() {
                continue;
            }
            let entry = sums.entry(key).or_insert((0.0, 0.0, 0));
            entry.0 += coordinate.lat;
            entry.1 += coordinate.lng;
            entry.2 += 1;
        }

        let centers = sums
            .into_iter()
            .map(|(key, (lat, lng, n))| {
                let n = n as f64;
                (key, Coordinate { lat: lat / n, lng: lng / n })
            })
            .collect();
        Self { centers }
    }

    pub fn get(&self, region: &str) -> Option<Coordinate> {
        self.centers.get(&region_key(region)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Coordinate)> {
        self.centers.iter().map(|(k, c)| (k.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}
