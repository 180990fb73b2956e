use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Piecewise-linear percentile -> rank table with open-ended extrapolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTable {
    /// Sorted by percentile, ascending, percentiles distinct.
    points: Vec<(f64, f64)>,
}

impl RankTable {
    /// Build from observed `(percentile, rank)` pairs. Ranks sharing a
    /// percentile are averaged. Returns `None` when nothing usable remains.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut sorted: Vec<(f64, f64)> = pairs
            .into_iter()
            .filter(|(p, r)| p.is_finite() && r.is_finite())
            .collect();
        sorted.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut points: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
        let mut group: Vec<f64> = Vec::new();
        let mut group_key = f64::NAN;
        for (percentile, rank) in sorted {
            if percentile != group_key && !group.is_empty() {
                points.push((group_key, group.iter().sum::<f64>() / group.len() as f64));
                group.clear();
            }
            group_key = percentile;
            group.push(rank);
        }
        if !group.is_empty() {
            points.push((group_key, group.iter().sum::<f64>() / group.len() as f64));
        }

        (!points.is_empty()).then_some(Self { points })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Linear interpolation; outside the observed range the nearest end
    /// segment is extended. A single point is a constant.
    pub fn interpolate(&self, percentile: f64) -> f64 {
        let points = &self.points;
        if points.len() == 1 {
            return points[0].1;
        }
        let segment = match points.iter().position(|&(p, _)| p >= percentile) {
            Some(0) => 0,
            Some(i) => i - 1,
            None => points.len() - 2,
        };
        let (x0, y0) = points[segment];
        let (x1, y1) = points[segment + 1];
        y0 + (y1 - y0) * (percentile - x0) / (x1 - x0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RankTable {
        RankTable::from_pairs([(99.5, 100.0), (95.0, 1000.0), (90.0, 2000.0)]).unwrap()
    }

    #[test]
    fn interpolates_inside_range() {
        let t = table();
        assert!((t.interpolate(97.25) - 550.0).abs() < 1e-9);
        assert!((t.interpolate(95.0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn extrapolates_past_both_ends() {
        let t = table();
        // slope of the top segment is -200 rank per percentile point
        assert!((t.interpolate(100.0) - 0.0).abs() < 1e-9);
        assert!((t.interpolate(85.0) - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_percentiles_are_averaged() {
        let t = RankTable::from_pairs([(90.0, 100.0), (90.0, 300.0), (80.0, 1000.0)]).unwrap();
        assert_eq!(t.points(), &[(80.0, 1000.0), (90.0, 200.0)]);
    }

    #[test]
    fn empty_input_yields_none() {
        assert!(RankTable::from_pairs(Vec::new()).is_none());
    }
}
