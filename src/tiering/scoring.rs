use crate::types::candidate::{CandidateOption, ScoreBreakdown};

/// Point caps for each factor (sum = 100).
pub const PLACEMENT_POINTS: f64 = 40.0;
pub const THRESHOLD_POINTS: f64 = 30.0;
pub const AUTONOMY_POINTS: f64 = 15.0;
pub const REGION_POINTS: f64 = 10.0;
pub const CAPACITY_POINTS: f64 = 5.0;

/// Threshold that earns the full threshold points.
pub const THRESHOLD_REFERENCE_MAX: f64 = 200.0;

/// Programs need more seats than this for the capacity points.
pub const MIN_CAPACITY_SEATS: u64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    pub placement: f64,
    pub threshold: f64,
    pub threshold_reference_max: f64,
    pub autonomy: f64,
    pub region: f64,
    pub capacity: f64,
    pub min_capacity_seats: u64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            placement: PLACEMENT_POINTS,
            threshold: THRESHOLD_POINTS,
            threshold_reference_max: THRESHOLD_REFERENCE_MAX,
            autonomy: AUTONOMY_POINTS,
            region: REGION_POINTS,
            capacity: CAPACITY_POINTS,
            min_capacity_seats: MIN_CAPACITY_SEATS,
        }
    }
}

/// Inputs beyond the candidate itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringContext<'a> {
    pub student_score: f64,
    pub preferred_region: Option<&'a str>,
}

pub trait QualityScorer {
    fn score(&self, candidate: &CandidateOption, context: &ScoringContext<'_>) -> ScoreBreakdown;

    /// Sum of the factors, rounded to one decimal, in [0, 100].
    fn score_value(&self, breakdown: &ScoreBreakdown) -> f64 {
        let value = ((breakdown.total() * 10.0).round() / 10.0).clamp(0.0, 100.0);
        debug_assert!((0.0..=100.0).contains(&value), "score {value} out of range [0, 100]");
        value
    }
}

/// Placement, threshold strength, autonomy, region fit and capacity.
#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    pub weights: ScoringWeights,
}

impl CompositeScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }
}

fn capped(value: f64, cap: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, cap)
    } else {
        0.0
    }
}

impl QualityScorer for CompositeScorer {
    fn score(&self, candidate: &CandidateOption, context: &ScoringContext<'_>) -> ScoreBreakdown {
        let w = &self.weights;

        let placement = candidate
            .placement_rate
            .map(|rate| capped(rate / 100.0 * w.placement, w.placement))
            .unwrap_or(0.0);

        let threshold = if w.threshold_reference_max > 0.0 {
            capped(candidate.threshold / w.threshold_reference_max * w.threshold, w.threshold)
        } else {
            0.0
        };

        let autonomy = if candidate.autonomous { w.autonomy } else { 0.0 };

        let region_match = match (context.preferred_region.map(str::trim), &candidate.region) {
            (Some(preferred), Some(region)) if !preferred.is_empty() => region
                .to_lowercase()
                .contains(&preferred.to_lowercase()),
            _ => false,
        };
        let region = if region_match { w.region } else { 0.0 };

        let capacity = match candidate.total_seats {
            Some(seats) if seats > w.min_capacity_seats => w.capacity,
            _ => 0.0,
        };

        ScoreBreakdown {
            placement,
            threshold,
            autonomy,
            region,
            capacity,
        }
    }
}
