use serde::{Deserialize, Serialize};

use crate::types::identifiers::InstitutionId;

/// Risk classification of one option relative to the student's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Safe,
    Moderate,
    Ambitious,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Safe, Tier::Moderate, Tier::Ambitious];

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Safe => "safe",
            Tier::Moderate => "moderate",
            Tier::Ambitious => "ambitious",
        }
    }
}

/// Request-scoped projection of one institution program. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateOption {
    pub institution_id: InstitutionId,
    pub institution_name: String,
    pub region: Option<String>,
    pub program_code: String,
    pub program_name: String,
    /// Year the threshold was observed in.
    pub year: i32,
    pub category: String,
    /// Threshold came from the default category, not the requested one.
    pub category_fallback: bool,
    pub threshold: f64,
    pub placement_rate: Option<f64>,
    pub autonomous: bool,
    pub total_seats: Option<u64>,
    pub distance_km: Option<f64>,
}

/// Points contributed by each factor of the composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub placement: f64,
    pub threshold: f64,
    pub autonomy: f64,
    pub region: f64,
    pub capacity: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.placement + self.threshold + self.autonomy + self.region + self.capacity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub option: CandidateOption,
    pub tier: Tier,
    pub quality_score: f64,
    pub why: ScoreBreakdown,
}
