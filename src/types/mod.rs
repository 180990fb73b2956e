pub mod candidate;
pub mod identifiers;
pub mod recommendation;

pub use candidate::{CandidateOption, ScoreBreakdown, ScoredCandidate, Tier};
pub use identifiers::{ArtifactDigest, DatasetFingerprint, InstitutionId, VersionId};
pub use recommendation::{
    Degradation, EngineError, RecommendationRequest, RecommendationResponse, MAX_SCORE, MAX_YEAR,
    MIN_SCORE, MIN_YEAR,
};
