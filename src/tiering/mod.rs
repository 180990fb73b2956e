pub mod scoring;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::candidate::{CandidateOption, ScoredCandidate, Tier};

pub use scoring::{CompositeScorer, QualityScorer, ScoringContext, ScoringWeights};

/// Offsets against an option's admission threshold `t`:
/// Safe `s >= t + 2`, Moderate `t - 5 <= s < t + 2`,
/// Ambitious `t - 10 <= s < t - 5`, anything lower is out of reach.
#[derive(Debug, Clone, PartialEq)]
pub struct TierThresholds {
    pub safe_margin: f64,
    pub moderate_reach: f64,
    pub ambitious_reach: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            safe_margin: 2.0,
            moderate_reach: 5.0,
            ambitious_reach: 10.0,
        }
    }
}

impl TierThresholds {
    pub fn classify(&self, score: f64, threshold: f64) -> Option<Tier> {
        if score >= threshold + self.safe_margin {
            Some(Tier::Safe)
        } else if score >= threshold - self.moderate_reach {
            Some(Tier::Moderate)
        } else if score >= threshold - self.ambitious_reach {
            Some(Tier::Ambitious)
        } else {
            None
        }
    }
}

/// Options per tier, each sorted by quality score (highest first).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredOptions {
    pub safe: Vec<ScoredCandidate>,
    pub moderate: Vec<ScoredCandidate>,
    pub ambitious: Vec<ScoredCandidate>,
    /// Options more than the ambitious reach below their threshold.
    pub excluded: usize,
}

impl TieredOptions {
    pub fn tier(&self, tier: Tier) -> &[ScoredCandidate] {
        match tier {
            Tier::Safe => &self.safe,
            Tier::Moderate => &self.moderate,
            Tier::Ambitious => &self.ambitious,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut Vec<ScoredCandidate> {
        match tier {
            Tier::Safe => &mut self.safe,
            Tier::Moderate => &mut self.moderate,
            Tier::Ambitious => &mut self.ambitious,
        }
    }

    pub fn len(&self) -> usize {
        self.safe.len() + self.moderate.len() + self.ambitious.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredCandidate> {
        self.safe.iter().chain(&self.moderate).chain(&self.ambitious)
    }
}

#[derive(Debug)]
pub struct TieringEngine<S = CompositeScorer> {
    scorer: S,
    thresholds: TierThresholds,
}

impl Default for TieringEngine<CompositeScorer> {
    fn default() -> Self {
        Self {
            scorer: CompositeScorer::default(),
            thresholds: TierThresholds::default(),
        }
    }
}

impl<S> TieringEngine<S>
where
    S: QualityScorer,
{
    pub fn new(scorer: S, thresholds: TierThresholds) -> Self {
        Self { scorer, thresholds }
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    /// Composite quality in [0, 100].
    pub fn composite_score(&self, candidate: &CandidateOption, score: f64, preferred_region: Option<&str>) -> f64 {
        let context = ScoringContext {
            student_score: score,
            preferred_region,
        };
        self.scorer.score_value(&self.scorer.score(candidate, &context))
    }

    /// Partition options into tiers and order each tier by quality.
    ///
    /// The sort is stable: equal scores keep their input order.
    pub fn categorize(
        &self,
        score: f64,
        candidates: Vec<CandidateOption>,
        preferred_region: Option<&str>,
    ) -> TieredOptions {
        let context = ScoringContext {
            student_score: score,
            preferred_region,
        };
        let mut tiers = TieredOptions::default();

        for option in candidates {
            let Some(tier) = self.thresholds.classify(score, option.threshold) else {
                tiers.excluded += 1;
                continue;
            };
            let why = self.scorer.score(&option, &context);
            let quality_score = self.scorer.score_value(&why);
            tiers.tier_mut(tier).push(ScoredCandidate {
                option,
                tier,
                quality_score,
                why,
            });
        }

        for tier in Tier::ALL {
            tiers
                .tier_mut(tier)
                .sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap_or(Ordering::Equal));
        }

        debug_assert!(Tier::ALL.iter().all(|&tier| {
            tiers
                .tier(tier)
                .windows(2)
                .all(|w| w[0].quality_score >= w[1].quality_score)
        }));

        tiers
    }
}
