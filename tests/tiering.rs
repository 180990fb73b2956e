use admission_engine::tiering::{
    CompositeScorer, QualityScorer, ScoringContext, TierThresholds, TieringEngine,
};
use admission_engine::types::{CandidateOption, InstitutionId, Tier};

fn option(code: &str, threshold: f64) -> CandidateOption {
    CandidateOption {
        institution_id: InstitutionId::parse(code),
        institution_name: format!("Institution {code}"),
        region: Some("CHENNAI".to_string()),
        program_code: "CS".to_string(),
        program_name: "Computer Science and Engineering".to_string(),
        year: 2024,
        category: "OC".to_string(),
        category_fallback: false,
        threshold,
        placement_rate: None,
        autonomous: false,
        total_seats: None,
        distance_km: None,
    }
}

#[test]
fn invariant_tier_boundaries() {
    let thresholds = TierThresholds::default();
    assert_eq!(thresholds.classify(195.0, 193.0), Some(Tier::Safe));
    assert_eq!(thresholds.classify(195.0, 194.0), Some(Tier::Moderate));
    assert_eq!(thresholds.classify(180.0, 188.0), Some(Tier::Ambitious));
    assert_eq!(thresholds.classify(170.0, 188.0), None);

    // Edges are inclusive on the lower side of each band
    assert_eq!(thresholds.classify(192.0, 190.0), Some(Tier::Safe));
    assert_eq!(thresholds.classify(185.0, 190.0), Some(Tier::Moderate));
    assert_eq!(thresholds.classify(180.0, 190.0), Some(Tier::Ambitious));
    assert_eq!(thresholds.classify(179.99, 190.0), None);
}

#[test]
fn invariant_categorize_partitions_and_excludes() {
    let engine = TieringEngine::default();
    let candidates = vec![
        option("1", 193.0),
        option("2", 194.0),
        option("3", 203.0),
        option("4", 206.0),
    ];

    let tiers = engine.categorize(195.0, candidates, None);

    assert_eq!(tiers.safe.len(), 1);
    assert_eq!(tiers.moderate.len(), 1);
    assert_eq!(tiers.ambitious.len(), 1);
    assert_eq!(tiers.excluded, 1);
    assert_eq!(tiers.safe[0].option.institution_id.as_str(), "1");
    assert_eq!(tiers.moderate[0].option.institution_id.as_str(), "2");
    assert_eq!(tiers.ambitious[0].option.institution_id.as_str(), "3");
    assert!(tiers.iter().all(|c| c.option.institution_id.as_str() != "4"));
}

#[test]
fn invariant_no_out_of_reach_option_leaks() {
    let engine = TieringEngine::default();
    for score in (0..=200).step_by(5) {
        let score = score as f64;
        let candidates: Vec<CandidateOption> = (0..=200)
            .step_by(3)
            .map(|t| option(&t.to_string(), t as f64))
            .collect();
        let total = candidates.len();
        let tiers = engine.categorize(score, candidates, None);

        assert_eq!(tiers.len() + tiers.excluded, total);
        for candidate in tiers.iter() {
            assert!(score >= candidate.option.threshold - 10.0);
        }
    }
}

#[test]
fn invariant_sort_is_stable_within_tier() {
    let engine = TieringEngine::default();
    // Identical inputs except the id: every score ties
    let candidates: Vec<CandidateOption> = (1..=6).map(|i| option(&i.to_string(), 150.0)).collect();

    let tiers = engine.categorize(190.0, candidates, None);
    let order: Vec<&str> = tiers.safe.iter().map(|c| c.option.institution_id.as_str()).collect();
    assert_eq!(order, vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn invariant_tier_sorted_by_quality_descending() {
    let engine = TieringEngine::default();
    let mut low = option("1", 150.0);
    low.placement_rate = Some(10.0);
    let mut high = option("2", 150.0);
    high.placement_rate = Some(90.0);
    high.autonomous = true;
    let mut mid = option("3", 150.0);
    mid.placement_rate = Some(50.0);

    let tiers = engine.categorize(190.0, vec![low, high, mid], None);
    let order: Vec<&str> = tiers.safe.iter().map(|c| c.option.institution_id.as_str()).collect();
    assert_eq!(order, vec!["2", "3", "1"]);
}

#[test]
fn composite_score_factors() {
    let engine = TieringEngine::default();
    let mut candidate = option("1", 180.0);
    candidate.placement_rate = Some(85.0);
    candidate.autonomous = true;
    candidate.total_seats = Some(120);

    // 34 + 27 + 15 + 10 + 5
    let score = engine.composite_score(&candidate, 190.0, Some("chennai"));
    assert!((score - 91.0).abs() < 1e-9, "got {score}");

    // Region mismatch drops the region points only
    let score = engine.composite_score(&candidate, 190.0, Some("Madurai"));
    assert!((score - 81.0).abs() < 1e-9, "got {score}");

    // Exactly the minimum seat count earns nothing
    candidate.total_seats = Some(60);
    let score = engine.composite_score(&candidate, 190.0, Some("Madurai"));
    assert!((score - 76.0).abs() < 1e-9, "got {score}");
}

#[test]
fn invariant_composite_score_bounded() {
    let scorer = CompositeScorer::default();
    let context = ScoringContext {
        student_score: 200.0,
        preferred_region: Some("CHENNAI"),
    };

    let placements = [None, Some(0.0), Some(-20.0), Some(55.5), Some(100.0), Some(250.0), Some(f64::NAN)];
    let thresholds = [0.0, 77.7, 200.0, 450.0, -3.0];
    let seats = [None, Some(0), Some(61), Some(10_000)];

    for placement in placements {
        for threshold in thresholds {
            for total_seats in seats {
                for autonomous in [false, true] {
                    let mut candidate = option("9", threshold);
                    candidate.placement_rate = placement;
                    candidate.total_seats = total_seats;
                    candidate.autonomous = autonomous;

                    let breakdown = scorer.score(&candidate, &context);
                    let value = scorer.score_value(&breakdown);
                    assert!((0.0..=100.0).contains(&value), "score {value} out of range");
                }
            }
        }
    }

    let mut bare = option("0", 0.0);
    bare.region = None;
    let value = scorer.score_value(&scorer.score(&bare, &ScoringContext::default()));
    assert_eq!(value, 0.0);
}
