use admission_engine::geo::{
    find_within_radius, haversine_km, Coordinate, DistrictCentroids, ExactRegion, FuzzyRegion,
    GeoCatalog, GeoResolver, InstitutionName, MatchKind, RegionSubstring, ResolutionStrategy,
};
use admission_engine::records::Institution;
use admission_engine::types::InstitutionId;

fn institution(code: &str, name: &str, region: &str, coordinate: Option<(f64, f64)>) -> Institution {
    Institution {
        id: InstitutionId::parse(code),
        name: name.to_string(),
        region: Some(region.to_string()),
        coordinate: coordinate.and_then(|(lat, lng)| Coordinate::new(lat, lng)),
        placement_rate: None,
        autonomous: false,
    }
}

fn fixture() -> Vec<Institution> {
    vec![
        institution("1", "Guindy College of Engineering", "Chennai", Some((13.08, 80.27))),
        institution("2", "Marina Institute of Technology", "Chennai", Some((13.01, 80.23))),
        institution("3", "Kovai Engineering College", "Coimbatore", Some((11.02, 76.96))),
        institution("4", "Temple City Institute", "Madurai", Some((9.93, 78.12))),
        institution("5", "Ariyalur Polytechnic", "Ariyalur", Some((11.14, 79.08))),
        institution("6", "Unmapped Institute", "Salem", None),
    ]
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn invariant_centroid_is_mean_of_located_institutions() {
    let centroids = DistrictCentroids::build(&fixture());
    let chennai = centroids.get("chennai").expect("Chennai centroid");
    assert!(approx(chennai.lat, 13.045), "lat {}", chennai.lat);
    assert!(approx(chennai.lng, 80.25), "lng {}", chennai.lng);

    // Regions with no located institution have no centroid
    assert!(centroids.get("Salem").is_none());
    assert_eq!(centroids.len(), 4);
}

#[test]
fn cascade_exact_region() {
    let resolver = GeoResolver::new(&fixture());
    let found = resolver.resolve_location("  coimbatore ").expect("exact match");
    assert_eq!(found.kind, MatchKind::ExactRegion);
    assert!(approx(found.coordinate.lat, 11.02));
}

#[test]
fn cascade_region_substring_both_directions() {
    let resolver = GeoResolver::new(&fixture());

    let found = resolver.resolve_location("Madurai district").expect("query contains label");
    assert_eq!(found.kind, MatchKind::RegionSubstring);
    assert_eq!(found.matched, "MADURAI");

    let found = resolver.resolve_location("Coimb").expect("label contains query");
    assert_eq!(found.kind, MatchKind::RegionSubstring);
    assert_eq!(found.matched, "COIMBATORE");
}

#[test]
fn cascade_fuzzy_region() {
    let resolver = GeoResolver::new(&fixture());
    let found = resolver.resolve_location("Aryalur").expect("close spelling");
    assert_eq!(found.kind, MatchKind::FuzzyRegion);
    assert_eq!(found.matched, "ARIYALUR");
}

#[test]
fn cascade_institution_name() {
    let resolver = GeoResolver::new(&fixture());
    let found = resolver.resolve_location("guindy").expect("name substring");
    assert_eq!(found.kind, MatchKind::InstitutionName);
    assert_eq!(found.matched, "Guindy College of Engineering");
    assert!(approx(found.coordinate.lat, 13.08));
}

#[test]
fn invariant_exact_region_beats_institution_name() {
    // "Kovai" is both a region label and part of an institution name
    let mut institutions = fixture();
    institutions.push(institution("7", "Kovai Arts Campus", "Kovai", Some((11.5, 77.5))));
    let resolver = GeoResolver::new(&institutions);

    let found = resolver.resolve_location("Kovai").expect("resolves");
    assert_eq!(found.kind, MatchKind::ExactRegion);
    assert!(approx(found.coordinate.lat, 11.5));

    // Each step resolves the query on its own
    let catalog = GeoCatalog::build(&institutions);
    assert!(InstitutionName::default().resolve(&catalog, "KOVAI").is_some());
    assert!(ExactRegion.resolve(&catalog, "KOVAI").is_some());
    assert!(RegionSubstring.resolve(&catalog, "KOVAI").is_some());
    assert!(FuzzyRegion::default().resolve(&catalog, "KOVAI").is_some());
}

#[test]
fn resolution_miss_is_recoverable() {
    let resolver = GeoResolver::new(&fixture());
    let miss = resolver.resolve_location("Atlantis").expect_err("nothing matches");
    assert_eq!(miss.query, "Atlantis");

    assert!(resolver.resolve_location("   ").is_err());
}

#[test]
fn custom_cascade_order_is_respected() {
    let resolver = GeoResolver::with_strategies(&fixture(), vec![Box::new(InstitutionName::default())]);
    // Without the region strategies only names are searched
    assert!(resolver.resolve_location("Coimbatore").is_err());
    let found = resolver.resolve_location("Kovai Engineering").expect("name match");
    assert_eq!(found.kind, MatchKind::InstitutionName);
}

#[test]
fn invariant_radius_search_excludes_unlocated_and_sorts() {
    let institutions = fixture();
    let center = Coordinate::new(13.05, 80.25).expect("valid");
    let nearby = find_within_radius(center, 100.0, &institutions);

    let ids: Vec<&str> = nearby.iter().map(|n| n.item.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"1") && ids.contains(&"2"));
    assert!(nearby.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));

    let everything = find_within_radius(center, 20_000.0, &institutions);
    assert_eq!(everything.len(), 5, "unlocated institution never matches");
}

#[test]
fn invariant_radius_boundary_inclusive() {
    let center = Coordinate::new(11.0, 78.0).expect("valid");
    let point = Coordinate::new(11.5, 78.5).expect("valid");
    let exact = center.distance_km(&point);

    assert_eq!(find_within_radius(center, exact, [point]).len(), 1);
    assert_eq!(find_within_radius(center, exact - 1e-6, [point]).len(), 0);
}

#[test]
fn invariant_radius_no_false_positives_or_negatives() {
    let center = Coordinate::new(11.0, 78.0).expect("valid");
    let mut grid = Vec::new();
    for i in 0..=40 {
        for j in 0..=40 {
            let lat = 8.0 + i as f64 * 0.15;
            let lng = 75.0 + j as f64 * 0.15;
            if let Some(c) = Coordinate::new(lat, lng) {
                grid.push(c);
            }
        }
    }

    for radius in [0.0, 25.0, 80.0, 150.0, 333.3] {
        let found = find_within_radius(center, radius, grid.iter().copied());
        for hit in &found {
            let d = haversine_km(center.lat, center.lng, hit.item.lat, hit.item.lng);
            assert!(d <= radius);
            assert!((d - hit.distance_km).abs() < 1e-9);
        }
        let expected = grid.iter().filter(|c| center.distance_km(c) <= radius).count();
        assert_eq!(found.len(), expected, "radius {radius}");
    }
}

#[test]
fn placeholder_coordinates_are_rejected() {
    assert!(Coordinate::new(0.0, 0.0).is_none());
    assert!(Coordinate::new(91.0, 10.0).is_none());
    assert!(Coordinate::new(10.0, f64::NAN).is_none());
}

#[test]
fn duplicate_institution_names_report_one_row() {
    let institutions = vec![
        institution("1", "Guindy College of Engineering", "Chennai", Some((13.08, 80.27))),
        institution("9", "GUINDY  college of engineering", "Madurai", Some((9.93, 78.12))),
    ];
    let cascade: Vec<Box<dyn ResolutionStrategy>> = vec![Box::new(InstitutionName::default())];
    let resolver = GeoResolver::with_strategies(&institutions, cascade);

    // Misspelt, so only the similarity step can match
    let found = resolver.resolve_location("Guindy Colege of Engineering").unwrap();
    assert_eq!(found.kind, MatchKind::InstitutionName);
    assert_eq!(found.matched, "Guindy College of Engineering");
    assert!(approx(found.coordinate.lat, 13.08));
    assert!(approx(found.coordinate.lng, 80.27));

    let described = format!("{resolver:?}");
    assert!(described.contains("InstitutionName"), "{described}");
}
