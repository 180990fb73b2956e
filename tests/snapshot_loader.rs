use std::fs;
use std::path::Path;

use admission_engine::records::{DataSnapshot, RecordIndex, RecordLoadError};
use admission_engine::types::InstitutionId;
use serde_json::json;
use tempfile::tempdir;

fn write_json(root: &Path, file: &str, value: serde_json::Value) {
    let path = root.join("json").join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn write_minimal(root: &Path) {
    write_json(
        root,
        "colleges.json",
        json!([
            {"code": 1, "name": "Guindy College of Engineering", "district": "Chennai",
             "placement": "85%", "autonomous": "Autonomous", "lat": 13.01, "lng": 80.23},
            {"code": "0002", "name": "Kovai Engineering College", "district": "Coimbatore",
             "placement": "N/A", "autonomous": false},
            {"code": 3, "name": "Placeholder Institute", "district": "Salem",
             "placement": null, "lat": 0, "lng": 0},
            {"code": 4, "name": "   "}
        ]),
    );
    write_json(
        root,
        "cutoffs.json",
        json!([
            {"college_code": 1, "branch_code": "CS", "branch_name": "Computer Science and Engineering",
             "year": 2024, "cutoffs": {"oc": 195.5, "BC": 193.0, "SC": null}},
            {"college_code": "2", "branch_code": "ME", "branch_name": "Mechanical Engineering",
             "year": "2023", "cutoffs": {"OC": "160"}},
            {"college_code": 2, "branch_code": "EC", "branch_name": "Electronics and Communication",
             "year": null, "cutoffs": {"OC": 170}}
        ]),
    );
}

#[test]
fn loads_snapshot_and_normalises_fields() {
    let dir = tempdir().unwrap();
    write_minimal(dir.path());

    let snapshot = DataSnapshot::load(dir.path()).unwrap();

    assert_eq!(snapshot.institutions.len(), 3, "row without a name is dropped");
    assert_eq!(snapshot.report.skipped_institution_rows, 1);
    assert_eq!(snapshot.history.len(), 2, "row without a year is dropped");
    assert_eq!(snapshot.report.skipped_admission_rows, 1);
    assert!(snapshot.seats.is_empty(), "missing optional seats file is empty");

    let guindy = &snapshot.institutions[0];
    assert_eq!(guindy.id, InstitutionId::parse("1"));
    assert_eq!(guindy.placement_rate, Some(85.0));
    assert!(guindy.autonomous);
    assert!(guindy.coordinate.is_some());

    let kovai = &snapshot.institutions[1];
    assert_eq!(kovai.id.as_str(), "2");
    assert_eq!(kovai.placement_rate, None);
    assert!(!kovai.autonomous);

    // (0, 0) is a placeholder, not a location
    assert!(snapshot.institutions[2].coordinate.is_none());

    let cs = &snapshot.history.records()[0];
    assert_eq!(cs.threshold("OC"), Some(195.5));
    assert_eq!(cs.threshold("sc"), None);
    let me = &snapshot.history.records()[1];
    assert_eq!(me.year, 2023);
    assert_eq!(me.threshold("OC"), Some(160.0));
}

#[test]
fn geo_references_merge_with_later_source_winning() {
    let dir = tempdir().unwrap();
    write_minimal(dir.path());
    write_json(
        dir.path(),
        "college_geo_locations.json",
        json!([
            {"code": 1, "lat": 13.08, "lng": 80.27},
            {"code": "2", "lat": 11.02, "lng": 76.96},
            {"code": 3, "lat": null, "lng": null}
        ]),
    );

    let snapshot = DataSnapshot::load(dir.path()).unwrap();
    assert_eq!(snapshot.report.coordinates_merged, 2);

    let guindy = snapshot.institutions[0].coordinate.unwrap();
    assert_eq!((guindy.lat, guindy.lng), (13.08, 80.27));
    let kovai = snapshot.institutions[1].coordinate.unwrap();
    assert_eq!((kovai.lat, kovai.lng), (11.02, 76.96));
    assert!(snapshot.institutions[2].coordinate.is_none());
}

#[test]
fn seats_tolerate_junk_totals() {
    let dir = tempdir().unwrap();
    write_minimal(dir.path());
    write_json(
        dir.path(),
        "seats.json",
        json!([
            {"college_code": 1, "branch_code": "CS", "total": 120, "seats": {"OC": 40}},
            {"college_code": 1, "branch_code": "EC", "total": "60"},
            {"college_code": 1, "branch_code": "ME", "total": "sixty"}
        ]),
    );

    let snapshot = DataSnapshot::load(dir.path()).unwrap();
    let index = RecordIndex::build(&snapshot);
    let id = InstitutionId::parse("1");

    assert_eq!(index.total_seats(&id, None), 180);
    assert_eq!(index.total_seats(&id, Some("CS")), 120);
    assert_eq!(index.stats().malformed_seat_values, 1);
}

#[test]
fn missing_required_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = DataSnapshot::load(dir.path()).unwrap_err();
    assert!(matches!(err, RecordLoadError::Missing(_)));
}

#[test]
fn empty_admission_history_is_rejected() {
    let dir = tempdir().unwrap();
    write_minimal(dir.path());
    write_json(dir.path(), "cutoffs.json", json!([]));

    let err = DataSnapshot::load(dir.path()).unwrap_err();
    assert!(matches!(err, RecordLoadError::Empty(_)));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempdir().unwrap();
    write_minimal(dir.path());
    fs::write(dir.path().join("json").join("cutoffs.json"), b"{not json").unwrap();

    let err = DataSnapshot::load(dir.path()).unwrap_err();
    assert!(matches!(err, RecordLoadError::Parse { .. }));
}

#[test]
fn mistyped_rows_do_not_reject_the_file() {
    let dir = tempdir().unwrap();
    write_json(
        dir.path(),
        "colleges.json",
        json!([
            {"code": 1, "name": "Guindy College of Engineering", "district": "Chennai"},
            {"code": 5, "name": 12345, "district": ["Chennai"], "autonomous": {"flag": true}},
            42
        ]),
    );
    write_json(
        dir.path(),
        "cutoffs.json",
        json!([
            {"college_code": 1, "branch_code": 104, "branch_name": "Civil Engineering",
             "year": 2024, "cutoffs": {"OC": [150], "BC": 140}},
            {"college_code": 1, "branch_code": "CS", "branch_name": "Computer Science and Engineering",
             "year": 2024, "cutoffs": "not a map"}
        ]),
    );
    write_json(
        dir.path(),
        "seats.json",
        json!([
            {"college_code": 1, "branch_code": 104, "total": [60]},
            {"college_code": 1, "branch_code": "CS", "total": {"OC": 30}},
            {"college_code": 1, "branch_code": "ME", "total": 45}
        ]),
    );

    let snapshot = DataSnapshot::load(dir.path()).unwrap();

    assert_eq!(snapshot.institutions.len(), 2);
    assert_eq!(snapshot.institutions[1].name, "12345");
    assert_eq!(snapshot.institutions[1].region, None);
    assert!(!snapshot.institutions[1].autonomous);
    assert_eq!(snapshot.report.skipped_institution_rows, 1);

    assert_eq!(snapshot.history.len(), 1);
    let civil = &snapshot.history.records()[0];
    assert_eq!(civil.program_code, "104");
    assert_eq!(civil.threshold("OC"), None);
    assert_eq!(civil.threshold("BC"), Some(140.0));
    assert_eq!(snapshot.report.skipped_admission_rows, 1);
    assert_eq!(snapshot.report.malformed_rows, 2);

    let index = RecordIndex::build(&snapshot);
    let id = InstitutionId::parse("1");
    assert_eq!(index.total_seats(&id, None), 45);
    assert_eq!(index.total_seats(&id, Some("104")), 0);
    assert_eq!(index.stats().malformed_seat_values, 2);
}
