// Snapshot loading is wholesale: the engine never patches a loaded snapshot,
// it reloads everything on restart.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::geo::Coordinate;
use crate::records::admission::{
    merge_coordinates, AdmissionHistory, AdmissionRecord, GeoReference, Institution, LooseValue,
    SeatRecord,
};
use crate::types::InstitutionId;

pub const INSTITUTIONS_FILE: &str = "json/colleges.json";
pub const GEO_REFERENCE_FILE: &str = "json/college_geo_locations.json";
pub const ADMISSIONS_FILE: &str = "json/cutoffs.json";
pub const SEATS_FILE: &str = "json/seats.json";

#[derive(Debug, Error)]
pub enum RecordLoadError {
    #[error("required data file missing: {0}")]
    Missing(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} collection is empty")]
    Empty(&'static str),
}

/// Rows that were recovered or dropped while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub institutions: usize,
    pub admission_records: usize,
    pub seat_records: usize,
    pub coordinates_merged: usize,
    pub skipped_admission_rows: usize,
    pub skipped_institution_rows: usize,
    /// Rows in any file whose shape could not be read at all.
    pub malformed_rows: usize,
}

/// Read-only view of everything the ingestion collaborator produced.
#[derive(Debug, Clone, Default)]
pub struct DataSnapshot {
    pub institutions: Vec<Institution>,
    pub history: AdmissionHistory,
    pub seats: Vec<SeatRecord>,
    pub report: LoadReport,
}

impl DataSnapshot {
    pub fn from_parts(
        mut institutions: Vec<Institution>,
        history: AdmissionHistory,
        seats: Vec<SeatRecord>,
        geo_references: &[GeoReference],
    ) -> Self {
        let coordinates_merged = merge_coordinates(&mut institutions, geo_references);
        let report = LoadReport {
            institutions: institutions.len(),
            admission_records: history.len(),
            seat_records: seats.len(),
            coordinates_merged,
            ..LoadReport::default()
        };
        Self {
            institutions,
            history,
            seats,
            report,
        }
    }

    pub fn load(data_dir: &Path) -> Result<Self, RecordLoadError> {
        let raw_institutions: Rows<RawInstitution> = read_rows(&data_dir.join(INSTITUTIONS_FILE))?;
        let raw_admissions: Rows<RawAdmissionRecord> = read_rows(&data_dir.join(ADMISSIONS_FILE))?;
        let raw_geo: Rows<RawGeoReference> = read_optional_rows(&data_dir.join(GEO_REFERENCE_FILE))?;
        let raw_seats: Rows<RawSeatRecord> = read_optional_rows(&data_dir.join(SEATS_FILE))?;

        let malformed_rows =
            raw_institutions.malformed + raw_admissions.malformed + raw_geo.malformed + raw_seats.malformed;
        let institution_rows = raw_institutions.total;
        let admission_rows = raw_admissions.total;

        let institutions: Vec<Institution> = raw_institutions
            .rows
            .into_iter()
            .filter_map(RawInstitution::into_institution)
            .collect();
        let admissions: Vec<AdmissionRecord> = raw_admissions
            .rows
            .into_iter()
            .filter_map(RawAdmissionRecord::into_record)
            .collect();

        if institutions.is_empty() {
            return Err(RecordLoadError::Empty("institution"));
        }
        if admissions.is_empty() {
            return Err(RecordLoadError::Empty("admission history"));
        }

        let geo_references: Vec<GeoReference> = raw_geo
            .rows
            .into_iter()
            .map(RawGeoReference::into_reference)
            .collect();
        let seats: Vec<SeatRecord> = raw_seats.rows.into_iter().map(RawSeatRecord::into_record).collect();

        let mut snapshot = Self::from_parts(
            institutions,
            AdmissionHistory::new(admissions),
            seats,
            &geo_references,
        );
        snapshot.report.skipped_institution_rows = institution_rows - snapshot.institutions.len();
        snapshot.report.skipped_admission_rows = admission_rows - snapshot.history.len();
        snapshot.report.malformed_rows = malformed_rows;

        if snapshot.report.skipped_admission_rows > 0 || snapshot.report.skipped_institution_rows > 0 {
            warn!(
                skipped_admissions = snapshot.report.skipped_admission_rows,
                skipped_institutions = snapshot.report.skipped_institution_rows,
                malformed = malformed_rows,
                "dropped rows without a usable year or name"
            );
        }
        info!(
            institutions = snapshot.report.institutions,
            admissions = snapshot.report.admission_records,
            seats = snapshot.report.seat_records,
            coordinates_merged = snapshot.report.coordinates_merged,
            "loaded data snapshot"
        );
        Ok(snapshot)
    }
}

/// Rows of one file that deserialised, plus how many did not.
struct Rows<T> {
    rows: Vec<T>,
    total: usize,
    malformed: usize,
}

impl<T> Default for Rows<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            total: 0,
            malformed: 0,
        }
    }
}

/// The file must be a JSON array; each element is read on its own so one
/// badly shaped row is counted and skipped instead of failing the file.
fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Rows<T>, RecordLoadError> {
    if !path.exists() {
        return Err(RecordLoadError::Missing(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| RecordLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let values: Vec<serde_json::Value> =
        serde_json::from_slice(&bytes).map_err(|source| RecordLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Rows {
        rows: Vec::with_capacity(values.len()),
        total: values.len(),
        malformed: 0,
    };
    for (position, value) in values.into_iter().enumerate() {
        match serde_json::from_value(value) {
            Ok(row) => rows.rows.push(row),
            Err(err) => {
                warn!(path = %path.display(), position, error = %err, "skipping malformed row");
                rows.malformed += 1;
            }
        }
    }
    Ok(rows)
}

fn read_optional_rows<T: DeserializeOwned>(path: &Path) -> Result<Rows<T>, RecordLoadError> {
    if !path.exists() {
        warn!(path = %path.display(), "optional data file missing, treating as empty");
        return Ok(Rows::default());
    }
    read_rows(path)
}

fn coordinate_from(lat: Option<&LooseValue>, lng: Option<&LooseValue>) -> Option<Coordinate> {
    let lat = lat?.as_f64()?;
    let lng = lng?.as_f64()?;
    Coordinate::new(lat, lng)
}

fn clean_text(value: Option<&LooseValue>) -> Option<String> {
    value.and_then(LooseValue::as_label)
}

#[derive(Debug, Deserialize)]
struct RawInstitution {
    code: Option<LooseValue>,
    name: Option<LooseValue>,
    #[serde(default)]
    district: Option<LooseValue>,
    #[serde(default)]
    placement: Option<LooseValue>,
    #[serde(default)]
    autonomous: Option<LooseValue>,
    #[serde(default)]
    lat: Option<LooseValue>,
    #[serde(default)]
    lng: Option<LooseValue>,
}

impl RawInstitution {
    fn into_institution(self) -> Option<Institution> {
        let name = clean_text(self.name.as_ref())?;
        let id = self
            .code
            .as_ref()
            .map(LooseValue::as_institution_id)
            .unwrap_or_else(|| InstitutionId::parse(""));
        let autonomous = match &self.autonomous {
            Some(LooseValue::Flag(flag)) => *flag,
            Some(LooseValue::Text(text)) => text.to_ascii_lowercase().contains("autonomous"),
            _ => false,
        };
        Some(Institution {
            id,
            name,
            region: clean_text(self.district.as_ref()),
            coordinate: coordinate_from(self.lat.as_ref(), self.lng.as_ref()),
            placement_rate: self.placement.as_ref().and_then(LooseValue::as_f64),
            autonomous,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawGeoReference {
    code: Option<LooseValue>,
    #[serde(default)]
    lat: Option<LooseValue>,
    #[serde(default)]
    lng: Option<LooseValue>,
}

impl RawGeoReference {
    fn into_reference(self) -> GeoReference {
        GeoReference {
            institution_id: self
                .code
                .as_ref()
                .map(LooseValue::as_institution_id)
                .unwrap_or_else(|| InstitutionId::parse("")),
            coordinate: coordinate_from(self.lat.as_ref(), self.lng.as_ref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAdmissionRecord {
    college_code: Option<LooseValue>,
    #[serde(default)]
    branch_code: Option<LooseValue>,
    #[serde(default)]
    branch_name: Option<LooseValue>,
    year: Option<LooseValue>,
    #[serde(default)]
    cutoffs: BTreeMap<String, Option<LooseValue>>,
    #[serde(default)]
    ranks: BTreeMap<String, Option<LooseValue>>,
    #[serde(default)]
    district: Option<LooseValue>,
}

impl RawAdmissionRecord {
    fn into_record(self) -> Option<AdmissionRecord> {
        let year = self.year.as_ref()?.as_f64()?;
        if year.fract() != 0.0 {
            return None;
        }
        Some(AdmissionRecord {
            institution_id: self
                .college_code
                .as_ref()
                .map(LooseValue::as_institution_id)
                .unwrap_or_else(|| InstitutionId::parse("")),
            program_code: clean_text(self.branch_code.as_ref()).unwrap_or_default(),
            program_name: clean_text(self.branch_name.as_ref()).unwrap_or_default(),
            year: year as i32,
            thresholds: self
                .cutoffs
                .into_iter()
                .map(|(cat, v)| (cat.trim().to_ascii_uppercase(), v.as_ref().and_then(LooseValue::as_f64)))
                .collect(),
            ranks: self
                .ranks
                .into_iter()
                .map(|(cat, v)| (cat.trim().to_ascii_uppercase(), v.as_ref().and_then(LooseValue::as_count)))
                .collect(),
            region: clean_text(self.district.as_ref()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSeatRecord {
    college_code: Option<LooseValue>,
    #[serde(default)]
    branch_code: Option<LooseValue>,
    #[serde(default)]
    total: Option<LooseValue>,
    #[serde(default)]
    seats: BTreeMap<String, Option<LooseValue>>,
}

impl RawSeatRecord {
    fn into_record(self) -> SeatRecord {
        SeatRecord {
            institution_id: self
                .college_code
                .as_ref()
                .map(LooseValue::as_institution_id)
                .unwrap_or_else(|| InstitutionId::parse("")),
            program_code: clean_text(self.branch_code.as_ref()).unwrap_or_default(),
            total: self.total,
            by_category: self.seats,
        }
    }
}
