use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::types::identifiers::InstitutionId;

/// A field the ingestion side emits with inconsistent typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Number(f64),
    Text(String),
    Flag(bool),
    /// Arrays, objects or anything else; reads as missing.
    Other(serde_json::Value),
}

impl LooseValue {
    /// Numeric reading: plain numbers, or text such as `"85"` / `"85.5%"`.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            LooseValue::Number(n) => *n,
            LooseValue::Text(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
            LooseValue::Flag(_) | LooseValue::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Count reading: non-negative numbers (truncated) or all-digit text.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            LooseValue::Number(n) if n.is_finite() && *n >= 0.0 => Some(n.trunc() as u64),
            LooseValue::Text(s) => {
                let s = s.trim();
                if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    s.parse().ok()
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            LooseValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            LooseValue::Number(n) => n.to_string(),
            LooseValue::Text(s) => s.clone(),
            LooseValue::Flag(b) => b.to_string(),
            LooseValue::Other(value) => value.to_string(),
        }
    }

    /// Trimmed, non-empty text for names and codes. Flags and structured
    /// values do not count.
    pub fn as_label(&self) -> Option<String> {
        match self {
            LooseValue::Number(_) | LooseValue::Text(_) => {
                let text = self.as_text().trim().to_string();
                (!text.is_empty()).then_some(text)
            }
            LooseValue::Flag(_) | LooseValue::Other(_) => None,
        }
    }

    pub fn as_institution_id(&self) -> InstitutionId {
        match self {
            LooseValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < 1e15 => {
                InstitutionId::from_number(*n as i64)
            }
            other => InstitutionId::parse(&other.as_text()),
        }
    }
}

/// One row per (institution, program, year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    pub institution_id: InstitutionId,
    pub program_code: String,
    pub program_name: String,
    pub year: i32,
    /// Category code -> admission threshold; `None` when nobody was admitted.
    pub thresholds: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub ranks: BTreeMap<String, Option<u64>>,
    #[serde(default)]
    pub region: Option<String>,
}

impl AdmissionRecord {
    pub fn threshold(&self, category: &str) -> Option<f64> {
        self.thresholds
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(category))
            .and_then(|(_, value)| *value)
    }

    /// Programs are keyed by code; name only when the code is blank.
    pub fn program_key(&self) -> &str {
        if self.program_code.trim().is_empty() {
            &self.program_name
        } else {
            &self.program_code
        }
    }
}

/// One row per (institution, program) of the seat matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatRecord {
    pub institution_id: InstitutionId,
    pub program_code: String,
    pub total: Option<LooseValue>,
    #[serde(default)]
    pub by_category: BTreeMap<String, Option<LooseValue>>,
}

impl SeatRecord {
    /// Seat total with malformed or missing values read as zero.
    pub fn seat_count(&self) -> u64 {
        self.total.as_ref().and_then(LooseValue::as_count).unwrap_or(0)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(&self.total, Some(v) if v.as_count().is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub region: Option<String>,
    pub coordinate: Option<Coordinate>,
    /// Placement percentage, 0-100.
    pub placement_rate: Option<f64>,
    pub autonomous: bool,
}

/// Coordinate override from the secondary geo-reference source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoReference {
    pub institution_id: InstitutionId,
    pub coordinate: Option<Coordinate>,
}

/// Apply geo references onto institutions; the later source wins.
/// Returns how many institutions had their coordinate set or replaced.
pub fn merge_coordinates(institutions: &mut [Institution], references: &[GeoReference]) -> usize {
    let mut merged = 0;
    for reference in references {
        let Some(coordinate) = reference.coordinate else {
            continue;
        };
        for institution in institutions.iter_mut().filter(|i| i.id == reference.institution_id) {
            institution.coordinate = Some(coordinate);
            merged += 1;
        }
    }
    merged
}

/// The authoritative admission history. Append-only across years.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdmissionHistory {
    records: Vec<AdmissionRecord>,
}

impl AdmissionHistory {
    pub fn new(records: Vec<AdmissionRecord>) -> Self {
        Self { records }
    }

    /// Replace every row of `year` with `rows`. Rows for other years are
    /// kept as they are; incoming rows for a different year are dropped.
    pub fn replace_year(&mut self, year: i32, rows: Vec<AdmissionRecord>) -> usize {
        self.records.retain(|r| r.year != year);
        let before = self.records.len();
        self.records.extend(rows.into_iter().filter(|r| r.year == year));
        self.records.len() - before
    }

    pub fn records(&self) -> &[AdmissionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AdmissionRecord> {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.records.iter().map(|r| r.year).collect();
        years.sort_unstable();
        years.dedup();
        years
    }
}
