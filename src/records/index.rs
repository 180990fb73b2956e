use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::records::admission::{AdmissionRecord, Institution, SeatRecord};
use crate::records::loader::DataSnapshot;
use crate::types::identifiers::InstitutionId;

/// Anything grouped under an institution key.
pub trait InstitutionKeyed {
    fn institution_id(&self) -> &InstitutionId;
}

impl InstitutionKeyed for AdmissionRecord {
    fn institution_id(&self) -> &InstitutionId {
        &self.institution_id
    }
}

impl InstitutionKeyed for SeatRecord {
    fn institution_id(&self) -> &InstitutionId {
        &self.institution_id
    }
}

/// Group records by institution, keeping input order inside each group.
///
/// Records are not sorted by year; callers filter by year themselves.
/// Identifiers that did not parse are indexed under their raw key.
pub fn index_by_institution<R>(records: &[R]) -> HashMap<InstitutionId, Vec<R>>
where
    R: InstitutionKeyed + Clone,
{
    let mut index: HashMap<InstitutionId, Vec<R>> = HashMap::new();
    for record in records {
        index
            .entry(record.institution_id().clone())
            .or_default()
            .push(record.clone());
    }
    index
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub admission_groups: usize,
    pub seat_groups: usize,
    pub raw_identifier_keys: usize,
    pub malformed_seat_values: usize,
}

/// Read-only lookup structures built once from a snapshot.
#[derive(Debug, Clone, Default)]
pub struct RecordIndex {
    institutions: Vec<Institution>,
    positions: HashMap<InstitutionId, usize>,
    admissions: HashMap<InstitutionId, Vec<AdmissionRecord>>,
    seats: HashMap<InstitutionId, Vec<SeatRecord>>,
    stats: IndexStats,
}

impl RecordIndex {
    pub fn build(snapshot: &DataSnapshot) -> Self {
        let admissions = index_by_institution(snapshot.history.records());
        let seats = index_by_institution(&snapshot.seats);

        let mut positions = HashMap::with_capacity(snapshot.institutions.len());
        for (pos, institution) in snapshot.institutions.iter().enumerate() {
            // First declaration wins for duplicated codes.
            positions.entry(institution.id.clone()).or_insert(pos);
        }

        let raw_identifier_keys = admissions
            .keys()
            .chain(seats.keys())
            .filter(|id| id.is_raw())
            .collect::<HashSet<_>>()
            .len();
        let malformed_seat_values = snapshot.seats.iter().filter(|s| s.is_malformed()).count();

        let stats = IndexStats {
            admission_groups: admissions.len(),
            seat_groups: seats.len(),
            raw_identifier_keys,
            malformed_seat_values,
        };

        if raw_identifier_keys > 0 || malformed_seat_values > 0 {
            warn!(
                raw_identifier_keys,
                malformed_seat_values, "indexed records with data quality issues"
            );
        }
        info!(
            admission_groups = stats.admission_groups,
            seat_groups = stats.seat_groups,
            "built record index"
        );

        Self {
            institutions: snapshot.institutions.clone(),
            positions,
            admissions,
            seats,
            stats,
        }
    }

    pub fn institutions(&self) -> &[Institution] {
        &self.institutions
    }

    pub fn institution(&self, id: &InstitutionId) -> Option<&Institution> {
        self.positions.get(id).map(|&pos| &self.institutions[pos])
    }

    pub fn admissions_for(&self, id: &InstitutionId) -> &[AdmissionRecord] {
        self.admissions.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn seats_for(&self, id: &InstitutionId) -> &[SeatRecord] {
        self.seats.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every admission record, grouped by institution (group order unspecified).
    pub fn all_admissions(&self) -> impl Iterator<Item = &AdmissionRecord> {
        self.admissions.values().flatten()
    }

    /// Sum of seat totals for an institution, optionally one program.
    /// Missing or non-numeric totals count as zero.
    pub fn total_seats(&self, id: &InstitutionId, program_code: Option<&str>) -> u64 {
        self.seats_for(id)
            .iter()
            .filter(|seat| match program_code {
                Some(code) => seat.program_code.trim().eq_ignore_ascii_case(code.trim()),
                None => true,
            })
            .map(SeatRecord::seat_count)
            .sum()
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}
