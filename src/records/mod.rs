pub mod admission;
pub mod index;
pub mod loader;

pub use admission::{
    merge_coordinates, AdmissionHistory, AdmissionRecord, GeoReference, Institution, LooseValue,
    SeatRecord,
};
pub use index::{index_by_institution, IndexStats, InstitutionKeyed, RecordIndex};
pub use loader::{DataSnapshot, LoadReport, RecordLoadError};
