//! Shared types for converting BIDS datasets into NDA image03 records.

pub mod error;
pub mod header;
pub mod metadata;
pub mod options;
pub mod record;
pub mod scan;
pub mod subjects;

pub use error::{ModelError, Result};
pub use header::{HeaderFacts, UnitLabel};
pub use metadata::{ConstantsView, MergedMetadata, SidecarLevel};
pub use options::{ConversionOptions, ScanFailurePolicy, SubjectStrictness};
pub use record::{FieldValue, Image03Field, NdaRecord};
pub use scan::{Scan, normalize_subject_id, strip_nifti_extension};
pub use subjects::{GuidMapping, Participant, ParticipantTable, ScanTimingRow, ScanTimingTable};
