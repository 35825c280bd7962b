//! BIDS dataset ingestion.
//!
//! This crate reads everything the record builder consults but does not own:
//!
//! - **Scan discovery**: enumerate NIfTI scans in the subject/session layout
//! - **GUID mapping**: parse `<participant_id> - <GUID>` files and apply the
//!   subject presence policy
//! - **Participants**: load `participants.tsv` (age and sex)
//! - **Scan timing**: load the per-subject/session `*_scans.tsv` tables

mod discovery;
mod error;
mod guid;
mod participants;
mod timing;
mod tsv;

// === Error Types ===
pub use error::{IngestError, Result};

// === Scan Discovery ===
pub use discovery::discover_scans;

// === Subject Lookups ===
pub use guid::{ParsedGuidMapping, load_guid_mapping, parse_guid_mapping, select_mapped_subjects};
pub use participants::{PARTICIPANTS_FILE, load_participants, participants_path};
pub use timing::{TimingIndex, TimingKey, load_scan_timing, scan_timing_path};

// === Tables ===
pub use tsv::{TsvTable, read_tsv_table};
