//! Record synthesis for BIDS to NDA image03 conversion.
//!
//! Each scan flows through the same stages:
//!
//! 1. [`sidecar`] merges the inherited JSON sidecars.
//! 2. [`header`] reads geometry from the NIfTI header and normalizes units.
//! 3. [`orientation`] classifies the acquisition plane.
//! 4. [`builder`] assembles the image03 row.
//! 5. [`packager`] writes the per-scan metadata archive.
//!
//! [`pipeline`] drives these stages over a whole dataset.

pub mod builder;
pub mod companions;
pub mod error;
pub mod format;
pub mod header;
pub mod nifti;
pub mod orientation;
pub mod packager;
pub mod pipeline;
pub mod sidecar;

pub use builder::{RecordInputs, SCAN_TYPES, SubjectLookups, build_record, scan_type_for};
pub use companions::Companions;
pub use error::{CoreError, Result};
pub use header::{ScanGeometry, extract_geometry};
pub use orientation::{Orientation, OrientationError, deduce_orientation, orientation_from_cosines};
pub use packager::{ArchiveOutcome, METADATA_ARCHIVE_TYPE, package_artifacts};
pub use pipeline::{
    ConversionContext, ConversionRun, ScanOutcome, SkippedScan, process_scan, process_scans,
    retain_mapped_scans,
};
pub use sidecar::{ResolvedSidecars, SidecarSource, resolve_sidecars};
