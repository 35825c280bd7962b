//! Companion files that travel with a scan: task events and diffusion
//! gradient tables.

use std::path::{Path, PathBuf};

use nda_model::Scan;

pub const BOLD_SUFFIX: &str = "bold";
pub const DWI_SUFFIX: &str = "dwi";
const EVENTS_SUFFIX: &str = "_events.tsv";

/// Companion files located for one scan. Fields are only populated for the
/// suffixes they apply to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Companions {
    /// Task events for `bold` scans.
    pub events: Option<PathBuf>,
    /// Gradient directions for `dwi` scans.
    pub bvec: Option<PathBuf>,
    /// Gradient magnitudes for `dwi` scans.
    pub bval: Option<PathBuf>,
}

impl Companions {
    /// Looks for the scan-specific companion first and falls back to the
    /// dataset-level file at the BIDS root.
    pub fn locate(bids_root: &Path, scan: &Scan) -> Self {
        let mut companions = Self::default();
        match scan.suffix.as_str() {
            BOLD_SUFFIX => {
                let task_default = scan
                    .task
                    .as_ref()
                    .map(|task| bids_root.join(format!("task-{task}{EVENTS_SUFFIX}")));
                companions.events = first_existing(
                    std::iter::once(scan_specific(scan, EVENTS_SUFFIX)).chain(task_default),
                );
            }
            DWI_SUFFIX => {
                companions.bvec = first_existing([
                    scan_specific(scan, "_dwi.bvec"),
                    bids_root.join("dwi.bvec"),
                ]);
                companions.bval = first_existing([
                    scan_specific(scan, "_dwi.bval"),
                    bids_root.join("dwi.bval"),
                ]);
            }
            _ => {}
        }
        companions
    }

    /// True when either gradient file was found.
    pub fn has_gradients(&self) -> bool {
        self.bvec.is_some() || self.bval.is_some()
    }
}

/// Archive member name for a scan's events table. Always the scan-specific
/// name, even when the dataset-level file was used.
pub fn events_member_name(scan: &Scan) -> String {
    let prefix = scan.companion_prefix();
    let base = prefix
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    format!("{base}{EVENTS_SUFFIX}")
}

fn scan_specific(scan: &Scan, suffix: &str) -> PathBuf {
    let mut path = scan.companion_prefix().into_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| path.is_file())
}
