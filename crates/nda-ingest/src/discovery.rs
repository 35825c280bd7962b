//! Scan discovery over a BIDS directory tree.

use std::path::{Path, PathBuf};

use nda_model::{Scan, strip_nifti_extension};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

const SUBJECT_DIR_PREFIX: &str = "sub-";
const SESSION_DIR_PREFIX: &str = "ses-";

/// Lists NIfTI scans laid out as `sub-*/<datatype>/sub-*` or
/// `sub-*/ses-*/<datatype>/sub-*_ses-*`.
///
/// Returns scans sorted by path.
pub fn discover_scans(bids_root: &Path) -> Result<Vec<Scan>> {
    if !bids_root.is_dir() {
        return Err(IngestError::DirectoryNotFound {
            path: bids_root.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    for subject_dir in list_dirs(bids_root, SUBJECT_DIR_PREFIX)? {
        for datatype_dir in list_dirs(&subject_dir, "")? {
            collect_nifti_files(&datatype_dir, false, &mut files)?;

            let is_session = datatype_dir
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(SESSION_DIR_PREFIX));
            if is_session {
                for session_datatype_dir in list_dirs(&datatype_dir, "")? {
                    collect_nifti_files(&session_datatype_dir, true, &mut files)?;
                }
            }
        }
    }

    files.sort();
    files.dedup();

    let mut scans = Vec::with_capacity(files.len());
    for path in files {
        match Scan::from_path(&path) {
            Ok(scan) => scans.push(scan),
            Err(error) => warn!(%error, "skipping file"),
        }
    }
    debug!(
        bids_root = %bids_root.display(),
        scan_count = scans.len(),
        "scan discovery complete"
    );
    Ok(scans)
}

fn read_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| IngestError::DirectoryRead {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut paths = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| IngestError::DirectoryRead {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_none_or(|name| name.starts_with('.'));
        if !hidden {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn list_dirs(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    Ok(read_entries(dir)?
        .into_iter()
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect())
}

fn collect_nifti_files(dir: &Path, require_session: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for path in read_entries(dir)? {
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if is_scan_file_name(name, require_session) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_scan_file_name(name: &str, require_session: bool) -> bool {
    let Some(stem) = strip_nifti_extension(name) else {
        return false;
    };
    if !stem.starts_with(SUBJECT_DIR_PREFIX) {
        return false;
    }
    !require_session || stem.contains(&format!("_{SESSION_DIR_PREFIX}"))
}
