//! Scan identity derived from BIDS file names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Extensions recognized as NIfTI image files, longest first.
pub const NIFTI_EXTENSIONS: [&str; 2] = [".nii.gz", ".nii"];

pub const SUBJECT_PREFIX: &str = "sub-";
pub const SESSION_PREFIX: &str = "ses-";
pub const TASK_PREFIX: &str = "task-";

/// A single imaging volume discovered in the dataset.
///
/// Identity is the file path; the remaining fields are parsed from the
/// underscore-delimited file name once at discovery time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scan {
    /// Path to the image file as discovered.
    pub path: PathBuf,
    /// Subject label without the `sub-` prefix.
    pub subject: String,
    /// Session label without the `ses-` prefix.
    pub session: Option<String>,
    /// Acquisition suffix (e.g. `bold`, `T1w`, `dwi`).
    pub suffix: String,
    /// Task label for functional runs.
    pub task: Option<String>,
}

impl Scan {
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let invalid = |reason: &str| ModelError::InvalidScanName {
            path: path.clone(),
            reason: reason.to_string(),
        };
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid("file name is not valid UTF-8"))?;
        let stem = strip_nifti_extension(file_name).ok_or_else(|| invalid("not a NIfTI file"))?;

        let components: Vec<&str> = stem.split('_').collect();
        let subject = components
            .first()
            .and_then(|first| first.strip_prefix(SUBJECT_PREFIX))
            .filter(|label| !label.is_empty())
            .ok_or_else(|| invalid("first entity must be sub-<label>"))?;
        let suffix = components
            .last()
            .filter(|_| components.len() > 1)
            .ok_or_else(|| invalid("missing acquisition suffix"))?;
        let session = components
            .iter()
            .find_map(|component| component.strip_prefix(SESSION_PREFIX))
            .map(str::to_string);
        let task = components
            .iter()
            .find_map(|component| component.strip_prefix(TASK_PREFIX))
            .map(str::to_string);

        Ok(Self {
            subject: subject.to_string(),
            session,
            suffix: (*suffix).to_string(),
            task,
            path,
        })
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// File name with the NIfTI extension removed.
    pub fn stem(&self) -> &str {
        let file_name = self.file_name();
        strip_nifti_extension(file_name).unwrap_or(file_name)
    }

    /// The scan's own same-named JSON sidecar.
    pub fn sidecar_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}.json", self.stem()))
    }

    /// Subject identifier as written in BIDS (`sub-<label>`).
    pub fn src_subject_id(&self) -> String {
        format!("{SUBJECT_PREFIX}{}", self.subject)
    }

    /// Visit label: the session label when the second name entity is a
    /// session token.
    pub fn visit(&self) -> Option<&str> {
        self.stem()
            .split('_')
            .nth(1)
            .and_then(|component| component.strip_prefix(SESSION_PREFIX))
    }

    /// Path prefix shared by the scan and its companion files, i.e.
    /// everything before `_<suffix>`.
    pub fn companion_prefix(&self) -> PathBuf {
        let stem = self.stem();
        let prefix = stem
            .strip_suffix(self.suffix.as_str())
            .and_then(|rest| rest.strip_suffix('_'))
            .unwrap_or(stem);
        self.path.with_file_name(prefix)
    }
}

/// Removes a recognized NIfTI extension, returning `None` for other files.
pub fn strip_nifti_extension(file_name: &str) -> Option<&str> {
    NIFTI_EXTENSIONS
        .iter()
        .find_map(|extension| file_name.strip_suffix(extension))
}

/// Normalizes a participant identifier by dropping a leading `sub-`.
pub fn normalize_subject_id(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix(SUBJECT_PREFIX).unwrap_or(trimmed)
}
