//! Error types for record synthesis.

use std::path::PathBuf;

use thiserror::Error;

use crate::orientation::OrientationError;

#[derive(Debug, Error)]
pub enum CoreError {
    // === Sidecars ===
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON sidecar {path}: {source}")]
    SidecarParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sidecar {path} is not a JSON object")]
    SidecarNotObject { path: PathBuf },

    // === Header ===
    #[error("invalid NIfTI header in {path}: {reason}")]
    InvalidHeader { path: PathBuf, reason: String },

    #[error("{path} has {dimensions} dimension(s); at least 3 are required")]
    TooFewDimensions { path: PathBuf, dimensions: usize },

    #[error("unknown unit code '{code}' in {path}; expected one of mm, sec, msec")]
    UnknownUnit { code: String, path: PathBuf },

    // === Record fields ===
    #[error(transparent)]
    Orientation(#[from] OrientationError),

    #[error("no NDA scan type for suffix '{suffix}' ({path})")]
    UnmappedSuffix { suffix: String, path: PathBuf },

    #[error("subject sub-{subject} has no GUID mapping entry")]
    MissingGuid { subject: String },

    #[error("no participants.tsv row for participant_id 'sub-{subject}'")]
    MissingParticipant { subject: String },

    #[error("no scans.tsv table loaded for {scan}")]
    MissingTimingTable { scan: PathBuf },

    #[error("no row in {table} matches {scan}; acq_time is required for interview_date")]
    MissingAcquisitionTime { scan: PathBuf, table: PathBuf },

    #[error("acq_time '{value}' for {scan} is not an ISO 8601 date")]
    InvalidAcquisitionTime { value: String, scan: PathBuf },

    // === Archives ===
    #[error("failed to serialize metadata for {path}: {source}")]
    MetadataSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    // === Pipeline ===
    #[error("failed to convert {path}")]
    Scan {
        path: PathBuf,
        #[source]
        source: Box<CoreError>,
    },
}

impl CoreError {
    /// True for errors that mean the dataset as a whole cannot be
    /// represented, as opposed to one scan lacking data.
    pub fn is_dataset_level(&self) -> bool {
        match self {
            Self::UnmappedSuffix { .. } | Self::UnknownUnit { .. } => true,
            Self::Scan { source, .. } => source.is_dataset_level(),
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_level_errors_survive_wrapping() {
        let inner = CoreError::UnknownUnit {
            code: "micron".to_string(),
            path: PathBuf::from("sub-01_T1w.nii.gz"),
        };
        let wrapped = CoreError::Scan {
            path: PathBuf::from("sub-01_T1w.nii.gz"),
            source: Box::new(inner),
        };
        assert!(wrapped.is_dataset_level());
        assert!(!CoreError::MissingParticipant { subject: "01".to_string() }.is_dataset_level());
    }

    #[test]
    fn scan_error_message_leaves_cause_to_source_chain() {
        let wrapped = CoreError::Scan {
            path: PathBuf::from("sub-01_T1w.nii.gz"),
            source: Box::new(CoreError::MissingGuid {
                subject: "01".to_string(),
            }),
        };
        assert_eq!(wrapped.to_string(), "failed to convert sub-01_T1w.nii.gz");
        let cause = std::error::Error::source(&wrapped).map(ToString::to_string);
        assert_eq!(
            cause.as_deref(),
            Some("subject sub-01 has no GUID mapping entry")
        );
    }
}
