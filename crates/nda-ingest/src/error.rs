//! Error types for dataset ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading the dataset's side tables.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Required file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read directory entries.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Table Errors ===
    /// Failed to parse a tab-separated table.
    #[error("failed to parse {path}: {source}")]
    TsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Required column not found in a table.
    #[error("required column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    /// Invalid value in a table cell.
    #[error("invalid {field} value '{value}' in {path}")]
    InvalidValue {
        field: String,
        value: String,
        path: PathBuf,
    },

    // === Subject Mapping Errors ===
    /// A GUID mapping line is not `<participant_id> - <GUID>`.
    #[error("{path}:{line}: expected '<participant_id> - <GUID>', found '{content}'")]
    GuidLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// Participants without a GUID under strict subject checking.
    #[error("the following subjects are missing from the GUID mapping: {}", .subjects.join(", "))]
    UnmappedSubjects { subjects: Vec<String> },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
