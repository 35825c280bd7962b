use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("not a BIDS scan file name: {path} ({reason})")]
    InvalidScanName { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;
