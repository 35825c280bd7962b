//! Submission table output for NDA image03.

pub mod error;
pub mod image03;

pub use error::{OutputError, Result};
pub use image03::{IMAGE03_FILE, render_image03, write_image03};
