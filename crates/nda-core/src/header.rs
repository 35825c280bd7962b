//! Geometry extraction and unit normalization for image headers.

use std::path::Path;

use nda_model::{HeaderFacts, UnitLabel};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::nifti::read_nifti_header;

/// Header unit codes the image03 dictionary can represent.
pub const UNIT_LABELS: &[(&str, UnitLabel)] = &[
    ("mm", UnitLabel::Millimeters),
    ("sec", UnitLabel::Seconds),
    ("msec", UnitLabel::Milliseconds),
];

const MILLISECONDS_CODE: &str = "msec";

/// Dictionary label for a header unit code.
pub fn unit_label(code: &str) -> Option<UnitLabel> {
    UNIT_LABELS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, label)| *label)
}

/// Header facts with units normalized for output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanGeometry {
    pub facts: HeaderFacts,
    pub space_label: UnitLabel,
    /// Present only for volumes with a fourth axis.
    pub time_label: Option<UnitLabel>,
    /// Fourth-axis spacing in seconds, present only for 4-D volumes.
    pub repetition_time: Option<f32>,
}

impl ScanGeometry {
    /// Validates and normalizes facts read from `path`.
    ///
    /// Fewer than three dimensions is rejected. The spatial unit must map to a
    /// dictionary label, as must the temporal unit when a fourth axis exists.
    pub fn from_facts(facts: HeaderFacts, path: &Path) -> Result<Self> {
        if facts.num_dimensions() < 3 {
            return Err(CoreError::TooFewDimensions {
                path: path.to_path_buf(),
                dimensions: facts.num_dimensions(),
            });
        }
        let space_label = require_label(facts.space_unit, path)?;
        let (time_label, repetition_time) = match facts.voxel_size(3) {
            Some(spacing) if facts.has_fourth_axis() => (
                Some(require_label(facts.time_unit, path)?),
                Some(repetition_time_seconds(spacing, facts.time_unit)),
            ),
            _ => (None, None),
        };
        Ok(Self {
            facts,
            space_label,
            time_label,
            repetition_time,
        })
    }

    pub fn num_dimensions(&self) -> usize {
        self.facts.num_dimensions()
    }
}

fn require_label(code: &str, path: &Path) -> Result<UnitLabel> {
    unit_label(code).ok_or_else(|| CoreError::UnknownUnit {
        code: code.to_string(),
        path: path.to_path_buf(),
    })
}

/// Converts fourth-axis spacing to seconds.
pub fn repetition_time_seconds(spacing: f32, time_unit: &str) -> f32 {
    if time_unit == MILLISECONDS_CODE {
        spacing / 1000.0
    } else {
        spacing
    }
}

/// Reads and normalizes the geometry of the image at `path`.
pub fn extract_geometry(path: &Path) -> Result<ScanGeometry> {
    let header = read_nifti_header(path)?;
    debug!(
        path = %path.display(),
        version = ?header.version,
        dims = ?header.dims,
        space_unit = header.space_unit(),
        time_unit = header.time_unit(),
        "read image header"
    );
    ScanGeometry::from_facts(header.to_facts(), path)
}
