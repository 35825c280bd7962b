//! Anatomical plane deduction from direction cosines.

use std::fmt;

use nda_model::MergedMetadata;
use serde_json::Value;
use thiserror::Error;

/// Sidecar key written by converters that keep the DICOM value verbatim.
pub const DICOM_ORIENTATION_KEY: &str = "ImageOrientationPatientDICOM";
/// Key consulted in the `global.const` view when the DICOM key is absent.
pub const CONST_ORIENTATION_KEY: &str = "ImageOrientationPatient";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Sagittal,
    Coronal,
    Axial,
}

impl Orientation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sagittal => "Sagittal",
            Self::Coronal => "Coronal",
            Self::Axial => "Axial",
        }
    }

    const fn from_axis(axis: usize) -> Option<Self> {
        match axis {
            0 => Some(Self::Sagittal),
            1 => Some(Self::Coronal),
            2 => Some(Self::Axial),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrientationError {
    #[error("orientation must hold 6 direction cosines, got {value}")]
    Malformed { value: String },

    #[error("direction cosines {cosines:?} do not select a single anatomical axis")]
    Oblique { cosines: Vec<f64> },
}

/// Classifies six direction cosines (row vector then column vector).
///
/// Each cosine is rounded half to even, the slice normal is taken as the
/// cross product of the two vectors, and the plane is the axis where the
/// absolute normal is exactly 1. Zero or several such axes is an error.
pub fn orientation_from_cosines(cosines: &[f64]) -> Result<Orientation, OrientationError> {
    let [r0, r1, r2, c0, c1, c2] = cosines else {
        return Err(OrientationError::Malformed {
            value: format!("{cosines:?}"),
        });
    };
    let row = [r0, r1, r2].map(|v| v.round_ties_even());
    let col = [c0, c1, c2].map(|v| v.round_ties_even());
    let normal = [
        (row[1] * col[2] - row[2] * col[1]).abs(),
        (row[2] * col[0] - row[0] * col[2]).abs(),
        (row[0] * col[1] - row[1] * col[0]).abs(),
    ];

    let mut unit_axes = normal
        .iter()
        .enumerate()
        .filter(|(_, component)| **component == 1.0)
        .map(|(axis, _)| axis);
    match (unit_axes.next(), unit_axes.next()) {
        (Some(axis), None) => Orientation::from_axis(axis).ok_or_else(|| oblique(cosines)),
        _ => Err(oblique(cosines)),
    }
}

fn oblique(cosines: &[f64]) -> OrientationError {
    OrientationError::Oblique {
        cosines: cosines.to_vec(),
    }
}

/// Reads the orientation source for a scan and classifies it.
///
/// `ImageOrientationPatientDICOM` is used when present, otherwise the
/// constant `ImageOrientationPatient`. An absent, null or empty value means
/// the field is left empty.
pub fn deduce_orientation(
    metadata: &MergedMetadata,
) -> Result<Option<Orientation>, OrientationError> {
    let source = metadata
        .get(DICOM_ORIENTATION_KEY)
        .or_else(|| metadata.constants().get(CONST_ORIENTATION_KEY));
    let Some(value) = source else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        Value::Array(items) => {
            let cosines = items
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| OrientationError::Malformed {
                    value: value.to_string(),
                })?;
            orientation_from_cosines(&cosines).map(Some)
        }
        other => Err(OrientationError::Malformed {
            value: other.to_string(),
        }),
    }
}
