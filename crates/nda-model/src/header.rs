//! Imaging geometry read from a scan's binary header.

/// Unit labels accepted by the image03 dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitLabel {
    Millimeters,
    Seconds,
    Milliseconds,
}

impl UnitLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Millimeters => "Millimeters",
            Self::Seconds => "Seconds",
            Self::Milliseconds => "Milliseconds",
        }
    }
}

impl std::fmt::Display for UnitLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geometry facts for one scan.
///
/// `extents` and `voxel_sizes` hold one entry per dimension. Unit codes are
/// the short names of the header's `xyzt_units` nibbles (`mm`, `sec`,
/// `msec`, `unknown`, ...), not yet normalized to [`UnitLabel`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderFacts {
    pub extents: Vec<usize>,
    pub voxel_sizes: Vec<f32>,
    pub space_unit: &'static str,
    pub time_unit: &'static str,
}

impl HeaderFacts {
    pub fn num_dimensions(&self) -> usize {
        self.extents.len()
    }

    pub fn extent(&self, axis: usize) -> Option<usize> {
        self.extents.get(axis).copied()
    }

    pub fn voxel_size(&self, axis: usize) -> Option<f32> {
        self.voxel_sizes.get(axis).copied()
    }

    /// True when the volume carries a fourth (time or gradient) axis.
    pub fn has_fourth_axis(&self) -> bool {
        self.extents.len() > 3
    }
}
