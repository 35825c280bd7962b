//! The image03 output row.

use std::fmt;

use serde_json::Value;

macro_rules! image03_fields {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Column of the NDA `image03` data structure, in dictionary order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Image03Field {
            $($variant),+
        }

        impl Image03Field {
            /// Every column, in output order.
            pub const ALL: &'static [Image03Field] = &[$(Image03Field::$variant),+];

            /// Column name as it appears in the output header.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Image03Field::$variant => $name),+
                }
            }
        }
    };
}

image03_fields! {
    SubjectKey => "subjectkey",
    SrcSubjectId => "src_subject_id",
    InterviewDate => "interview_date",
    InterviewAge => "interview_age",
    Gender => "gender",
    ImageFile => "image_file",
    ExperimentId => "experiment_id",
    ImageDescription => "image_description",
    ScanType => "scan_type",
    ScanObject => "scan_object",
    ImageFileFormat => "image_file_format",
    ImageModality => "image_modality",
    ScannerManufacturer => "scanner_manufacturer_pd",
    ScannerType => "scanner_type_pd",
    ScannerSoftwareVersions => "scanner_software_versions_pd",
    MagneticFieldStrength => "magnetic_field_strength",
    EchoTime => "mri_echo_time_pd",
    FlipAngle => "flip_angle",
    ReceiveCoil => "receive_coil",
    ImageOrientation => "image_orientation",
    TransformationPerformed => "transformation_performed",
    TransformationType => "transformation_type",
    ImageNumDimensions => "image_num_dimensions",
    ImageExtent1 => "image_extent1",
    ImageExtent2 => "image_extent2",
    ImageExtent3 => "image_extent3",
    ImageExtent4 => "image_extent4",
    Extent4Type => "extent4_type",
    AcquisitionMatrix => "acquisition_matrix",
    ImageResolution1 => "image_resolution1",
    ImageResolution2 => "image_resolution2",
    ImageResolution3 => "image_resolution3",
    ImageSliceThickness => "image_slice_thickness",
    PhotometInterpret => "photomet_interpret",
    ImageResolution4 => "image_resolution4",
    ImageUnit1 => "image_unit1",
    ImageUnit2 => "image_unit2",
    ImageUnit3 => "image_unit3",
    RepetitionTime => "mri_repetition_time_pd",
    SliceTiming => "slice_timing",
    ImageUnit4 => "image_unit4",
    FieldOfView => "mri_field_of_view_pd",
    PatientPosition => "patient_position",
    Visit => "visit",
    DataFile2 => "data_file2",
    DataFile2Type => "data_file2_type",
    BvecFile => "bvecfile",
    BvalFile => "bvalfile",
    BvecBvalFiles => "bvek_bval_files",
    DeviceSerialNumber => "deviceserialnumber",
    ProcDate => "procdate",
    VisNum => "visnum",
    Manifest => "manifest",
    EmissionWavelength => "emission_wavelength",
    ObjectiveMagnification => "objective_magnification",
    ObjectiveNa => "objective_na",
    Immersion => "immersion",
    ExposureTime => "exposure_time",
    CameraSn => "camera_sn",
    BlockNumber => "block_number",
    Level => "level",
    CutThickness => "cut_thickness",
    Stain => "stain",
    StainDetails => "stain_details",
    PipelineStage => "pipeline_stage",
    Deconvolved => "deconvolved",
    DeconSoftware => "decon_software",
    DeconMethod => "decon_method",
    PsfType => "psf_type",
    PsfFile => "psf_file",
    DeconSnr => "decon_snr",
    DeconIterations => "decon_iterations",
    MicroTemplateName => "micro_temmplate_name",
    InStack => "in_stack",
    DeconTemplateName => "decon_template_name",
    Stack => "stack",
    Slices => "slices",
    SliceNumber => "slice_number",
    SliceThickness => "slice_thickness",
    TypeOfMicroscopy => "type_of_microscopy",
}

impl fmt::Display for Image03Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell of an image03 row.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Integer(i64),
    /// Single-precision values read from image headers.
    Float32(f32),
    Float64(f64),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Converts a sidecar value. Strings are taken verbatim, null becomes
    /// empty, and lists are rendered as `[a, b, c]`.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(text) => Self::Text(text.clone()),
            Value::Bool(flag) => Self::Text(if *flag { "True" } else { "False" }.to_string()),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => Self::Integer(integer),
                None => number.as_f64().map_or(Self::Empty, Self::Float64),
            },
            Value::Array(_) | Value::Object(_) => Self::Text(render_json_inline(value)),
        }
    }

    /// Converts an optional sidecar value, mapping absence to empty.
    pub fn from_optional_json(value: Option<&Value>) -> Self {
        value.map_or(Self::Empty, Self::from_json)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float32(value) => write_decimal(f, *value, value.fract() == 0.0),
            Self::Float64(value) => write_decimal(f, *value, value.fract() == 0.0),
        }
    }
}

fn write_decimal<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    value: T,
    integral: bool,
) -> fmt::Result {
    if integral {
        write!(f, "{value:.1}")
    } else {
        write!(f, "{value}")
    }
}

fn render_json_inline(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(render_json_inline).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::String(text) => format!("'{text}'"),
        Value::Object(_) => value.to_string(),
        other => FieldValue::from_json(other).to_string(),
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Text(value.to_string()), Self::Integer)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float32(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float64(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// One image03 row. Every column is always present, in dictionary order;
/// columns that do not apply hold [`FieldValue::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct NdaRecord {
    values: Vec<FieldValue>,
}

impl Default for NdaRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl NdaRecord {
    pub fn new() -> Self {
        Self {
            values: vec![FieldValue::Empty; Image03Field::ALL.len()],
        }
    }

    pub fn set(&mut self, field: Image03Field, value: impl Into<FieldValue>) {
        self.values[field as usize] = value.into();
    }

    pub fn get(&self, field: Image03Field) -> &FieldValue {
        &self.values[field as usize]
    }

    /// Rendered text of a column.
    pub fn text(&self, field: Image03Field) -> String {
        self.get(field).to_string()
    }

    /// Column name and value pairs in output order.
    pub fn iter(&self) -> impl Iterator<Item = (Image03Field, &FieldValue)> {
        Image03Field::ALL.iter().copied().zip(self.values.iter())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(|(field, _)| field.as_str())
    }

    /// Rendered cells in output order.
    pub fn to_row(&self) -> Vec<String> {
        self.values.iter().map(ToString::to_string).collect()
    }
}
