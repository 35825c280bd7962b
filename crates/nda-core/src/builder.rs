//! image03 record synthesis for one scan.
//!
//! The builder is a pure transform: every file lookup (sidecars, header,
//! companions, tabular inputs) happens before it runs, so the same inputs
//! always produce the same record.

use std::path::PathBuf;

use chrono::NaiveDate;
use nda_model::{
    FieldValue, GuidMapping, Image03Field, MergedMetadata, NdaRecord, ParticipantTable, Scan,
    ScanTimingTable, UnitLabel,
};

use crate::companions::{BOLD_SUFFIX, Companions, DWI_SUFFIX};
use crate::error::{CoreError, Result};
use crate::format::{format_general, format_pair};
use crate::header::ScanGeometry;
use crate::orientation::Orientation;

/// NDA scan type for each acquisition suffix.
pub const SCAN_TYPES: &[(&str, &str)] = &[
    ("dwi", "MR diffusion"),
    ("bold", "fMRI"),
    ("sbref", "fMRI"),
    ("T1w", "MR structural (T1)"),
    ("PD", "MR structural (PD)"),
    ("T2w", "MR structural (T2)"),
    ("inplaneT2", "MR structural (T2)"),
    ("FLAIR", "FLAIR"),
    ("FLASH", "MR structural (FLASH)"),
    ("epi", "Field Map"),
    ("phase1", "Field Map"),
    ("phase2", "Field Map"),
    ("phasediff", "Field Map"),
    ("magnitude1", "Field Map"),
    ("magnitude2", "Field Map"),
    ("fieldmap", "Field Map"),
];

pub const SCAN_OBJECT: &str = "Live";
pub const IMAGE_FILE_FORMAT: &str = "NIFTI";
pub const IMAGE_MODALITY: &str = "MRI";
pub const TRANSFORMATION_PERFORMED: &str = "Yes";
pub const TRANSFORMATION_TYPE: &str = "BIDS2NDA";
pub const PATIENT_POSITION: &str = "head first-supine";

const EPI_SUFFIX: &str = "epi";
const EXTENT4_TIME: &str = "time";
const EXTENT4_DIFFUSION: &str = "diffusion weighting";
const ACQ_DATE_FORMAT: &str = "%Y-%m-%d";
const NDA_DATE_FORMAT: &str = "%m/%d/%Y";

/// Metadata keys copied verbatim into the record.
const PASS_THROUGH: &[(Image03Field, &str)] = &[
    (Image03Field::ScannerManufacturer, "Manufacturer"),
    (Image03Field::ScannerType, "ManufacturersModelName"),
    (Image03Field::ScannerSoftwareVersions, "SoftwareVersions"),
    (Image03Field::MagneticFieldStrength, "MagneticFieldStrength"),
    (Image03Field::EchoTime, "EchoTime"),
    (Image03Field::FlipAngle, "FlipAngle"),
    (Image03Field::ReceiveCoil, "ReceiveCoilName"),
    (Image03Field::SliceTiming, "SliceTiming"),
];

/// NDA scan type for a suffix, if it has one.
pub fn scan_type_for(suffix: &str) -> Option<&'static str> {
    SCAN_TYPES
        .iter()
        .find(|(known, _)| *known == suffix)
        .map(|(_, scan_type)| *scan_type)
}

/// Dataset-wide tables consulted for subject-level fields.
#[derive(Debug, Clone, Copy)]
pub struct SubjectLookups<'a> {
    pub guids: &'a GuidMapping,
    pub participants: &'a ParticipantTable,
    /// Timing table covering the scan's subject or session.
    pub timing: Option<&'a ScanTimingTable>,
}

/// Everything needed to build one record.
#[derive(Debug, Clone, Copy)]
pub struct RecordInputs<'a> {
    pub scan: &'a Scan,
    pub metadata: &'a MergedMetadata,
    pub geometry: &'a ScanGeometry,
    pub orientation: Option<Orientation>,
    pub companions: &'a Companions,
    pub lookups: SubjectLookups<'a>,
}

/// Builds the image03 record for one scan. Archive columns are left empty;
/// the packager fills them.
pub fn build_record(inputs: &RecordInputs<'_>) -> Result<NdaRecord> {
    let RecordInputs {
        scan,
        metadata,
        geometry,
        orientation,
        companions,
        lookups,
    } = *inputs;

    let scan_type = scan_type_for(&scan.suffix).ok_or_else(|| CoreError::UnmappedSuffix {
        suffix: scan.suffix.clone(),
        path: scan.path.clone(),
    })?;

    let mut record = NdaRecord::new();
    set_subject_fields(&mut record, scan, lookups)?;

    record.set(Image03Field::ImageFile, scan.path.display().to_string());
    if scan.suffix == BOLD_SUFFIX {
        record.set(
            Image03Field::ExperimentId,
            FieldValue::from_optional_json(metadata.get("ExperimentID")),
        );
    }
    record.set(Image03Field::ImageDescription, image_description(scan, metadata));
    record.set(Image03Field::ScanType, scan_type);
    record.set(Image03Field::ScanObject, SCAN_OBJECT);
    record.set(Image03Field::ImageFileFormat, IMAGE_FILE_FORMAT);
    record.set(Image03Field::ImageModality, IMAGE_MODALITY);
    for (field, key) in PASS_THROUGH {
        record.set(*field, FieldValue::from_optional_json(metadata.get(key)));
    }
    record.set(Image03Field::ImageOrientation, orientation.map(Orientation::as_str));
    record.set(Image03Field::TransformationPerformed, TRANSFORMATION_PERFORMED);
    record.set(Image03Field::TransformationType, TRANSFORMATION_TYPE);

    set_geometry_fields(&mut record, scan, metadata, geometry);

    record.set(Image03Field::PatientPosition, PATIENT_POSITION);
    record.set(Image03Field::Visit, scan.visit());
    set_gradient_fields(&mut record, scan, companions);

    Ok(record)
}

fn set_subject_fields(
    record: &mut NdaRecord,
    scan: &Scan,
    lookups: SubjectLookups<'_>,
) -> Result<()> {
    let guid = lookups
        .guids
        .guid_for(&scan.subject)
        .ok_or_else(|| CoreError::MissingGuid {
            subject: scan.subject.clone(),
        })?;
    let participant = lookups
        .participants
        .get(&scan.subject)
        .ok_or_else(|| CoreError::MissingParticipant {
            subject: scan.subject.clone(),
        })?;
    let timing = lookups.timing.ok_or_else(|| CoreError::MissingTimingTable {
        scan: scan.path.clone(),
    })?;
    let acq_time = timing
        .acquisition_time_for(&scan.path)
        .ok_or_else(|| CoreError::MissingAcquisitionTime {
            scan: scan.path.clone(),
            table: timing.source.clone(),
        })?;
    let interview_date =
        interview_date(acq_time).ok_or_else(|| CoreError::InvalidAcquisitionTime {
            value: acq_time.to_string(),
            scan: scan.path.clone(),
        })?;

    record.set(Image03Field::SubjectKey, guid);
    record.set(Image03Field::SrcSubjectId, scan.src_subject_id());
    record.set(Image03Field::InterviewDate, interview_date);
    record.set(Image03Field::InterviewAge, participant.age_in_months());
    record.set(Image03Field::Gender, participant.sex.as_str());
    Ok(())
}

fn set_geometry_fields(
    record: &mut NdaRecord,
    scan: &Scan,
    metadata: &MergedMetadata,
    geometry: &ScanGeometry,
) {
    let facts = &geometry.facts;
    let constants = metadata.constants();
    let extent = |axis| facts.extent(axis).unwrap_or_default();
    let voxel = |axis| facts.voxel_size(axis).unwrap_or_default();
    let four_d = facts.has_fourth_axis();

    record.set(Image03Field::ImageNumDimensions, facts.num_dimensions());
    record.set(Image03Field::ImageExtent1, extent(0));
    record.set(Image03Field::ImageExtent2, extent(1));
    record.set(Image03Field::ImageExtent3, extent(2));
    record.set(Image03Field::ImageExtent4, facts.extent(3));
    record.set(Image03Field::Extent4Type, extent4_type(&scan.suffix, four_d));
    record.set(
        Image03Field::AcquisitionMatrix,
        format_pair(extent(0) as f64, extent(1) as f64),
    );
    record.set(Image03Field::ImageResolution1, voxel(0));
    record.set(Image03Field::ImageResolution2, voxel(1));
    record.set(Image03Field::ImageResolution3, voxel(2));
    record.set(
        Image03Field::ImageSliceThickness,
        constants
            .get("SliceThickness")
            .map_or(FieldValue::Float32(voxel(2)), FieldValue::from_json),
    );
    record.set(
        Image03Field::PhotometInterpret,
        FieldValue::from_optional_json(constants.get("PhotometricInterpretation")),
    );
    if four_d {
        record.set(Image03Field::ImageResolution4, facts.voxel_size(3));
    }

    let space_label = geometry.space_label.as_str();
    record.set(Image03Field::ImageUnit1, space_label);
    record.set(Image03Field::ImageUnit2, space_label);
    record.set(Image03Field::ImageUnit3, space_label);
    record.set(
        Image03Field::RepetitionTime,
        match geometry.repetition_time {
            Some(seconds) => FieldValue::Float32(seconds),
            None => FieldValue::from_optional_json(metadata.get("RepetitionTime")),
        },
    );
    record.set(
        Image03Field::ImageUnit4,
        geometry.time_label.map(UnitLabel::as_str),
    );
    record.set(
        Image03Field::FieldOfView,
        format!(
            "{} x {} {space_label}",
            format_general(f64::from(voxel(0))),
            format_general(f64::from(voxel(1)))
        ),
    );
}

fn set_gradient_fields(record: &mut NdaRecord, scan: &Scan, companions: &Companions) {
    if scan.suffix != DWI_SUFFIX {
        return;
    }
    let display = |path: Option<&PathBuf>| path.map(|path| path.display().to_string());
    record.set(Image03Field::BvecFile, display(companions.bvec.as_ref()));
    record.set(Image03Field::BvalFile, display(companions.bval.as_ref()));
    record.set(
        Image03Field::BvecBvalFiles,
        if companions.has_gradients() { "Yes" } else { "No" },
    );
}

/// `bold <TaskName>` for functional runs, otherwise the bare suffix.
///
/// A functional run without `TaskName` falls back to the task entity of the
/// file name.
pub fn image_description(scan: &Scan, metadata: &MergedMetadata) -> String {
    if scan.suffix != BOLD_SUFFIX {
        return scan.suffix.clone();
    }
    match metadata.get_str("TaskName").or(scan.task.as_deref()) {
        Some(task) => format!("{BOLD_SUFFIX} {task}"),
        None => BOLD_SUFFIX.to_string(),
    }
}

/// Kind of the fourth axis, if the suffix gives it one.
pub fn extent4_type(suffix: &str, four_d: bool) -> Option<&'static str> {
    match suffix {
        BOLD_SUFFIX => Some(EXTENT4_TIME),
        EPI_SUFFIX if four_d => Some(EXTENT4_TIME),
        DWI_SUFFIX => Some(EXTENT4_DIFFUSION),
        _ => None,
    }
}

/// Converts an ISO 8601 acquisition timestamp to `MM/DD/YYYY`.
pub fn interview_date(acq_time: &str) -> Option<String> {
    let date_part = acq_time.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, ACQ_DATE_FORMAT)
        .ok()
        .map(|date| date.format(NDA_DATE_FORMAT).to_string())
}
