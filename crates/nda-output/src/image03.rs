//! The tab-separated image03 submission table.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};
use nda_model::{Image03Field, NdaRecord};
use tracing::info;

use crate::error::{OutputError, Result};

pub const IMAGE03_FILE: &str = "image03.txt";
/// Data structure short name and version written on the first line.
pub const STRUCTURE_NAME: &str = "image";
pub const STRUCTURE_VERSION: &str = "3";

/// Renders the full table: structure line, column header, then one row per
/// record. Every field is double-quoted.
pub fn render_image03<'a>(
    records: impl IntoIterator<Item = &'a NdaRecord>,
) -> csv::Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record([STRUCTURE_NAME, STRUCTURE_VERSION])?;
    writer.write_record(Image03Field::ALL.iter().copied().map(Image03Field::as_str))?;
    for record in records {
        writer.write_record(record.to_row())?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Writes `image03.txt` into `output_dir`, replacing any previous table.
///
/// The table is written to a temp file and renamed into place so a failed
/// run never leaves a partial table behind.
pub fn write_image03<'a>(
    output_dir: &Path,
    records: impl IntoIterator<Item = &'a NdaRecord>,
) -> Result<PathBuf> {
    let path = output_dir.join(IMAGE03_FILE);
    let bytes = render_image03(records).map_err(|e| OutputError::Csv {
        path: path.clone(),
        source: e,
    })?;

    fs::create_dir_all(output_dir).map_err(|e| OutputError::Io {
        operation: "create directory",
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let temp_path = path.with_extension("txt.tmp");
    let mut file = File::create(&temp_path).map_err(|e| OutputError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    file.write_all(&bytes).map_err(|e| OutputError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;
    file.sync_all().map_err(|e| OutputError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&temp_path, &path).map_err(|e| OutputError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.clone(),
        source: e,
    })?;

    info!(path = %path.display(), bytes = bytes.len(), "wrote image03 table");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_line_precedes_quoted_header() {
        let bytes = render_image03(std::iter::empty()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("\"image\"\t\"3\""));
        let header = lines.next().unwrap();
        assert!(header.starts_with("\"subjectkey\"\t\"src_subject_id\"\t\"interview_date\""));
        assert!(header.ends_with("\"slice_thickness\"\t\"type_of_microscopy\""));
        assert_eq!(header.split('\t').count(), Image03Field::ALL.len());
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_cells_are_quoted_and_rows_end_with_newline() {
        let mut record = NdaRecord::new();
        record.set(Image03Field::SubjectKey, "NDAR_INV0001");
        record.set(Image03Field::ImageDescription, "bold \"rest\"");
        let text = String::from_utf8(render_image03([&record]).unwrap()).unwrap();
        assert!(text.ends_with('\n'));
        assert!(!text.contains('\r'));
        let row = text.lines().nth(2).unwrap();
        let cells: Vec<&str> = row.split('\t').collect();
        assert_eq!(cells.len(), Image03Field::ALL.len());
        assert_eq!(cells[0], "\"NDAR_INV0001\"");
        assert_eq!(cells[1], "\"\"");
        assert_eq!(
            cells[Image03Field::ImageDescription as usize],
            "\"bold \"\"rest\"\"\""
        );
    }
}
