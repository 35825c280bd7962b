//! Per-scan metadata archives.
//!
//! Each archive holds the scan's merged sidecar as pretty-printed JSON with
//! sorted keys and non-ASCII characters written as `\uXXXX` escapes, plus
//! the task events table for functional runs. Entries are
//! stamped with a fixed modification time so re-running a conversion
//! rewrites byte-identical archives.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use nda_model::{Image03Field, MergedMetadata, NdaRecord, Scan};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use sha2::Digest;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::companions::{BOLD_SUFFIX, Companions, DWI_SUFFIX, events_member_name};
use crate::error::{CoreError, Result};

pub const ARCHIVE_EXTENSION: &str = ".metadata.zip";
/// Value of `data_file2_type` for rows that reference an archive.
pub const METADATA_ARCHIVE_TYPE: &str =
    "ZIP file with additional metadata from Brain Imaging Data Structure (http://bids.neuroimaging.io)";

const JSON_INDENT: &[u8] = b"    ";

/// An archive written for one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOutcome {
    pub path: PathBuf,
    /// Member names in write order.
    pub members: Vec<String>,
    /// SHA-256 of the metadata JSON member.
    pub metadata_sha256: String,
}

/// Archives are written when there is metadata to carry, and always for
/// functional and diffusion scans.
pub fn needs_archive(scan: &Scan, metadata: &MergedMetadata) -> bool {
    !metadata.is_empty() || scan.suffix == BOLD_SUFFIX || scan.suffix == DWI_SUFFIX
}

pub fn archive_name(scan: &Scan) -> String {
    format!("{}{ARCHIVE_EXTENSION}", scan.stem())
}

/// Serializes metadata with four-space indentation, sorted keys and
/// ASCII-only output.
pub fn metadata_json(metadata: &MergedMetadata) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = AsciiFormatter(PrettyFormatter::with_indent(JSON_INDENT));
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    metadata.as_map().serialize(&mut serializer)?;
    Ok(buffer)
}

/// Pretty formatter that escapes every non-ASCII character as UTF-16
/// `\uXXXX` units.
struct AsciiFormatter<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiFormatter<'_> {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        let mut units = [0u16; 2];
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            if ch.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..index])?;
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = index + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + Write,
    {
        self.0.end_object_value(writer)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(sha2::Sha256::digest(bytes))
}

/// Writes the archive for `scan` into `output_dir` when one is needed.
pub fn package_artifacts(
    output_dir: &Path,
    scan: &Scan,
    metadata: &MergedMetadata,
    companions: &Companions,
) -> Result<Option<ArchiveOutcome>> {
    if !needs_archive(scan, metadata) {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir).map_err(|e| CoreError::io(output_dir, e))?;
    let path = output_dir.join(archive_name(scan));

    let json = metadata_json(metadata).map_err(|e| CoreError::MetadataSerialize {
        path: scan.path.clone(),
        source: e,
    })?;
    let mut members = vec![(format!("{}.json", scan.stem()), json)];
    if let Some(events) = &companions.events {
        let contents = std::fs::read(events).map_err(|e| CoreError::io(events, e))?;
        members.push((events_member_name(scan), contents));
    }

    write_archive(&path, &members)?;
    let outcome = ArchiveOutcome {
        metadata_sha256: sha256_hex(&members[0].1),
        members: members.into_iter().map(|(name, _)| name).collect(),
        path,
    };
    debug!(
        archive = %outcome.path.display(),
        members = outcome.members.len(),
        metadata_sha256 = %outcome.metadata_sha256,
        "wrote metadata archive"
    );
    Ok(Some(outcome))
}

fn write_archive(path: &Path, members: &[(String, Vec<u8>)]) -> Result<()> {
    let archive_error = |source| CoreError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|e| CoreError::io(path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());
    for (name, contents) in members {
        zip.start_file(name.as_str(), options).map_err(archive_error)?;
        zip.write_all(contents).map_err(|e| CoreError::io(path, e))?;
    }
    let mut writer = zip.finish().map_err(archive_error)?;
    writer.flush().map_err(|e| CoreError::io(path, e))?;
    Ok(())
}

/// Fills the archive columns of a record.
pub fn record_archive(record: &mut NdaRecord, outcome: Option<&ArchiveOutcome>) {
    if let Some(outcome) = outcome {
        record.set(Image03Field::DataFile2, outcome.path.display().to_string());
        record.set(Image03Field::DataFile2Type, METADATA_ARCHIVE_TYPE);
    }
}
