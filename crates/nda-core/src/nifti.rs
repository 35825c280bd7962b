//! Minimal NIfTI-1/NIfTI-2 header reader.
//!
//! Only the fields needed for image03 geometry are decoded: dimensions,
//! voxel spacing and the `xyzt_units` byte. Version and byte order are
//! detected from `sizeof_hdr`; gzip input is detected from its magic bytes.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use flate2::read::GzDecoder;
use nda_model::HeaderFacts;

use crate::error::{CoreError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NiftiVersion {
    Nifti1,
    Nifti2,
}

impl NiftiVersion {
    pub const fn header_size(self) -> usize {
        match self {
            Self::Nifti1 => 348,
            Self::Nifti2 => 540,
        }
    }
}

mod offsets_v1 {
    pub const DIM: usize = 40;
    pub const PIXDIM: usize = 76;
    pub const XYZT_UNITS: usize = 123;
    pub const MAGIC: usize = 344;
}

mod offsets_v2 {
    pub const MAGIC: usize = 4;
    pub const DIM: usize = 16;
    pub const PIXDIM: usize = 104;
    pub const XYZT_UNITS: usize = 500;
}

/// Decoded geometry fields of a NIfTI header.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    pub version: NiftiVersion,
    /// `dim[1..=ndim]`.
    pub dims: Vec<i64>,
    /// `pixdim[1..=ndim]`.
    pub pixdims: Vec<f64>,
    pub xyzt_units: u8,
}

impl NiftiHeader {
    /// Decodes a header from its raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        let Some(sizeof_hdr) = bytes.get(0..4) else {
            return Err("file too short to hold a header".to_string());
        };
        let (version, little_endian) = match (
            LittleEndian::read_i32(sizeof_hdr),
            BigEndian::read_i32(sizeof_hdr),
        ) {
            (348, _) => (NiftiVersion::Nifti1, true),
            (_, 348) => (NiftiVersion::Nifti1, false),
            (540, _) => (NiftiVersion::Nifti2, true),
            (_, 540) => (NiftiVersion::Nifti2, false),
            _ => return Err(format!("unrecognized sizeof_hdr bytes {sizeof_hdr:?}")),
        };
        if bytes.len() < version.header_size() {
            return Err(format!(
                "header truncated: got {} bytes, need {}",
                bytes.len(),
                version.header_size()
            ));
        }

        match (version, little_endian) {
            (NiftiVersion::Nifti1, true) => parse_v1::<LittleEndian>(bytes),
            (NiftiVersion::Nifti1, false) => parse_v1::<BigEndian>(bytes),
            (NiftiVersion::Nifti2, true) => parse_v2::<LittleEndian>(bytes),
            (NiftiVersion::Nifti2, false) => parse_v2::<BigEndian>(bytes),
        }
    }

    /// Short name of the spatial unit code.
    pub fn space_unit(&self) -> &'static str {
        match self.xyzt_units & 0x07 {
            1 => "meter",
            2 => "mm",
            3 => "micron",
            _ => "unknown",
        }
    }

    /// Short name of the temporal unit code.
    pub fn time_unit(&self) -> &'static str {
        match self.xyzt_units & 0x38 {
            0x08 => "sec",
            0x10 => "msec",
            0x18 => "usec",
            0x20 => "hz",
            0x28 => "ppm",
            0x30 => "rads",
            _ => "unknown",
        }
    }

    pub fn to_facts(&self) -> HeaderFacts {
        HeaderFacts {
            extents: self
                .dims
                .iter()
                .map(|extent| usize::try_from(*extent).unwrap_or_default())
                .collect(),
            voxel_sizes: self.pixdims.iter().map(|size| *size as f32).collect(),
            space_unit: self.space_unit(),
            time_unit: self.time_unit(),
        }
    }
}

fn check_ndim(ndim: i64) -> std::result::Result<usize, String> {
    match usize::try_from(ndim) {
        Ok(ndim @ 1..=7) => Ok(ndim),
        _ => Err(format!("ndim must be 1..=7, got {ndim}")),
    }
}

#[allow(clippy::wildcard_imports)]
fn parse_v1<E: ByteOrder>(bytes: &[u8]) -> std::result::Result<NiftiHeader, String> {
    use offsets_v1::*;

    let magic = &bytes[MAGIC..MAGIC + 4];
    if magic != b"n+1\0" && magic != b"ni1\0" {
        return Err(format!("bad NIfTI-1 magic {magic:?}"));
    }
    let ndim = check_ndim(i64::from(E::read_i16(&bytes[DIM..DIM + 2])))?;
    let dims = (1..=ndim)
        .map(|axis| {
            let offset = DIM + axis * 2;
            i64::from(E::read_i16(&bytes[offset..offset + 2]))
        })
        .collect();
    let pixdims = (1..=ndim)
        .map(|axis| {
            let offset = PIXDIM + axis * 4;
            f64::from(E::read_f32(&bytes[offset..offset + 4]))
        })
        .collect();
    Ok(NiftiHeader {
        version: NiftiVersion::Nifti1,
        dims,
        pixdims,
        xyzt_units: bytes[XYZT_UNITS],
    })
}

#[allow(clippy::wildcard_imports)]
fn parse_v2<E: ByteOrder>(bytes: &[u8]) -> std::result::Result<NiftiHeader, String> {
    use offsets_v2::*;

    let magic = &bytes[MAGIC..MAGIC + 8];
    if magic != b"n+2\0\r\n\x1a\n" && magic != b"ni2\0\r\n\x1a\n" {
        return Err(format!("bad NIfTI-2 magic {magic:?}"));
    }
    let ndim = check_ndim(E::read_i64(&bytes[DIM..DIM + 8]))?;
    let dims = (1..=ndim)
        .map(|axis| {
            let offset = DIM + axis * 8;
            E::read_i64(&bytes[offset..offset + 8])
        })
        .collect();
    let pixdims = (1..=ndim)
        .map(|axis| {
            let offset = PIXDIM + axis * 8;
            E::read_f64(&bytes[offset..offset + 8])
        })
        .collect();
    Ok(NiftiHeader {
        version: NiftiVersion::Nifti2,
        dims,
        pixdims,
        xyzt_units: bytes[XYZT_UNITS],
    })
}

/// Reads the header of a `.nii` or `.nii.gz` file without touching voxel data.
pub fn read_nifti_header(path: &Path) -> Result<NiftiHeader> {
    let file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let gzipped = reader
        .fill_buf()
        .map_err(|e| CoreError::io(path, e))?
        .starts_with(&GZIP_MAGIC);

    let limit = NiftiVersion::Nifti2.header_size() as u64;
    let mut bytes = Vec::with_capacity(NiftiVersion::Nifti2.header_size());
    if gzipped {
        GzDecoder::new(reader)
            .take(limit)
            .read_to_end(&mut bytes)
            .map_err(|e| CoreError::io(path, e))?;
    } else {
        reader
            .take(limit)
            .read_to_end(&mut bytes)
            .map_err(|e| CoreError::io(path, e))?;
    }

    NiftiHeader::from_bytes(&bytes).map_err(|reason| CoreError::InvalidHeader {
        path: path.to_path_buf(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    use super::*;

    fn v1_header(dims: &[i16], pixdims: &[f32], xyzt_units: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 352];
        LittleEndian::write_i32(&mut buf[0..4], 348);
        LittleEndian::write_i16(&mut buf[40..42], dims.len() as i16);
        for (axis, extent) in dims.iter().enumerate() {
            let offset = 42 + axis * 2;
            LittleEndian::write_i16(&mut buf[offset..offset + 2], *extent);
        }
        for (axis, size) in pixdims.iter().enumerate() {
            let offset = 80 + axis * 4;
            LittleEndian::write_f32(&mut buf[offset..offset + 4], *size);
        }
        buf[123] = xyzt_units;
        buf[344..348].copy_from_slice(b"n+1\0");
        buf
    }

    #[test]
    fn decodes_v1_geometry() {
        let header =
            NiftiHeader::from_bytes(&v1_header(&[64, 64, 30, 120], &[3.0, 3.0, 4.0, 2000.0], 0x12))
                .unwrap();
        assert_eq!(header.version, NiftiVersion::Nifti1);
        assert_eq!(header.dims, vec![64, 64, 30, 120]);
        assert_eq!(header.space_unit(), "mm");
        assert_eq!(header.time_unit(), "msec");
        let facts = header.to_facts();
        assert_eq!(facts.voxel_sizes, vec![3.0, 3.0, 4.0, 2000.0]);
    }

    #[test]
    fn decodes_big_endian_v2_geometry() {
        let mut buf = vec![0u8; 544];
        BigEndian::write_i32(&mut buf[0..4], 540);
        buf[4..12].copy_from_slice(b"n+2\0\r\n\x1a\n");
        BigEndian::write_i64(&mut buf[16..24], 3);
        for (axis, extent) in [176i64, 256, 256].iter().enumerate() {
            let offset = 24 + axis * 8;
            BigEndian::write_i64(&mut buf[offset..offset + 8], *extent);
        }
        for (axis, size) in [1.0f64, 0.9, 0.9].iter().enumerate() {
            let offset = 112 + axis * 8;
            BigEndian::write_f64(&mut buf[offset..offset + 8], *size);
        }
        buf[500] = 0x0a;
        let header = NiftiHeader::from_bytes(&buf).unwrap();
        assert_eq!(header.version, NiftiVersion::Nifti2);
        assert_eq!(header.dims, vec![176, 256, 256]);
        assert_eq!(header.pixdims, vec![1.0, 0.9, 0.9]);
        assert_eq!(header.space_unit(), "mm");
        assert_eq!(header.time_unit(), "sec");
    }

    #[test]
    fn rejects_bad_magic_and_short_input() {
        let mut buf = v1_header(&[4, 4, 4], &[1.0, 1.0, 1.0], 0x02);
        buf[344..348].copy_from_slice(b"xxxx");
        assert!(NiftiHeader::from_bytes(&buf).is_err());
        assert!(NiftiHeader::from_bytes(&[0x5c, 0x01]).is_err());
    }

    #[test]
    fn reads_gzipped_and_plain_files() {
        let dir = TempDir::new().unwrap();
        let bytes = v1_header(&[10, 12, 14], &[1.0, 1.0, 1.5], 0x02);

        let plain = dir.path().join("sub-01_T1w.nii");
        std::fs::write(&plain, &bytes).unwrap();
        assert_eq!(read_nifti_header(&plain).unwrap().dims, vec![10, 12, 14]);

        let gz = dir.path().join("sub-01_T2w.nii.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        std::fs::write(&gz, encoder.finish().unwrap()).unwrap();
        assert_eq!(read_nifti_header(&gz).unwrap().pixdims, vec![1.0, 1.0, 1.5]);
    }
}
