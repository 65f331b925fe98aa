/// Export header formatters
///
/// Wraps an extracted file's bytes for two target-machine loaders. Both
/// headers are built from the finished record only; neither participates
/// in image decoding.

use std::io::{self, Write};

use crate::filesystem::FileRecord;

/// Header format prepended to an exported file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportHeader {
    /// Raw bytes only
    None,
    /// Orix loader header
    Orix,
    /// Tape loader header
    Tape,
}

impl ExportHeader {
    /// Parse an export header name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "raw" => Some(ExportHeader::None),
            "orix" => Some(ExportHeader::Orix),
            "tape" => Some(ExportHeader::Tape),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExportHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportHeader::None => write!(f, "raw"),
            ExportHeader::Orix => write!(f, "orix"),
            ExportHeader::Tape => write!(f, "tape"),
        }
    }
}

/// Write a file record with the requested header followed by its bytes
pub fn write_record<W: Write>(
    out: &mut W,
    header: ExportHeader,
    name: &str,
    record: &FileRecord,
) -> io::Result<()> {
    match header {
        ExportHeader::None => {}
        ExportHeader::Orix => write_orix_header(out, record)?,
        ExportHeader::Tape => write_tape_header(out, name, record)?,
    }
    out.write_all(&record.bytes)
}

/// Orix header: magic, cpu mode, os type, reserved bytes, file-type bit,
/// then little-endian start/end/exec addresses
///
/// Only BASIC programs and files with an execution address get a header;
/// anything else exports bare.
fn write_orix_header<W: Write>(out: &mut W, record: &FileRecord) -> io::Result<()> {
    if !record.is_basic() && record.exec_address == 0 {
        return Ok(());
    }

    out.write_all(b"\x01\x00ori\x01")?;
    out.write_all(&[0x00])?; // cpu_mode
    out.write_all(&[0x03])?; // os_type: FTDos
    out.write_all(&[0x00; 5])?; // reserved

    let kind: u8 = if record.is_basic() { 0b0000_0001 } else { 0b0000_0010 };
    out.write_all(&[kind])?;

    out.write_all(&record.load_address.to_le_bytes())?;
    out.write_all(&record.end_address.to_le_bytes())?;
    out.write_all(&record.exec_address.to_le_bytes())?;
    Ok(())
}

/// Tape header: sync bytes, type byte, big-endian end/start addresses,
/// then the length-prefixed filename
fn write_tape_header<W: Write>(out: &mut W, name: &str, record: &FileRecord) -> io::Result<()> {
    out.write_all(&[0x16, 0x16, 0x16, 0x16, 0x24])?;
    out.write_all(&[0xFF, 0xFF])?;
    out.write_all(&[if record.is_basic() { 0x00 } else { 0x80 }])?;
    out.write_all(&[0x00])?;

    out.write_all(&record.end_address.to_be_bytes())?;
    out.write_all(&record.load_address.to_be_bytes())?;

    out.write_all(&[name.len() as u8])?;
    out.write_all(name.as_bytes())?;
    out.write_all(&[0x00])?;
    Ok(())
}
