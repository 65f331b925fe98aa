/// MFM image data structures

/// Sector definitions
pub mod sector;
/// Track definition and the address-mark scanner
pub mod track;

pub use sector::{SectorEntry, SectorId};
pub use track::Track;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{MfmError, Result};
use crate::format::constants::{MFM_DISK_SIGNATURE, RAW_TRACK_SIZE, SIGNATURE_SIZE};
use crate::format::ImageHeader;

/// An opened MFM_DISK image
///
/// Holds the validated path and the geometry read once from the fixed
/// header region. Track reads are not cached: every call re-reads the raw
/// bytes from the file and re-runs the address-mark scan.
#[derive(Debug, Clone)]
pub struct MfmImage {
    /// Path of the validated image file
    path: PathBuf,
    /// Geometry from the image header
    header: ImageHeader,
}

impl MfmImage {
    /// Open an MFM_DISK image file
    ///
    /// Validates the 8-byte signature and reads the three geometry fields
    /// that follow it. A file that cannot be opened or read is an I/O
    /// error; a readable file with the wrong leading bytes is an invalid
    /// signature carrying the bytes actually read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;

        let mut signature = Vec::with_capacity(SIGNATURE_SIZE);
        file.by_ref()
            .take(SIGNATURE_SIZE as u64)
            .read_to_end(&mut signature)?;
        if signature != MFM_DISK_SIGNATURE {
            return Err(MfmError::invalid_signature(&signature));
        }

        let mut geometry = [0u8; 12];
        file.read_exact(&mut geometry)?;
        let header = ImageHeader::parse(&geometry);

        Ok(Self { path, header })
    }

    /// Get the geometry read from the image header
    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// Get the path of the image file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode one track
    ///
    /// Fails fast on a track/side outside the declared geometry before any
    /// file offset is computed.
    pub fn read_track(&self, track: u8, side: u8) -> Result<Track> {
        if !self.header.contains(track, side) {
            return Err(MfmError::InvalidTrack {
                side,
                track,
                tracks: self.header.tracks,
                sides: self.header.sides,
            });
        }

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.header.track_offset(track, side)))?;

        let mut raw = vec![0u8; RAW_TRACK_SIZE];
        file.read_exact(&mut raw)?;

        Ok(Track::decode(track, side, raw))
    }
}
