/// MFM_DISK format constants and image geometry

/// Format constants
pub mod constants;

pub use constants::*;

/// Disk geometry read from the fixed image header
///
/// The three fields follow the signature as little-endian u32 values and
/// are read exactly once when the image is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Number of sides (1 or 2)
    pub sides: u32,
    /// Number of tracks per side
    pub tracks: u32,
    /// Sector layout code
    pub geometry: u32,
}

impl ImageHeader {
    /// Parse the geometry fields from the 12 bytes following the signature
    pub fn parse(raw: &[u8; 12]) -> Self {
        Self {
            sides: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]),
            tracks: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
            geometry: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
        }
    }

    /// Check whether a track/side pair lies inside the declared geometry
    pub fn contains(&self, track: u8, side: u8) -> bool {
        (track as u32) < self.tracks && (side as u32) < self.sides
    }

    /// Byte offset of a track's raw data in the image file
    ///
    /// Track data for track T, side S begins at
    /// `DATA_OFFSET + (S * tracks + T) * RAW_TRACK_SIZE`.
    pub fn track_offset(&self, track: u8, side: u8) -> u64 {
        DATA_OFFSET + (side as u64 * self.tracks as u64 + track as u64) * RAW_TRACK_SIZE as u64
    }
}
