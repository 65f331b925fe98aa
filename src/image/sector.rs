/// Sector data structures

use crate::format::constants::sector_size_bytes;

/// Sector ID field contents - addressing information recovered from the
/// four bytes following an ID address mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorId {
    /// Track number
    pub track: u8,
    /// Side number
    pub side: u8,
    /// Sector number
    pub sector: u8,
    /// Size code (sector length = 128 << code)
    pub size_code: u8,
}

impl SectorId {
    /// Create a new sector ID
    pub fn new(track: u8, side: u8, sector: u8, size_code: u8) -> Self {
        Self {
            track,
            side,
            sector,
            size_code,
        }
    }

    /// Get the sector data length in bytes from the size code
    pub fn size_bytes(&self) -> usize {
        sector_size_bytes(self.size_code)
    }
}

/// Location of one sector's fields inside a raw track buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorEntry {
    /// Sector addressing information from the ID field
    pub id: SectorId,
    /// Offset of the ID address mark in the raw track buffer
    pub id_offset: usize,
    /// Offset of the data address mark, if one was found before the track
    /// buffer ended or another ID mark began
    pub data_offset: Option<usize>,
}

impl SectorEntry {
    /// Check whether a data field was recovered for this sector
    pub fn has_data(&self) -> bool {
        self.data_offset.is_some()
    }
}
