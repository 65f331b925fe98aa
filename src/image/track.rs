/// Track data structures and the address-mark scanner

use std::collections::BTreeMap;

use log::debug;

use crate::error::{MfmError, Result};
use crate::format::constants::{
    DATA_ADDRESS_MARK, DATA_FIELD_TRAILER, ID_ADDRESS_MARK, ID_FIELD_SKIP,
};
use crate::image::sector::{SectorEntry, SectorId};

/// A decoded disk track: the raw 6400-byte stream plus the sector map
/// recovered from its embedded address marks
#[derive(Debug, Clone)]
pub struct Track {
    /// Physical track number
    pub track_number: u8,
    /// Physical side number (0 or 1)
    pub side_number: u8,
    /// Raw track bytes as stored in the image
    raw: Vec<u8>,
    /// Sector number to recovered field offsets
    sectors: BTreeMap<u8, SectorEntry>,
}

impl Track {
    /// Decode a raw track buffer into a sector map
    pub fn decode(track_number: u8, side_number: u8, raw: Vec<u8>) -> Self {
        let sectors = scan(&raw);
        debug!(
            "track {} side {}: {} sectors recovered",
            track_number,
            side_number,
            sectors.len()
        );
        Self {
            track_number,
            side_number,
            raw,
            sectors,
        }
    }

    /// Get the raw track bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Get a sector's recovered field offsets by sector number
    pub fn get_sector(&self, sector: u8) -> Option<&SectorEntry> {
        self.sectors.get(&sector)
    }

    /// Iterate over recovered sectors in sector-number order
    pub fn sectors(&self) -> impl Iterator<Item = &SectorEntry> {
        self.sectors.values()
    }

    /// Get the number of sectors recovered from this track
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Check if this track contains a sector with the given number
    pub fn has_sector(&self, sector: u8) -> bool {
        self.sectors.contains_key(&sector)
    }

    /// Get list of all recovered sector numbers
    pub fn sector_ids(&self) -> Vec<u8> {
        self.sectors.keys().copied().collect()
    }

    /// Get a sector's data bytes
    ///
    /// The data field starts one byte past the data address mark. A sector
    /// number absent from the map, or present without a recovered data
    /// field, is a corrupt track.
    pub fn sector_data(&self, sector: u8) -> Result<&[u8]> {
        let corrupt = || MfmError::CorruptTrack {
            track: self.track_number,
            sector,
        };

        let entry = self.sectors.get(&sector).ok_or_else(corrupt)?;
        let data_offset = entry.data_offset.ok_or_else(corrupt)?;

        let start = data_offset + 1;
        let end = start + entry.id.size_bytes();
        if end > self.raw.len() {
            // Data mark found but the field runs past the buffer
            return Err(corrupt());
        }

        Ok(&self.raw[start..end])
    }
}

/// Scan a raw track buffer for address marks and build the sector map
///
/// A single cursor moves forward through the buffer, never backtracking.
/// Each ID address mark (0xFE) opens a sector entry; the following data
/// address mark (0xFB) completes it. Another ID mark, or the end of the
/// buffer, leaves the entry without a data field. Duplicate sector numbers
/// overwrite the earlier entry: last scanned wins.
fn scan(raw: &[u8]) -> BTreeMap<u8, SectorEntry> {
    let mut sectors = BTreeMap::new();
    let eot = raw.len();
    let mut pos = 0;

    while pos < eot {
        while pos < eot && raw[pos] != ID_ADDRESS_MARK {
            pos += 1;
        }
        if pos + 4 >= eot {
            // No room left for a complete ID field
            break;
        }

        let id = SectorId::new(raw[pos + 1], raw[pos + 2], raw[pos + 3], raw[pos + 4]);
        let id_offset = pos;
        let data_length = id.size_bytes();

        // Skip the ID field and its check bytes
        pos += ID_FIELD_SKIP;

        while pos < eot && raw[pos] != DATA_ADDRESS_MARK && raw[pos] != ID_ADDRESS_MARK {
            pos += 1;
        }

        if pos >= eot || raw[pos] == ID_ADDRESS_MARK {
            // No data field for this sector; resume at the next ID mark
            sectors.insert(
                id.sector,
                SectorEntry {
                    id,
                    id_offset,
                    data_offset: None,
                },
            );
            continue;
        }

        sectors.insert(
            id.sector,
            SectorEntry {
                id,
                id_offset,
                data_offset: Some(pos),
            },
        );

        // Skip the data field and its trailing bytes
        pos += data_length + DATA_FIELD_TRAILER;
    }

    sectors
}
