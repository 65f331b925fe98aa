/// FTDOS filesystem implementation

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};

use crate::error::{MfmError, Result};
use crate::filesystem::{ContentKind, DirEntry, FileRecord};
use crate::format::constants::{
    BITMAP_SECTOR, CATALOG_FIRST_SECTOR, CHAIN_END_TRACK, DIR_ENTRIES_OFFSET,
    DIR_ENTRIES_PER_SECTOR, DIR_ENTRY_SIZE, FCB_PAIRS_END, FCB_PAIRS_OFFSET, SECTOR_SIZE,
    SYSTEM_TRACK,
};
use crate::image::{MfmImage, Track};

/// FTDOS marker byte-pairs accepted by the DOS identification probe
const DOS_MARKERS: [[u8; 2]; 2] = [[0x80, 0x80], [0x80, 0x4D]];

/// Load address of the system image files
const SYSTEM_LOAD_ADDRESS: u16 = 0xC000;

/// Execution address of the system image files
const SYSTEM_EXEC_ADDRESS: u16 = 0xD4F8;

/// Load address of the boot sector
const BOOT_LOAD_ADDRESS: u16 = 0x0400;

/// Fixed extraction recipe for a file that bypasses the catalog
#[derive(Debug, Clone, Copy)]
enum SpecialFile {
    /// System image rebuilt from a fixed track range
    SystemImage {
        /// First track of the range
        start_track: u8,
    },
    /// Boot sector taken straight from track 0 sector 1
    BootSector,
}

/// Filenames served by a fixed recipe instead of an FCB chain
///
/// Start track 0 would select the ROM 1.1 layout; the DOS images shipped
/// on FTDOS disks use the ROM 1.0 layout at track 4.
fn special_file(name: &str) -> Option<SpecialFile> {
    match name {
        "FTDOS3-2.SYS" | "TDOS2-26.SYS" => Some(SpecialFile::SystemImage { start_track: 4 }),
        "BOOTSECT.BIN" => Some(SpecialFile::BootSector),
        _ => None,
    }
}

/// FTDOS filesystem mounted on an MFM_DISK image
///
/// Mounting runs the DOS identification probe and reads the whole catalog
/// chain; file contents are materialised on demand.
#[derive(Debug)]
pub struct FtdosFileSystem<'a> {
    image: &'a MfmImage,
    /// Sectors per track, counted on the system track during the probe
    sectors_per_track: u8,
    catalog: BTreeMap<String, DirEntry>,
}

impl<'a> FtdosFileSystem<'a> {
    /// Mount the FTDOS filesystem from an opened image
    pub fn mount(image: &'a MfmImage) -> Result<Self> {
        let sectors_per_track = Self::probe(image)?;
        let catalog = Self::read_catalog(image)?;

        debug!(
            "mounted FTDOS: {} sectors/track, {} catalog entries",
            sectors_per_track,
            catalog.len()
        );

        Ok(Self {
            image,
            sectors_per_track,
            catalog,
        })
    }

    /// DOS identification probe
    ///
    /// Checks the marker byte-pair at the end of the bitmap sector and the
    /// zeroed own-address of the catalog head sector, then takes the
    /// per-track sector count from the system track's decoded map.
    fn probe(image: &MfmImage) -> Result<u8> {
        let track = image.read_track(SYSTEM_TRACK, 0)?;

        let bitmap = full_sector(&track, BITMAP_SECTOR)?;
        let marker = &bitmap[246..248];
        if !DOS_MARKERS.iter().any(|m| &m[..] == marker) {
            return Err(MfmError::unsupported_dos(marker));
        }

        let head = full_sector(&track, CATALOG_FIRST_SECTOR)?;
        if head[0..2] != [0x00, 0x00] {
            return Err(MfmError::unsupported_dos(&head[0..2]));
        }

        Ok(track.sector_count() as u8)
    }

    /// Walk the catalog sector chain and parse every live entry record
    fn read_catalog(image: &MfmImage) -> Result<BTreeMap<String, DirEntry>> {
        let mut entries = BTreeMap::new();
        let mut visited = HashSet::new();

        let mut track_no = SYSTEM_TRACK;
        let mut sector_no = CATALOG_FIRST_SECTOR;

        // {0xFF, _} marks the last catalog sector, {_, 0x00} an empty catalog
        while track_no != CHAIN_END_TRACK && sector_no != 0x00 {
            if !visited.insert((track_no, sector_no)) {
                return Err(MfmError::CatalogCorrupt {
                    track: track_no,
                    sector: sector_no,
                });
            }

            let track = image.read_track(track_no, 0)?;
            let cat = full_sector(&track, sector_no)?;

            // Own-address consistency marker; the head sector holds {0, 0}
            if cat[0] != 0 && (cat[0], cat[1]) != (track_no, sector_no) {
                warn!(
                    "catalog sector {}/{} claims to be {}/{}",
                    track_no, sector_no, cat[0], cat[1]
                );
            }

            for i in 0..DIR_ENTRIES_PER_SECTOR {
                let offset = DIR_ENTRIES_OFFSET + i * DIR_ENTRY_SIZE;
                if let Some(entry) = parse_dir_entry(&cat[offset..offset + DIR_ENTRY_SIZE]) {
                    entries.insert(entry.name.clone(), entry);
                }
            }

            track_no = cat[2];
            sector_no = cat[3];
        }

        Ok(entries)
    }

    /// Get the catalog, keyed by display name
    pub fn catalog(&self) -> &BTreeMap<String, DirEntry> {
        &self.catalog
    }

    /// Look up a catalog entry by display name
    pub fn get(&self, name: &str) -> Option<&DirEntry> {
        self.catalog.get(name)
    }

    /// Sectors per track counted during the probe
    pub fn sectors_per_track(&self) -> u8 {
        self.sectors_per_track
    }

    /// Get the mounted image
    pub fn image(&self) -> &MfmImage {
        self.image
    }

    /// Volume name: the eight trailing bytes of the bitmap sector
    pub fn disk_name(&self) -> Result<String> {
        let track = self.image.read_track(SYSTEM_TRACK, 0)?;
        let bitmap = full_sector(&track, BITMAP_SECTOR)?;
        Ok(String::from_utf8_lossy(&bitmap[SECTOR_SIZE - 8..])
            .trim_end()
            .to_string())
    }

    /// Raw allocation bitmap sector
    pub fn bitmap_sector(&self) -> Result<Vec<u8>> {
        let track = self.image.read_track(SYSTEM_TRACK, 0)?;
        Ok(full_sector(&track, BITMAP_SECTOR)?.to_vec())
    }

    /// Read a file's contents and derive its load/execution metadata
    ///
    /// The special-file table is consulted first; everything else goes
    /// through the catalog and the file's FCB chain.
    pub fn read_file(&self, name: &str) -> Result<FileRecord> {
        match special_file(name) {
            Some(SpecialFile::SystemImage { start_track }) => self.read_system_image(start_track),
            Some(SpecialFile::BootSector) => self.read_boot_sector(),
            None => {
                let entry = self
                    .catalog
                    .get(name)
                    .ok_or_else(|| MfmError::FileNotFound(name.to_string()))?;
                self.read_chain(entry)
            }
        }
    }

    /// Read the sector at track/sector, reusing the cached track when the
    /// chain stays on the same one
    fn read_block(&self, cache: &mut Option<Track>, track_no: u8, sector_no: u8) -> Result<Vec<u8>> {
        if let Some(track) = cache {
            if track.track_number == track_no {
                return Ok(full_sector(track, sector_no)?.to_vec());
            }
        }
        let track = cache.insert(self.image.read_track(track_no, 0)?);
        Ok(full_sector(track, sector_no)?.to_vec())
    }

    /// Follow a file's FCB chain and concatenate its data blocks
    fn read_chain(&self, entry: &DirEntry) -> Result<FileRecord> {
        let ext = name_extension(&entry.raw_name);

        let mut bytes = Vec::new();
        let mut visited = HashSet::new();
        let mut cache: Option<Track> = None;

        let mut fcb_track = entry.first_fcb_track;
        let mut fcb_sector = entry.first_fcb_sector;
        let mut first_fcb = true;
        let mut load_address = 0u16;
        let mut size = 0u16;

        while fcb_track != CHAIN_END_TRACK && fcb_sector != 0x00 {
            if !visited.insert((fcb_track, fcb_sector)) {
                return Err(MfmError::ChainCorrupt {
                    track: fcb_track,
                    sector: fcb_sector,
                });
            }

            let fcb = self.read_block(&mut cache, fcb_track, fcb_sector)?;
            debug!("{}: FCB {}/{}", entry.name, fcb_track, fcb_sector);

            if first_fcb {
                first_fcb = false;
                load_address = u16::from_le_bytes([fcb[2], fcb[3]]);
                size = corrected_size(&ext, u16::from_le_bytes([fcb[4], fcb[5]]));
            }

            let mut n = FCB_PAIRS_OFFSET;
            while n <= FCB_PAIRS_END {
                let (track_no, sector_no) = (fcb[n], fcb[n + 1]);
                if track_no == 0xFF || sector_no == 0xFF {
                    break;
                }
                bytes.extend_from_slice(&self.read_block(&mut cache, track_no, sector_no)?);
                n += 2;
            }

            fcb_track = fcb[0];
            fcb_sector = fcb[1];
        }

        bytes.truncate(size as usize);

        let (file_type, exec_address) = match ext.as_str() {
            "BAS" => (0x80, 0),
            "CMD" | "SYS" | "BIN" => (0x40, load_address),
            _ => (0x40, 0),
        };

        Ok(FileRecord {
            bytes,
            load_address,
            size,
            end_address: load_address.wrapping_add(size),
            exec_address,
            file_type,
        })
    }

    /// Rebuild a system image from its fixed track range: three full
    /// tracks (the first starting at sector 3) plus eleven sectors of the
    /// following track
    fn read_system_image(&self, start_track: u8) -> Result<FileRecord> {
        let mut bytes = Vec::new();

        for track_no in start_track..start_track + 3 {
            let track = self.image.read_track(track_no, 0)?;
            let first_sector = if track_no == start_track { 3 } else { 1 };
            for sector_no in first_sector..=self.sectors_per_track {
                bytes.extend_from_slice(full_sector(&track, sector_no)?);
            }
        }

        let track = self.image.read_track(start_track + 3, 0)?;
        for sector_no in 1..=11 {
            bytes.extend_from_slice(full_sector(&track, sector_no)?);
        }

        let size = bytes.len() as u16;
        Ok(FileRecord {
            bytes,
            load_address: SYSTEM_LOAD_ADDRESS,
            size,
            end_address: SYSTEM_LOAD_ADDRESS.wrapping_add(size),
            exec_address: SYSTEM_EXEC_ADDRESS,
            file_type: 0x40,
        })
    }

    /// Synthesize the boot sector file from track 0 sector 1
    fn read_boot_sector(&self) -> Result<FileRecord> {
        let track = self.image.read_track(0, 0)?;
        let bytes = full_sector(&track, 1)?.to_vec();

        let size = bytes.len() as u16;
        Ok(FileRecord {
            bytes,
            load_address: BOOT_LOAD_ADDRESS,
            size,
            end_address: BOOT_LOAD_ADDRESS.wrapping_add(size),
            exec_address: 0,
            file_type: 0x40,
        })
    }
}

/// Fetch a sector's data and require the full FTDOS sector size
///
/// FTDOS structures are indexed at fixed offsets up to 255; a shorter
/// data field cannot hold them and counts as a corrupt track.
fn full_sector(track: &Track, sector_no: u8) -> Result<&[u8]> {
    let data = track.sector_data(sector_no)?;
    if data.len() < SECTOR_SIZE {
        return Err(MfmError::CorruptTrack {
            track: track.track_number,
            sector: sector_no,
        });
    }
    Ok(data)
}

/// Parse one 18-byte catalog entry record
///
/// Returns None for deleted/unused slots (track byte 0xFF).
fn parse_dir_entry(record: &[u8]) -> Option<DirEntry> {
    if record.len() < DIR_ENTRY_SIZE {
        return None;
    }

    let first_fcb_track = record[0];
    if first_fcb_track == CHAIN_END_TRACK {
        return None;
    }

    let first_fcb_sector = record[1];
    let lock = record[2] as char;

    let mut raw_name = [0u8; 12];
    raw_name.copy_from_slice(&record[3..15]);

    let type_flag = record[15] as char;
    let size_blocks = u16::from_le_bytes([record[16], record[17]]);

    Some(DirEntry {
        name: display_name(&raw_name),
        raw_name,
        first_fcb_track,
        first_fcb_sector,
        lock,
        type_flag,
        size_blocks,
        content: classify(&name_extension(&raw_name), size_blocks),
    })
}

/// Compose the display name: trimmed 8-byte name, `.` + extension only
/// when the extension is non-empty
fn display_name(raw_name: &[u8; 12]) -> String {
    let name = String::from_utf8_lossy(&raw_name[..8]).trim_end().to_string();
    let ext = name_extension(raw_name);

    if ext.is_empty() {
        name
    } else {
        format!("{}.{}", name, ext)
    }
}

/// Trimmed 3-byte extension from the raw name field
fn name_extension(raw_name: &[u8; 12]) -> String {
    String::from_utf8_lossy(&raw_name[9..12]).trim_end().to_string()
}

/// Content classification from the extension; SCR splits on the declared
/// block count
fn classify(ext: &str, size_blocks: u16) -> ContentKind {
    match ext {
        "BAS" => ContentKind::Basic,
        "CMD" | "SYS" | "BIN" => ContentKind::Executable,
        "ARY" => ContentKind::Array,
        "SCR" => {
            if size_blocks == 6 {
                ContentKind::LoScreen
            } else {
                ContentKind::HiScreen
            }
        }
        "DAT" => ContentKind::Data,
        "TXT" => ContentKind::Text,
        _ => ContentKind::Unknown,
    }
}

/// Apply the extension-specific declared-size corrections
///
/// FTDOS-3.2 records array and screen sizes one byte short: arrays round
/// odd sizes up to even, screens always gain one byte.
fn corrected_size(ext: &str, size: u16) -> u16 {
    match ext {
        "ARY" => size + size % 2,
        "SCR" => size + 1,
        _ => size,
    }
}
