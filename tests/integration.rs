/// Integration tests for mfmmanager

use std::collections::HashMap;
use std::io::Write;

use mfmmanager::format::{MFM_DISK_SIGNATURE, RAW_TRACK_SIZE, SECTOR_SIZE};
use mfmmanager::*;
use tempfile::NamedTempFile;

/// Sectors laid down on every synthetic track
const SECTORS_PER_TRACK: u8 = 17;

/// Builds synthetic MFM_DISK images: every track carries sectors 1..=17
/// with hand-placed ID and data address marks; individual sector contents
/// are overridden per test.
struct ImageBuilder {
    sides: u32,
    tracks: u32,
    overrides: HashMap<(u8, u8, u8), Vec<u8>>,
}

impl ImageBuilder {
    fn new(sides: u32, tracks: u32) -> Self {
        Self {
            sides,
            tracks,
            overrides: HashMap::new(),
        }
    }

    /// Set the data of a side-0 sector; short data is zero-padded
    fn set_sector(&mut self, track: u8, sector: u8, data: &[u8]) -> &mut Self {
        assert!(data.len() <= SECTOR_SIZE);
        let mut padded = data.to_vec();
        padded.resize(SECTOR_SIZE, 0);
        self.overrides.insert((0, track, sector), padded);
        self
    }

    fn write(&self) -> NamedTempFile {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MFM_DISK_SIGNATURE);
        bytes.extend_from_slice(&self.sides.to_le_bytes());
        bytes.extend_from_slice(&self.tracks.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.resize(0x100, 0);

        let zeroes = vec![0u8; SECTOR_SIZE];
        for side in 0..self.sides as u8 {
            for track in 0..self.tracks as u8 {
                let mut raw = vec![0x4E; 32];
                for sector in 1..=SECTORS_PER_TRACK {
                    let data = self
                        .overrides
                        .get(&(side, track, sector))
                        .unwrap_or(&zeroes);

                    raw.extend_from_slice(&[0xFE, track, side, sector, 1, 0, 0]);
                    raw.extend_from_slice(&[0x4E; 12]);
                    raw.push(0xFB);
                    raw.extend_from_slice(data);
                    raw.extend_from_slice(&[0, 0]);
                    raw.extend_from_slice(&[0x4E; 20]);
                }
                raw.resize(RAW_TRACK_SIZE, 0x4E);
                bytes.extend_from_slice(&raw);
            }
        }

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&bytes).expect("write image");
        file
    }
}

/// An image that passes the FTDOS probe: bitmap markers on track 20
/// sector 1, a volume name, and an empty catalog head at sector 2
fn ftdos_image() -> ImageBuilder {
    let mut builder = ImageBuilder::new(1, 42);
    builder.set_sector(20, 1, &bitmap_sector(b"TESTDISK"));
    builder.set_sector(20, 2, &catalog_sector((0, 0), (0xFF, 0x00), &[]));
    builder
}

/// Bitmap sector: DOS marker pair at 246..248, volume name in the last
/// eight bytes
fn bitmap_sector(volume: &[u8; 8]) -> Vec<u8> {
    let mut data = vec![0u8; SECTOR_SIZE];
    data[246] = 0x80;
    data[247] = 0x80;
    data[248..].copy_from_slice(volume);
    data
}

/// Catalog sector: own address, next-sector link, then 18-byte entry
/// records; unused slots are wiped to 0xFF
fn catalog_sector(own: (u8, u8), next: (u8, u8), entries: &[[u8; 18]]) -> Vec<u8> {
    assert!(entries.len() <= 14);
    let mut data = vec![0xFF; SECTOR_SIZE];
    data[0] = own.0;
    data[1] = own.1;
    data[2] = next.0;
    data[3] = next.1;
    for (i, entry) in entries.iter().enumerate() {
        let offset = 4 + i * 18;
        data[offset..offset + 18].copy_from_slice(entry);
    }
    data
}

/// 18-byte directory entry record
fn dir_entry(name: &str, ext: &str, track: u8, sector: u8, blocks: u16) -> [u8; 18] {
    assert!(name.len() <= 8 && ext.len() <= 3);
    let mut record = [0u8; 18];
    record[0] = track;
    record[1] = sector;
    record[2] = b' ';
    record[3..15].fill(b' ');
    record[3..3 + name.len()].copy_from_slice(name.as_bytes());
    record[12..12 + ext.len()].copy_from_slice(ext.as_bytes());
    record[15] = b'S';
    record[16..18].copy_from_slice(&blocks.to_le_bytes());
    record
}

/// FCB sector: next-FCB link, optional load/size header (first FCB only),
/// data-block pair list terminated with 0xFF
fn fcb_sector(next: (u8, u8), header: Option<(u16, u16)>, pairs: &[(u8, u8)]) -> Vec<u8> {
    let mut data = vec![0u8; SECTOR_SIZE];
    data[0] = next.0;
    data[1] = next.1;
    if let Some((load, size)) = header {
        data[2..4].copy_from_slice(&load.to_le_bytes());
        data[4..6].copy_from_slice(&size.to_le_bytes());
    }
    data[6..].fill(0xFF);
    for (i, &(track, sector)) in pairs.iter().enumerate() {
        data[6 + i * 2] = track;
        data[6 + i * 2 + 1] = sector;
    }
    data
}

#[test]
fn test_open_and_mount() {
    let file = ftdos_image().write();

    let image = MfmImage::open(file.path()).expect("open image");
    assert_eq!(image.header().sides, 1);
    assert_eq!(image.header().tracks, 42);

    let fs = FtdosFileSystem::mount(&image).expect("mount filesystem");
    assert_eq!(fs.sectors_per_track(), 17);
    assert!(fs.catalog().is_empty());
    assert_eq!(fs.disk_name().unwrap(), "TESTDISK");
}

#[test]
fn test_round_trip_single_fcb() {
    let n = 700usize;
    let content: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();

    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector((0, 0), (0xFF, 0x00), &[dir_entry("DATA", "BIN", 1, 1, 3)]),
    );
    builder.set_sector(
        1,
        1,
        &fcb_sector((0xFF, 0x00), Some((0x8000, n as u16)), &[(2, 1), (2, 2), (2, 3)]),
    );
    builder.set_sector(2, 1, &content[..256]);
    builder.set_sector(2, 2, &content[256..512]);
    builder.set_sector(2, 3, &content[512..]);

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let entry = fs.get("DATA.BIN").expect("catalog entry");
    assert_eq!(entry.content, ContentKind::Executable);

    let record = fs.read_file("DATA.BIN").unwrap();
    assert_eq!(record.bytes, content);
    assert_eq!(record.size, n as u16);
    assert_eq!(record.load_address, 0x8000);
    assert_eq!(record.end_address, 0x8000 + n as u16);
    // BIN files execute at their load address
    assert_eq!(record.exec_address, 0x8000);
    assert_eq!(record.file_type, 0x40);
}

#[test]
fn test_round_trip_multiple_fcbs() {
    let content: Vec<u8> = (0..512).map(|i| (i / 2) as u8).collect();

    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector((0, 0), (0xFF, 0x00), &[dir_entry("SPLIT", "DAT", 1, 1, 2)]),
    );
    // Chain of two FCBs, one data block each
    builder.set_sector(1, 1, &fcb_sector((1, 2), Some((0x5000, 512)), &[(2, 1)]));
    builder.set_sector(1, 2, &fcb_sector((0xFF, 0x00), None, &[(2, 2)]));
    builder.set_sector(2, 1, &content[..256]);
    builder.set_sector(2, 2, &content[256..]);

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let record = fs.read_file("SPLIT.DAT").unwrap();
    assert_eq!(record.bytes, content);
    assert_eq!(record.exec_address, 0);
    assert_eq!(record.file_type, 0x40);
}

#[test]
fn test_ary_size_correction() {
    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector((0, 0), (0xFF, 0x00), &[dir_entry("FOO", "ARY", 1, 1, 1)]),
    );
    builder.set_sector(1, 1, &fcb_sector((0xFF, 0x00), Some((0x9800, 5)), &[(2, 1)]));
    builder.set_sector(2, 1, &[10, 20, 30, 40, 50, 60, 70, 80]);

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    // Odd array sizes round up by one byte
    let record = fs.read_file("FOO.ARY").unwrap();
    assert_eq!(record.size, 6);
    assert_eq!(record.bytes, vec![10, 20, 30, 40, 50, 60]);
}

#[test]
fn test_scr_size_correction() {
    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector((0, 0), (0xFF, 0x00), &[dir_entry("FOO", "SCR", 1, 1, 6)]),
    );
    builder.set_sector(1, 1, &fcb_sector((0xFF, 0x00), Some((0xA000, 6)), &[(2, 1)]));
    builder.set_sector(2, 1, &[1, 2, 3, 4, 5, 6, 7, 8]);

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let entry = fs.get("FOO.SCR").unwrap();
    assert_eq!(entry.content, ContentKind::LoScreen);

    // Screen sizes always gain one byte
    let record = fs.read_file("FOO.SCR").unwrap();
    assert_eq!(record.size, 7);
    assert_eq!(record.bytes.len(), 7);
}

#[test]
fn test_basic_file_type() {
    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector((0, 0), (0xFF, 0x00), &[dir_entry("GAME", "BAS", 1, 1, 1)]),
    );
    builder.set_sector(1, 1, &fcb_sector((0xFF, 0x00), Some((0x0501, 100)), &[(2, 1)]));

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let record = fs.read_file("GAME.BAS").unwrap();
    assert_eq!(record.file_type, 0x80);
    assert_eq!(record.exec_address, 0);
    assert!(record.is_basic());
}

#[test]
fn test_fcb_chain_cycle_detected() {
    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector((0, 0), (0xFF, 0x00), &[dir_entry("LOOP", "DAT", 1, 1, 1)]),
    );
    // Two FCBs pointing at each other
    builder.set_sector(1, 1, &fcb_sector((1, 2), Some((0x5000, 100)), &[(2, 1)]));
    builder.set_sector(1, 2, &fcb_sector((1, 1), None, &[(2, 2)]));

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let err = fs.read_file("LOOP.DAT").unwrap_err();
    assert!(matches!(
        err,
        MfmError::ChainCorrupt {
            track: 1,
            sector: 1
        }
    ));
}

#[test]
fn test_catalog_cycle_detected() {
    let mut builder = ftdos_image();
    builder.set_sector(20, 2, &catalog_sector((0, 0), (20, 3), &[]));
    builder.set_sector(20, 3, &catalog_sector((20, 3), (20, 2), &[]));

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();

    let err = FtdosFileSystem::mount(&image).unwrap_err();
    assert!(matches!(
        err,
        MfmError::CatalogCorrupt {
            track: 20,
            sector: 2
        }
    ));
}

#[test]
fn test_catalog_excludes_deleted_entries() {
    let mut deleted = dir_entry("GONE", "TXT", 1, 3, 1);
    deleted[0] = 0xFF;

    let mut builder = ftdos_image();
    builder.set_sector(
        20,
        2,
        &catalog_sector(
            (0, 0),
            (0xFF, 0x00),
            &[deleted, dir_entry("KEEP", "TXT", 1, 1, 1)],
        ),
    );

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    assert_eq!(fs.catalog().len(), 1);
    assert!(fs.get("KEEP.TXT").is_some());
    assert!(fs.get("GONE.TXT").is_none());
    assert!(fs.catalog().values().all(|e| e.first_fcb_track != 0xFF));
}

#[test]
fn test_unsupported_dos_probe() {
    let mut builder = ImageBuilder::new(1, 42);
    let mut bitmap = bitmap_sector(b"SOMEDISK");
    bitmap[246] = 0x12;
    bitmap[247] = 0x34;
    builder.set_sector(20, 1, &bitmap);
    builder.set_sector(20, 2, &catalog_sector((0, 0), (0xFF, 0x00), &[]));

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();

    let err = FtdosFileSystem::mount(&image).unwrap_err();
    match err {
        MfmError::UnsupportedDos { probed } => assert_eq!(probed, vec![0x12, 0x34]),
        other => panic!("expected UnsupportedDos, got {other:?}"),
    }
}

#[test]
fn test_boot_sector_synthesized() {
    let boot: Vec<u8> = (0..=255).collect();

    let mut builder = ftdos_image();
    builder.set_sector(0, 1, &boot);

    let file = builder.write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    // Not a catalog entry, served from track 0 sector 1 regardless
    assert!(fs.get("BOOTSECT.BIN").is_none());
    let record = fs.read_file("BOOTSECT.BIN").unwrap();
    assert_eq!(record.bytes, boot);
    assert_eq!(record.load_address, 0x0400);
    assert_eq!(record.end_address, 0x0500);
    assert_eq!(record.exec_address, 0);
}

#[test]
fn test_system_image_recipe() {
    let file = ftdos_image().write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    // Tracks 4-6 (first from sector 3) plus 11 sectors of track 7
    let record = fs.read_file("FTDOS3-2.SYS").unwrap();
    assert_eq!(record.bytes.len(), (15 + 17 + 17 + 11) * 256);
    assert_eq!(record.load_address, 0xC000);
    assert_eq!(record.exec_address, 0xD4F8);
    assert_eq!(record.file_type, 0x40);
}

#[test]
fn test_file_not_found() {
    let file = ftdos_image().write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let err = fs.read_file("MISSING.BAS").unwrap_err();
    assert!(matches!(err, MfmError::FileNotFound(name) if name == "MISSING.BAS"));
}

#[test]
fn test_bitmap_sector_round_trip() {
    let file = ftdos_image().write();
    let image = MfmImage::open(file.path()).unwrap();
    let fs = FtdosFileSystem::mount(&image).unwrap();

    let raw = fs.bitmap_sector().unwrap();
    assert_eq!(raw.len(), 256);
    assert_eq!(&raw[246..248], &[0x80, 0x80]);

    let rows = map::decode_bitmap(&raw, 42, 1);
    assert_eq!(rows.len(), 42);
}
