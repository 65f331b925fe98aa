/*!
# mfmmanager

A Rust library for reading MFM_DISK floppy images with FTDOS filesystem
support.

## Features

- MFM_DISK signature and geometry validation
- Track decoding: sector boundaries recovered from the raw byte stream by
  scanning for embedded address marks
- FTDOS catalog and file extraction, including the FCB chains files are
  scattered across
- Allocation bitmap rendering and export headers for two target loaders

## Quick Start

```rust,no_run
use mfmmanager::{FtdosFileSystem, MfmImage};

// Open and validate an MFM_DISK image
let image = MfmImage::open("disk.dsk")?;

// Mount the FTDOS filesystem
let fs = FtdosFileSystem::mount(&image)?;
for (name, entry) in fs.catalog() {
    println!("{}: {} blocks", name, entry.size_blocks);
}

// Extract a file
let record = fs.read_file("GAME.BAS")?;
println!("{} bytes, load {:04X}", record.bytes.len(), record.load_address);
# Ok::<(), mfmmanager::MfmError>(())
```

## Image format

An MFM_DISK file starts with the 8-byte ASCII signature `MFM_DISK`,
followed by three little-endian u32 geometry fields (sides, tracks,
sector layout code), followed by raw track data: 6400 bytes per track of
MFM-style byte stream with embedded ID (0xFE) and data (0xFB) address
marks. Sector boundaries are not at fixed offsets; they are discovered by
scanning.

## Modules

- `format`: image signature, layout constants and geometry header
- `image`: core image structures (MfmImage, Track, SectorEntry)
- `filesystem`: FTDOS catalog and file reading
- `export`: Orix and tape export headers
- `map`: allocation bitmap visualization
- `error`: error types and Result alias
*/

#![warn(missing_docs)]

/// Error types and Result alias
pub mod error;
/// Export header formatters
pub mod export;
/// FTDOS filesystem implementation
pub mod filesystem;
/// Image signature, layout constants and geometry header
pub mod format;
/// Core image data structures (MfmImage, Track, SectorEntry)
pub mod image;
/// Allocation bitmap visualization
pub mod map;

// Re-export common types
pub use error::{MfmError, Result};
pub use export::ExportHeader;
pub use filesystem::{ContentKind, DirEntry, FileRecord, FtdosFileSystem};
pub use format::ImageHeader;
pub use image::{MfmImage, SectorEntry, SectorId, Track};
