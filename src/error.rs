use thiserror::Error;

/// Result type alias for MFM image operations
pub type Result<T> = std::result::Result<T, MfmError>;

/// Errors that can occur when working with MFM_DISK images
#[derive(Debug, Error)]
pub enum MfmError {
    /// I/O error occurred while opening or reading the image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the MFM_DISK signature
    #[error("Invalid image signature: {found:02X?}")]
    InvalidSignature {
        /// The bytes actually read where the signature was expected
        found: Vec<u8>,
    },

    /// The DOS identification probe did not recognise an FTDOS catalog
    #[error("Unsupported DOS: probe bytes {probed:02X?}")]
    UnsupportedDos {
        /// The raw marker bytes read by the probe
        probed: Vec<u8>,
    },

    /// Track or side outside the geometry declared in the image header
    #[error("Invalid track {track} on side {side} (tracks: {tracks}, sides: {sides})")]
    InvalidTrack {
        /// Side number
        side: u8,
        /// Track number
        track: u8,
        /// Track count from the image header
        tracks: u32,
        /// Side count from the image header
        sides: u32,
    },

    /// A sector is missing from the track's decoded map, or its data
    /// address mark was never found
    #[error("Corrupt track {track}: sector {sector} has no usable data field")]
    CorruptTrack {
        /// Track number
        track: u8,
        /// Sector number
        sector: u8,
    },

    /// The catalog sector chain revisited a sector it had already walked
    #[error("Corrupt catalog: sector chain revisits track {track} sector {sector}")]
    CatalogCorrupt {
        /// Track number of the revisited sector
        track: u8,
        /// Sector number of the revisited sector
        sector: u8,
    },

    /// A file's FCB chain revisited a sector it had already walked
    #[error("Corrupt file chain: FCB chain revisits track {track} sector {sector}")]
    ChainCorrupt {
        /// Track number of the revisited FCB sector
        track: u8,
        /// Sector number of the revisited FCB sector
        sector: u8,
    },

    /// File not found in the catalog
    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl MfmError {
    /// Create an invalid-signature error from the bytes actually read
    pub fn invalid_signature(found: &[u8]) -> Self {
        MfmError::InvalidSignature {
            found: found.to_vec(),
        }
    }

    /// Create an unsupported-DOS error from the probed marker bytes
    pub fn unsupported_dos(probed: &[u8]) -> Self {
        MfmError::UnsupportedDos {
            probed: probed.to_vec(),
        }
    }
}
