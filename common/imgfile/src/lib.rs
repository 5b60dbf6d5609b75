//! Sector engine for disc images stored on block-addressed removable media
//!
//! An image file holds a header record, one or two TOC blobs, and runs of raw 2352-byte CD
//! sectors. This crate resolves logical sector numbers to image blocks, trims each raw sector down
//! to the sub-fields a host asked for, and hands the result out in transfer-window sized chunks.
//!
//! Sizes are counted in addressable units (2 bytes each) unless a name says otherwise.

pub mod audio;
pub mod cursor;
pub mod device;
pub mod header;
pub mod resolve;
pub mod session;

use std::io;
use thiserror::Error;

pub const BYTES_PER_UNIT: usize = 2;

// Physical blocks on the media are 512 bytes, which is exactly one 256-unit transfer window
pub const BYTES_PER_BLOCK: usize = 512;
pub const UNITS_PER_BLOCK: u16 = 256;

// Data: 12 sync bytes + 4 header bytes + 2048 data bytes + 288 error detection/correction bytes
// Audio: 1176 signed 16-bit PCM samples, half for the left channel and half for the right channel
pub const BYTES_PER_SECTOR: usize = 2352;
pub const UNITS_PER_SECTOR: u16 = (BYTES_PER_SECTOR / BYTES_PER_UNIT) as u16;

pub const TOC_LEN: usize = 408;

/// Disk type byte for CD-ROM XA discs; XA data sectors carry an 8-byte sub-header.
pub const XA_DISK_TYPE: u8 = 0x20;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Image header has invalid magic {0:02X?}")]
    BadMagic([u8; 4]),
    #[error("Image header lists {0} TOCs; expected 1 or 2")]
    BadTocCount(u8),
    #[error(
        "Image header lists {count} regions; at most {max} fit in the header block",
        max = header::MAX_REGIONS
    )]
    BadRegionCount { count: u16 },
    #[error("I/O error reading image header: {0}")]
    ReadFailure(#[source] io::Error),
}

pub type InitResult<T> = Result<T, InitError>;

#[derive(Debug, Error)]
pub enum SeekError {
    #[error("Sector {sector} is not covered by any region of the image")]
    OutOfRange { sector: u32 },
    #[error("Request flags {flags:02X} select a sector class unavailable at sector {sector}")]
    BadMode { sector: u32, flags: u8 },
    #[error("Request flags {flags:02X} neither enable sub-field selection nor request raw sectors")]
    NoFieldsSelected { flags: u8 },
    #[error("I/O error positioning image file: {0}")]
    ReadFailure(#[source] io::Error),
}

pub type SeekResult<T> = Result<T, SeekError>;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error reading image block: {0}")]
    ReadFailure(#[source] io::Error),
}

pub type IoResult<T> = Result<T, IoError>;

impl From<IoError> for SeekError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::ReadFailure(source) => Self::ReadFailure(source),
        }
    }
}
