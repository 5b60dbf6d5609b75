//! Emulated optical drive built on the `imgfile` sector engine
//!
//! [`drive::Drive`] follows the media in and out of the slot, owns the
//! [`imgfile::session::MediaSession`] for whatever image is currently loaded, and answers host
//! commands against it.

pub mod catalog;
pub mod cdda;
pub mod drive;
pub mod media;

use imgfile::InitError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("No usable media inserted")]
    NoMedia,
    #[error("No image numbered {number} found on the media")]
    ImageNotFound { number: u32 },
    #[error("Error opening image '{name}': {source}")]
    ImageOpen {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Error loading image: {0}")]
    Init(#[from] InitError),
    #[error("Invalid image name pattern: {0}")]
    Catalog(#[from] regex::Error),
}

pub type DriveResult<T> = Result<T, DriveError>;
