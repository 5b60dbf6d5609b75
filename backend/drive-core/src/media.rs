//! Where images come from: a removable medium that can be present or absent

use crate::catalog::ImageCatalog;
use imgfile::device::{BlockDevice, FileBlockDevice};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

pub trait MediaSource {
    type Device: BlockDevice;

    /// Whether a medium is currently in the slot.
    fn is_inserted(&mut self) -> bool;

    /// Open the image the catalog currently points at, or `Ok(None)` if the medium has no such
    /// image.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be listed or the image cannot be opened.
    fn open_image(&mut self, catalog: &ImageCatalog) -> io::Result<Option<Self::Device>>;
}

/// A directory standing in for the root of the medium; the medium is inserted while the directory
/// exists.
#[derive(Debug, Clone)]
pub struct DirectoryMedia {
    root: PathBuf,
}

impl DirectoryMedia {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the image the catalog currently points at, if the directory holds one.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn find_image(&self, catalog: &ImageCatalog) -> io::Result<Option<PathBuf>> {
        let mut matches = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let matches_name =
                entry.file_name().to_str().is_some_and(|name| catalog.matches_current(name));
            if matches_name && entry.file_type()?.is_file() {
                matches.push(entry.path());
            }
        }

        // Directory order is unspecified
        matches.sort();
        if matches.len() > 1 {
            log::warn!(
                "{} files match image number {}; using '{}'",
                matches.len(),
                catalog.current_number(),
                matches[0].display()
            );
        }

        Ok(matches.into_iter().next())
    }
}

impl MediaSource for DirectoryMedia {
    type Device = FileBlockDevice<File>;

    fn is_inserted(&mut self) -> bool {
        self.root.is_dir()
    }

    fn open_image(&mut self, catalog: &ImageCatalog) -> io::Result<Option<Self::Device>> {
        let Some(path) = self.find_image(catalog)? else {
            return Ok(None);
        };

        log::info!("Opening image '{}'", path.display());
        let file = File::open(&path)?;
        FileBlockDevice::new(file).map(Some)
    }
}
