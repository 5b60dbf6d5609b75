//! The emulated drive: media presence, image loading, and the host command interface
//!
//! Everything runs from one cooperative loop: the owner calls [`Drive::service`] repeatedly and
//! forwards host commands in between. The drive is in one of three states:
//!
//! * Empty: nothing in the slot
//! * Unusable: media is present but the image could not be loaded; only removal gets out of this
//! * Ready: an image is loaded and host commands are served from its [`MediaSession`]
//!
//! Removal drops the session, which tears down both sector cursors.

#[cfg(test)]
mod tests;

use crate::catalog::ImageCatalog;
use crate::cdda::CddaPlayer;
use crate::media::MediaSource;
use crate::{DriveError, DriveResult};
use imgfile::cursor::{Chunk, SectorStatus};
use imgfile::header::TableOfContents;
use imgfile::resolve::RequestFlags;
use imgfile::session::MediaSession;

/// Status returned by TOC requests that the loaded image cannot answer.
pub const STATUS_TOC_UNAVAILABLE: u8 = 0x50;

/// Disk type status reported while no usable image is loaded.
pub const DISK_TYPE_NONE: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Inserted { image_number: u32 },
    Removed,
}

enum MediaState<D> {
    Empty,
    Unusable,
    Ready { session: MediaSession<D>, image_number: u32 },
}

pub struct Drive<S: MediaSource> {
    source: S,
    catalog: ImageCatalog,
    media: MediaState<S::Device>,
    cdda: CddaPlayer,
    last_chunk: Option<Chunk>,
}

impl<S: MediaSource> Drive<S> {
    pub fn new(source: S, catalog: ImageCatalog) -> Self {
        Self {
            source,
            catalog,
            media: MediaState::Empty,
            cdda: CddaPlayer::default(),
            last_chunk: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    #[must_use]
    pub fn catalog(&self) -> &ImageCatalog {
        &self.catalog
    }

    /// One pass of the main loop: react to media changes, then keep CDDA playback fed.
    ///
    /// # Errors
    ///
    /// Returns an error if newly inserted media could not be loaded. The drive stays in the
    /// unusable state until the media is removed.
    pub fn service(&mut self) -> DriveResult<Option<MediaEvent>> {
        let event = self.poll()?;
        self.service_cdda();
        Ok(event)
    }

    /// Check for media insertion or removal.
    ///
    /// # Errors
    ///
    /// Returns an error if newly inserted media could not be loaded.
    pub fn poll(&mut self) -> DriveResult<Option<MediaEvent>> {
        let inserted = self.source.is_inserted();
        match (&self.media, inserted) {
            (MediaState::Empty, true) => self.insert().map(Some),
            (MediaState::Unusable | MediaState::Ready { .. }, false) => {
                self.remove();
                Ok(Some(MediaEvent::Removed))
            }
            _ => Ok(None),
        }
    }

    fn insert(&mut self) -> DriveResult<MediaEvent> {
        log::info!("Media inserted");

        match self.load_current() {
            Ok((session, image_number)) => {
                log::info!("Image {image_number} ready: {session:?}");
                self.catalog.advance();
                self.media = MediaState::Ready { session, image_number };
                Ok(MediaEvent::Inserted { image_number })
            }
            Err(err) => {
                log::error!("Unable to load image from media: {err}");
                self.catalog.reset();
                self.media = MediaState::Unusable;
                Err(err)
            }
        }
    }

    fn load_current(&mut self) -> DriveResult<(MediaSession<S::Device>, u32)> {
        let device = match self.open_current()? {
            Some(device) => device,
            None => {
                log::info!(
                    "Image '{}' not found, starting over from the first image",
                    self.catalog.current_name()
                );
                self.catalog.reset();
                self.open_current()?.ok_or(DriveError::ImageNotFound {
                    number: self.catalog.current_number(),
                })?
            }
        };

        let session = MediaSession::load(device)?;
        Ok((session, self.catalog.current_number()))
    }

    fn open_current(&mut self) -> DriveResult<Option<S::Device>> {
        self.source.open_image(&self.catalog).map_err(|source| DriveError::ImageOpen {
            name: self.catalog.current_name(),
            source,
        })
    }

    fn remove(&mut self) {
        log::info!("Media removed");
        self.cdda.stop();
        self.last_chunk = None;
        self.media = MediaState::Empty;
    }

    #[must_use]
    pub fn session(&self) -> Option<&MediaSession<S::Device>> {
        match &self.media {
            MediaState::Ready { session, .. } => Some(session),
            MediaState::Empty | MediaState::Unusable => None,
        }
    }

    /// # Errors
    ///
    /// Returns [`DriveError::NoMedia`] unless an image is loaded.
    pub fn session_mut(&mut self) -> DriveResult<&mut MediaSession<S::Device>> {
        match &mut self.media {
            MediaState::Ready { session, .. } => Ok(session),
            MediaState::Empty | MediaState::Unusable => Err(DriveError::NoMedia),
        }
    }

    #[must_use]
    pub fn is_media_present(&self) -> bool {
        !matches!(self.media, MediaState::Empty)
    }

    /// Number of the catalog image currently loaded.
    #[must_use]
    pub fn image_number(&self) -> Option<u32> {
        match self.media {
            MediaState::Ready { image_number, .. } => Some(image_number),
            MediaState::Empty | MediaState::Unusable => None,
        }
    }

    #[must_use]
    pub fn disk_type_status(&self) -> u8 {
        self.session().map_or(DISK_TYPE_NONE, |session| session.header().disk_type)
    }

    /// # Errors
    ///
    /// Returns [`STATUS_TOC_UNAVAILABLE`] if no image is loaded or the image has no TOC `index`.
    pub fn get_toc(&self, index: u8) -> Result<&TableOfContents, u8> {
        self.session().and_then(|session| session.toc(index)).ok_or(STATUS_TOC_UNAVAILABLE)
    }

    /// Host data seek. `flags` is the raw request flag byte.
    pub fn seek_data(&mut self, sector: u32, flags: u8) -> bool {
        self.last_chunk = None;
        let Ok(session) = self.session_mut() else { return false };
        session.seek_data(sector, RequestFlags(flags)).is_ok()
    }

    /// Host CDDA seek. Stops any playback in progress.
    pub fn seek_audio(&mut self, sector: u32) -> bool {
        self.cdda.stop();
        let Ok(session) = self.session_mut() else { return false };
        session.seek_audio(sector).is_ok()
    }

    /// Fetch the next data chunk; it is then available from [`Self::last_chunk`] and
    /// [`Self::data_chunk`].
    pub fn read_next_data_chunk(&mut self) -> bool {
        let Ok(session) = self.session_mut() else { return false };
        match session.read_next_data_chunk() {
            Ok(chunk) => {
                self.last_chunk = Some(chunk);
                true
            }
            Err(_) => {
                self.last_chunk = None;
                false
            }
        }
    }

    #[must_use]
    pub fn last_chunk(&self) -> Option<Chunk> {
        self.last_chunk
    }

    /// Bytes of the last fetched chunk, until it is marked delivered.
    #[must_use]
    pub fn data_chunk(&self) -> Option<&[u8]> {
        let chunk = self.last_chunk?;
        self.session().map(|session| session.chunk_bytes(chunk))
    }

    /// Mark the last fetched chunk delivered; returns true when it completed a logical sector.
    pub fn sector_complete(&mut self) -> bool {
        self.last_chunk = None;
        let Ok(session) = self.session_mut() else { return false };
        session.sector_complete() == SectorStatus::Complete
    }

    /// Run the chunk loop for one whole logical sector, appending its bytes to `out`.
    ///
    /// On a failed read `out` may hold part of the sector.
    pub fn read_data_sector(&mut self, out: &mut Vec<u8>) -> bool {
        loop {
            if !self.read_next_data_chunk() {
                return false;
            }
            if let Some(bytes) = self.data_chunk() {
                out.extend_from_slice(bytes);
            }
            if self.sector_complete() {
                return true;
            }
        }
    }

    /// Seek to `sector` and start streaming audio from it.
    pub fn play_cdda(&mut self, sector: u32) -> bool {
        if !self.seek_audio(sector) {
            return false;
        }
        log::debug!("CDDA playback started at sector {sector}");
        self.cdda.start();
        true
    }

    pub fn stop_cdda(&mut self) {
        self.cdda.stop();
    }

    #[must_use]
    pub fn is_cdda_playing(&self) -> bool {
        self.cdda.is_playing()
    }

    /// Refill any drained CDDA buffer half.
    pub fn service_cdda(&mut self) {
        if !self.cdda.is_playing() {
            return;
        }

        let MediaState::Ready { session, .. } = &mut self.media else {
            self.cdda.stop();
            return;
        };
        if let Err(err) = self.cdda.service(session) {
            log::warn!("CDDA playback stopped by read failure: {err}");
        }
    }

    /// Audio bytes playback should consume next, if they have been read.
    #[must_use]
    pub fn cdda_samples(&self) -> Option<&[u8]> {
        let half = self.cdda.ready_half()?;
        self.session().map(|session| session.audio().half(half).as_slice())
    }

    /// Mark the half returned by [`Self::cdda_samples`] as played.
    pub fn release_cdda_samples(&mut self) {
        self.cdda.release_half();
    }
}
