//! All state belonging to one inserted image
//!
//! A [`MediaSession`] is created when media is inserted and dropped when it is removed. Nothing
//! survives from one session to the next.


use crate::audio::{AudioSectorCursor, BufferHalf};
use crate::cursor::{Chunk, DataSectorCursor, SectorStatus};
use crate::device::BlockDevice;
use crate::header::{DiscImageHeader, TableOfContents};
use crate::resolve::{RequestFlags, ResolvedAccess, SubcodeQ};
use crate::{InitResult, IoError, IoResult, SeekResult, header, resolve};
use std::io;

pub struct MediaSession<D> {
    device: D,
    header: DiscImageHeader,
    tocs: Vec<TableOfContents>,
    data: Option<DataSectorCursor>,
    /// Transfer window shared by every data chunk; the data cursor relies on it surviving
    /// between fetches.
    data_buffer: Box<[u8; crate::BYTES_PER_BLOCK]>,
    audio: AudioSectorCursor,
}

impl<D: BlockDevice> MediaSession<D> {
    /// Read the header and TOCs from a freshly inserted image.
    ///
    /// # Errors
    ///
    /// Propagates any header validation or read error; no session exists on failure.
    pub fn load(mut device: D) -> InitResult<Self> {
        let (header, tocs) = header::load(&mut device)?;

        log::info!(
            "Loaded image: disk type {:02X}, {} TOC(s), {} region(s)",
            header.disk_type,
            header.num_tocs,
            header.regions.len()
        );
        log::debug!("Image regions: {:?}", header.regions);

        Ok(Self {
            device,
            header,
            tocs,
            data: None,
            data_buffer: Box::new([0; crate::BYTES_PER_BLOCK]),
            audio: AudioSectorCursor::default(),
        })
    }

    #[must_use]
    pub fn header(&self) -> &DiscImageHeader {
        &self.header
    }

    #[must_use]
    pub fn toc(&self, index: u8) -> Option<&TableOfContents> {
        self.tocs.get(usize::from(index))
    }

    #[must_use]
    pub fn data_cursor(&self) -> Option<&DataSectorCursor> {
        self.data.as_ref()
    }

    #[must_use]
    pub fn audio(&self) -> &AudioSectorCursor {
        &self.audio
    }

    #[must_use]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Position the data cursor at the first wanted unit of `sector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sector cannot be resolved or positioned; the live cursor is only
    /// replaced on success.
    pub fn seek_data(&mut self, sector: u32, flags: RequestFlags) -> SeekResult<()> {
        let cursor = resolve::resolve(&self.header, sector, flags, true).and_then(|access| {
            let ResolvedAccess::Data { location, format } = access else {
                unreachable!("data resolution always yields data access")
            };
            DataSectorCursor::seek(&self.device, location, format)
        });

        match cursor {
            Ok(cursor) => {
                log::debug!(
                    "Data seek to sector {sector} flags {:02X}: {:?}",
                    flags.0,
                    cursor.format()
                );
                self.data = Some(cursor);
                Ok(())
            }
            Err(err) => {
                log::warn!("Data seek to sector {sector} with flags {:02X} failed: {err}", flags.0);
                Err(err)
            }
        }
    }

    /// Position the CDDA cursor at the audio sector `sector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sector is not in an audio region or cannot be positioned.
    pub fn seek_audio(&mut self, sector: u32) -> SeekResult<SubcodeQ> {
        let result = resolve::resolve(&self.header, sector, RequestFlags::AUDIO, false).and_then(
            |access| {
                let ResolvedAccess::Audio { location, subcode_q } = access else {
                    unreachable!("audio resolution always yields audio access")
                };
                self.audio.seek(&self.device, location, subcode_q)?;
                Ok(subcode_q)
            },
        );

        if let Err(err) = &result {
            log::warn!("CDDA seek to sector {sector} failed: {err}");
        }
        result
    }

    /// Make the next chunk of the current data stream available through [`Self::chunk_bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if no data seek has succeeded yet or if the block read fails.
    pub fn read_next_data_chunk(&mut self) -> IoResult<Chunk> {
        let Some(cursor) = &mut self.data else {
            return Err(IoError::ReadFailure(io::Error::new(
                io::ErrorKind::InvalidInput,
                "data read requested before any seek",
            )));
        };

        cursor.fetch_next_chunk(&mut self.device, &mut self.data_buffer).inspect_err(|err| {
            log::error!("Data read failed: {err}");
        })
    }

    /// Bytes of `chunk` within the transfer window.
    #[must_use]
    pub fn chunk_bytes(&self, chunk: Chunk) -> &[u8] {
        &self.data_buffer[chunk.byte_range()]
    }

    /// Mark the current chunk delivered; returns whether a logical sector just completed.
    pub fn sector_complete(&mut self) -> SectorStatus {
        match &mut self.data {
            Some(cursor) => cursor.consume_chunk(),
            None => SectorStatus::InProgress,
        }
    }

    /// # Errors
    ///
    /// Returns an error if no audio seek has succeeded yet or if the block read fails.
    pub fn read_next_audio_block(&mut self, half: BufferHalf) -> IoResult<()> {
        self.audio.fetch_audio_block(&mut self.device, half).inspect_err(|err| {
            log::error!("CDDA read failed: {err}");
        })
    }
}

impl<D> std::fmt::Debug for MediaSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("header", &self.header)
            .field("tocs", &self.tocs)
            .field("data", &self.data)
            .field("audio_position", &self.audio.position())
            .finish_non_exhaustive()
    }
}
