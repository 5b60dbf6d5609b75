//! CDDA streaming: whole image blocks into a two-slot playback buffer

use crate::device::{BlockCursor, BlockDevice};
use crate::resolve::{SectorLocation, SubcodeQ};
use crate::{IoError, IoResult, SeekError, SeekResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferHalf {
    First,
    Second,
}

impl BufferHalf {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioSectorCursor {
    blocks: BlockCursor,
    subcode_q: Option<SubcodeQ>,
    buffer: Box<[[u8; crate::BYTES_PER_BLOCK]; 2]>,
}

impl Default for AudioSectorCursor {
    fn default() -> Self {
        Self {
            blocks: BlockCursor::default(),
            subcode_q: None,
            buffer: Box::new([[0; crate::BYTES_PER_BLOCK]; 2]),
        }
    }
}

impl AudioSectorCursor {
    /// Move to the block holding the start of the audio sector at `location`.
    ///
    /// Audio is streamed in whole blocks, so playback starts at the block boundary at or before
    /// the sector start.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::ReadFailure`] if the block lies outside the image; the cursor is left
    /// unchanged.
    pub fn seek<D: BlockDevice + ?Sized>(
        &mut self,
        device: &D,
        location: SectorLocation,
        subcode_q: SubcodeQ,
    ) -> SeekResult<()> {
        self.blocks.seek(device, location.block).map_err(SeekError::ReadFailure)?;
        self.subcode_q = Some(subcode_q);

        log::trace!("Seeked CDDA cursor to block {}, Q={subcode_q:?}", location.block);

        Ok(())
    }

    /// Read the next audio block into one half of the playback buffer.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadFailure`] if the cursor is unpositioned or the read fails.
    pub fn fetch_audio_block<D: BlockDevice + ?Sized>(
        &mut self,
        device: &mut D,
        half: BufferHalf,
    ) -> IoResult<()> {
        self.blocks
            .read_next(device, &mut self.buffer[half.index()])
            .map_err(IoError::ReadFailure)
    }

    #[must_use]
    pub fn half(&self, half: BufferHalf) -> &[u8; crate::BYTES_PER_BLOCK] {
        &self.buffer[half.index()]
    }

    #[must_use]
    pub fn subcode_q(&self) -> Option<SubcodeQ> {
        self.subcode_q
    }

    #[must_use]
    pub fn position(&self) -> Option<u32> {
        self.blocks.position()
    }
}
