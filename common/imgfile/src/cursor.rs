//! Data sector cursor: hands out a trimmed sector stream in transfer-window sized chunks
//!
//! The host pulls data in bursts of at most 256 units, and a 256-unit window is exactly one image
//! block. The cursor tracks its position inside the current block with an 8-bit wrapping counter:
//! when the counter overflows back to 0 the block is used up and the next fetch must read a new
//! one. Trimmed sectors start and end at arbitrary offsets, so a single logical sector usually
//! spans several blocks and a block usually holds parts of two sectors.


use crate::device::{BlockCursor, BlockDevice};
use crate::resolve::{SectorFormatParams, SectorLocation};
use crate::{IoError, IoResult, SeekError, SeekResult};
use std::num::Wrapping;
use std::ops::Range;

/// Convert an 8-bit chunk length to units; 0 means a full window.
#[inline]
#[must_use]
pub fn window_units(len: Wrapping<u8>) -> u16 {
    if len.0 == 0 { crate::UNITS_PER_BLOCK } else { len.0.into() }
}

/// Contiguous run of wanted units inside the most recently fetched block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub offset: u8,
    pub len: Wrapping<u8>,
}

impl Chunk {
    #[inline]
    #[must_use]
    pub fn len_units(self) -> u16 {
        window_units(self.len)
    }

    /// Byte range of the chunk within the block buffer passed to
    /// [`DataSectorCursor::fetch_next_chunk`].
    #[must_use]
    pub fn byte_range(self) -> Range<usize> {
        let start = usize::from(self.offset) * crate::BYTES_PER_UNIT;
        start..start + usize::from(self.len_units()) * crate::BYTES_PER_UNIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorStatus {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    AwaitingChunk,
    ChunkReady(Chunk),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSectorCursor {
    blocks: BlockCursor,
    state: CursorState,
    block_pending_fetch: bool,
    window_offset: Wrapping<u8>,
    units_delivered: u16,
    format: SectorFormatParams,
}

impl DataSectorCursor {
    /// Position a new cursor at the first wanted unit of the sector at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`SeekError::ReadFailure`] if the starting block lies outside the image.
    pub fn seek<D: BlockDevice + ?Sized>(
        device: &D,
        location: SectorLocation,
        format: SectorFormatParams,
    ) -> SeekResult<Self> {
        let mut cursor = Self {
            blocks: BlockCursor::default(),
            state: CursorState::AwaitingChunk,
            block_pending_fetch: false,
            window_offset: Wrapping(location.start_offset_in_unit),
            units_delivered: 0,
            format,
        };

        // Nothing has been fetched yet, so if the leading trim runs off the end of the first
        // block that block is never read at all
        cursor.skip_units(format.skip_before);
        let mut block = location.block;
        if cursor.block_pending_fetch {
            block = block.wrapping_add(1);
        }
        cursor.block_pending_fetch = true;

        cursor.blocks.seek(device, block).map_err(SeekError::ReadFailure)?;

        log::trace!("Seeked data cursor to block {block}: {cursor:?}");

        Ok(cursor)
    }

    #[must_use]
    pub fn format(&self) -> SectorFormatParams {
        self.format
    }

    #[must_use]
    pub fn window_offset(&self) -> u8 {
        self.window_offset.0
    }

    #[must_use]
    pub fn units_delivered(&self) -> u16 {
        self.units_delivered
    }

    #[must_use]
    pub fn block_pending_fetch(&self) -> bool {
        self.block_pending_fetch
    }

    #[must_use]
    pub fn chunk(&self) -> Option<Chunk> {
        match self.state {
            CursorState::ChunkReady(chunk) => Some(chunk),
            CursorState::AwaitingChunk => None,
        }
    }

    /// Make the next chunk available, reading a new block into `block_buf` if the previous one is
    /// used up.
    ///
    /// `block_buf` must be the same buffer on every call: a chunk that does not need a new block
    /// refers to bytes left in the buffer by an earlier fetch. [`crate::session::MediaSession`]
    /// owns that buffer for the life of the media.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ReadFailure`] if the block read fails; the cursor is left unchanged.
    pub fn fetch_next_chunk<D: BlockDevice + ?Sized>(
        &mut self,
        device: &mut D,
        block_buf: &mut [u8; crate::BYTES_PER_BLOCK],
    ) -> IoResult<Chunk> {
        if self.block_pending_fetch {
            self.blocks.read_next(device, block_buf).map_err(IoError::ReadFailure)?;
            self.block_pending_fetch = false;
        }

        // !offset is the room left in the window minus one, so a fresh window (offset 0) has room
        // 255 and the +1 below wraps to 0, i.e. a full 256-unit chunk
        let room = !self.window_offset;
        let sector_remaining = self.format.sector_size - self.units_delivered;
        let len = if u16::from(room.0) < sector_remaining {
            room + Wrapping(1)
        } else {
            Wrapping(sector_remaining as u8)
        };

        let chunk = Chunk { offset: self.window_offset.0, len };
        self.state = CursorState::ChunkReady(chunk);

        Ok(chunk)
    }

    /// Mark the current chunk as delivered to the host.
    ///
    /// When this finishes a logical sector, the trailing trim of that sector and the leading trim
    /// of the next one are skipped, so the following fetch starts on the next sector's first
    /// wanted unit.
    pub fn consume_chunk(&mut self) -> SectorStatus {
        let CursorState::ChunkReady(chunk) = self.state else {
            log::warn!("Data chunk consumed without a preceding fetch; ignoring");
            return SectorStatus::InProgress;
        };
        self.state = CursorState::AwaitingChunk;

        self.units_delivered += chunk.len_units();
        self.window_offset += chunk.len;
        if self.window_offset.0 == 0 {
            self.block_pending_fetch = true;
        }

        if self.units_delivered < self.format.sector_size {
            return SectorStatus::InProgress;
        }

        self.units_delivered = 0;
        self.skip_units(self.format.skip_after);
        self.skip_units(self.format.skip_before);

        SectorStatus::Complete
    }

    fn skip_units(&mut self, units: u8) {
        if units > (!self.window_offset).0 {
            // Skip runs past the end of the window. If the current block was never fetched it is
            // stepped over without a read
            if self.block_pending_fetch {
                self.blocks.skip_next();
            }
            self.block_pending_fetch = true;
        }
        self.window_offset += Wrapping(units);
    }
}
