//! Block-level access to the image file
//!
//! The removable media is read in fixed 512-byte blocks. Every consumer of the image keeps its own
//! [`BlockCursor`], so the data path and the CDDA path can stream from different places in the
//! same file without disturbing each other.

mod memory;

#[cfg(test)]
mod tests;

pub use memory::MemoryImage;

use crate::BYTES_PER_BLOCK;
use std::io;
use std::io::{BufReader, Read, Seek, SeekFrom};

pub trait BlockDevice {
    /// Number of whole or partial 512-byte blocks in the image.
    fn block_count(&self) -> u32;

    /// Read block `block` into `out`. A trailing partial block is zero-padded.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from the underlying storage.
    fn read_block(&mut self, block: u32, out: &mut [u8; BYTES_PER_BLOCK]) -> io::Result<()>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for Box<D> {
    fn block_count(&self) -> u32 {
        (**self).block_count()
    }

    fn read_block(&mut self, block: u32, out: &mut [u8; BYTES_PER_BLOCK]) -> io::Result<()> {
        (**self).read_block(block, out)
    }
}

/// A [`BlockDevice`] over any seekable byte stream, typically an image [`std::fs::File`].
#[derive(Debug)]
pub struct FileBlockDevice<F: Read + Seek> {
    file: BufReader<F>,
    position: u64,
    len: u64,
}

impl<F: Read + Seek> FileBlockDevice<F> {
    /// # Errors
    ///
    /// Propagates any I/O error encountered while determining the file length.
    pub fn new(mut file: F) -> io::Result<Self> {
        let len = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        Ok(Self { file: BufReader::new(file), position: 0, len })
    }
}

impl<F: Read + Seek> BlockDevice for FileBlockDevice<F> {
    fn block_count(&self) -> u32 {
        self.len.div_ceil(crate::BYTES_PER_BLOCK as u64).try_into().unwrap_or(u32::MAX)
    }

    fn read_block(&mut self, block: u32, out: &mut [u8; BYTES_PER_BLOCK]) -> io::Result<()> {
        let block_addr = u64::from(block) * crate::BYTES_PER_BLOCK as u64;
        if block_addr >= self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("block {block} is past the end of the image ({} bytes)", self.len),
            ));
        }

        // Sequential reads are the common case; only seek when the stream is somewhere else
        if self.position != block_addr {
            self.file.seek(SeekFrom::Start(block_addr))?;
            self.position = block_addr;
        }

        let available = (self.len - block_addr).min(crate::BYTES_PER_BLOCK as u64) as usize;
        if let Err(err) = self.file.read_exact(&mut out[..available]) {
            // Stream position is unknown after a failed read
            self.position = u64::MAX;
            return Err(err);
        }
        out[available..].fill(0);
        self.position = block_addr + available as u64;

        Ok(())
    }
}

/// Per-consumer read position within a [`BlockDevice`].
///
/// A cursor starts out unpositioned; reading from it before a successful [`BlockCursor::seek`]
/// is an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCursor {
    position: Option<u32>,
}

impl BlockCursor {
    #[must_use]
    pub fn position(self) -> Option<u32> {
        self.position
    }

    /// # Errors
    ///
    /// Returns an error if `block` is past the end of the device; the cursor is left unchanged.
    pub fn seek<D: BlockDevice + ?Sized>(&mut self, device: &D, block: u32) -> io::Result<()> {
        let block_count = device.block_count();
        if block >= block_count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("cannot seek to block {block}; image has {block_count} blocks"),
            ));
        }

        self.position = Some(block);
        Ok(())
    }

    /// Read the block at the cursor into `out` and move to the following block.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor is unpositioned or if the device read fails. The cursor only
    /// advances on success.
    pub fn read_next<D: BlockDevice + ?Sized>(
        &mut self,
        device: &mut D,
        out: &mut [u8; BYTES_PER_BLOCK],
    ) -> io::Result<()> {
        let Some(block) = self.position else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "block cursor read before any seek",
            ));
        };

        device.read_block(block, out)?;
        self.position = Some(block.wrapping_add(1));

        Ok(())
    }

    /// Move past the block at the cursor without reading it.
    pub fn skip_next(&mut self) {
        self.position = self.position.map(|block| block.wrapping_add(1));
    }
}
