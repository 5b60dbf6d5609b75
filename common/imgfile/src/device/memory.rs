use std::io;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Deref;

/// An image held entirely in memory, readable through [`super::FileBlockDevice`].
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    bytes: Vec<u8>,
    address: u64,
}

impl Deref for MemoryImage {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.bytes
    }
}

impl MemoryImage {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, address: 0 }
    }
}

impl From<Vec<u8>> for MemoryImage {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl Read for MemoryImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(remaining) = usize::try_from(self.address).ok().and_then(|a| self.bytes.get(a..))
        else {
            return Ok(0);
        };

        let len = remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&remaining[..len]);
        self.address += len as u64;
        Ok(len)
    }
}

impl Seek for MemoryImage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let address = match pos {
            SeekFrom::Start(address) => i128::from(address),
            SeekFrom::End(offset) => self.bytes.len() as i128 + i128::from(offset),
            SeekFrom::Current(offset) => i128::from(self.address) + i128::from(offset),
        };

        self.address = u64::try_from(address).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid seek address: {address}"))
        })?;
        Ok(self.address)
    }
}
