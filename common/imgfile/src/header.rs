//! Image header record, region table, and TOC blobs
//!
//! Layout (all fields little-endian):
//!
//! | Block | Offset | Size | Contents                                                     |
//! |-------|--------|------|--------------------------------------------------------------|
//! | 0     | 0      | 4    | Magic, ASCII `IMGD`                                          |
//! | 0     | 4      | 1    | Disk type                                                    |
//! | 0     | 5      | 1    | Number of TOCs (1-2)                                         |
//! | 0     | 6      | 2    | Number of regions                                            |
//! | 0     | 8      | 8*N  | Regions: start sector (24 bits) + raw mode (8 bits), file block |
//! | 1..=2 | 0      | 408  | TOC blobs                                                    |

#[cfg(test)]
mod tests;

use crate::device::BlockDevice;
use crate::{InitError, InitResult};

pub const HEADER_MAGIC: [u8; 4] = *b"IMGD";

const REGIONS_OFFSET: usize = 8;
const REGION_LEN: usize = 8;
pub const MAX_REGIONS: usize = (crate::BYTES_PER_BLOCK - REGIONS_OFFSET) / REGION_LEN;

pub const MAX_TOCS: u8 = 2;

const START_SECTOR_MASK: u32 = 0x00FF_FFFF;

#[inline]
#[must_use]
pub fn is_data_mode(raw_mode: u8) -> bool {
    raw_mode & 0x04 != 0
}

#[inline]
#[must_use]
pub fn is_lead_in_mode(raw_mode: u8) -> bool {
    raw_mode & 0x80 != 0
}

/// A run of uniformly formatted sectors stored contiguously in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start_sector: u32,
    pub raw_mode: u8,
    /// Image block holding the first byte of `start_sector`.
    pub file_offset: u32,
}

impl Region {
    /// Data sectors carry sync, header, and error correction fields; anything else is raw audio.
    #[inline]
    #[must_use]
    pub fn is_data(&self) -> bool {
        is_data_mode(self.raw_mode)
    }

    /// Whether the region belongs to the lead-in / TOC area.
    #[inline]
    #[must_use]
    pub fn is_lead_in(&self) -> bool {
        is_lead_in_mode(self.raw_mode)
    }

    fn parse(bytes: &[u8]) -> Self {
        let start_and_type = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let file_offset = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self {
            start_sector: start_and_type & START_SECTOR_MASK,
            raw_mode: (start_and_type >> 24) as u8,
            file_offset,
        }
    }

    fn write(&self, out: &mut [u8]) {
        let start_and_type =
            (self.start_sector & START_SECTOR_MASK) | (u32::from(self.raw_mode) << 24);
        out[0..4].copy_from_slice(&start_and_type.to_le_bytes());
        out[4..8].copy_from_slice(&self.file_offset.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscImageHeader {
    pub disk_type: u8,
    pub num_tocs: u8,
    pub regions: Vec<Region>,
}

impl DiscImageHeader {
    #[inline]
    #[must_use]
    pub fn is_xa(&self) -> bool {
        self.disk_type == crate::XA_DISK_TYPE
    }

    /// Parse a header record from the first image block.
    ///
    /// # Errors
    ///
    /// Returns an error if the magic does not match, if the TOC count is outside 1-2, or if the
    /// region count does not fit in the block.
    pub fn parse(block: &[u8; crate::BYTES_PER_BLOCK]) -> InitResult<Self> {
        let magic: [u8; 4] = [block[0], block[1], block[2], block[3]];
        if magic != HEADER_MAGIC {
            return Err(InitError::BadMagic(magic));
        }

        let disk_type = block[4];
        let num_tocs = block[5];
        if !(1..=MAX_TOCS).contains(&num_tocs) {
            return Err(InitError::BadTocCount(num_tocs));
        }

        let num_regions = u16::from_le_bytes([block[6], block[7]]);
        if usize::from(num_regions) > MAX_REGIONS {
            return Err(InitError::BadRegionCount { count: num_regions });
        }

        let regions: Vec<_> = block[REGIONS_OFFSET..]
            .chunks_exact(REGION_LEN)
            .take(num_regions.into())
            .map(Region::parse)
            .collect();

        if !regions.is_sorted_by_key(|region| region.start_sector) {
            log::warn!("Image regions are not in ascending sector order: {regions:?}");
        }

        Ok(Self { disk_type, num_tocs, regions })
    }

    /// Serialize back into a header block, e.g. when authoring an image.
    ///
    /// # Panics
    ///
    /// Panics if the header holds more than [`MAX_REGIONS`] regions.
    #[must_use]
    pub fn to_block(&self) -> [u8; crate::BYTES_PER_BLOCK] {
        assert!(self.regions.len() <= MAX_REGIONS, "too many regions: {}", self.regions.len());

        let mut block = [0; crate::BYTES_PER_BLOCK];
        block[0..4].copy_from_slice(&HEADER_MAGIC);
        block[4] = self.disk_type;
        block[5] = self.num_tocs;
        block[6..8].copy_from_slice(&(self.regions.len() as u16).to_le_bytes());
        for (region, out) in
            self.regions.iter().zip(block[REGIONS_OFFSET..].chunks_exact_mut(REGION_LEN))
        {
            region.write(out);
        }

        block
    }
}

/// Opaque TOC blob, handed to the host byte-for-byte.
#[derive(Clone, PartialEq, Eq)]
pub struct TableOfContents(Box<[u8; crate::TOC_LEN]>);

impl TableOfContents {
    #[must_use]
    pub fn new(bytes: [u8; crate::TOC_LEN]) -> Self {
        Self(Box::new(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; crate::TOC_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for TableOfContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TableOfContents").field(&format_args!("{:02X?}..", &self.0[..8])).finish()
    }
}

/// Read and validate the header record and the TOC blobs that follow it.
///
/// # Errors
///
/// Returns an error if the header is invalid or any block read fails. Nothing is returned on
/// failure, so no partially loaded state can leak out.
pub fn load<D: BlockDevice + ?Sized>(
    device: &mut D,
) -> InitResult<(DiscImageHeader, Vec<TableOfContents>)> {
    let mut block = [0; crate::BYTES_PER_BLOCK];
    device.read_block(0, &mut block).map_err(InitError::ReadFailure)?;
    let header = DiscImageHeader::parse(&block)?;

    let mut tocs = Vec::with_capacity(header.num_tocs.into());
    for i in 0..header.num_tocs {
        device.read_block(u32::from(i) + 1, &mut block).map_err(InitError::ReadFailure)?;

        let mut toc = [0; crate::TOC_LEN];
        toc.copy_from_slice(&block[..crate::TOC_LEN]);
        tocs.push(TableOfContents::new(toc));
    }

    Ok((header, tocs))
}
