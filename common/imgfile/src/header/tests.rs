use super::*;
use crate::device::{FileBlockDevice, MemoryImage};
use test_log::test;

fn header_block(magic: [u8; 4], disk_type: u8, num_tocs: u8, regions: &[[u8; 8]]) -> Vec<u8> {
    let mut block = vec![0; crate::BYTES_PER_BLOCK];
    block[0..4].copy_from_slice(&magic);
    block[4] = disk_type;
    block[5] = num_tocs;
    block[6..8].copy_from_slice(&(regions.len() as u16).to_le_bytes());
    for (i, region) in regions.iter().enumerate() {
        block[8 + 8 * i..16 + 8 * i].copy_from_slice(region);
    }
    block
}

fn device_with_tocs(header: Vec<u8>, toc_fill: &[u8]) -> FileBlockDevice<MemoryImage> {
    let mut bytes = header;
    for &fill in toc_fill {
        bytes.extend(std::iter::repeat_n(fill, crate::BYTES_PER_BLOCK));
    }
    FileBlockDevice::new(MemoryImage::new(bytes)).unwrap()
}

#[test]
fn parses_regions() {
    let block = header_block(
        HEADER_MAGIC,
        0x20,
        2,
        &[[0x00, 0x00, 0x00, 0x04, 0x03, 0x00, 0x00, 0x00], [
            0x2D, 0x01, 0x00, 0x80, 0x10, 0x27, 0x00, 0x00,
        ]],
    );
    let header = DiscImageHeader::parse(block.as_slice().try_into().unwrap()).unwrap();

    assert_eq!(header.disk_type, 0x20);
    assert!(header.is_xa());
    assert_eq!(header.num_tocs, 2);
    assert_eq!(header.regions, vec![
        Region { start_sector: 0, raw_mode: 0x04, file_offset: 3 },
        Region { start_sector: 301, raw_mode: 0x80, file_offset: 10000 },
    ]);
    assert!(header.regions[0].is_data());
    assert!(!header.regions[0].is_lead_in());
    assert!(!header.regions[1].is_data());
    assert!(header.regions[1].is_lead_in());
}

#[test]
fn toc_count_must_be_one_or_two() {
    for num_tocs in 0..=u8::MAX {
        let block = header_block(HEADER_MAGIC, 0x10, num_tocs, &[]);
        let result = DiscImageHeader::parse(block.as_slice().try_into().unwrap());
        match num_tocs {
            1 | 2 => assert!(result.is_ok(), "num_tocs={num_tocs}"),
            _ => assert!(
                matches!(result, Err(InitError::BadTocCount(n)) if n == num_tocs),
                "num_tocs={num_tocs}"
            ),
        }
    }
}

#[test]
fn rejects_bad_magic() {
    let block = header_block(*b"IMGX", 0x10, 1, &[]);
    let result = DiscImageHeader::parse(block.as_slice().try_into().unwrap());
    assert!(matches!(result, Err(InitError::BadMagic(magic)) if &magic == b"IMGX"));
}

#[test]
fn rejects_oversized_region_table() {
    let mut block = header_block(HEADER_MAGIC, 0x10, 1, &[]);
    block[6..8].copy_from_slice(&(MAX_REGIONS as u16 + 1).to_le_bytes());
    let result = DiscImageHeader::parse(block.as_slice().try_into().unwrap());
    assert!(matches!(
        result,
        Err(InitError::BadRegionCount { count }) if usize::from(count) == MAX_REGIONS + 1
    ));
}

#[test]
fn to_block_parses_back() {
    let header = DiscImageHeader {
        disk_type: 0x80,
        num_tocs: 1,
        regions: vec![
            Region { start_sector: 0, raw_mode: 0x00, file_offset: 2 },
            Region { start_sector: 0x12_3456, raw_mode: 0x04, file_offset: 0xABCD },
        ],
    };
    assert_eq!(DiscImageHeader::parse(&header.to_block()).unwrap(), header);
}

#[test]
fn load_reads_tocs_following_header() {
    let block = header_block(HEADER_MAGIC, 0x10, 2, &[]);
    let mut device = device_with_tocs(block, &[0x11, 0x22]);

    let (header, tocs) = load(&mut device).unwrap();
    assert_eq!(header.num_tocs, 2);
    assert_eq!(tocs.len(), 2);
    assert!(tocs[0].as_bytes().iter().all(|&b| b == 0x11));
    assert!(tocs[1].as_bytes().iter().all(|&b| b == 0x22));
}

#[test]
fn load_fails_on_missing_toc_block() {
    let block = header_block(HEADER_MAGIC, 0x10, 2, &[]);
    let mut device = device_with_tocs(block, &[0x11]);

    assert!(matches!(load(&mut device), Err(InitError::ReadFailure(_))));
}

#[test]
fn load_fails_on_empty_image() {
    let mut device = FileBlockDevice::new(MemoryImage::default()).unwrap();
    assert!(matches!(load(&mut device), Err(InitError::ReadFailure(_))));
}
