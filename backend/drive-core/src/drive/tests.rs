use super::*;
use crate::catalog::CatalogConfig;
use imgfile::device::{FileBlockDevice, MemoryImage};
use imgfile::header::{DiscImageHeader, Region};
use imgfile::{BYTES_PER_BLOCK, BYTES_PER_SECTOR, TOC_LEN};
use std::collections::BTreeMap;
use std::io;
use test_log::test;

const FIRST_DATA_BLOCK: usize = 3;

#[derive(Default)]
struct FakeMedia {
    inserted: bool,
    images: BTreeMap<u32, Vec<u8>>,
    opened: Vec<u32>,
}

impl MediaSource for FakeMedia {
    type Device = FileBlockDevice<MemoryImage>;

    fn is_inserted(&mut self) -> bool {
        self.inserted
    }

    fn open_image(&mut self, catalog: &ImageCatalog) -> io::Result<Option<Self::Device>> {
        let number = catalog.current_number();
        self.opened.push(number);
        self.images
            .get(&number)
            .map(|bytes| FileBlockDevice::new(MemoryImage::new(bytes.clone())))
            .transpose()
    }
}

fn raw_sector_byte(sector: u32, i: usize) -> u8 {
    (sector as usize * 31 + i * 7 + (i >> 8)) as u8
}

fn build_image(disk_type: u8, num_tocs: u8, regions: &[(u32, u8, u32)]) -> Vec<u8> {
    let mut bytes = vec![0; FIRST_DATA_BLOCK * BYTES_PER_BLOCK];
    let mut header_regions = Vec::new();

    for &(start_sector, raw_mode, sector_count) in regions {
        let file_offset = (bytes.len() / BYTES_PER_BLOCK) as u32;
        header_regions.push(Region { start_sector, raw_mode, file_offset });

        for sector in start_sector..start_sector + sector_count {
            bytes.extend((0..BYTES_PER_SECTOR).map(|i| raw_sector_byte(sector, i)));
        }
        bytes.resize(bytes.len().next_multiple_of(BYTES_PER_BLOCK), 0);
    }

    let header = DiscImageHeader { disk_type, num_tocs, regions: header_regions };
    bytes[..BYTES_PER_BLOCK].copy_from_slice(&header.to_block());
    for toc in 0..usize::from(num_tocs) {
        let start = (toc + 1) * BYTES_PER_BLOCK;
        bytes[start..start + TOC_LEN].fill(0xB0 + toc as u8);
    }

    bytes
}

fn data_image(disk_type: u8) -> Vec<u8> {
    build_image(disk_type, 1, &[(0, 0x04, 8)])
}

fn drive_with(images: impl IntoIterator<Item = (u32, Vec<u8>)>) -> Drive<FakeMedia> {
    let media = FakeMedia { images: images.into_iter().collect(), ..FakeMedia::default() };
    Drive::new(media, ImageCatalog::new(CatalogConfig::default()).unwrap())
}

fn set_inserted(
    drive: &mut Drive<FakeMedia>,
    inserted: bool,
) -> DriveResult<Option<MediaEvent>> {
    drive.source_mut().inserted = inserted;
    drive.service()
}

#[test]
fn empty_drive() {
    let mut drive = drive_with([(0, data_image(0x10))]);
    assert_eq!(drive.service().unwrap(), None);

    assert_eq!(drive.disk_type_status(), DISK_TYPE_NONE);
    assert_eq!(drive.image_number(), None);
    assert!(!drive.is_media_present());
    assert_eq!(drive.get_toc(0).err(), Some(STATUS_TOC_UNAVAILABLE));
    assert!(!drive.seek_data(0, 0x20));
    assert!(!drive.seek_audio(0));
    assert!(!drive.sector_complete());
    assert!(matches!(drive.session_mut(), Err(DriveError::NoMedia)));

    assert!(!drive.read_next_data_chunk());
}

#[test]
fn insertion_loads_image() {
    let mut drive = drive_with([(0, data_image(imgfile::XA_DISK_TYPE))]);

    let event = set_inserted(&mut drive, true).unwrap();
    assert_eq!(event, Some(MediaEvent::Inserted { image_number: 0 }));
    assert_eq!(drive.image_number(), Some(0));
    assert_eq!(drive.disk_type_status(), imgfile::XA_DISK_TYPE);

    // Still inserted, nothing new to report
    assert_eq!(drive.service().unwrap(), None);
}

#[test]
fn toc_requests() {
    let mut drive = drive_with([(0, data_image(0x10))]);
    set_inserted(&mut drive, true).unwrap();

    let toc = drive.get_toc(0).unwrap();
    assert!(toc.as_bytes().iter().all(|&b| b == 0xB0));
    assert_eq!(drive.get_toc(1).err(), Some(STATUS_TOC_UNAVAILABLE));
    assert_eq!(drive.get_toc(2).err(), Some(STATUS_TOC_UNAVAILABLE));
}

#[test]
fn insertions_step_through_catalog() {
    let mut drive = drive_with([(0, data_image(0x10)), (1, data_image(imgfile::XA_DISK_TYPE))]);

    let mut loaded = Vec::new();
    for _ in 0..4 {
        let Some(MediaEvent::Inserted { image_number }) = set_inserted(&mut drive, true).unwrap()
        else {
            panic!("expected an insertion");
        };
        loaded.push(image_number);
        assert_eq!(set_inserted(&mut drive, false).unwrap(), Some(MediaEvent::Removed));
    }

    assert_eq!(loaded, vec![0, 1, 0, 1]);
    // Image 2 is looked up once before wrapping back to the first image
    assert_eq!(drive.source().opened, vec![0, 1, 2, 0, 1]);
}

#[test]
fn missing_images_leave_drive_unusable() {
    let mut drive = drive_with([]);

    let result = set_inserted(&mut drive, true);
    assert!(matches!(result, Err(DriveError::ImageNotFound { number: 0 })));
    assert!(drive.is_media_present());
    assert_eq!(drive.disk_type_status(), DISK_TYPE_NONE);

    // Unusable until removed
    assert_eq!(drive.service().unwrap(), None);
    assert_eq!(drive.source().opened, vec![0, 0]);
    assert_eq!(set_inserted(&mut drive, false).unwrap(), Some(MediaEvent::Removed));
}

#[test]
fn corrupt_image_resets_catalog() {
    let mut bad = data_image(0x10);
    bad[0] = b'X';
    let mut drive = drive_with([(0, data_image(0x10)), (1, bad)]);

    set_inserted(&mut drive, true).unwrap();
    set_inserted(&mut drive, false).unwrap();
    assert_eq!(drive.catalog().current_number(), 1);

    let result = set_inserted(&mut drive, true);
    assert!(matches!(result, Err(DriveError::Init(imgfile::InitError::BadMagic(_)))));
    assert_eq!(drive.disk_type_status(), DISK_TYPE_NONE);
    assert_eq!(drive.catalog().current_number(), 0);

    set_inserted(&mut drive, false).unwrap();
    let event = set_inserted(&mut drive, true).unwrap();
    assert_eq!(event, Some(MediaEvent::Inserted { image_number: 0 }));
}

fn user_data(sector: u32) -> Vec<u8> {
    (16..2064).map(|i| raw_sector_byte(sector, i)).collect()
}

/// One sector through the chunk-level host commands, starting from a fresh output buffer.
fn read_sector(drive: &mut Drive<FakeMedia>) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        assert!(drive.read_next_data_chunk());
        let chunk = drive.last_chunk().unwrap();
        let bytes = drive.data_chunk().unwrap();
        assert_eq!(bytes.len(), usize::from(chunk.len_units()) * imgfile::BYTES_PER_UNIT);
        out.extend_from_slice(bytes);

        if drive.sector_complete() {
            assert_eq!(drive.data_chunk(), None);
            return out;
        }
    }
}

#[test]
fn host_data_reads() {
    let mut drive = drive_with([(0, data_image(0x10))]);
    set_inserted(&mut drive, true).unwrap();

    assert!(drive.seek_data(2, 0x20));
    assert_eq!(read_sector(&mut drive), user_data(2));
    assert_eq!(read_sector(&mut drive), user_data(3));
    assert_eq!(drive.last_chunk(), None);

    // Out of range and wrong class both fail without disturbing the stream
    let audio_flags = RequestFlags::new(imgfile::resolve::SectorClass::Audio, 0x20);
    assert!(!drive.seek_data(100, 0x20));
    assert!(!drive.seek_data(0, audio_flags.0));
    assert_eq!(read_sector(&mut drive), user_data(4));
}

#[test]
fn consecutive_sectors_share_transfer_window() {
    let mut drive = drive_with([(0, data_image(0x10))]);
    set_inserted(&mut drive, true).unwrap();

    // Sectors 1 and 3 begin in the block that holds the end of sectors 0 and 2
    assert!(drive.seek_data(0, 0x20));
    for sector in 0..6 {
        let mut out = Vec::new();
        assert!(drive.read_data_sector(&mut out));
        assert_eq!(out, user_data(sector), "sector {sector}");
    }

    // Image holds 8 sectors
    let mut out = Vec::new();
    assert!(drive.read_data_sector(&mut out));
    assert!(drive.read_data_sector(&mut out));
    assert!(!drive.read_data_sector(&mut out));
}

#[test]
fn removal_tears_down_cursors() {
    let mut drive = drive_with([(0, data_image(0x10))]);
    set_inserted(&mut drive, true).unwrap();
    assert!(drive.seek_data(1, 0x20));

    set_inserted(&mut drive, false).unwrap();
    set_inserted(&mut drive, true).unwrap();

    // Same image again, but the previous seek did not survive
    assert!(!drive.read_next_data_chunk());
    assert!(drive.session().unwrap().data_cursor().is_none());
}

#[test]
fn cdda_playback_until_end_of_image() {
    // Audio region starts at block 8 and holds two sectors, which pad out to 10 blocks
    let image = build_image(0x10, 1, &[(0, 0x04, 1), (1, 0x00, 2)]);
    let mut drive = drive_with([(0, image.clone())]);
    set_inserted(&mut drive, true).unwrap();

    assert!(!drive.play_cdda(0));
    assert!(drive.play_cdda(1));
    drive.service_cdda();

    let mut played = Vec::new();
    while let Some(samples) = drive.cdda_samples() {
        played.extend_from_slice(samples);
        drive.release_cdda_samples();
        drive.service_cdda();
    }

    // The block after the last one played was read but the read past the end stopped playback
    assert!(!drive.is_cdda_playing());
    assert_eq!(played, image[8 * BYTES_PER_BLOCK..17 * BYTES_PER_BLOCK]);
}

#[test]
fn cdda_stops_on_removal() {
    let image = build_image(0x10, 1, &[(0, 0x00, 4)]);
    let mut drive = drive_with([(0, image)]);
    set_inserted(&mut drive, true).unwrap();

    assert!(drive.play_cdda(0));
    drive.service_cdda();
    assert!(drive.cdda_samples().is_some());

    set_inserted(&mut drive, false).unwrap();
    assert!(!drive.is_cdda_playing());
    assert!(drive.cdda_samples().is_none());
}
