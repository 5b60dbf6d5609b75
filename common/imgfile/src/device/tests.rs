use super::*;
use test_log::test;

fn numbered_blocks(count: u8, trailing: usize) -> FileBlockDevice<MemoryImage> {
    let mut bytes = Vec::new();
    for i in 0..count {
        bytes.extend(std::iter::repeat_n(i, crate::BYTES_PER_BLOCK));
    }
    bytes.extend(std::iter::repeat_n(0xEE, trailing));
    FileBlockDevice::new(MemoryImage::new(bytes)).unwrap()
}

#[test]
fn block_count_rounds_up_partial_blocks() {
    assert_eq!(numbered_blocks(3, 0).block_count(), 3);
    assert_eq!(numbered_blocks(3, 10).block_count(), 4);
}

#[test]
fn partial_final_block_is_zero_padded() {
    let mut device = numbered_blocks(1, 10);
    let mut out = [0xFF; crate::BYTES_PER_BLOCK];
    device.read_block(1, &mut out).unwrap();

    assert!(out[..10].iter().all(|&b| b == 0xEE));
    assert!(out[10..].iter().all(|&b| b == 0));
}

#[test]
fn read_past_end_fails() {
    let mut device = numbered_blocks(2, 0);
    let mut out = [0; crate::BYTES_PER_BLOCK];
    assert!(device.read_block(2, &mut out).is_err());
}

#[test]
fn out_of_order_reads() {
    let mut device = numbered_blocks(4, 0);
    let mut out = [0; crate::BYTES_PER_BLOCK];
    for block in [3, 0, 1, 1, 2] {
        device.read_block(block, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == block as u8), "block {block}");
    }
}

#[test]
fn cursor_reads_sequentially_and_skips() {
    let mut device = numbered_blocks(4, 0);
    let mut out = [0; crate::BYTES_PER_BLOCK];
    let mut cursor = BlockCursor::default();

    cursor.seek(&device, 1).unwrap();
    cursor.read_next(&mut device, &mut out).unwrap();
    assert_eq!(out[0], 1);

    cursor.skip_next();
    cursor.read_next(&mut device, &mut out).unwrap();
    assert_eq!(out[0], 3);
    assert_eq!(cursor.position(), Some(4));

    assert!(cursor.read_next(&mut device, &mut out).is_err());
    assert_eq!(cursor.position(), Some(4));
}

#[test]
fn cursor_rejects_unpositioned_read_and_bad_seek() {
    let mut device = numbered_blocks(2, 0);
    let mut out = [0; crate::BYTES_PER_BLOCK];
    let mut cursor = BlockCursor::default();

    assert!(cursor.read_next(&mut device, &mut out).is_err());

    cursor.seek(&device, 1).unwrap();
    assert!(cursor.seek(&device, 2).is_err());
    assert_eq!(cursor.position(), Some(1));
}
