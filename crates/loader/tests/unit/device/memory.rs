use pretty_assertions::assert_eq;
use tileload_core::device::{MemoryReader, MemoryWriter, SparseMemory};

#[test]
fn test_unwritten_reads_zero() {
    let mem = SparseMemory::new();
    assert!(mem.is_empty());
    assert_eq!(mem.read_u32(0x1000), 0);
}

#[test]
fn test_rewrite_counts_but_keeps_one_word() {
    let mut mem = SparseMemory::new();
    mem.write_u32(0x10, 1);
    mem.write_u32(0x10, 2);
    assert_eq!(mem.len(), 1);
    assert_eq!(mem.write_count(), 2);
    assert_eq!(mem.read_u32(0x10), 2);
}

#[test]
fn test_write_block_pads_trailing_word() {
    let mut mem = SparseMemory::new();
    mem.write_block(0x100, &[1, 2, 3, 4, 5, 6]);
    assert_eq!(mem.read_u32(0x100), 0x0403_0201);
    assert_eq!(mem.read_u32(0x104), 0x0000_0605);
    assert_eq!(mem.write_count(), 2);
}

#[test]
fn test_write_block_empty_issues_nothing() {
    let mut mem = SparseMemory::new();
    mem.write_block(0x100, &[]);
    assert!(mem.is_empty());
}

#[test]
fn test_fill_zero_rounds_up_to_words() {
    let mut mem = SparseMemory::new();
    mem.write_u32(0x208, 0xFFFF_FFFF);
    mem.fill_zero(0x200, 9);
    let words: Vec<_> = mem.iter().collect();
    assert_eq!(words, vec![(0x200, 0), (0x204, 0), (0x208, 0)]);
}

#[test]
fn test_read_bytes_truncates() {
    let mut mem = SparseMemory::new();
    mem.write_block(0x40, b"abcdefg");
    assert_eq!(mem.read_bytes(0x40, 7), b"abcdefg".to_vec());
    assert_eq!(mem.read_bytes(0x40, 2), b"ab".to_vec());
}

#[test]
fn test_range_and_clear() {
    let mut mem = SparseMemory::new();
    for i in 0..8u32 {
        mem.write_u32(u64::from(i) * 4, i);
    }
    let mid: Vec<_> = mem.range(8, 16).collect();
    assert_eq!(mid, vec![(8, 2), (12, 3)]);
    mem.clear();
    assert!(mem.is_empty());
    assert_eq!(mem.write_count(), 0);
}

#[test]
fn test_writes_through_mutable_reference() {
    fn fill<W: MemoryWriter>(mut w: W) {
        w.write_u32(0, 7);
    }
    let mut mem = SparseMemory::new();
    fill(&mut mem);
    assert_eq!(mem.read_u32(0), 7);
}
