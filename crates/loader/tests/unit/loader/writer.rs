use mockall::predicate::{always, eq};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tileload_core::common::{ErrorKind, TileLocation};
use tileload_core::config::DeviceConfig;
use tileload_core::device::{DeviceContext, MemoryReader, MemoryWriter};
use tileload_core::elf::{Segment, SegmentKind};
use tileload_core::loader::{BurstKind, SectionWriter};

use crate::common::elf::pattern;
use crate::common::harness::TestContext;
use crate::common::mocks::device::{MockResolver, MockWriter};
use crate::common::mocks::memory::RecordingMemory;

const ORIGIN: TileLocation = TileLocation::new(3, 10);
const BANK: u32 = 0x8000;

fn segment(paddr: u32, file_size: u32, mem_size: u32) -> Segment {
    Segment {
        kind: SegmentKind::Load,
        offset: 0,
        vaddr: paddr,
        paddr,
        file_size,
        mem_size,
        flags: 0x6,
        align: 4,
    }
}

fn ready(config: DeviceConfig) -> DeviceContext {
    let mut ctx = DeviceContext::new(config).unwrap();
    ctx.mark_ready();
    ctx
}

#[test]
fn test_program_segment_never_resolves() {
    let ctx = ready(DeviceConfig::aie());
    let mut resolver = MockResolver::new();
    resolver.expect_resolve().times(0);
    let writer = SectionWriter::with_resolver(&ctx, resolver);

    let mut mem = RecordingMemory::default();
    let data = pattern(32, 1);
    let report = writer
        .write_segment(&mut mem, ORIGIN, &segment(0x100, 32, 32), &data)
        .unwrap();
    assert_eq!(report.bursts.len(), 1);
    assert_eq!(report.bursts[0].kind, BurstKind::Program);
    assert_eq!(report.bursts[0].tile, ORIGIN);
}

#[test]
fn test_program_segment_host_address() {
    let ctx = ready(DeviceConfig::aie());
    let host = 0x200_0000_0000 + 0x2_0000 + 0x40 + ctx.tile_addr(ORIGIN);

    let mut mem = MockWriter::new();
    mem.expect_write_block()
        .with(eq(host), always())
        .times(1)
        .return_const(());
    mem.expect_fill_zero()
        .with(eq(host + 8), eq(8))
        .times(1)
        .return_const(());

    let data = pattern(8, 2);
    let report = SectionWriter::new(&ctx)
        .write_segment(&mut mem, ORIGIN, &segment(0x40, 8, 16), &data)
        .unwrap();
    assert_eq!(report.bursts[0].host_addr, host);
    assert_eq!(report.bursts[0].len, 16);
}

#[test]
fn test_program_partial_word_padded_then_zero_filled() {
    let mut t = TestContext::aie();
    let data = pattern(6, 3);
    let _ = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0, 6, 12), &data)
        .unwrap();

    let base = t.prog_host_addr(ORIGIN, 0);
    assert_eq!(t.mem.writes.len(), 3);
    assert_eq!(t.mem.read_bytes(base, 6), data);
    assert_eq!(t.mem.read_bytes(base + 6, 6), vec![0; 6]);
}

#[test]
fn test_program_overflow() {
    let t = TestContext::aie();
    let data = pattern(0x20, 1);
    let mut mem = RecordingMemory::default();
    let err = SectionWriter::new(&t.ctx)
        .write_segment(&mut mem, ORIGIN, &segment(0x3FF0, 0x20, 0x20), &data)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBinary);
    assert!(mem.writes.is_empty());
}

#[test]
fn test_file_size_larger_than_mem_size() {
    let t = TestContext::aie();
    let data = pattern(16, 1);
    let err = SectionWriter::new(&t.ctx)
        .write_segment(&mut RecordingMemory::default(), ORIGIN, &segment(0, 16, 8), &data)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBinary);
}

#[test]
fn test_data_shorter_than_file_size() {
    let t = TestContext::aie();
    let data = pattern(4, 1);
    let err = SectionWriter::new(&t.ctx)
        .write_segment(&mut RecordingMemory::default(), ORIGIN, &segment(0, 16, 16), &data)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBinary);
}

#[test]
fn test_segment_between_program_and_data_memory() {
    let t = TestContext::aie();
    let data = pattern(8, 1);
    for paddr in [0x4000, 0x1_0000, 0x1_FFF8] {
        let err = SectionWriter::new(&t.ctx)
            .write_segment(&mut RecordingMemory::default(), ORIGIN, &segment(paddr, 8, 8), &data)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBinary, "paddr {paddr:#x}");
    }
}

#[test]
fn test_segment_past_data_memory() {
    let t = TestContext::aie();
    let data = pattern(0x20, 1);
    let err = SectionWriter::new(&t.ctx)
        .write_segment(
            &mut RecordingMemory::default(),
            ORIGIN,
            &segment(0x3_FFF0, 0x20, 0x20),
            &data,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBinary);
}

#[test]
fn test_data_zero_fill() {
    let mut t = TestContext::aie();
    let data = pattern(8, 7);
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x2_0000, 8, 24), &data)
        .unwrap();

    assert_eq!(report.words(BurstKind::Data), 2);
    assert_eq!(report.words(BurstKind::Zero), 4);
    assert_eq!(report.bytes(BurstKind::Zero), 16);
    assert_eq!(t.mem.data_writes(), 2);
    assert_eq!(t.mem.zero_writes(), 4);

    let south = TileLocation::new(2, 10);
    let zeros = t.mem.writes_in(t.data_host_addr(south, 8), 16);
    assert_eq!(zeros.len(), 4);
    assert!(zeros.iter().all(|(_, v)| *v == 0));
}

/// Fills `words` words at `host` with all-ones and forgets the writes.
fn stale(mem: &mut RecordingMemory, host: u64, words: u64) {
    for i in 0..words {
        mem.write_u32(host + i * 4, 0xFFFF_FFFF);
    }
    mem.writes.clear();
}

#[test]
fn test_zero_tail_after_partial_word_is_aligned() {
    let mut t = TestContext::aie();
    let south = TileLocation::new(2, 10);
    let base = t.data_host_addr(south, 0);
    stale(&mut t.mem, base, 8);

    let data = vec![1, 2, 3, 4, 5, 6];
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x2_0000, 6, 24), &data)
        .unwrap();

    let mut expected = data.clone();
    expected.resize(24, 0);
    assert_eq!(t.mem.read_bytes(base, 24), expected);
    assert!(t.mem.writes.iter().all(|(addr, _)| addr % 4 == 0));
    assert_eq!(t.mem.writes.len(), 6);
    assert_eq!(report.bursts[1].dev_addr, 0x2_0008);
    assert_eq!(report.bytes(BurstKind::Zero), 16);
}

#[test]
fn test_zero_tail_after_partial_word_crosses_bank() {
    let mut t = TestContext::aie();
    let south = TileLocation::new(2, 10);
    let west = TileLocation::new(3, 9);
    let south_tail = t.data_host_addr(south, 0x7FF0);
    let west_head = t.data_host_addr(west, 0);
    stale(&mut t.mem, south_tail, 4);
    stale(&mut t.mem, west_head, 2);

    let data = pattern(7, 3);
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x2_7FF0, 7, 24), &data)
        .unwrap();

    let mut expected = data.clone();
    expected.resize(16, 0);
    assert_eq!(t.mem.read_bytes(south_tail, 16), expected);
    assert_eq!(t.mem.read_bytes(west_head, 8), vec![0; 8]);
    assert_eq!(report.bursts.len(), 3);
    assert_eq!(report.bursts[2].tile, west);
    assert!(t.mem.writes.iter().all(|(addr, _)| addr % 4 == 0));
}

#[test]
fn test_partial_word_without_zero_tail() {
    let mut t = TestContext::aie();
    let data = pattern(5, 1);
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x2_0000, 5, 5), &data)
        .unwrap();
    assert_eq!(report.bursts.len(), 1);
    assert_eq!(t.mem.writes.len(), 2);
}

#[test]
fn test_bss_only_segment() {
    let mut t = TestContext::aie();
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x3_0000, 0, 0x40), &[])
        .unwrap();
    assert_eq!(report.bursts.len(), 1);
    assert_eq!(report.bursts[0].kind, BurstKind::Zero);
    assert_eq!(report.bursts[0].tile, TileLocation::new(4, 10));
    assert_eq!(t.mem.writes.len(), 16);
}

#[test]
fn test_split_across_two_banks() {
    let mut t = TestContext::aie();
    let data = pattern(16, 11);
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x2_7FF8, 16, 16), &data)
        .unwrap();

    let south = TileLocation::new(2, 10);
    let west = TileLocation::new(3, 9);
    assert_eq!(report.bursts.len(), 2);
    assert_eq!(report.bursts[0].tile, south);
    assert_eq!(report.bursts[0].len, 8);
    assert_eq!(report.bursts[0].host_addr, t.data_host_addr(south, 0x7FF8));
    assert_eq!(report.bursts[1].tile, west);
    assert_eq!(report.bursts[1].dev_addr, 0x2_8000);
    assert_eq!(report.bursts[1].host_addr, t.data_host_addr(west, 0));

    assert_eq!(t.mem.read_bytes(t.data_host_addr(south, 0x7FF8), 8), &data[..8]);
    assert_eq!(t.mem.read_bytes(t.data_host_addr(west, 0), 8), &data[8..]);
}

#[test]
fn test_zero_fill_starts_in_next_bank() {
    let mut t = TestContext::aie();
    let data = pattern(8, 1);
    let report = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, ORIGIN, &segment(0x2_7FF8, 8, 24), &data)
        .unwrap();
    assert_eq!(report.bursts.len(), 2);
    assert_eq!(report.bursts[1].kind, BurstKind::Zero);
    assert_eq!(report.bursts[1].tile, TileLocation::new(3, 9));
    assert_eq!(report.bursts[1].len, 16);
}

#[test]
fn test_partial_failure_keeps_earlier_chunks() {
    // Row 8 is even: West is the origin's own bank, North is off the grid.
    let origin = TileLocation::new(8, 10);
    let mut t = TestContext::aie();
    let data = pattern(16, 5);
    let err = SectionWriter::new(&t.ctx)
        .write_segment(&mut t.mem, origin, &segment(0x2_FFF8, 16, 16), &data)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AddressTranslation);
    assert_eq!(t.mem.writes.len(), 2);
    assert_eq!(t.mem.read_bytes(t.data_host_addr(origin, 0x7FF8), 8), &data[..8]);
}

#[test]
fn test_custom_resolver_picks_tile() {
    let ctx = ready(DeviceConfig::aie());
    let target = TileLocation::new(6, 6);
    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve()
        .withf(|_, origin, addr| *origin == ORIGIN && *addr == 0x2_0010)
        .times(1)
        .returning(move |_, _, _| Ok(target));

    let mut mem = RecordingMemory::default();
    let report = SectionWriter::with_resolver(&ctx, resolver)
        .write_segment(&mut mem, ORIGIN, &segment(0x2_0010, 4, 4), &[1, 2, 3, 4])
        .unwrap();
    assert_eq!(report.bursts[0].tile, target);
    assert_eq!(
        mem.writes,
        vec![(ctx.base_addr() + 0x10 + ctx.tile_addr(target), 0x0403_0201)]
    );
}

proptest! {
    #[test]
    fn prop_chunks_follow_bank_boundaries(
        start_word in 0u32..(4 * BANK / 4),
        len_words in 1u32..(3 * BANK / 4),
    ) {
        let start = 0x2_0000 + start_word * 4;
        let len = (len_words * 4).min(0x4_0000 - start);
        prop_assume!(len > 0);

        let mut t = TestContext::aie();
        let data = pattern(len as usize, 0);
        let report = SectionWriter::new(&t.ctx)
            .write_segment(&mut t.mem, ORIGIN, &segment(start, len, len), &data)
            .unwrap();

        let first_bank = start / BANK;
        let last_bank = (start + len - 1) / BANK;
        prop_assert_eq!(report.bursts.len() as u32, last_bank - first_bank + 1);
        prop_assert_eq!(report.bytes(BurstKind::Data), u64::from(len));

        for pair in report.bursts.windows(2) {
            prop_assert_eq!((pair[0].dev_addr + pair[0].len) % BANK, 0);
            prop_assert_eq!(pair[0].dev_addr + pair[0].len, pair[1].dev_addr);
            prop_assert_ne!(pair[0].tile, pair[1].tile);
        }
        prop_assert_eq!(t.mem.writes.len() as u64, u64::from(len / 4));
    }
}
