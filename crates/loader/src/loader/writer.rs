//! Segment placement.
//!
//! This module writes one loadable segment into tile memory. It handles:
//! 1. **Program memory:** Segments below the program memory size go to the origin tile as one burst.
//! 2. **Data memory:** Other segments are split wherever they cross a bank boundary, each chunk
//!    going to the tile that owns that bank.
//! 3. **Zero fill:** The part of a segment beyond its file-backed bytes is written as zeros,
//!    starting at the first word boundary after them.
//!
//! Writes are not transactional. If a later chunk fails to resolve, earlier chunks stay written.

use tracing::{error, trace};

use super::resolver::{AddressResolver, GridResolver};
use crate::common::{LoadError, Result, TileLocation};
use crate::device::traits::WORD_BYTES;
use crate::device::{DeviceContext, MemoryWriter};
use crate::elf::Segment;

/// What a burst carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BurstKind {
    /// Program memory image (file bytes, zero-padded to the in-memory size).
    Program,
    /// Initialized data copied from the file.
    Data,
    /// Zero-filled uninitialized data.
    Zero,
}

/// One contiguous run of word writes into a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Burst {
    /// Tile receiving the burst.
    pub tile: TileLocation,
    /// Device-side address of the first byte, as seen by the origin core.
    pub dev_addr: u32,
    /// Host address of the first byte.
    pub host_addr: u64,
    /// Length in bytes.
    pub len: u32,
    /// Contents.
    pub kind: BurstKind,
}

impl Burst {
    /// Number of word writes issued for this burst.
    #[inline]
    pub const fn words(&self) -> u64 {
        (self.len as u64).div_ceil(WORD_BYTES)
    }
}

/// Write plan executed for one segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SegmentReport {
    /// Bursts in issue order.
    pub bursts: Vec<Burst>,
}

impl SegmentReport {
    /// Number of word writes of the given kind.
    pub fn words(&self, kind: BurstKind) -> u64 {
        self.bursts
            .iter()
            .filter(|b| b.kind == kind)
            .map(Burst::words)
            .sum()
    }

    /// Number of bytes covered by bursts of the given kind.
    pub fn bytes(&self, kind: BurstKind) -> u64 {
        self.bursts
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| u64::from(b.len))
            .sum()
    }
}

/// Writes segments for one device, consulting an address resolver for data memory.
#[derive(Debug, Clone)]
pub struct SectionWriter<'ctx, R = GridResolver> {
    ctx: &'ctx DeviceContext,
    resolver: R,
}

impl<'ctx> SectionWriter<'ctx, GridResolver> {
    /// Creates a writer using the grid's checkerboard resolver.
    pub const fn new(ctx: &'ctx DeviceContext) -> Self {
        Self {
            ctx,
            resolver: GridResolver,
        }
    }
}

impl<'ctx, R: AddressResolver> SectionWriter<'ctx, R> {
    /// Creates a writer with a custom resolver.
    pub const fn with_resolver(ctx: &'ctx DeviceContext, resolver: R) -> Self {
        Self { ctx, resolver }
    }

    /// Returns the device context.
    pub const fn context(&self) -> &'ctx DeviceContext {
        self.ctx
    }

    /// Writes one loadable segment for the core at `origin`.
    ///
    /// # Arguments
    ///
    /// * `mem` - Word write primitive.
    /// * `origin` - Core tile the program belongs to.
    /// * `segment` - Program header of the segment.
    /// * `data` - File-backed bytes of the segment (at least `file_size` long).
    ///
    /// # Returns
    ///
    /// The bursts that were issued.
    ///
    /// # Errors
    ///
    /// * `InvalidBinary` - the segment overflows program memory, falls between program and
    ///   data memory, runs past the data-memory windows, or has fewer file bytes than declared.
    /// * `AddressTranslation` - a chunk of a data segment has no owning core tile.
    pub fn write_segment<W: MemoryWriter + ?Sized>(
        &self,
        mem: &mut W,
        origin: TileLocation,
        segment: &Segment,
        data: &[u8],
    ) -> Result<SegmentReport> {
        if segment.file_size > segment.mem_size {
            return Err(LoadError::invalid_binary(format!(
                "segment at {:#x}: file size {:#x} exceeds memory size {:#x}",
                segment.paddr, segment.file_size, segment.mem_size
            )));
        }
        let init = data.get(..segment.file_size as usize).ok_or_else(|| {
            LoadError::invalid_binary(format!(
                "segment at {:#x}: {:#x} file bytes declared, {:#x} available",
                segment.paddr,
                segment.file_size,
                data.len()
            ))
        })?;

        let mut report = SegmentReport::default();
        if segment.paddr < self.ctx.core_layout().prog_mem_size {
            self.write_program(mem, origin, segment, init, &mut report)?;
        } else {
            self.check_data_bounds(segment)?;
            let start = u64::from(segment.paddr);
            self.write_banked(
                mem,
                origin,
                start,
                Some(init),
                u64::from(segment.file_size),
                &mut report,
            )?;
            // The last initialized word is already zero-padded; the tail starts on the next word.
            let zero_start = (start + u64::from(segment.file_size)).next_multiple_of(WORD_BYTES);
            self.write_banked(
                mem,
                origin,
                zero_start,
                None,
                segment.mem_end().saturating_sub(zero_start),
                &mut report,
            )?;
        }
        Ok(report)
    }

    /// Program memory is private to a tile, so the whole segment is one burst at the origin.
    fn write_program<W: MemoryWriter + ?Sized>(
        &self,
        mem: &mut W,
        origin: TileLocation,
        segment: &Segment,
        init: &[u8],
        report: &mut SegmentReport,
    ) -> Result<()> {
        let layout = self.ctx.core_layout();
        if segment.mem_end() > u64::from(layout.prog_mem_size) {
            error!(
                "overflow of program memory: {:#x}+{:#x}",
                segment.paddr, segment.mem_size
            );
            return Err(LoadError::invalid_binary(format!(
                "segment at {:#x} of {:#x} bytes overflows {:#x} bytes of program memory",
                segment.paddr, segment.mem_size, layout.prog_mem_size
            )));
        }

        let host_addr = self.ctx.base_addr()
            + layout.prog_mem_host_offset
            + u64::from(segment.paddr)
            + self.ctx.tile_addr(origin);

        mem.write_block(host_addr, init);
        let padded = (init.len() as u64).next_multiple_of(WORD_BYTES);
        let total = u64::from(segment.mem_size).next_multiple_of(WORD_BYTES);
        if total > padded {
            mem.fill_zero(host_addr + padded, total - padded);
        }

        let burst = Burst {
            tile: origin,
            dev_addr: segment.paddr,
            host_addr,
            len: segment.mem_size,
            kind: BurstKind::Program,
        };
        trace!(?burst, "program memory burst");
        report.bursts.push(burst);
        Ok(())
    }

    fn check_data_bounds(&self, segment: &Segment) -> Result<()> {
        let layout = self.ctx.core_layout();
        if segment.paddr < layout.data_mem_addr || segment.mem_end() > layout.data_mem_end() {
            error!("invalid section starting at {:#x}", segment.paddr);
            return Err(LoadError::invalid_binary(format!(
                "segment {:#x}..{:#x} lies outside data memory {:#x}..{:#x}",
                segment.paddr,
                segment.mem_end(),
                layout.data_mem_addr,
                layout.data_mem_end()
            )));
        }
        Ok(())
    }

    /// Writes `len` bytes starting at device address `start`, one chunk per bank.
    ///
    /// With `source` set the chunks copy successive slices of it; otherwise they are zeros.
    /// Every chunk except the last ends exactly on a bank boundary, so the loop advances
    /// into a new bank on each iteration.
    fn write_banked<W: MemoryWriter + ?Sized>(
        &self,
        mem: &mut W,
        origin: TileLocation,
        start: u64,
        source: Option<&[u8]>,
        len: u64,
        report: &mut SegmentReport,
    ) -> Result<()> {
        let layout = self.ctx.core_layout();
        let bank_size = u64::from(layout.data_mem_size);
        let mask = u64::from(layout.bank_mask());

        let mut addr = start;
        let mut remaining = len;
        let mut consumed = 0usize;
        while remaining > 0 {
            // Bounds were checked against the 32-bit data-memory windows.
            let dev_addr = addr as u32;
            let tile = self
                .resolver
                .resolve(self.ctx, origin, dev_addr)
                .inspect_err(|_| {
                    error!("failed to get target location for p_paddr {dev_addr:#x}");
                })?;

            let in_bank = addr & mask;
            let overflow = (in_bank + remaining).saturating_sub(bank_size);
            let chunk = remaining - overflow;
            let host_addr = self.ctx.base_addr() + in_bank + self.ctx.tile_addr(tile);

            let kind = match source {
                Some(bytes) => {
                    let end = consumed + chunk as usize;
                    mem.write_block(host_addr, &bytes[consumed..end]);
                    consumed = end;
                    BurstKind::Data
                }
                None => {
                    mem.fill_zero(host_addr, chunk);
                    BurstKind::Zero
                }
            };

            let burst = Burst {
                tile,
                dev_addr,
                host_addr,
                len: chunk as u32,
                kind,
            };
            trace!(?burst, "data memory burst");
            report.bursts.push(burst);

            addr += chunk;
            remaining -= chunk;
        }
        Ok(())
    }
}
