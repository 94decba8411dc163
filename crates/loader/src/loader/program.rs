//! Per-tile ELF loading.
//!
//! This module is the entry point for placing a program on a core tile. It performs:
//! 1. **Target checks:** The device must be ready and the location must hold a core tile.
//! 2. **Segment walk:** Program headers are visited in table order; only `PT_LOAD` ones are written.
//! 3. **File loading:** `load_from_path` reads the ELF into an owned buffer and delegates.
//! 4. **Simulation setup:** With an active side channel, the stack range and symbol path are sent first.
//!
//! A load stops at the first failing segment. Segments written before the failure remain on
//! the device; there is no rollback.

use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tracing::{debug, error, info};

use super::resolver::{AddressResolver, GridResolver};
use super::sim::{NullSimChannel, SimChannel, SimCommand, StackRange};
use super::writer::{BurstKind, SectionWriter, SegmentReport};
use crate::common::{LoadError, Result, TileLocation};
use crate::device::{DeviceContext, MemoryWriter, TileKind};
use crate::elf::image::Hex;
use crate::elf::{ElfImage, Segment};

/// Loads ELF programs onto the core tiles of one device.
pub struct ProgramLoader<'ctx, R = GridResolver> {
    writer: SectionWriter<'ctx, R>,
    sim: Box<dyn SimChannel>,
}

impl<'ctx> ProgramLoader<'ctx, GridResolver> {
    /// Creates a loader with the checkerboard resolver and no simulator channel.
    pub fn new(ctx: &'ctx DeviceContext) -> Self {
        Self {
            writer: SectionWriter::new(ctx),
            sim: Box::new(NullSimChannel),
        }
    }
}

impl<'ctx, R: AddressResolver> ProgramLoader<'ctx, R> {
    /// Creates a loader with a custom address resolver.
    pub fn with_resolver(ctx: &'ctx DeviceContext, resolver: R) -> Self {
        Self {
            writer: SectionWriter::with_resolver(ctx, resolver),
            sim: Box::new(NullSimChannel),
        }
    }

    /// Replaces the simulator channel.
    #[must_use]
    pub fn with_sim_channel(mut self, sim: Box<dyn SimChannel>) -> Self {
        self.sim = sim;
        self
    }

    /// Returns the device context.
    pub const fn context(&self) -> &'ctx DeviceContext {
        self.writer.context()
    }

    /// Loads an ELF image held in memory onto the core at `loc`.
    ///
    /// Uninitialized data is written as zeros.
    ///
    /// # Arguments
    ///
    /// * `mem` - Word write primitive for the device.
    /// * `loc` - Core tile to load.
    /// * `elf` - Complete ELF image.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - device not ready, empty image, or `loc` outside the grid.
    /// * `InvalidTileType` - `loc` is not a core tile.
    /// * `InvalidBinary` - malformed image or out-of-bounds segment.
    /// * `AddressTranslation` - a data segment has no owning core tile.
    pub fn load_from_buffer<W: MemoryWriter + ?Sized>(
        &self,
        mem: &mut W,
        loc: TileLocation,
        elf: &[u8],
    ) -> Result<()> {
        if elf.is_empty() {
            error!("empty elf image");
            return Err(LoadError::invalid_argument("empty elf image"));
        }
        self.check_target(loc)?;

        let image = ElfImage::parse(elf).inspect_err(|e| error!("{e}"))?;

        let mut summary = SegmentReport::default();
        for (index, segment) in image.segments().iter().enumerate() {
            log_segment(index, segment);
            if !segment.is_loadable() {
                continue;
            }
            let data = image.segment_data(segment)?;
            let report = self.writer.write_segment(mem, loc, segment, data)?;
            summary.bursts.extend(report.bursts);
        }

        info!(
            tile = %loc,
            bursts = summary.bursts.len(),
            program_words = summary.words(BurstKind::Program),
            data_words = summary.words(BurstKind::Data),
            zero_words = summary.words(BurstKind::Zero),
            "elf loaded"
        );
        Ok(())
    }

    /// Reads an ELF file and loads it onto the core at `loc`.
    ///
    /// With an active simulator channel, the stack range from `<path>.map` is sent before the
    /// file is read, followed by a symbol load request when `load_symbols` is set.
    ///
    /// # Errors
    ///
    /// Everything [`load_from_buffer`](Self::load_from_buffer) returns, plus `Io` when a file
    /// cannot be read, `AllocationFailure` when the image buffer cannot be reserved, and
    /// `Simulation` when the map file has no stack range or a command cannot be sent.
    pub fn load_from_path<W: MemoryWriter + ?Sized>(
        &mut self,
        mem: &mut W,
        loc: TileLocation,
        path: impl AsRef<Path>,
        load_symbols: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        self.check_target(loc)?;

        if self.sim.is_active() {
            self.prepare_simulation(loc, path, load_symbols)?;
        }

        let elf = read_image(path)?;
        info!(path = %path.display(), size = elf.len(), "elf read");
        self.load_from_buffer(mem, loc, &elf)
    }

    fn check_target(&self, loc: TileLocation) -> Result<()> {
        let ctx = self.context();
        if !ctx.is_ready() {
            error!("device instance is not ready");
            return Err(LoadError::invalid_argument("device is not ready"));
        }
        if !ctx.contains(loc) {
            error!("tile {loc} is outside the grid");
            return Err(LoadError::invalid_argument(format!(
                "tile {loc} is outside the {}x{} grid",
                ctx.num_rows(),
                ctx.num_cols()
            )));
        }
        let kind = ctx.tile_kind(loc);
        if kind != TileKind::Core {
            error!("invalid tile type {kind} at {loc}");
            return Err(LoadError::InvalidTileType { loc, kind });
        }
        Ok(())
    }

    fn prepare_simulation(
        &mut self,
        loc: TileLocation,
        path: &Path,
        load_symbols: bool,
    ) -> Result<()> {
        let mut map_path = path.as_os_str().to_owned();
        map_path.push(".map");
        let map_text = fs::read_to_string(&map_path).map_err(|e| LoadError::io(&map_path, e))?;

        let Some(range) = StackRange::parse_map(&map_text) else {
            error!("stack range definition failed");
            return Err(LoadError::simulation(format!(
                "no stack range in {}",
                Path::new(&map_path).display()
            )));
        };
        info!(
            start = %Hex(range.start),
            end = %Hex(range.end),
            "stack range"
        );

        self.sim.send(SimCommand::SetStack { loc, range })?;
        if load_symbols {
            self.sim.send(SimCommand::LoadSymbols {
                loc,
                path: path.to_path_buf(),
            })?;
        }
        Ok(())
    }
}

impl<R: fmt::Debug> fmt::Debug for ProgramLoader<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramLoader")
            .field("writer", &self.writer)
            .field("sim_active", &self.sim.is_active())
            .finish()
    }
}

/// Reads a whole file into a buffer reserved up front from its size.
fn read_image(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let size = file.metadata().map_err(|e| LoadError::io(path, e))?.len();
    let capacity =
        usize::try_from(size).map_err(|_| LoadError::AllocationFailure { size })?;

    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity)
        .map_err(|_| LoadError::AllocationFailure { size })?;
    let _ = file
        .read_to_end(&mut buf)
        .map_err(|e| LoadError::io(path, e))?;
    Ok(buf)
}

fn log_segment(index: usize, s: &Segment) {
    debug!(
        index,
        p_type = ?s.kind,
        p_offset = %Hex(s.offset),
        p_vaddr = %Hex(s.vaddr),
        p_paddr = %Hex(s.paddr),
        p_filesz = %Hex(s.file_size),
        p_memsz = %Hex(s.mem_size),
        p_flags = %Hex(s.flags),
        p_align = %Hex(s.align),
        "program header"
    );
}
