//! Device context and memory-write backends.
//!
//! This module implements the device-facing side of the loader. It provides:
//! 1. **Context:** `DeviceContext`, the validated immutable view of one device.
//! 2. **Classification:** `TileKind` and the row-band rule that assigns it.
//! 3. **Traits:** `MemoryWriter` / `MemoryReader`, the word-granular write and read primitives.
//! 4. **Backends:** A host-side sparse image and an `mmap`-backed register window.

/// Host-side sparse memory image.
pub mod memory;

/// Memory-mapped register window backed by a device file.
#[cfg(unix)]
pub mod mmio;

/// Memory access traits.
pub mod traits;

use std::fmt;

use crate::common::{Result, TileLocation};
use crate::config::{CoreMemoryLayout, DeviceConfig};

pub use memory::SparseMemory;
#[cfg(unix)]
pub use mmio::MappedWindow;
pub use traits::{MemoryReader, MemoryWriter};

/// Kind of tile occupying a grid location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileKind {
    /// Interface tile on the shim row; no core.
    Shim,
    /// Memory tile; shared buffer, no core.
    Mem,
    /// Processing tile with a core, program memory, and data memory.
    Core,
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shim => "shim tile",
            Self::Mem => "memory tile",
            Self::Core => "core tile",
        };
        f.write_str(name)
    }
}

/// Validated, read-only description of one device.
///
/// Created by the device-management layer from a [`DeviceConfig`] and shared by reference
/// with every load. The loader only reads it; readiness is flipped by the owner through
/// [`DeviceContext::mark_ready`] before any load is attempted.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    config: DeviceConfig,
    ready: bool,
}

impl DeviceContext {
    /// Creates a context from a configuration, validating it first.
    ///
    /// The context starts out not ready.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the configuration fails [`DeviceConfig::validate`].
    pub fn new(config: DeviceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ready: false,
        })
    }

    /// Marks the device as initialised and ready for loads.
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Returns whether the device has been marked ready.
    #[inline]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns the configuration this context was built from.
    #[inline]
    pub const fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns the core tile memory layout.
    #[inline]
    pub const fn core_layout(&self) -> &CoreMemoryLayout {
        &self.config.core
    }

    /// Host base address of the array.
    #[inline]
    pub const fn base_addr(&self) -> u64 {
        self.config.base_addr
    }

    /// Number of grid rows.
    #[inline]
    pub const fn num_rows(&self) -> u8 {
        self.config.num_rows
    }

    /// Number of grid columns.
    #[inline]
    pub const fn num_cols(&self) -> u8 {
        self.config.num_cols
    }

    /// Returns whether `loc` lies inside the grid.
    #[inline]
    pub const fn contains(&self, loc: TileLocation) -> bool {
        loc.row < self.config.num_rows && loc.col < self.config.num_cols
    }

    /// Offset of a tile's register window relative to the array base.
    ///
    /// # Arguments
    ///
    /// * `loc` - Tile location; not bounds-checked.
    ///
    /// # Returns
    ///
    /// `(row << row_shift) | (col << col_shift)`.
    #[inline]
    pub const fn tile_addr(&self, loc: TileLocation) -> u64 {
        ((loc.row as u64) << self.config.row_shift) | ((loc.col as u64) << self.config.col_shift)
    }

    /// Bytes of host address space, from the array base, that a load can write to.
    ///
    /// Covers the last tile of the grid up to the end of its program or data memory,
    /// whichever lies higher.
    pub fn load_span(&self) -> u64 {
        let cfg = &self.config;
        let last = TileLocation::new(cfg.num_rows - 1, cfg.num_cols - 1);
        let core = &cfg.core;
        let tile_extent = (core.prog_mem_host_offset + u64::from(core.prog_mem_size))
            .max(u64::from(core.data_mem_size));
        self.tile_addr(last) + tile_extent
    }

    /// Classifies the tile at `loc` by its row.
    ///
    /// The shim row holds interface tiles, the configured memory-tile band holds memory
    /// tiles, and every other row holds core tiles.
    pub const fn tile_kind(&self, loc: TileLocation) -> TileKind {
        let cfg = &self.config;
        if loc.row == cfg.shim_row {
            TileKind::Shim
        } else if cfg.mem_tile_num_rows > 0
            && loc.row >= cfg.mem_tile_row_start
            && loc.row - cfg.mem_tile_row_start < cfg.mem_tile_num_rows
        {
            TileKind::Mem
        } else {
            TileKind::Core
        }
    }
}
