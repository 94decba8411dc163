//! Device model configuration.
//!
//! This module defines the structures that describe one accelerator model. It provides:
//! 1. **Defaults:** Baseline constants for the first-generation (checkerboard) array.
//! 2. **Structures:** Grid geometry (`DeviceConfig`) and the core tile memory map (`CoreMemoryLayout`).
//! 3. **Presets:** `DeviceConfig::aie()` and `DeviceConfig::aieml()` for the two array generations.
//!
//! Configuration is supplied as JSON (`DeviceConfig::from_json_file`) or built from a preset.
//! It is validated once when a [`DeviceContext`](crate::device::DeviceContext) is created and
//! is never mutated afterwards.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{LoadError, Result};

/// Default configuration constants for the first-generation array.
mod defaults {
    /// Host-side base address of the array's register window.
    pub const BASE_ADDR: u64 = 0x200_0000_0000;

    /// Number of rows, shim row included.
    pub const NUM_ROWS: u8 = 9;

    /// Number of columns.
    pub const NUM_COLS: u8 = 50;

    /// Bit position of the row index in a tile's address offset.
    pub const ROW_SHIFT: u8 = 18;

    /// Bit position of the column index in a tile's address offset.
    pub const COL_SHIFT: u8 = 23;

    /// Row holding the shim (interface) tiles.
    pub const SHIM_ROW: u8 = 0;

    /// First memory-tile row; unused when there are no memory tiles.
    pub const MEM_TILE_ROW_START: u8 = 0;

    /// Number of memory-tile rows.
    pub const MEM_TILE_NUM_ROWS: u8 = 0;

    /// Program memory size in bytes (16 KiB).
    pub const PROG_MEM_SIZE: u32 = 0x4000;

    /// Offset of program memory inside a tile's register window.
    pub const PROG_MEM_HOST_OFFSET: u64 = 0x2_0000;

    /// Data memory size in bytes (32 KiB); one bank per cardinal window.
    pub const DATA_MEM_SIZE: u32 = 0x8000;

    /// Device-side address of the first data-memory window (cardinal code 4).
    pub const DATA_MEM_ADDR: u32 = 0x2_0000;
}

/// Core tile memory map, as seen by the compiled program and by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreMemoryLayout {
    /// Program memory size in bytes. Device addresses below this hit program memory.
    #[serde(default = "CoreMemoryLayout::default_prog_mem_size")]
    pub prog_mem_size: u32,

    /// Offset of program memory within a tile's host address window.
    #[serde(default = "CoreMemoryLayout::default_prog_mem_host_offset")]
    pub prog_mem_host_offset: u64,

    /// Data memory size in bytes. Must be a power of two.
    #[serde(default = "CoreMemoryLayout::default_data_mem_size")]
    pub data_mem_size: u32,

    /// Device-side base address of the data-memory windows.
    #[serde(default = "CoreMemoryLayout::default_data_mem_addr")]
    pub data_mem_addr: u32,

    /// Whether neighbouring rows alternate orientation (checkerboard placement).
    #[serde(default = "CoreMemoryLayout::default_is_checkerboard")]
    pub is_checkerboard: bool,
}

impl CoreMemoryLayout {
    fn default_prog_mem_size() -> u32 {
        defaults::PROG_MEM_SIZE
    }

    fn default_prog_mem_host_offset() -> u64 {
        defaults::PROG_MEM_HOST_OFFSET
    }

    fn default_data_mem_size() -> u32 {
        defaults::DATA_MEM_SIZE
    }

    fn default_data_mem_addr() -> u32 {
        defaults::DATA_MEM_ADDR
    }

    fn default_is_checkerboard() -> bool {
        true
    }

    /// Mask selecting the offset inside one data-memory bank.
    #[inline]
    pub const fn bank_mask(&self) -> u32 {
        self.data_mem_size.wrapping_sub(1)
    }

    /// End (exclusive) of the device-side data-memory address space.
    ///
    /// The compiled program sees four windows (south, west, north, east) of one bank each.
    #[inline]
    pub const fn data_mem_end(&self) -> u64 {
        self.data_mem_addr as u64 + 4 * self.data_mem_size as u64
    }
}

impl Default for CoreMemoryLayout {
    fn default() -> Self {
        Self {
            prog_mem_size: defaults::PROG_MEM_SIZE,
            prog_mem_host_offset: defaults::PROG_MEM_HOST_OFFSET,
            data_mem_size: defaults::DATA_MEM_SIZE,
            data_mem_addr: defaults::DATA_MEM_ADDR,
            is_checkerboard: true,
        }
    }
}

/// Configuration of one accelerator device.
///
/// Holds the host base address, the grid geometry, the tile addressing shifts, the row bands
/// that hold non-core tiles, and the core tile memory layout.
///
/// # Examples
///
/// ```
/// use tileload_core::config::DeviceConfig;
///
/// let json = r#"{
///     "num_rows": 4,
///     "num_cols": 5,
///     "core": { "data_mem_size": 65536, "data_mem_addr": 262144, "is_checkerboard": false }
/// }"#;
///
/// let config = DeviceConfig::from_json_str(json).unwrap();
/// assert_eq!(config.num_cols, 5);
/// assert_eq!(config.core.prog_mem_size, 0x4000);
/// assert!(!config.core.is_checkerboard);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Host-side base address of the array.
    #[serde(default = "DeviceConfig::default_base_addr")]
    pub base_addr: u64,

    /// Number of rows in the grid.
    #[serde(default = "DeviceConfig::default_num_rows")]
    pub num_rows: u8,

    /// Number of columns in the grid.
    #[serde(default = "DeviceConfig::default_num_cols")]
    pub num_cols: u8,

    /// Bit position of the row index in a tile address.
    #[serde(default = "DeviceConfig::default_row_shift")]
    pub row_shift: u8,

    /// Bit position of the column index in a tile address.
    #[serde(default = "DeviceConfig::default_col_shift")]
    pub col_shift: u8,

    /// Row holding the shim tiles.
    #[serde(default = "DeviceConfig::default_shim_row")]
    pub shim_row: u8,

    /// First row of memory tiles.
    #[serde(default = "DeviceConfig::default_mem_tile_row_start")]
    pub mem_tile_row_start: u8,

    /// Number of memory-tile rows (0 when the model has none).
    #[serde(default = "DeviceConfig::default_mem_tile_num_rows")]
    pub mem_tile_num_rows: u8,

    /// Core tile memory layout.
    #[serde(default)]
    pub core: CoreMemoryLayout,
}

impl DeviceConfig {
    fn default_base_addr() -> u64 {
        defaults::BASE_ADDR
    }

    fn default_num_rows() -> u8 {
        defaults::NUM_ROWS
    }

    fn default_num_cols() -> u8 {
        defaults::NUM_COLS
    }

    fn default_row_shift() -> u8 {
        defaults::ROW_SHIFT
    }

    fn default_col_shift() -> u8 {
        defaults::COL_SHIFT
    }

    fn default_shim_row() -> u8 {
        defaults::SHIM_ROW
    }

    fn default_mem_tile_row_start() -> u8 {
        defaults::MEM_TILE_ROW_START
    }

    fn default_mem_tile_num_rows() -> u8 {
        defaults::MEM_TILE_NUM_ROWS
    }

    /// First-generation array: checkerboard placement, 32 KiB data memory, no memory tiles.
    pub fn aie() -> Self {
        Self::default()
    }

    /// Second-generation array: uniform orientation, 64 KiB data memory, one memory-tile row.
    pub fn aieml() -> Self {
        Self {
            num_rows: 11,
            num_cols: 38,
            row_shift: 20,
            col_shift: 25,
            mem_tile_row_start: 1,
            mem_tile_num_rows: 1,
            core: CoreMemoryLayout {
                prog_mem_size: 0x4000,
                prog_mem_host_offset: 0x2_0000,
                data_mem_size: 0x1_0000,
                data_mem_addr: 0x4_0000,
                is_checkerboard: false,
            },
            ..Self::default()
        }
    }

    /// Parses a configuration from a JSON string.
    ///
    /// Missing fields take the first-generation defaults. The result is not validated;
    /// validation happens when the device context is created.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the JSON does not describe a device configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LoadError::invalid_argument(format!("device config: {e}")))
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the file cannot be read and `InvalidArgument` when it does not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
        Self::from_json_str(&text)
    }

    /// Checks the invariants the loader relies on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the grid is empty, the data memory size is not a
    /// non-zero power of two, the data-memory windows overlap program memory, or a shift
    /// would push a tile index outside 64 bits.
    pub fn validate(&self) -> Result<()> {
        if self.num_rows == 0 || self.num_cols == 0 {
            return Err(LoadError::invalid_argument(format!(
                "empty grid {}x{}",
                self.num_rows, self.num_cols
            )));
        }
        if !self.core.data_mem_size.is_power_of_two() {
            return Err(LoadError::invalid_argument(format!(
                "data memory size {:#x} is not a power of two",
                self.core.data_mem_size
            )));
        }
        if self.core.data_mem_addr < self.core.prog_mem_size {
            return Err(LoadError::invalid_argument(format!(
                "data memory base {:#x} overlaps program memory of {:#x} bytes",
                self.core.data_mem_addr, self.core.prog_mem_size
            )));
        }
        if self.core.data_mem_end() > u64::from(u32::MAX) + 1 {
            return Err(LoadError::invalid_argument(
                "data memory windows exceed the 32-bit device address space",
            ));
        }
        if self.row_shift > 56 || self.col_shift > 56 {
            return Err(LoadError::invalid_argument(format!(
                "tile address shifts {}/{} out of range",
                self.row_shift, self.col_shift
            )));
        }
        Ok(())
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_addr: defaults::BASE_ADDR,
            num_rows: defaults::NUM_ROWS,
            num_cols: defaults::NUM_COLS,
            row_shift: defaults::ROW_SHIFT,
            col_shift: defaults::COL_SHIFT,
            shim_row: defaults::SHIM_ROW,
            mem_tile_row_start: defaults::MEM_TILE_ROW_START,
            mem_tile_num_rows: defaults::MEM_TILE_NUM_ROWS,
            core: CoreMemoryLayout::default(),
        }
    }
}
