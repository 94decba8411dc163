//! ELF program loader for the tile grid of a spatial compute-array accelerator.
//!
//! This crate places a compiled core program into the distributed memories of a tile grid.
//! It covers the following:
//! 1. **Addressing:** Tile locations, host addresses, and checkerboard data-memory translation.
//! 2. **Device:** Immutable device context, tile classification, and memory-write backends.
//! 3. **ELF:** Bounds-checked views over 32-bit ELF images and their loadable segments.
//! 4. **Loading:** Segment splitting across data-memory banks and the per-tile load entry points.
//!
//! Raw memory writes go through the [`device::MemoryWriter`] trait so the same loading
//! logic drives a real memory-mapped window, a host-side image, or a test double.

/// Common types shared by every module (tile locations and errors).
pub mod common;
/// Device model configuration (grid geometry and core memory layout).
pub mod config;
/// Device context, tile classification, and memory-write backends.
pub mod device;
/// ELF image parsing over a bounds-checked byte view.
pub mod elf;
/// Address resolution, segment writing, and program loading.
pub mod loader;

/// Error type returned by every fallible operation; see [`common::error::LoadError`].
pub use crate::common::{LoadError, Result, TileLocation};
/// Device model configuration; start from `DeviceConfig::aie()` or deserialize from JSON.
pub use crate::config::DeviceConfig;
/// Immutable per-device context consumed by the loader.
pub use crate::device::DeviceContext;
/// Per-tile ELF loader; construct with `ProgramLoader::new`.
pub use crate::loader::ProgramLoader;
