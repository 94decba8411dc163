//! Common types used throughout the loader.
//!
//! This module provides the building blocks shared by the device, ELF, and loading layers:
//! 1. **Tile Locations:** Strongly typed grid coordinates.
//! 2. **Error Handling:** The load error enum, its category, and the crate result alias.

/// Tile coordinate type.
pub mod addr;

/// Error types for loading operations.
pub mod error;

pub use addr::TileLocation;
pub use error::{ErrorKind, LoadError, Result};
