//! Load error definitions.
//!
//! This module defines the error handling for the loader. It provides:
//! 1. **Error Representation:** One variant per failure category, carrying enough context to log.
//! 2. **Categories:** A fieldless `ErrorKind` so callers can branch without matching fields.
//! 3. **Conversions:** ELF parse errors map onto `InvalidBinary`.
//!
//! Every error is returned by value. Nothing in the crate retries; a failed load leaves the
//! words already written in place.

use std::path::PathBuf;

use thiserror::Error;

use super::addr::TileLocation;
use crate::device::TileKind;

/// Result type alias for loading operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while loading a program onto a tile.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The device context is not ready or an argument is unusable (e.g. an empty buffer).
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// What was wrong with the argument.
        reason: String,
    },

    /// The target location is not a processing tile.
    #[error("Invalid tile type at {loc}: expected a core tile, found {kind}")]
    InvalidTileType {
        /// Location that was requested.
        loc: TileLocation,
        /// Kind of tile found there.
        kind: TileKind,
    },

    /// The ELF image is malformed or a segment falls outside the tile memories.
    #[error("Invalid ELF: {reason}")]
    InvalidBinary {
        /// Description of the malformation.
        reason: String,
    },

    /// A data-memory address could not be mapped onto a core tile.
    #[error("Address translation failed for {addr:#x}: {reason}")]
    AddressTranslation {
        /// Device-side address taken from the ELF.
        addr: u32,
        /// Why the address could not be mapped.
        reason: String,
    },

    /// The ELF (or its companion map file) could not be read.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The buffer for the ELF image could not be allocated.
    #[error("Failed to allocate {size} bytes for the ELF image")]
    AllocationFailure {
        /// Requested buffer size in bytes.
        size: u64,
    },

    /// The simulator side channel could not be prepared.
    #[error("Simulation setup failed: {reason}")]
    Simulation {
        /// Reason for failure.
        reason: String,
    },
}

/// Fieldless error category, one per `LoadError` variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`LoadError::InvalidArgument`].
    InvalidArgument,
    /// See [`LoadError::InvalidTileType`].
    InvalidTileType,
    /// See [`LoadError::InvalidBinary`].
    InvalidBinary,
    /// See [`LoadError::AddressTranslation`].
    AddressTranslation,
    /// See [`LoadError::Io`].
    Io,
    /// See [`LoadError::AllocationFailure`].
    AllocationFailure,
    /// See [`LoadError::Simulation`].
    Simulation,
}

impl LoadError {
    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create an invalid binary error
    pub fn invalid_binary(reason: impl Into<String>) -> Self {
        Self::InvalidBinary {
            reason: reason.into(),
        }
    }

    /// Create an address translation error
    pub fn translation(addr: u32, reason: impl Into<String>) -> Self {
        Self::AddressTranslation {
            addr,
            reason: reason.into(),
        }
    }

    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a simulation setup error
    pub fn simulation(reason: impl Into<String>) -> Self {
        Self::Simulation {
            reason: reason.into(),
        }
    }

    /// Returns the category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidTileType { .. } => ErrorKind::InvalidTileType,
            Self::InvalidBinary { .. } => ErrorKind::InvalidBinary,
            Self::AddressTranslation { .. } => ErrorKind::AddressTranslation,
            Self::Io { .. } => ErrorKind::Io,
            Self::AllocationFailure { .. } => ErrorKind::AllocationFailure,
            Self::Simulation { .. } => ErrorKind::Simulation,
        }
    }
}

impl From<object::read::Error> for LoadError {
    fn from(err: object::read::Error) -> Self {
        Self::invalid_binary(err.to_string())
    }
}
