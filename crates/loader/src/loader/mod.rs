//! Program loading onto core tiles.
//!
//! This module turns an ELF image into word writes against a tile's memories. It performs:
//! 1. **Resolution:** Maps a data-memory address onto the tile that owns it (`resolver`).
//! 2. **Writing:** Places one segment, splitting it at data-memory bank boundaries (`writer`).
//! 3. **Orchestration:** Validates the target and walks the segment table (`program`).
//! 4. **Simulation:** Optional side channel that feeds stack ranges and symbols to a simulator (`sim`).
//!
//! Data flows one way: `ProgramLoader` → `SectionWriter` → `AddressResolver` → `MemoryWriter`.

/// Per-tile ELF loading entry points.
pub mod program;

/// Data-memory address to tile resolution.
pub mod resolver;

/// Simulator side channel.
pub mod sim;

/// Segment placement and bank splitting.
pub mod writer;

pub use program::ProgramLoader;
pub use resolver::{AddressResolver, CardinalDir, GridResolver, InvalidCardinal, resolve_data_target};
pub use sim::{NullSimChannel, SimChannel, SimCommand, StackRange, WriterSimChannel};
pub use writer::{Burst, BurstKind, SectionWriter, SegmentReport};
