//! Host-side sparse memory image.
//!
//! `SparseMemory` stands in for the device when no register window is mapped: the CLI uses it
//! for dry runs and the tests use it to read back what a load wrote. Only words that were
//! written are stored; everything else reads as zero.

use std::collections::BTreeMap;

use super::traits::{MemoryReader, MemoryWriter};

/// Word-addressed memory image keyed by absolute host address.
#[derive(Debug, Default, Clone)]
pub struct SparseMemory {
    words: BTreeMap<u64, u32>,
    writes: u64,
}

impl SparseMemory {
    /// Creates an empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct word addresses holding a value.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Total number of word writes received, rewrites included.
    pub const fn write_count(&self) -> u64 {
        self.writes
    }

    /// Iterates over `(address, word)` pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.words.iter().map(|(&addr, &val)| (addr, val))
    }

    /// Iterates over the words stored in `[start, end)`.
    pub fn range(&self, start: u64, end: u64) -> impl Iterator<Item = (u64, u32)> + '_ {
        self.words.range(start..end).map(|(&addr, &val)| (addr, val))
    }

    /// Drops every stored word and resets the write counter.
    pub fn clear(&mut self) {
        self.words.clear();
        self.writes = 0;
    }
}

impl MemoryWriter for SparseMemory {
    fn write_u32(&mut self, addr: u64, val: u32) {
        let _ = self.words.insert(addr, val);
        self.writes += 1;
    }
}

impl MemoryReader for SparseMemory {
    fn read_u32(&self, addr: u64) -> u32 {
        self.words.get(&addr).copied().unwrap_or(0)
    }
}
