//! Word-granular memory access traits.
//!
//! The loader never touches device memory directly. Every store goes through `MemoryWriter`,
//! whose only required method is the 32-bit write primitive; bursts are built on top of it.
//! `MemoryReader` is the matching read primitive, used to verify what a load produced.

/// Size of one device word in bytes.
pub const WORD_BYTES: u64 = 4;

/// Sink for 32-bit stores at absolute host addresses.
///
/// Individual word writes are assumed to succeed; failures are not modelled at this layer.
pub trait MemoryWriter {
    /// Writes one little-endian word at a host address.
    fn write_u32(&mut self, addr: u64, val: u32);

    /// Writes a contiguous byte slice starting at `addr`, one word at a time.
    ///
    /// A trailing partial word is padded with zero bytes.
    fn write_block(&mut self, addr: u64, data: &[u8]) {
        let mut offset = addr;
        for chunk in data.chunks(WORD_BYTES as usize) {
            let mut word = [0u8; WORD_BYTES as usize];
            word[..chunk.len()].copy_from_slice(chunk);
            self.write_u32(offset, u32::from_le_bytes(word));
            offset += WORD_BYTES;
        }
    }

    /// Writes zero words covering `len` bytes starting at `addr` (rounded up to a word).
    fn fill_zero(&mut self, addr: u64, len: u64) {
        let mut offset = 0;
        while offset < len {
            self.write_u32(addr + offset, 0);
            offset += WORD_BYTES;
        }
    }
}

/// Source of 32-bit loads at absolute host addresses.
pub trait MemoryReader {
    /// Reads one little-endian word at a host address.
    fn read_u32(&self, addr: u64) -> u32;

    /// Reads `len` bytes starting at `addr`.
    fn read_bytes(&self, addr: u64, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len.next_multiple_of(WORD_BYTES as usize));
        let mut offset = addr;
        while out.len() < len {
            out.extend_from_slice(&self.read_u32(offset).to_le_bytes());
            offset += WORD_BYTES;
        }
        out.truncate(len);
        out
    }
}

impl<W: MemoryWriter + ?Sized> MemoryWriter for &mut W {
    fn write_u32(&mut self, addr: u64, val: u32) {
        (**self).write_u32(addr, val);
    }

    fn write_block(&mut self, addr: u64, data: &[u8]) {
        (**self).write_block(addr, data);
    }

    fn fill_zero(&mut self, addr: u64, len: u64) {
        (**self).fill_zero(addr, len);
    }
}
