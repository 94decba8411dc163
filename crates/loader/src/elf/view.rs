//! Bounds-checked byte-range view.
//!
//! Every read from the ELF buffer goes through `ByteView`, which carries the absolute offset
//! of its first byte so that out-of-range requests can be reported against the whole image.
//! A read past the end is an `InvalidBinary` error, never a panic.

use crate::common::{LoadError, Result};

/// Immutable window over a byte buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteView<'data> {
    data: &'data [u8],
    base: u64,
}

impl<'data> ByteView<'data> {
    /// Creates a view covering all of `data`.
    pub const fn new(data: &'data [u8]) -> Self {
        Self { data, base: 0 }
    }

    /// Number of bytes in the view.
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the view covers no bytes.
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute offset of the first byte within the original buffer.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Returns the viewed bytes.
    pub const fn as_bytes(&self) -> &'data [u8] {
        self.data
    }

    /// Narrows the view to `len` bytes starting at `offset`.
    ///
    /// # Arguments
    ///
    /// * `offset` - Start, relative to this view.
    /// * `len` - Number of bytes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinary` if the range is not entirely inside the view.
    pub fn slice(&self, offset: u64, len: u64) -> Result<Self> {
        let out_of_range = || {
            LoadError::invalid_binary(format!(
                "range {:#x}..{:#x} exceeds {:#x} byte image",
                self.base.saturating_add(offset),
                self.base.saturating_add(offset).saturating_add(len),
                self.base.saturating_add(self.data.len() as u64),
            ))
        };
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let len_usize = usize::try_from(len).map_err(|_| out_of_range())?;
        let end = start.checked_add(len_usize).ok_or_else(out_of_range)?;
        let data = self.data.get(start..end).ok_or_else(out_of_range)?;
        Ok(Self {
            data,
            base: self.base + offset,
        })
    }
}
