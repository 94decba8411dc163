//! Memory-mapped register window.
//!
//! This module maps a region of a device file into the process with `mmap` and exposes it as a
//! word-granular memory. It provides:
//! 1. **Mapping:** `MappedWindow::open` maps `len` bytes at a page-aligned file offset.
//! 2. **Translation:** Absolute host addresses are rebased onto the mapping.
//! 3. **Access:** Volatile 32-bit loads and stores; accesses outside the window are dropped
//!    and dropped writes are counted.
//!
//! Any file that supports shared mappings works: `/dev/mem`, a UIO node, or a plain file used
//! as a memory dump.

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;

use tracing::{debug, warn};

use super::traits::{MemoryReader, MemoryWriter, WORD_BYTES};
use crate::common::{LoadError, Result};

/// A shared, writable mapping of part of a device file.
///
/// Host address `host_base` corresponds to the first byte of the mapping.
#[derive(Debug)]
pub struct MappedWindow {
    ptr: *mut u8,
    len: usize,
    host_base: u64,
    dropped: u64,
    _file: File,
}

// SAFETY: the mapping is owned exclusively by this value and is only accessed through
// `&self`/`&mut self` methods; the raw pointer is never handed out.
unsafe impl Send for MappedWindow {}

impl MappedWindow {
    /// Maps `len` bytes of `path` starting at file offset `offset`.
    ///
    /// # Arguments
    ///
    /// * `path` - Device or regular file to map.
    /// * `offset` - Page-aligned offset within the file.
    /// * `len` - Number of bytes to map.
    /// * `host_base` - Host address that the first mapped byte stands for.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty window or an unaligned offset and `Io` when
    /// the file cannot be opened or mapped.
    pub fn open(path: impl AsRef<Path>, offset: u64, len: usize, host_base: u64) -> Result<Self> {
        let path = path.as_ref();
        if len == 0 {
            return Err(LoadError::invalid_argument("empty mmio window"));
        }
        // SAFETY: sysconf has no preconditions.
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let page = u64::try_from(page).unwrap_or(4096);
        if offset % page != 0 {
            return Err(LoadError::invalid_argument(format!(
                "mmio offset {offset:#x} is not aligned to the {page:#x} byte page size"
            )));
        }
        let file_offset = libc::off_t::try_from(offset).map_err(|_| {
            LoadError::invalid_argument(format!("mmio offset {offset:#x} out of range"))
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| LoadError::io(path, e))?;

        // SAFETY: the fd is valid for the lifetime of `file`, which the window keeps alive;
        // the kernel validates `len` and `file_offset`.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                file_offset,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(LoadError::io(path, std::io::Error::last_os_error()));
        }

        debug!(path = %path.display(), offset, len, host_base, "mapped mmio window");
        Ok(Self {
            ptr: raw.cast::<u8>(),
            len,
            host_base,
            dropped: 0,
            _file: file,
        })
    }

    /// Size of the mapping in bytes.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Always `false`; empty windows cannot be created.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Host address of the first mapped byte.
    pub const fn host_base(&self) -> u64 {
        self.host_base
    }

    /// Number of writes dropped because they fell outside the window or were unaligned.
    pub const fn dropped_writes(&self) -> u64 {
        self.dropped
    }

    /// Offset of a word inside the mapping, if the whole aligned word is covered.
    fn word_offset(&self, addr: u64) -> Option<usize> {
        let offset = addr.checked_sub(self.host_base)?;
        if offset % WORD_BYTES != 0 {
            return None;
        }
        let offset = usize::try_from(offset).ok()?;
        (offset.checked_add(WORD_BYTES as usize)? <= self.len).then_some(offset)
    }
}

impl MemoryWriter for MappedWindow {
    fn write_u32(&mut self, addr: u64, val: u32) {
        let Some(offset) = self.word_offset(addr) else {
            warn!("write to {addr:#x} outside mmio window dropped");
            self.dropped += 1;
            return;
        };
        // SAFETY: `word_offset` guarantees the aligned word lies inside the live mapping.
        unsafe {
            self.ptr
                .add(offset)
                .cast::<u32>()
                .write_volatile(val.to_le());
        }
    }
}

impl MemoryReader for MappedWindow {
    fn read_u32(&self, addr: u64) -> u32 {
        let Some(offset) = self.word_offset(addr) else {
            warn!("read from {addr:#x} outside mmio window");
            return 0;
        };
        // SAFETY: `word_offset` guarantees the aligned word lies inside the live mapping.
        let raw = unsafe { self.ptr.add(offset).cast::<u32>().read_volatile() };
        u32::from_le(raw)
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe a mapping created in `open` and not yet unmapped.
        let _ = unsafe { libc::munmap(self.ptr.cast::<libc::c_void>(), self.len) };
    }
}
