//! ELF header and program segment table.
//!
//! This module decodes the parts of a 32-bit ELF executable that drive loading. It provides:
//! 1. **Header:** `ElfHeader`, a plain copy of the file header fields.
//! 2. **Segments:** `Segment`, one entry per program header, in table order.
//! 3. **Image:** `ElfImage`, which owns both and hands out bounds-checked segment bytes.
//!
//! Decoding is done by `object`, which validates the identification bytes, the header size,
//! and the program header entry size, and locates the table through `e_phoff`. Either byte
//! order is accepted.

use std::fmt;

use object::Endianness;
use object::elf::{FileHeader32, PT_LOAD, ProgramHeader32};
use object::read::elf::{FileHeader, ProgramHeader};
use tracing::debug;

use super::view::ByteView;
use crate::common::{LoadError, Result};

/// Copy of the ELF file header fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElfHeader {
    /// Object file type (`e_type`).
    pub e_type: u16,
    /// Target machine (`e_machine`).
    pub machine: u16,
    /// Object file version (`e_version`).
    pub version: u32,
    /// Entry point (`e_entry`).
    pub entry: u32,
    /// Program header table offset (`e_phoff`).
    pub phoff: u32,
    /// Section header table offset (`e_shoff`).
    pub shoff: u32,
    /// Processor flags (`e_flags`).
    pub flags: u32,
    /// Header size (`e_ehsize`).
    pub ehsize: u16,
    /// Program header entry size (`e_phentsize`).
    pub phentsize: u16,
    /// Program header count (`e_phnum`).
    pub phnum: u16,
    /// Section header entry size (`e_shentsize`).
    pub shentsize: u16,
    /// Section header count (`e_shnum`).
    pub shnum: u16,
    /// Section name string table index (`e_shstrndx`).
    pub shstrndx: u16,
}

/// Program header type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentKind {
    /// `PT_LOAD`: copied into device memory.
    Load,
    /// Any other type; skipped by the loader.
    Other(u32),
}

impl From<u32> for SegmentKind {
    fn from(p_type: u32) -> Self {
        if p_type == PT_LOAD {
            Self::Load
        } else {
            Self::Other(p_type)
        }
    }
}

/// One program header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Segment type.
    pub kind: SegmentKind,
    /// Offset of the file-backed bytes in the image.
    pub offset: u32,
    /// Virtual address.
    pub vaddr: u32,
    /// Device-side physical address the segment is placed at.
    pub paddr: u32,
    /// Number of bytes backed by the file.
    pub file_size: u32,
    /// Number of bytes occupied in memory; the excess over `file_size` is zero-filled.
    pub mem_size: u32,
    /// Permission flags.
    pub flags: u32,
    /// Required alignment.
    pub align: u32,
}

impl Segment {
    /// Returns `true` for `PT_LOAD` segments.
    #[inline]
    pub fn is_loadable(&self) -> bool {
        self.kind == SegmentKind::Load
    }

    /// First device address past the in-memory extent.
    #[inline]
    pub fn mem_end(&self) -> u64 {
        u64::from(self.paddr) + u64::from(self.mem_size)
    }

    fn from_program_header(ph: &ProgramHeader32<Endianness>, endian: Endianness) -> Self {
        Self {
            kind: SegmentKind::from(ph.p_type(endian)),
            offset: ph.p_offset(endian),
            vaddr: ph.p_vaddr(endian),
            paddr: ph.p_paddr(endian),
            file_size: ph.p_filesz(endian),
            mem_size: ph.p_memsz(endian),
            flags: ph.p_flags(endian),
            align: ph.p_align(endian),
        }
    }
}

/// A parsed ELF image borrowing the underlying buffer.
#[derive(Clone, Debug)]
pub struct ElfImage<'data> {
    view: ByteView<'data>,
    header: ElfHeader,
    segments: Vec<Segment>,
}

impl<'data> ElfImage<'data> {
    /// Parses the file header and program header table of a 32-bit ELF image.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinary` if the buffer is not a 32-bit ELF file or the program header
    /// table does not fit inside it.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let ehdr = FileHeader32::<Endianness>::parse(data)?;
        let endian = ehdr.endian()?;
        let header = ElfHeader {
            e_type: ehdr.e_type(endian),
            machine: ehdr.e_machine(endian),
            version: ehdr.e_version(endian),
            entry: ehdr.e_entry(endian),
            phoff: ehdr.e_phoff(endian),
            shoff: ehdr.e_shoff(endian),
            flags: ehdr.e_flags(endian),
            ehsize: ehdr.e_ehsize(endian),
            phentsize: ehdr.e_phentsize(endian),
            phnum: ehdr.e_phnum(endian),
            shentsize: ehdr.e_shentsize(endian),
            shnum: ehdr.e_shnum(endian),
            shstrndx: ehdr.e_shstrndx(endian),
        };
        log_header(&header);

        let segments = ehdr
            .program_headers(endian, data)?
            .iter()
            .map(|ph| Segment::from_program_header(ph, endian))
            .collect();

        Ok(Self {
            view: ByteView::new(data),
            header,
            segments,
        })
    }

    /// Returns the decoded file header.
    pub const fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// Returns every program header in table order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the file-backed bytes of a segment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBinary` if `offset + file_size` runs past the end of the image.
    pub fn segment_data(&self, segment: &Segment) -> Result<&'data [u8]> {
        self.view
            .slice(u64::from(segment.offset), u64::from(segment.file_size))
            .map(|v| v.as_bytes())
            .map_err(|e| match e {
                LoadError::InvalidBinary { reason } => LoadError::invalid_binary(format!(
                    "segment at {:#x}: {reason}",
                    segment.paddr
                )),
                other => other,
            })
    }
}

/// Formats a header word as zero-padded hex in log fields.
pub(crate) struct Hex(pub(crate) u32);

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

fn log_header(h: &ElfHeader) {
    debug!(
        e_type = %Hex(u32::from(h.e_type)),
        e_machine = %Hex(u32::from(h.machine)),
        e_version = %Hex(h.version),
        e_entry = %Hex(h.entry),
        e_phoff = %Hex(h.phoff),
        e_shoff = %Hex(h.shoff),
        e_flags = %Hex(h.flags),
        e_ehsize = h.ehsize,
        e_phentsize = h.phentsize,
        e_phnum = h.phnum,
        e_shentsize = h.shentsize,
        e_shnum = h.shnum,
        e_shstrndx = h.shstrndx,
        "elf header"
    );
}
