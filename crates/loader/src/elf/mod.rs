//! ELF image parsing.
//!
//! Core programs arrive as 32-bit ELF executables. Only the file header and the program
//! header table matter to the loader; sections and symbols are ignored.
//! 1. **View:** `ByteView` gives bounds-checked access to the raw image.
//! 2. **Image:** `ElfImage` decodes the header and segment table with the `object` crate.

/// Parsed ELF header and program segments.
pub mod image;

/// Bounds-checked byte-range view.
pub mod view;

pub use image::{ElfHeader, ElfImage, Segment, SegmentKind};
pub use view::ByteView;
