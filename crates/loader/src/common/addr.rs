//! Tile location type.
//!
//! Grid coordinates are kept in a dedicated type so that a row can never be passed where a
//! column is expected, and so every layer formats locations the same way.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a tile in the device grid.
///
/// Row 0 is the shim row at the bottom of the array; rows grow northwards and columns grow
/// eastwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileLocation {
    /// Grid row.
    pub row: u8,
    /// Grid column.
    pub col: u8,
}

impl TileLocation {
    /// Creates a tile location.
    ///
    /// # Arguments
    ///
    /// * `row` - Grid row.
    /// * `col` - Grid column.
    #[inline]
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// Returns the location one row to the south, or `None` below row 0.
    #[inline]
    pub fn south(self) -> Option<Self> {
        self.row.checked_sub(1).map(|row| Self { row, ..self })
    }

    /// Returns the location one row to the north, or `None` on overflow.
    #[inline]
    pub fn north(self) -> Option<Self> {
        self.row.checked_add(1).map(|row| Self { row, ..self })
    }

    /// Returns the location one column to the west, or `None` left of column 0.
    #[inline]
    pub fn west(self) -> Option<Self> {
        self.col.checked_sub(1).map(|col| Self { col, ..self })
    }

    /// Returns the location one column to the east, or `None` on overflow.
    #[inline]
    pub fn east(self) -> Option<Self> {
        self.col.checked_add(1).map(|col| Self { col, ..self })
    }
}

impl fmt::Display for TileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(col {}, row {})", self.col, self.row)
    }
}
