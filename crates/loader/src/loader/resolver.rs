//! Data-memory address resolution.
//!
//! A core addresses four data-memory banks: its own and those of its neighbours. The bank is
//! selected by the address bits above the bank size, giving a cardinal direction code:
//!
//! | code | direction | target |
//! |------|-----------|--------|
//! | 4 | South | row − 1 |
//! | 5 | West  | column − 1 on odd rows, same tile on even rows |
//! | 6 | North | row + 1 |
//! | 7 | East  | column + 1 on even rows, same tile on odd rows |
//!
//! On checkerboard devices alternate rows are mirrored, which is why the horizontal cases
//! depend on row parity. Devices without a checkerboard behave as if every row were odd.

use thiserror::Error;
use tracing::error;

use crate::common::{LoadError, Result, TileLocation};
use crate::device::{DeviceContext, TileKind};

/// Cardinal direction encoded in a data-memory address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardinalDir {
    /// Bank of the tile below.
    South,
    /// West interface: own bank or the tile to the left.
    West,
    /// Bank of the tile above.
    North,
    /// East interface: own bank or the tile to the right.
    East,
}

/// A direction code outside 4..=7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid cardinal direction code {0}")]
pub struct InvalidCardinal(pub u32);

impl CardinalDir {
    /// Returns the address code of this direction.
    pub const fn code(self) -> u32 {
        match self {
            Self::South => 4,
            Self::West => 5,
            Self::North => 6,
            Self::East => 7,
        }
    }

    /// Decodes a direction code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCardinal` for any code other than 4, 5, 6 or 7.
    pub const fn decode(code: u32) -> std::result::Result<Self, InvalidCardinal> {
        match code {
            4 => Ok(Self::South),
            5 => Ok(Self::West),
            6 => Ok(Self::North),
            7 => Ok(Self::East),
            other => Err(InvalidCardinal(other)),
        }
    }
}

impl TryFrom<u32> for CardinalDir {
    type Error = InvalidCardinal;

    fn try_from(code: u32) -> std::result::Result<Self, Self::Error> {
        Self::decode(code)
    }
}

/// Strategy mapping a device-side data address to the tile that owns it.
pub trait AddressResolver {
    /// Resolves `addr`, seen from the core at `origin`, to the owning tile.
    ///
    /// # Errors
    ///
    /// Returns `AddressTranslation` when no core tile owns the address.
    fn resolve(&self, ctx: &DeviceContext, origin: TileLocation, addr: u32)
    -> Result<TileLocation>;
}

/// Resolver applying the grid's checkerboard rule; see [`resolve_data_target`].
#[derive(Clone, Copy, Debug, Default)]
pub struct GridResolver;

impl AddressResolver for GridResolver {
    fn resolve(
        &self,
        ctx: &DeviceContext,
        origin: TileLocation,
        addr: u32,
    ) -> Result<TileLocation> {
        resolve_data_target(ctx, origin, addr)
    }
}

/// Finds the tile whose data memory backs `addr` when accessed from `origin`.
///
/// Pure function of its inputs.
///
/// # Arguments
///
/// * `ctx` - Device context.
/// * `origin` - Tile the program is loaded onto.
/// * `addr` - Device-side data-memory address from the ELF.
///
/// # Returns
///
/// The owning tile: `origin` itself or one of its four neighbours.
///
/// # Errors
///
/// Returns `AddressTranslation` if the direction code is not 4..=7, the neighbour is
/// outside the grid, or the neighbour is not a core tile.
pub fn resolve_data_target(
    ctx: &DeviceContext,
    origin: TileLocation,
    addr: u32,
) -> Result<TileLocation> {
    let layout = ctx.core_layout();
    let dir = CardinalDir::decode(addr / layout.data_mem_size).map_err(|e| {
        error!("invalid data memory address {addr:#x}");
        LoadError::translation(addr, e.to_string())
    })?;

    let row_parity = if layout.is_checkerboard {
        origin.row % 2
    } else {
        1
    };

    let target = match dir {
        CardinalDir::South => origin.south(),
        CardinalDir::West if row_parity == 1 => origin.west(),
        CardinalDir::North => origin.north(),
        CardinalDir::East if row_parity == 0 => origin.east(),
        CardinalDir::West | CardinalDir::East => Some(origin),
    };

    let target = target.filter(|t| ctx.contains(*t)).ok_or_else(|| {
        error!("target row/col out of range for {addr:#x} from {origin}");
        LoadError::translation(
            addr,
            format!(
                "{dir:?} neighbour of {origin} is outside the {}x{} grid",
                ctx.num_rows(),
                ctx.num_cols()
            ),
        )
    })?;

    let kind = ctx.tile_kind(target);
    if kind != TileKind::Core {
        error!("invalid tile type {kind} at {target} for {addr:#x}");
        return Err(LoadError::translation(
            addr,
            format!("{dir:?} neighbour {target} is a {kind}"),
        ));
    }

    Ok(target)
}
