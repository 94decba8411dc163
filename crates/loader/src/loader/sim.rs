//! Simulator side channel.
//!
//! When a program runs under the array simulator, the simulator also wants to know the
//! core's stack range and where to find the program's symbols. That information travels
//! over a separate command channel and never touches the memory write path.
//!
//! The loader holds a `SimChannel` chosen when it is built. `NullSimChannel` is inactive and
//! makes the loader skip the simulation steps entirely; `WriterSimChannel` renders commands
//! as text lines for a simulator command pipe.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use crate::common::{LoadError, Result, TileLocation};

/// Marker that identifies the stack line of a linker map file.
const STACK_MARKER: &str = "items) : Stack";

/// Stack address range of a core program, inclusive of both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackRange {
    /// First stack address.
    pub start: u32,
    /// Last stack address.
    pub end: u32,
}

impl StackRange {
    /// Extracts the stack range from the text of a linker map file.
    ///
    /// Looks for the first line of the form
    /// `    0x<start>..0x<end> ( <n> items) : Stack`.
    ///
    /// # Returns
    ///
    /// `None` if no line carries the stack marker or its addresses do not parse.
    pub fn parse_map(text: &str) -> Option<Self> {
        let line = text.lines().find(|l| l.contains(STACK_MARKER))?;
        let (start, rest) = line.trim_start().split_once("..")?;
        let start = parse_hex(start)?;
        let end = parse_hex(rest.split_whitespace().next()?)?;
        Some(Self { start, end })
    }
}

fn parse_hex(field: &str) -> Option<u32> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))?;
    u32::from_str_radix(digits, 16).ok()
}

/// Command sent to the simulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimCommand {
    /// Declare the stack range of the core at `loc`.
    SetStack {
        /// Core tile.
        loc: TileLocation,
        /// Stack range read from the map file.
        range: StackRange,
    },
    /// Ask the simulator to load symbols for the core at `loc` from an ELF file.
    LoadSymbols {
        /// Core tile.
        loc: TileLocation,
        /// Path of the ELF carrying the symbols.
        path: PathBuf,
    },
}

impl fmt::Display for SimCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetStack { loc, range } => write!(
                f,
                "SETSTACK {} {} {:#010x} {:#010x}",
                loc.col, loc.row, range.start, range.end
            ),
            Self::LoadSymbols { loc, path } => {
                write!(f, "LOADSYM {} {} {}", loc.col, loc.row, path.display())
            }
        }
    }
}

/// Destination for simulator commands.
pub trait SimChannel {
    /// Whether the loader should run the simulation steps at all.
    fn is_active(&self) -> bool {
        true
    }

    /// Delivers one command.
    ///
    /// # Errors
    ///
    /// Returns `Simulation` when the command cannot be delivered.
    fn send(&mut self, cmd: SimCommand) -> Result<()>;
}

/// Inactive channel used outside simulation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSimChannel;

impl SimChannel for NullSimChannel {
    fn is_active(&self) -> bool {
        false
    }

    fn send(&mut self, _cmd: SimCommand) -> Result<()> {
        Ok(())
    }
}

/// Channel writing one text line per command to any writer.
#[derive(Debug)]
pub struct WriterSimChannel<W: Write> {
    out: W,
}

impl<W: Write> WriterSimChannel<W> {
    /// Wraps a writer.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SimChannel for WriterSimChannel<W> {
    fn send(&mut self, cmd: SimCommand) -> Result<()> {
        writeln!(self.out, "{cmd}")
            .and_then(|()| self.out.flush())
            .map_err(|e| LoadError::simulation(format!("failed to send `{cmd}`: {e}")))
    }
}
