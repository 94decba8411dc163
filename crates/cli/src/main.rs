//! Command-line front end for the tile ELF loader.
//!
//! This binary wires the loader library to the outside world. It performs:
//! 1. **Device setup:** Builds a device context from a preset or a JSON config and marks it ready.
//! 2. **Load:** Places an ELF on one core tile through a mapped register window or a dry-run image.
//! 3. **Inspection:** Prints the effective device configuration as JSON.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use tileload_core::device::{MappedWindow, SparseMemory};
use tileload_core::loader::WriterSimChannel;
use tileload_core::{DeviceConfig, DeviceContext, LoadError, ProgramLoader, TileLocation};

#[derive(Parser, Debug)]
#[command(
    name = "tileload",
    author,
    version,
    about = "Load ELF programs onto the core tiles of a compute-array accelerator",
    long_about = "Load a core ELF onto one tile of the array.\n\nWithout --mmio the load runs against an in-memory image and reports what would be written.\n\nExamples:\n  tileload load --elf kernel.elf --col 3 --row 2\n  tileload load --elf kernel.elf --col 3 --row 2 --device aieml --mmio /dev/uio0\n  tileload show-config --device aieml"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DevicePreset {
    /// First-generation array (checkerboard).
    Aie,
    /// Second-generation array (memory tiles, no checkerboard).
    Aieml,
}

#[derive(clap::Args, Debug)]
struct DeviceArgs {
    /// Built-in device model.
    #[arg(long, value_enum, default_value = "aie")]
    device: DevicePreset,

    /// JSON device configuration; overrides --device.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load an ELF onto one core tile.
    Load {
        /// ELF file to load.
        #[arg(short, long)]
        elf: PathBuf,

        /// Tile column.
        #[arg(long)]
        col: u8,

        /// Tile row.
        #[arg(long)]
        row: u8,

        #[command(flatten)]
        device: DeviceArgs,

        /// Device file exposing the array's register space (e.g. /dev/uio0).
        #[arg(long)]
        mmio: Option<PathBuf>,

        /// Page-aligned offset of the register space within the device file.
        #[arg(long, default_value = "0", value_parser = parse_u64)]
        mmio_offset: u64,

        /// Number of bytes to map. Defaults to the span of the whole grid.
        #[arg(long, value_parser = parse_u64)]
        mmio_len: Option<u64>,

        /// Append simulator commands (stack range, symbols) to this file.
        #[arg(long)]
        sim_log: Option<PathBuf>,

        /// Ask the simulator to load symbols from the ELF. Needs --sim-log.
        #[arg(long)]
        load_symbols: bool,
    },

    /// Print the effective device configuration as JSON.
    ShowConfig {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Load {
            elf,
            col,
            row,
            device,
            mmio,
            mmio_offset,
            mmio_len,
            sim_log,
            load_symbols,
        } => cmd_load(
            &elf,
            TileLocation::new(row, col),
            &device,
            mmio.map(|path| (path, mmio_offset, mmio_len)),
            sim_log,
            load_symbols,
        ),
        Commands::ShowConfig { device } => cmd_show_config(&device),
    };

    if let Err(e) = result {
        error!("{e}");
        eprintln!("\n[!] {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_u64(s: &str) -> Result<u64, String> {
    let parsed = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .map_or_else(|| s.parse::<u64>(), |hex| u64::from_str_radix(hex, 16));
    parsed.map_err(|e| format!("invalid number `{s}`: {e}"))
}

fn device_config(args: &DeviceArgs) -> Result<DeviceConfig, LoadError> {
    match (&args.config, args.device) {
        (Some(path), _) => DeviceConfig::from_json_file(path),
        (None, DevicePreset::Aie) => Ok(DeviceConfig::aie()),
        (None, DevicePreset::Aieml) => Ok(DeviceConfig::aieml()),
    }
}

/// Builds the device, selects the memory backend, and loads the ELF onto one tile.
fn cmd_load(
    elf: &Path,
    loc: TileLocation,
    device: &DeviceArgs,
    mmio: Option<(PathBuf, u64, Option<u64>)>,
    sim_log: Option<PathBuf>,
    load_symbols: bool,
) -> Result<(), LoadError> {
    let mut ctx = DeviceContext::new(device_config(device)?)?;
    // Nothing else initialises the array when driven from the command line.
    ctx.mark_ready();

    let mut loader = ProgramLoader::new(&ctx);
    if let Some(path) = sim_log {
        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LoadError::io(&path, e))?;
        loader = loader.with_sim_channel(Box::new(WriterSimChannel::new(file)));
    } else if load_symbols {
        eprintln!("[!] --load-symbols has no effect without --sim-log");
    }

    println!("[*] Loading {} onto tile {loc}", elf.display());
    match mmio {
        Some((path, offset, len)) => {
            let len = len.unwrap_or_else(|| ctx.load_span());
            let len = usize::try_from(len)
                .map_err(|_| LoadError::invalid_argument(format!("mmio length {len:#x}")))?;
            let mut window = MappedWindow::open(&path, offset, len, ctx.base_addr())?;
            loader.load_from_path(&mut window, loc, elf, load_symbols)?;
            check_window(&window)?;
            println!("[*] Written through {}", path.display());
        }
        None => {
            let mut image = SparseMemory::new();
            loader.load_from_path(&mut image, loc, elf, load_symbols)?;
            print_dry_run(&image);
        }
    }
    Ok(())
}

/// Fails the load if any write missed the mapped window.
fn check_window(window: &MappedWindow) -> Result<(), LoadError> {
    match window.dropped_writes() {
        0 => Ok(()),
        n => Err(LoadError::invalid_argument(format!(
            "{n} writes fell outside the {:#x} byte mmio window; raise --mmio-len",
            window.len()
        ))),
    }
}

fn print_dry_run(image: &SparseMemory) {
    println!(
        "[*] Dry run: {} word writes, {} distinct words",
        image.write_count(),
        image.len()
    );
    let first = image.iter().next();
    let last = image.iter().last();
    if let (Some((lo, _)), Some((hi, _))) = (first, last) {
        println!("    host range {lo:#x}..={hi:#x}");
    }
}

fn cmd_show_config(device: &DeviceArgs) -> Result<(), LoadError> {
    let config = device_config(device)?;
    config.validate()?;
    let json = serde_json::to_string_pretty(&config)
        .map_err(|e| LoadError::invalid_argument(format!("config serialization: {e}")))?;
    println!("{json}");
    Ok(())
}
