//! pixbridge - raw array inspection and conversion
//!
//! Reads raw N-dimensional arrays through the native 4-axis pixel buffer and
//! writes them back in another axis order or element type.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pixbridge_core::{AxisPermutation, CastPolicy, DType};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pixbridge")]
#[command(author, version, about = "Raw array inspection and conversion")]
#[command(long_about = "
Imports raw arrays into native x, y, z, c pixel buffers and exports them again.

Shapes are listed in the order given by --order, slowest axis first.

Examples:
  pixbridge inspect frame.raw --shape 480x640x3 --dtype uint8 --order yxc
  pixbridge convert frame.raw planar.raw --shape 480x640x3 --order yxc --to-order cyx
  pixbridge convert depth.raw depth8.raw --shape 480x640 --dtype float32 --order yx \\
      --to-dtype uint8 --policy clamp
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how a raw array maps onto the native buffer
    #[command(visible_alias = "i")]
    Inspect(InspectArgs),

    /// Re-export a raw array in another axis order or element type
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),
}

/// Layout of a raw input file.
#[derive(Args, Clone, Debug)]
struct RawLayout {
    /// Array shape, slowest axis first (e.g. 480x640x3 or 480,640,3)
    #[arg(short, long)]
    shape: commands::Shape,

    /// Element type of the file (uint8, float32, <f4, ...)
    #[arg(short, long, default_value = "uint8")]
    dtype: DType,

    /// Axis labels of the shape (e.g. yxc); defaults to the native prefix
    #[arg(short, long)]
    order: Option<AxisPermutation>,
}

#[derive(Args)]
struct InspectArgs {
    /// Raw input file
    input: PathBuf,

    #[command(flatten)]
    layout: RawLayout,
}

#[derive(Args)]
struct ConvertArgs {
    /// Raw input file
    input: PathBuf,

    /// Raw output file
    output: PathBuf,

    #[command(flatten)]
    layout: RawLayout,

    /// Output element type (defaults to the input type)
    #[arg(long)]
    to_dtype: Option<DType>,

    /// Output axis order (defaults to the input order)
    #[arg(long)]
    to_order: Option<AxisPermutation>,

    /// Cast policy: clamp, wrap, truncate
    #[arg(long, default_value = "clamp")]
    policy: CastPolicy,

    /// Export a single depth plane
    #[arg(long, allow_hyphen_values = true)]
    plane: Option<i64>,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Inspect(args) => commands::inspect::run(args, cli.verbose),
        Commands::Convert(args) => commands::convert::run(args, cli.verbose),
    }
}
