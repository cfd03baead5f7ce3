use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::parse_util::number_arg;

#[derive(Parser, Debug)]
#[command(author, version, about = "Intel HEX <-> binary converter", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Convert an Intel HEX file into a raw binary image
    ToBin(ToBinArgs),
    /// Convert a raw binary image into an Intel HEX file
    ToHex(ToHexArgs),
    /// Convert a plain hex dump back into bytes
    Undump(UndumpArgs),
}

#[derive(Args, Debug)]
pub(crate) struct Streams {
    /// Input file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ToBinArgs {
    #[command(flatten)]
    pub streams: Streams,

    /// Address of the first output byte; records below it are skipped
    /// (default: address of the first data record)
    #[arg(long, value_parser = number_arg)]
    pub offset: Option<u32>,

    /// Byte used to fill gaps between records
    #[arg(long, value_parser = number_arg, default_value = "0xFF")]
    pub padding: u32,

    /// Print a conversion summary
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ToHexArgs {
    #[command(flatten)]
    pub streams: Streams,

    /// Address of the first input byte
    #[arg(long, value_parser = number_arg)]
    pub offset: Option<u32>,

    /// Data bytes per record (1-255)
    #[arg(long, value_parser = number_arg, default_value = "16")]
    pub width: u32,

    /// Padding byte value
    #[arg(long, value_parser = number_arg, default_value = "0xFF")]
    pub padding: u32,

    /// Minimum run of padding bytes replaced by an address jump (0 disables)
    #[arg(long, value_parser = number_arg, default_value = "0")]
    pub padding_width: u32,

    /// Entry point written as a start linear address record
    #[arg(long, value_parser = number_arg)]
    pub start_linear: Option<u32>,

    /// Use extended segment records instead of extended linear records
    #[arg(long)]
    pub segment: bool,

    /// Print a conversion summary
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args, Debug)]
pub(crate) struct UndumpArgs {
    #[command(flatten)]
    pub streams: Streams,

    /// Characters to skip at the start of every line
    #[arg(short, long, value_parser = number_arg, default_value = "0")]
    pub start: u32,

    /// Characters per line to keep after the start offset (0 = whole line)
    #[arg(short, long, value_parser = number_arg, default_value = "0")]
    pub limit: u32,

    /// Only copy the selected columns, without decoding them
    #[arg(short, long)]
    pub extract_only: bool,

    /// Decode every letter and digit of the input, ignoring the layout
    #[arg(short, long, conflicts_with = "extract_only")]
    pub printable: bool,
}
