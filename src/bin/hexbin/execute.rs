use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hexbin::{
    AddressMode, ConversionParams, ConversionSummary, Error, UndumpOptions, binary_to_intel,
    extract_fragments, intel_to_binary, undump_hex_ascii, undump_printable,
};
use tracing::info;

use crate::args::{Cli, Command, ToBinArgs, ToHexArgs, UndumpArgs};

pub(crate) fn run(cli: &Cli) -> Result<(), Error> {
    match &cli.command {
        Command::ToBin(args) => to_bin(args),
        Command::ToHex(args) => to_hex(args),
        Command::Undump(args) => undump(args),
    }
}

fn to_bin(args: &ToBinArgs) -> Result<(), Error> {
    let mut params = ConversionParams {
        address_offset: args.offset,
        ..Default::default()
    };
    params.set_padding_byte(args.padding)?;

    let input = BufReader::new(File::open(&args.streams.input)?);
    let output = BufWriter::new(File::create(&args.streams.output)?);
    let summary = intel_to_binary(input, output, &params)?;
    report(&summary, args.summary, &args.streams.output);
    Ok(())
}

fn to_hex(args: &ToHexArgs) -> Result<(), Error> {
    let mut params = ConversionParams {
        address_offset: args.offset,
        start_linear_address: args.start_linear,
        addressing: if args.segment {
            AddressMode::Segment
        } else {
            AddressMode::Linear
        },
        ..Default::default()
    };
    params.set_width(args.width)?;
    params.set_padding_byte(args.padding)?;
    params.set_padding_width(args.padding_width)?;

    let input = BufReader::new(File::open(&args.streams.input)?);
    let output = BufWriter::new(File::create(&args.streams.output)?);
    let summary = binary_to_intel(input, output, &params)?;
    report(&summary, args.summary, &args.streams.output);
    Ok(())
}

fn undump(args: &UndumpArgs) -> Result<(), Error> {
    let options = UndumpOptions {
        start: args.start as usize,
        limit: args.limit as usize,
    };
    let input = BufReader::new(File::open(&args.streams.input)?);
    let output = BufWriter::new(File::create(&args.streams.output)?);

    if args.extract_only {
        let lines = extract_fragments(input, output, &options)?;
        info!(lines, "columns extracted");
    } else if args.printable {
        let bytes = undump_printable(input, output)?;
        info!(bytes, "printable hex decoded");
    } else {
        let bytes = undump_hex_ascii(input, output, &options)?;
        info!(bytes, "hex dump decoded");
    }
    Ok(())
}

fn report(summary: &ConversionSummary, print: bool, output: &Path) {
    info!(output = %output.display(), bytes = summary.bytes_written, "written");
    if print {
        println!("{summary}");
    }
}
