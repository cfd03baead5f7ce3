pub mod convert;
pub mod error;
pub mod io;
pub mod params;

pub use convert::{
    ConversionSummary, ConvertError, Direction, Location, PaddingMap, StartLinear,
    binary_to_intel, intel_to_binary,
};
pub use error::Error;
pub use io::{
    BLOCK_SPAN, HexAsciiWriteOptions, ParseError, Record, RecordType, UndumpOptions,
    extract_fragments, line_fragment, parse_record, undump_hex_ascii, undump_printable,
    write_hex_ascii,
};
pub use params::{AddressMode, ConfigError, ConversionParams, DEFAULT_PADDING_BYTE, DEFAULT_WIDTH};
