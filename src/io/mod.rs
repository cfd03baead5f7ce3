mod error;
mod hex_ascii;
mod intel_hex;

pub use error::ParseError;
pub use hex_ascii::{
    HexAsciiWriteOptions, UndumpOptions, extract_fragments, line_fragment, undump_hex_ascii,
    undump_printable, write_hex_ascii,
};
pub use intel_hex::{BLOCK_SPAN, Record, RecordType, parse_record};
