use std::fmt;

use thiserror::Error;

use crate::io::ParseError;
use crate::params::ConfigError;

/// Where in the input a write failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Line(usize),
    Offset(u64),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => write!(f, "line {line}"),
            Self::Offset(offset) => write!(f, "input offset {offset:#X}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to read input: {0}")]
    Read(#[from] std::io::Error),

    #[error("unable to write output at {location}: {source}")]
    Write {
        location: Location,
        #[source]
        source: std::io::Error,
    },

    #[error("missing end-of-file record after {lines} lines, conversion incomplete")]
    MissingEndOfFile { lines: usize },

    #[error("address overflow at line {line}: {address:#X} + {length} bytes exceeds 32 bits")]
    AddressOverflow {
        line: usize,
        address: u64,
        length: usize,
    },

    #[error(
        "record at line {line} starts at {address:#010X}, before the write position {expected:#010X}"
    )]
    AddressRegression {
        line: usize,
        address: u32,
        expected: u32,
    },
}
