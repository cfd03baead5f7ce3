use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed record at line {line}: {message}")]
    MalformedLine { line: usize, message: String },

    #[error("invalid hex digit at line {line}: {char:?}")]
    InvalidHexDigit { line: usize, char: char },

    #[error("unknown record type at line {line}: {record_type:02X}")]
    UnknownRecordType { line: usize, record_type: u8 },

    #[error(
        "missing payload at line {line}: record declares {declared} bytes, line holds {available}"
    )]
    MissingPayload {
        line: usize,
        declared: usize,
        available: usize,
    },

    #[error("checksum mismatch at line {line}: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch {
        line: usize,
        expected: u8,
        actual: u8,
    },

    #[error("unsupported start linear address width at line {line}: {width} bytes")]
    UnsupportedStartLinearWidth { line: usize, width: usize },

    #[error("extended address record at line {line} must have 2 data bytes, got {width}")]
    InvalidExtendedAddress { line: usize, width: usize },
}

