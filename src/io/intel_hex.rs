//! Intel HEX record model, checksum and line codec.
//!
//! Wire format, one record per line:
//!
//! ```text
//! :LLAAAATT[DD...]CC
//! ```

use std::fmt;

use super::ParseError;

pub const RECORD_DATA: u8 = 0x00;
pub const RECORD_EOF: u8 = 0x01;
pub const RECORD_EXTENDED_SEGMENT: u8 = 0x02;
pub const RECORD_EXTENDED_LINEAR: u8 = 0x04;
pub const RECORD_START_LINEAR: u8 = 0x05;

/// Addressable span of one extended-address block.
pub const BLOCK_SPAN: u32 = 0x1_0000;

const START_CHAR: u8 = b':';
/// LL + AAAA + TT + CC digits.
const MIN_RECORD_DIGITS: usize = 2 + 4 + 2 + 2;
const PAYLOAD_DIGITS_AT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Data,
    EndOfFile,
    ExtendedSegmentAddress,
    ExtendedLinearAddress,
    StartLinearAddress,
}

impl RecordType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            RECORD_DATA => Some(Self::Data),
            RECORD_EOF => Some(Self::EndOfFile),
            RECORD_EXTENDED_SEGMENT => Some(Self::ExtendedSegmentAddress),
            RECORD_EXTENDED_LINEAR => Some(Self::ExtendedLinearAddress),
            RECORD_START_LINEAR => Some(Self::StartLinearAddress),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Data => RECORD_DATA,
            Self::EndOfFile => RECORD_EOF,
            Self::ExtendedSegmentAddress => RECORD_EXTENDED_SEGMENT,
            Self::ExtendedLinearAddress => RECORD_EXTENDED_LINEAR,
            Self::StartLinearAddress => RECORD_START_LINEAR,
        }
    }
}

/// One Intel HEX line.
///
/// `address` holds only the lower 16 bits; extended addressing is tracked
/// by the conversion engines. The payload length is the record's `LL` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub record_type: RecordType,
    pub address: u16,
    pub payload: Vec<u8>,
    pub checksum: u8,
}

impl Record {
    /// Build a record with a freshly computed checksum. The address of
    /// non-Data records is normalized to 0.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is longer than 255 bytes.
    pub fn new(record_type: RecordType, address: u16, payload: Vec<u8>) -> Self {
        assert!(
            payload.len() <= u8::MAX as usize,
            "record payload of {} bytes exceeds 255",
            payload.len()
        );
        let address = if record_type == RecordType::Data {
            address
        } else {
            0
        };
        let mut record = Self {
            record_type,
            address,
            payload,
            checksum: 0,
        };
        record.checksum = record.compute_checksum();
        record
    }

    pub fn data(address: u16, payload: &[u8]) -> Self {
        Self::new(RecordType::Data, address, payload.to_vec())
    }

    pub fn end_of_file() -> Self {
        Self::new(RecordType::EndOfFile, 0, Vec::new())
    }

    /// Extended linear address record selecting the block holding `address`.
    pub fn extended_linear(address: u32) -> Self {
        let upper = (address >> 16) as u16;
        Self::new(
            RecordType::ExtendedLinearAddress,
            0,
            upper.to_be_bytes().to_vec(),
        )
    }

    /// Extended segment address record selecting the block holding `address`.
    /// Only meaningful below 1 MiB.
    pub fn extended_segment(address: u32) -> Self {
        let segment = ((address >> 4) & 0xF000) as u16;
        Self::new(
            RecordType::ExtendedSegmentAddress,
            0,
            segment.to_be_bytes().to_vec(),
        )
    }

    /// Start linear address record using the narrowest of 1, 2 or 4 bytes.
    pub fn start_linear(address: u32) -> Self {
        let payload = if address > 0xFFFF {
            address.to_be_bytes().to_vec()
        } else if address > 0xFF {
            (address as u16).to_be_bytes().to_vec()
        } else {
            vec![address as u8]
        };
        Self::new(RecordType::StartLinearAddress, 0, payload)
    }

    /// Payload byte count (`LL`).
    pub fn len(&self) -> u8 {
        self.payload.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Two's complement of the byte sum of every field before the checksum.
    pub fn compute_checksum(&self) -> u8 {
        let [addr_hi, addr_lo] = self.address.to_be_bytes();
        let sum = self
            .payload
            .iter()
            .fold(self.len(), |acc, &b| acc.wrapping_add(b))
            .wrapping_add(self.record_type.as_byte())
            .wrapping_add(addr_hi)
            .wrapping_add(addr_lo);
        (!sum).wrapping_add(1)
    }

    /// Base address carried by an extended segment/linear record.
    pub fn extended_base(&self, line: usize) -> Result<u32, ParseError> {
        let [hi, lo] = self.payload[..] else {
            return Err(ParseError::InvalidExtendedAddress {
                line,
                width: self.payload.len(),
            });
        };
        let value = u16::from_be_bytes([hi, lo]) as u32;
        Ok(match self.record_type {
            RecordType::ExtendedSegmentAddress => value << 4,
            _ => value << 16,
        })
    }

    /// Big-endian entry point of a start linear record and its byte width.
    pub fn start_linear_address(&self, line: usize) -> Result<(u32, u8), ParseError> {
        let address = match self.payload[..] {
            [b0] => b0 as u32,
            [b0, b1] => u16::from_be_bytes([b0, b1]) as u32,
            [b0, b1, b2, b3] => u32::from_be_bytes([b0, b1, b2, b3]),
            _ => {
                return Err(ParseError::UnsupportedStartLinearWidth {
                    line,
                    width: self.payload.len(),
                });
            }
        };
        Ok((address, self.len()))
    }

    /// Append the encoded line, newline included.
    pub fn encode_into(&self, output: &mut Vec<u8>) {
        let address = if self.record_type == RecordType::Data {
            self.address
        } else {
            0
        };
        let [addr_hi, addr_lo] = address.to_be_bytes();

        output.push(START_CHAR);
        write_hex_byte(output, self.len());
        write_hex_byte(output, addr_hi);
        write_hex_byte(output, addr_lo);
        write_hex_byte(output, self.record_type.as_byte());
        for &b in &self.payload {
            write_hex_byte(output, b);
        }
        write_hex_byte(output, self.checksum);
        output.push(b'\n');
    }

    pub fn to_line(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::with_capacity(1 + 2 * (5 + self.payload.len()) + 1);
        self.encode_into(&mut buf);
        // encode_into only emits ASCII
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Decode one Intel HEX line. `line` must already be stripped of its line
/// terminator; `line_num` is 1-based and only used for error reporting.
pub fn parse_record(line: &str, line_num: usize) -> Result<Record, ParseError> {
    let bytes = line.as_bytes();

    if bytes.first() != Some(&START_CHAR) {
        return Err(ParseError::MalformedLine {
            line: line_num,
            message: "line does not start with ':'".to_string(),
        });
    }

    let digits = &bytes[1..];
    if digits.len() < MIN_RECORD_DIGITS {
        return Err(ParseError::MalformedLine {
            line: line_num,
            message: format!(
                "record too short: {} hex digits, minimum is {MIN_RECORD_DIGITS}",
                digits.len()
            ),
        });
    }

    let length = decode_byte(digits, 0, line_num)?;
    let address = u16::from_be_bytes([
        decode_byte(digits, 2, line_num)?,
        decode_byte(digits, 4, line_num)?,
    ]);
    let type_byte = decode_byte(digits, 6, line_num)?;
    let record_type =
        RecordType::from_byte(type_byte).ok_or(ParseError::UnknownRecordType {
            line: line_num,
            record_type: type_byte,
        })?;

    let declared = length as usize;
    let available = (digits.len() - MIN_RECORD_DIGITS) / 2;
    if (record_type == RecordType::Data && declared == 0) || available < declared {
        return Err(ParseError::MissingPayload {
            line: line_num,
            declared,
            available,
        });
    }

    let payload = (0..declared)
        .map(|i| decode_byte(digits, PAYLOAD_DIGITS_AT + 2 * i, line_num))
        .collect::<Result<Vec<u8>, _>>()?;
    let checksum = decode_byte(digits, PAYLOAD_DIGITS_AT + 2 * declared, line_num)?;

    let trailing = digits.len() - MIN_RECORD_DIGITS - 2 * declared;
    if trailing > 0 {
        return Err(ParseError::MalformedLine {
            line: line_num,
            message: format!("{trailing} unexpected characters after the checksum"),
        });
    }

    let record = Record {
        record_type,
        address,
        payload,
        checksum,
    };

    let expected = record.compute_checksum();
    if expected != checksum {
        return Err(ParseError::ChecksumMismatch {
            line: line_num,
            expected,
            actual: checksum,
        });
    }

    Ok(record)
}

pub(crate) fn write_hex_byte(output: &mut Vec<u8>, byte: u8) {
    const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";
    output.push(HEX_CHARS[(byte >> 4) as usize]);
    output.push(HEX_CHARS[(byte & 0x0F) as usize]);
}

pub(crate) fn hex_digit(b: u8, line_num: usize) -> Result<u8, ParseError> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        _ => Err(ParseError::InvalidHexDigit {
            line: line_num,
            char: b as char,
        }),
    }
}

fn decode_byte(digits: &[u8], at: usize, line_num: usize) -> Result<u8, ParseError> {
    let high = hex_digit(digits[at], line_num)?;
    let low = hex_digit(digits[at + 1], line_num)?;
    Ok((high << 4) | low)
}
