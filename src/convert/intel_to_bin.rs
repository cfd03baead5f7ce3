use std::io::{BufRead, Write};

use tracing::{debug, info, warn};

use super::error::{ConvertError, Location};
use super::padding::BUFFER_SIZE;
use super::summary::{ConversionSummary, Direction, ImageDigest, StartLinear};
use crate::io::{BLOCK_SPAN, ParseError, Record, RecordType, parse_record};
use crate::params::ConversionParams;

const ADDRESS_SPACE: u64 = 1 << 32;

/// Extended base addresses. Segment and linear records update separate
/// slots; a Data record is placed at their sum plus its own address.
#[derive(Debug, Clone, Copy, Default)]
struct ExtendedBases {
    linear: u32,
    segment: u32,
}

impl ExtendedBases {
    fn base(&self) -> u64 {
        self.linear as u64 + self.segment as u64
    }
}

/// Convert Intel HEX text into a flat binary image.
///
/// The first output byte sits at the address floor (`address_offset`, or the
/// first Data record's address when unset). Gaps between records are filled
/// with `padding_byte`; records wholly below the floor are skipped.
pub fn intel_to_binary<R: BufRead, W: Write>(
    input: R,
    output: W,
    params: &ConversionParams,
) -> Result<ConversionSummary, ConvertError> {
    params.validate()?;
    IntelToBinary::new(output, params).run(input)
}

struct IntelToBinary<'p, W> {
    output: W,
    params: &'p ConversionParams,
    bases: ExtendedBases,
    floor: Option<u64>,
    /// Absolute address of the next output byte.
    cursor: Option<u64>,
    start_linear: Option<StartLinear>,
    bytes_written: u64,
    skipped_records: usize,
    digest: ImageDigest,
}

impl<'p, W: Write> IntelToBinary<'p, W> {
    fn new(output: W, params: &'p ConversionParams) -> Self {
        Self {
            output,
            params,
            bases: ExtendedBases::default(),
            floor: params.address_offset.map(u64::from),
            cursor: None,
            start_linear: None,
            bytes_written: 0,
            skipped_records: 0,
            digest: ImageDigest::new(),
        }
    }

    fn run<R: BufRead>(mut self, mut input: R) -> Result<ConversionSummary, ConvertError> {
        info!(offset = ?self.params.address_offset, "converting Intel HEX to binary");

        let mut raw = Vec::with_capacity(128);
        let mut line_num = 0usize;

        loop {
            raw.clear();
            if input.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            line_num += 1;

            let line = std::str::from_utf8(&raw)
                .map_err(|e| ParseError::MalformedLine {
                    line: line_num,
                    message: format!("invalid UTF-8: {e}"),
                })?
                .trim_end_matches(['\r', '\n']);

            let record = parse_record(line, line_num)?;
            match record.record_type {
                RecordType::Data => self.write_data(&record, line_num)?,
                RecordType::ExtendedLinearAddress => {
                    let base = record.extended_base(line_num)?;
                    let previous = std::mem::replace(&mut self.bases.linear, base);
                    self.trace_jump("linear", previous, base, line_num);
                }
                RecordType::ExtendedSegmentAddress => {
                    let base = record.extended_base(line_num)?;
                    let previous = std::mem::replace(&mut self.bases.segment, base);
                    self.trace_jump("segment", previous, base, line_num);
                }
                RecordType::StartLinearAddress => match record.start_linear_address(line_num) {
                    Ok((address, width)) => {
                        debug!(line = line_num, address, width, "start linear address");
                        self.start_linear = Some(StartLinear { address, width });
                    }
                    Err(e) => warn!("{e}, address left unset"),
                },
                RecordType::EndOfFile => {
                    self.output.flush().map_err(|source| ConvertError::Write {
                        location: Location::Line(line_num),
                        source,
                    })?;
                    return Ok(self.finish(line_num));
                }
            }
        }

        Err(ConvertError::MissingEndOfFile { lines: line_num })
    }

    fn trace_jump(&self, kind: &str, previous: u32, base: u32, line: usize) {
        if previous.abs_diff(base) > BLOCK_SPAN {
            debug!(
                line,
                kind,
                from = previous,
                to = base,
                "extended address jumps over more than one block"
            );
        } else {
            debug!(line, kind, base, "extended address");
        }
    }

    fn write_data(&mut self, record: &Record, line: usize) -> Result<(), ConvertError> {
        let start = self.bases.base() + record.address as u64;
        let length = record.payload.len();
        let end = start + length as u64;
        if end > ADDRESS_SPACE {
            return Err(ConvertError::AddressOverflow {
                line,
                address: start,
                length,
            });
        }

        let floor = *self.floor.get_or_insert(start);
        if end <= floor {
            warn!(
                line,
                address = format_args!("{start:#X}"),
                offset = format_args!("{floor:#X}"),
                "off-range address, record skipped"
            );
            self.skipped_records += 1;
            return Ok(());
        }

        let skip = floor.saturating_sub(start);
        let write_at = start + skip;
        let cursor = *self.cursor.get_or_insert(floor);
        if write_at < cursor {
            return Err(ConvertError::AddressRegression {
                line,
                address: write_at as u32,
                expected: cursor as u32,
            });
        }
        if write_at > cursor {
            debug!(line, gap = write_at - cursor, "filling gap with padding");
            self.write_padding(write_at - cursor, line)?;
        }

        let bytes = &record.payload[skip as usize..];
        self.write_bytes(bytes, line)?;
        self.cursor = Some(end);
        Ok(())
    }

    fn write_padding(&mut self, mut count: u64, line: usize) -> Result<(), ConvertError> {
        let block = [self.params.padding_byte; BUFFER_SIZE];
        while count > 0 {
            let n = count.min(BUFFER_SIZE as u64) as usize;
            self.write_bytes(&block[..n], line)?;
            count -= n as u64;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8], line: usize) -> Result<(), ConvertError> {
        self.output
            .write_all(bytes)
            .map_err(|source| ConvertError::Write {
                location: Location::Line(line),
                source,
            })?;
        self.digest.update(bytes);
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    fn finish(self, lines: usize) -> ConversionSummary {
        info!(lines, bytes = self.bytes_written, "conversion complete");
        ConversionSummary {
            direction: Direction::IntelToBinary,
            lines,
            bytes_written: self.bytes_written,
            address_offset: self.floor.unwrap_or(0) as u32,
            start_linear: self.start_linear,
            padding_runs: None,
            skipped_records: self.skipped_records,
            image_crc32: self.digest.finalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn convert(
        text: &str,
        params: &ConversionParams,
    ) -> Result<(Vec<u8>, ConversionSummary), ConvertError> {
        let mut out = Vec::new();
        let summary = intel_to_binary(Cursor::new(text), &mut out, params)?;
        Ok((out, summary))
    }

    fn hex(records: &[Record]) -> String {
        records.iter().map(Record::to_line).collect()
    }

    #[test]
    fn test_simple_image() {
        let text = ":10010000214601360121470136007EFE09D2190140\n\
                    :100110002146017E17C20001FF5F16002148011928\n\
                    :00000001FF\n";
        let (out, summary) = convert(text, &ConversionParams::default()).unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(&out[..4], &[0x21, 0x46, 0x01, 0x36]);
        assert_eq!(summary.address_offset, 0x0100);
        assert_eq!(summary.lines, 3);
        assert_eq!(summary.bytes_written, 32);
    }

    #[test]
    fn test_extended_linear_and_start_linear() {
        let text = hex(&[
            Record::extended_linear(0x0800_0000),
            Record::data(0x0000, &[1, 2, 3, 4]),
            Record::start_linear(0x0800_0131),
            Record::end_of_file(),
        ]);
        let (out, summary) = convert(&text, &ConversionParams::default()).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
        assert_eq!(summary.address_offset, 0x0800_0000);
        assert_eq!(
            summary.start_linear,
            Some(StartLinear {
                address: 0x0800_0131,
                width: 4
            })
        );
    }

    #[test]
    fn test_gap_across_blocks_is_padded() {
        let text = hex(&[
            Record::extended_linear(0),
            Record::data(0xFFFE, &[0xAA, 0xBB]),
            Record::extended_linear(0x0002_0000),
            Record::data(0x0000, &[0xCC]),
            Record::end_of_file(),
        ]);
        let (out, _) = convert(&text, &ConversionParams::default()).unwrap();
        assert_eq!(out.len(), 2 + 0x1_0000 + 1);
        assert_eq!(&out[..2], &[0xAA, 0xBB]);
        assert!(out[2..out.len() - 1].iter().all(|&b| b == 0xFF));
        assert_eq!(out[out.len() - 1], 0xCC);
    }

    #[test]
    fn test_segment_and_linear_bases_are_independent() {
        let text = hex(&[
            Record::extended_segment(0x1_0000),
            Record::data(0x0000, &[0x01]),
            Record::extended_linear(0),
            Record::data(0x0001, &[0x02]),
            Record::end_of_file(),
        ]);
        let (out, summary) = convert(&text, &ConversionParams::default()).unwrap();
        assert_eq!(summary.address_offset, 0x1_0000);
        assert_eq!(out, vec![0x01, 0x02]);
    }

    #[test]
    fn test_record_below_floor_is_skipped() {
        let text = hex(&[
            Record::data(0x0000, &[0x11; 16]),
            Record::data(0x0010, &[0x22; 16]),
            Record::end_of_file(),
        ]);
        let params = ConversionParams {
            address_offset: Some(0x0010),
            ..Default::default()
        };
        let (out, summary) = convert(&text, &params).unwrap();
        assert_eq!(out, vec![0x22; 16]);
        assert_eq!(summary.skipped_records, 1);
    }

    #[test]
    fn test_record_straddling_floor_writes_tail() {
        let text = hex(&[
            Record::data(0x00F8, &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]),
            Record::end_of_file(),
        ]);
        let params = ConversionParams {
            address_offset: Some(0x0100),
            ..Default::default()
        };
        let (out, _) = convert(&text, &params).unwrap();
        assert_eq!(out, vec![8, 9, 10, 11]);
    }

    #[test]
    fn test_explicit_zero_offset_fills_leading_gap() {
        let text = hex(&[Record::data(0x0004, &[0xAB]), Record::end_of_file()]);
        let params = ConversionParams {
            address_offset: Some(0),
            padding_byte: 0x00,
            ..Default::default()
        };
        let (out, summary) = convert(&text, &params).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0, 0xAB]);
        assert_eq!(summary.address_offset, 0);
    }

    #[test]
    fn test_unsupported_start_linear_is_not_fatal() {
        let text = hex(&[
            Record::data(0, &[1]),
            Record::new(RecordType::StartLinearAddress, 0, vec![1, 2, 3]),
            Record::end_of_file(),
        ]);
        let (_, summary) = convert(&text, &ConversionParams::default()).unwrap();
        assert_eq!(summary.start_linear, None);
    }

    #[test]
    fn test_missing_eof_fails() {
        let text = hex(&[Record::data(0, &[1, 2])]);
        let err = convert(&text, &ConversionParams::default()).unwrap_err();
        assert!(matches!(err, ConvertError::MissingEndOfFile { lines: 1 }));
    }

    #[test]
    fn test_checksum_mismatch_aborts() {
        let text = ":0403AC000024F40036\n:00000001FF\n";
        let err = convert(text, &ConversionParams::default()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Parse(ParseError::ChecksumMismatch { line: 1, .. })
        ));
    }

    #[test]
    fn test_overlapping_records_fail() {
        let text = hex(&[
            Record::data(0x0010, &[1, 2, 3, 4]),
            Record::data(0x0012, &[5]),
            Record::end_of_file(),
        ]);
        let err = convert(&text, &ConversionParams::default()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::AddressRegression {
                line: 2,
                address: 0x12,
                expected: 0x14
            }
        ));
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = ":0403AC000024F40035\r\n:00000001FF\r\n";
        let (out, summary) = convert(text, &ConversionParams::default()).unwrap();
        assert_eq!(out, vec![0x00, 0x24, 0xF4, 0x00]);
        assert_eq!(summary.lines, 2);
    }

    #[test]
    fn test_blank_line_aborts() {
        let text = ":0403AC000024F40035\n\n:00000001FF\n";
        let err = convert(text, &ConversionParams::default()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Parse(ParseError::MalformedLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_leading_whitespace_rejected() {
        let text = "   :0403AC000024F40035\n:00000001FF\n";
        let err = convert(text, &ConversionParams::default()).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Parse(ParseError::MalformedLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_zero_width_rejected_before_reading() {
        let params = ConversionParams {
            width: 0,
            ..Default::default()
        };
        let err = convert("garbage", &params).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
    }
}
