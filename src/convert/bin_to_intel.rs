use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::{debug, info};

use super::error::{ConvertError, Location};
use super::padding::{BUFFER_SIZE, PaddingMap};
use super::summary::{ConversionSummary, Direction, ImageDigest, StartLinear};
use crate::io::{BLOCK_SPAN, Record};
use crate::params::{AddressMode, ConversionParams};

/// Convert a raw binary image into Intel HEX text.
///
/// Runs of `padding_byte` at least `padding_width` long are left out of the
/// output and replaced by an extended-address record marking the jump.
pub fn binary_to_intel<R: Read + Seek, W: Write>(
    mut input: R,
    output: W,
    params: &ConversionParams,
) -> Result<ConversionSummary, ConvertError> {
    params.validate()?;

    let length = input.seek(SeekFrom::End(0))?;
    input.rewind()?;
    params.check_span(length)?;

    info!(
        length,
        offset = format_args!("{:#X}", params.base_address()),
        "converting binary to Intel HEX"
    );

    let paddings = if params.padding_enabled() {
        let map = PaddingMap::scan(&mut input, params.padding_byte, params.padding_width)?;
        input.rewind()?;
        map
    } else {
        PaddingMap::new()
    };

    let mut writer = HexWriter::new(output, params);
    writer.write_extended()?;

    for (run_start, run_length) in paddings.iter() {
        writer.copy_data(&mut input, run_start - writer.offset)?;
        input.seek(SeekFrom::Current(run_length as i64))?;
        writer.skip_padding(run_length)?;
    }
    writer.copy_data(&mut input, length - writer.offset)?;

    let start_linear = match params.start_linear_address {
        Some(address) => {
            let record = Record::start_linear(address);
            let width = record.len();
            writer.write_record(&record)?;
            Some(StartLinear { address, width })
        }
        None => None,
    };
    writer.write_record(&Record::end_of_file())?;
    writer.flush()?;

    info!(
        records = writer.records,
        bytes = writer.bytes_written,
        paddings = paddings.len(),
        "conversion complete"
    );

    Ok(ConversionSummary {
        direction: Direction::BinaryToIntel,
        lines: writer.records,
        bytes_written: writer.bytes_written,
        address_offset: params.base_address(),
        start_linear,
        padding_runs: params.padding_enabled().then_some(paddings.len()),
        skipped_records: 0,
        image_crc32: writer.digest.finalize(),
    })
}

struct HexWriter<'p, W> {
    output: W,
    params: &'p ConversionParams,
    /// Absolute address of the next input byte.
    full_address: u64,
    /// Block selected by the last extended-address record.
    block: Option<u64>,
    /// Input offset of the next input byte.
    offset: u64,
    records: usize,
    bytes_written: u64,
    digest: ImageDigest,
    line: Vec<u8>,
}

impl<'p, W: Write> HexWriter<'p, W> {
    fn new(output: W, params: &'p ConversionParams) -> Self {
        Self {
            output,
            params,
            full_address: params.base_address() as u64,
            block: None,
            offset: 0,
            records: 0,
            bytes_written: 0,
            digest: ImageDigest::new(),
            line: Vec::with_capacity(1 + 2 * (5 + u8::MAX as usize) + 1),
        }
    }

    /// Emit the extended-address record for the block holding `full_address`.
    fn write_extended(&mut self) -> Result<(), ConvertError> {
        let address = self.full_address as u32;
        let record = match self.params.addressing {
            AddressMode::Linear => Record::extended_linear(address),
            AddressMode::Segment => Record::extended_segment(address),
        };
        self.block = Some(self.full_address / BLOCK_SPAN as u64);
        self.write_record(&record)
    }

    /// Stream exactly `count` bytes from `input` into Data records.
    fn copy_data<R: Read>(&mut self, input: &mut R, count: u64) -> Result<(), ConvertError> {
        let mut buf = [0u8; BUFFER_SIZE];
        let mut remaining = count;
        while remaining > 0 {
            let want = remaining.min(BUFFER_SIZE as u64) as usize;
            let n = match input.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(ConvertError::Read(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("input ended {remaining} bytes early"),
                    )));
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.write_segments(&buf[..n])?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Split a block into Data records of at most `width` bytes, never
    /// crossing a block boundary.
    fn write_segments(&mut self, mut data: &[u8]) -> Result<(), ConvertError> {
        let width = self.params.width as usize;
        self.digest.update(data);

        while !data.is_empty() {
            if self.block != Some(self.full_address / BLOCK_SPAN as u64) {
                self.write_extended()?;
            }

            let in_block = (self.full_address % BLOCK_SPAN as u64) as u32;
            let room = (BLOCK_SPAN - in_block) as usize;
            let take = data.len().min(width).min(room);

            self.write_record(&Record::data(in_block as u16, &data[..take]))?;

            self.full_address += take as u64;
            self.offset += take as u64;
            self.bytes_written += take as u64;
            data = &data[take..];
        }
        Ok(())
    }

    /// Jump over a padding run that was skipped in the input.
    fn skip_padding(&mut self, length: u64) -> Result<(), ConvertError> {
        debug!(
            offset = self.offset,
            length,
            address = format_args!("{:#X}", self.full_address),
            "padding run compressed"
        );
        self.digest
            .update_repeated(self.params.padding_byte, length);
        self.offset += length;
        self.full_address += length;
        self.write_extended()
    }

    fn write_record(&mut self, record: &Record) -> Result<(), ConvertError> {
        self.line.clear();
        record.encode_into(&mut self.line);
        self.output
            .write_all(&self.line)
            .map_err(|source| ConvertError::Write {
                location: Location::Offset(self.offset),
                source,
            })?;
        self.records += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConvertError> {
        self.output.flush().map_err(|source| ConvertError::Write {
            location: Location::Offset(self.offset),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::io::{RecordType, parse_record};

    fn convert(data: &[u8], params: &ConversionParams) -> (Vec<Record>, ConversionSummary) {
        let mut out = Vec::new();
        let summary = binary_to_intel(Cursor::new(data), &mut out, params).unwrap();
        let text = String::from_utf8(out).unwrap();
        let records = text
            .lines()
            .enumerate()
            .map(|(i, line)| parse_record(line, i + 1).unwrap())
            .collect();
        (records, summary)
    }

    #[test]
    fn test_small_image() {
        let data: Vec<u8> = (0..20).collect();
        let (records, summary) = convert(&data, &ConversionParams::default());
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], Record::extended_linear(0));
        assert_eq!(records[1], Record::data(0x0000, &data[..16]));
        assert_eq!(records[2], Record::data(0x0010, &data[16..]));
        assert_eq!(records[3], Record::end_of_file());
        assert_eq!(summary.lines, 4);
        assert_eq!(summary.bytes_written, 20);
        assert_eq!(summary.padding_runs, None);
    }

    #[test]
    fn test_known_output_text() {
        let mut out = Vec::new();
        let params = ConversionParams {
            address_offset: Some(0x03AC),
            width: 4,
            ..Default::default()
        };
        binary_to_intel(Cursor::new([0x00u8, 0x24, 0xF4, 0x00]), &mut out, &params).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            ":020000040000FA\n:0403AC000024F40035\n:00000001FF\n"
        );
    }

    #[test]
    fn test_rollover_emits_extended_record() {
        let data = vec![0x5A; 0x1_0000 + 8];
        let params = ConversionParams {
            address_offset: Some(0x0800_0000),
            width: 32,
            ..Default::default()
        };
        let (records, _) = convert(&data, &params);
        let extended: Vec<_> = records
            .iter()
            .filter(|r| r.record_type == RecordType::ExtendedLinearAddress)
            .collect();
        assert_eq!(extended.len(), 2);
        assert_eq!(extended[1].payload, vec![0x08, 0x01]);
        let last_data = &records[records.len() - 2];
        assert_eq!(last_data.address, 0);
        assert_eq!(last_data.len(), 8);
    }

    #[test]
    fn test_odd_width_never_crosses_block() {
        let data = vec![0x11; 0x1_0000 + 4];
        let params = ConversionParams {
            width: 255,
            ..Default::default()
        };
        let (records, _) = convert(&data, &params);
        for record in records.iter().filter(|r| r.record_type == RecordType::Data) {
            assert!(record.address as u32 + record.len() as u32 <= BLOCK_SPAN);
        }
    }

    #[test]
    fn test_padding_run_becomes_address_jump() {
        let mut data = vec![0x01; 4];
        data.extend(vec![0xFF; 10_000]);
        data.extend([0x02; 4]);
        let params = ConversionParams {
            padding_width: 64,
            ..Default::default()
        };
        let (records, summary) = convert(&data, &params);
        assert_eq!(summary.padding_runs, Some(1));
        assert_eq!(summary.bytes_written, 8);
        assert_eq!(
            records,
            vec![
                Record::extended_linear(0),
                Record::data(0x0000, &[0x01; 4]),
                Record::extended_linear(0),
                Record::data(4 + 10_000, &[0x02; 4]),
                Record::end_of_file(),
            ]
        );
    }

    #[test]
    fn test_segment_mode_records() {
        let data = vec![0x33; 0x1_0000 + 1];
        let params = ConversionParams {
            address_offset: Some(0x2_0000),
            addressing: AddressMode::Segment,
            ..Default::default()
        };
        let (records, _) = convert(&data, &params);
        assert_eq!(records[0], Record::extended_segment(0x2_0000));
        assert_eq!(records[0].payload, vec![0x20, 0x00]);
        let second = records
            .iter()
            .filter(|r| r.record_type == RecordType::ExtendedSegmentAddress)
            .nth(1)
            .unwrap();
        assert_eq!(second.payload, vec![0x30, 0x00]);
    }

    #[test]
    fn test_segment_mode_rejects_large_image() {
        let params = ConversionParams {
            address_offset: Some(0xF_FFF0),
            addressing: AddressMode::Segment,
            ..Default::default()
        };
        let err = binary_to_intel(Cursor::new(vec![0u8; 32]), Vec::new(), &params).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
    }

    #[test]
    fn test_start_linear_written_before_eof() {
        let params = ConversionParams {
            start_linear_address: Some(0x0131),
            ..Default::default()
        };
        let (records, summary) = convert(&[0xAA], &params);
        let n = records.len();
        assert_eq!(records[n - 2], Record::start_linear(0x0131));
        assert_eq!(records[n - 1], Record::end_of_file());
        assert_eq!(
            summary.start_linear,
            Some(StartLinear {
                address: 0x0131,
                width: 2
            })
        );
    }

    #[test]
    fn test_empty_input() {
        let (records, summary) = convert(&[], &ConversionParams::default());
        assert_eq!(records, vec![Record::extended_linear(0), Record::end_of_file()]);
        assert_eq!(summary.bytes_written, 0);
    }
}
