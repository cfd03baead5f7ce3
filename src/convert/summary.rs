use std::fmt;

use crc::{CRC_32_ISO_HDLC, Crc, Digest};

static IMAGE_CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    IntelToBinary,
    BinaryToIntel,
}

/// Entry point carried by a start linear address record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartLinear {
    pub address: u32,
    /// Payload width of the record (1, 2 or 4 bytes).
    pub width: u8,
}

/// Post-conversion statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub direction: Direction,
    /// Lines parsed (HEX input) or records written (HEX output).
    pub lines: usize,
    /// Binary bytes written (HEX-to-binary) or encoded as Data records.
    pub bytes_written: u64,
    pub address_offset: u32,
    pub start_linear: Option<StartLinear>,
    /// `None` when padding detection was disabled.
    pub padding_runs: Option<usize>,
    pub skipped_records: usize,
    /// CRC-32 of the binary image on the binary side of the conversion.
    pub image_crc32: u32,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::IntelToBinary => {
                writeln!(f, "Intel HEX to binary.")?;
                writeln!(f, "{} lines parsed.", self.lines)?;
            }
            Direction::BinaryToIntel => {
                writeln!(f, "Binary to Intel HEX.")?;
                writeln!(f, "{} lines written.", self.lines)?;
            }
        }
        writeln!(f, "Address offset 0x{:08X}.", self.address_offset)?;
        match self.start_linear {
            Some(start) => writeln!(
                f,
                "The main function is at address 0x{:0width$X}.",
                start.address,
                width = start.width as usize * 2
            )?,
            None if self.direction == Direction::IntelToBinary => {
                writeln!(f, "The main function was not contained in the written data.")?
            }
            None => {}
        }
        if let Some(runs) = self.padding_runs {
            writeln!(f, "{runs} padding found.")?;
        }
        if self.skipped_records > 0 {
            writeln!(
                f,
                "{} records below the address offset skipped.",
                self.skipped_records
            )?;
        }
        writeln!(f, "{} bytes written.", self.bytes_written)?;
        write!(f, "Image CRC-32 0x{:08X}.", self.image_crc32)
    }
}

/// Running CRC-32 over the binary image.
pub(crate) struct ImageDigest {
    digest: Digest<'static, u32>,
}

impl ImageDigest {
    pub(crate) fn new() -> Self {
        Self {
            digest: IMAGE_CRC.digest(),
        }
    }

    pub(crate) fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    /// Feed `count` copies of `byte`.
    pub(crate) fn update_repeated(&mut self, byte: u8, mut count: u64) {
        let block = [byte; 256];
        while count > 0 {
            let n = count.min(block.len() as u64) as usize;
            self.digest.update(&block[..n]);
            count -= n as u64;
        }
    }

    pub(crate) fn finalize(self) -> u32 {
        self.digest.finalize()
    }
}
