use std::collections::BTreeMap;
use std::io::{self, Read};

use tracing::debug;

/// Block size used when streaming the binary input.
pub(crate) const BUFFER_SIZE: usize = 4096;

/// Runs of the padding byte found in a binary input, keyed by input offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaddingMap {
    runs: BTreeMap<u64, u64>,
}

impl PaddingMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `input` once and record every run of `padding_byte` at least
    /// `min_width` bytes long.
    ///
    /// A run is only recorded once a different byte terminates it, and never
    /// when it starts at offset 0: every compressed gap is then followed by
    /// data that anchors it when the image is expanded again.
    pub fn scan<R: Read>(input: &mut R, padding_byte: u8, min_width: u8) -> io::Result<Self> {
        let mut map = Self::new();
        if min_width == 0 {
            return Ok(map);
        }

        let mut buf = [0u8; BUFFER_SIZE];
        let mut offset = 0u64;
        let mut run_start: Option<u64> = None;

        loop {
            let n = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            for &byte in &buf[..n] {
                if byte == padding_byte {
                    run_start.get_or_insert(offset);
                } else if let Some(start) = run_start.take() {
                    let len = offset - start;
                    if start > 0 && len >= min_width as u64 {
                        map.insert(start, len);
                    }
                }
                offset += 1;
            }
        }

        debug!(runs = map.len(), scanned = offset, "padding scan complete");
        Ok(map)
    }

    fn insert(&mut self, start: u64, length: u64) {
        if length > 0 {
            self.runs.insert(start, length);
        }
    }

    /// Runs in ascending offset order as `(start, length)`.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.runs.iter().map(|(&start, &len)| (start, len))
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
