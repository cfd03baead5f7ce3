//! Plain hex dump/undump helpers (no record framing).

use std::io::{BufRead, Read, Write};

use tracing::debug;

use super::ParseError;
use crate::Error;
use super::intel_hex::{hex_digit, write_hex_byte};

/// Column window applied to every input line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndumpOptions {
    /// First character of each line to consider.
    pub start: usize,
    /// Maximum characters per line after `start`; 0 means to end of line.
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct HexAsciiWriteOptions {
    pub line_length: usize,
    pub separator: Option<String>,
}

impl Default for HexAsciiWriteOptions {
    fn default() -> Self {
        Self {
            line_length: 16,
            separator: None,
        }
    }
}

/// The `[start, start + limit)` window of a line, clipped to its length.
pub fn line_fragment<'a>(line: &'a str, options: &UndumpOptions) -> &'a str {
    let start = floor_char_boundary(line, options.start.min(line.len()));
    let rest = &line[start..];
    if options.limit == 0 || options.limit >= rest.len() {
        rest
    } else {
        &rest[..floor_char_boundary(rest, options.limit)]
    }
}

/// Copy only the selected window of every line, newline-terminated.
/// Returns the number of lines written.
pub fn extract_fragments<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    options: &UndumpOptions,
) -> Result<usize, Error> {
    let mut written = 0;
    for line in reader.lines() {
        let line = line?;
        let fragment = line_fragment(&line, options);
        if fragment.is_empty() {
            continue;
        }
        writer.write_all(fragment.as_bytes())?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Decode hex text into bytes. Tokens are separated by whitespace and may
/// carry a `0x` prefix; each token must hold an even number of digits.
/// Returns the number of bytes written.
pub fn undump_hex_ascii<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    options: &UndumpOptions,
) -> Result<u64, Error> {
    let mut bytes = Vec::new();
    let mut total = 0u64;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        if line.trim().is_empty() {
            debug!(line = line_no, "empty line ignored");
            continue;
        }

        bytes.clear();
        for token in line_fragment(&line, options).split_whitespace() {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            push_hex_token(digits.as_bytes(), &mut bytes, line_no)?;
        }
        writer.write_all(&bytes)?;
        total += bytes.len() as u64;
    }

    writer.flush()?;
    Ok(total)
}

/// Decode every ASCII letter and digit of the input as a stream of hex
/// digits, ignoring all other characters and the line structure.
/// Returns the number of bytes written.
pub fn undump_printable<R: Read, W: Write>(mut reader: R, mut writer: W) -> Result<u64, Error> {
    let mut text = Vec::new();
    reader.read_to_end(&mut text)?;

    let mut bytes = Vec::with_capacity(text.len() / 2);
    let mut high: Option<u8> = None;
    let mut line = 1;
    for &c in &text {
        if c == b'\n' {
            line += 1;
        } else if c.is_ascii_alphanumeric() {
            let nibble = hex_digit(c, line)?;
            match high.take() {
                Some(h) => bytes.push((h << 4) | nibble),
                None => high = Some(nibble),
            }
        }
    }
    if high.is_some() {
        return Err(ParseError::MalformedLine {
            line,
            message: "odd number of hex digits in input".to_string(),
        }
        .into());
    }

    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes.len() as u64)
}

/// Render bytes as uppercase hex, `line_length` bytes per line.
pub fn write_hex_ascii(data: &[u8], options: &HexAsciiWriteOptions) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 3);
    let line_len = if options.line_length == 0 {
        usize::MAX
    } else {
        options.line_length
    };
    let sep = options.separator.as_deref().unwrap_or("");
    let mut current_count = 0usize;

    for &byte in data {
        if current_count == line_len {
            out.push(b'\n');
            current_count = 0;
        } else if current_count > 0 && !sep.is_empty() {
            out.extend_from_slice(sep.as_bytes());
        }
        write_hex_byte(&mut out, byte);
        current_count += 1;
    }

    if !out.is_empty() {
        out.push(b'\n');
    }

    out
}

fn push_hex_token(digits: &[u8], out: &mut Vec<u8>, line: usize) -> Result<(), ParseError> {
    if !digits.len().is_multiple_of(2) {
        return Err(ParseError::MalformedLine {
            line,
            message: format!("odd number of hex digits in {:?}", String::from_utf8_lossy(digits)),
        });
    }

    for pair in digits.chunks_exact(2) {
        let hi = hex_digit(pair[0], line)?;
        let lo = hex_digit(pair[1], line)?;
        out.push((hi << 4) | lo);
    }
    Ok(())
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
