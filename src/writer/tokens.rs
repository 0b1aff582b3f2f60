//! Low-level PDF token formatting.
//!
//! Formats primitive tokens (numbers, names, strings, dates) with the exact
//! escaping the PDF syntax requires, and provides [`CountingWriter`], the
//! byte sink whose running count is the authoritative source for
//! cross-reference offsets.

use std::io::{self, Write};

use chrono::{DateTime, Utc};

/// Byte sink wrapper that counts every byte delivered to the inner writer.
///
/// The cross-reference table stores absolute byte offsets, so the count must
/// cover every byte that reaches the sink, including filter and encryption
/// output.
#[derive(Debug)]
pub struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    /// Wrap a writer with a zeroed byte counter.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Total bytes delivered to the inner writer so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write a real number with up to six fractional digits.
///
/// Trailing zeros are stripped, `-0` normalizes to `0`, and scientific
/// notation is never produced.
pub fn write_real<W: Write>(w: &mut W, value: f64) -> io::Result<()> {
    if !value.is_finite() {
        log::warn!("non-finite real {} written as 0", value);
        return w.write_all(b"0");
    }
    let formatted = format!("{:.6}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    let normalized = if trimmed == "-0" { "0" } else { trimmed };
    w.write_all(normalized.as_bytes())
}

/// Write a name token.
///
/// Names start with `/`. Bytes outside `0x21..=0x7E` and the delimiter set
/// `()<>[]{}/%#` are escaped as `#` followed by two hex digits.
pub fn write_name<W: Write>(w: &mut W, name: &str) -> io::Result<()> {
    w.write_all(b"/")?;
    for byte in name.bytes() {
        if is_regular_name_byte(byte) {
            w.write_all(&[byte])?;
        } else {
            write!(w, "#{:02X}", byte)?;
        }
    }
    Ok(())
}

fn is_regular_name_byte(byte: u8) -> bool {
    let delimiter = matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
    );
    (0x21..=0x7E).contains(&byte) && !delimiter
}

/// Write a literal string token `(...)`.
///
/// Escapes `\`, `(`, `)`; control bytes use the short `\n \r \t \b \f` forms
/// where they exist and three-digit octal otherwise. Bytes at or above 0x80
/// pass through unchanged, so ciphertext is representable.
pub fn write_literal_string<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    w.write_all(b"(")?;
    for &byte in data {
        match byte {
            b'\\' => w.write_all(b"\\\\")?,
            b'(' => w.write_all(b"\\(")?,
            b')' => w.write_all(b"\\)")?,
            0x0A => w.write_all(b"\\n")?,
            0x0D => w.write_all(b"\\r")?,
            0x09 => w.write_all(b"\\t")?,
            0x08 => w.write_all(b"\\b")?,
            0x0C => w.write_all(b"\\f")?,
            b if b < 0x20 => write!(w, "\\{:03o}", b)?,
            _ => w.write_all(&[byte])?,
        }
    }
    w.write_all(b")")
}

/// Write a hex string token `<...>` in uppercase.
pub fn write_hex_string<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    w.write_all(b"<")?;
    for byte in data {
        write!(w, "{:02X}", byte)?;
    }
    w.write_all(b">")
}

/// Encode a text string to its on-disk bytes.
///
/// Strings that fit the PDFDocEncoding-compatible range (all code points at
/// or below U+00FF) are written as single bytes. Anything else becomes
/// UTF-16BE with a `FE FF` byte-order mark.
pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) <= 0xFF) {
        text.chars().map(|c| c as u8).collect()
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    }
}

/// Format an instant in PDF date syntax, always in UTC.
pub fn format_date(date: &DateTime<Utc>) -> String {
    format!("D:{}Z", date.format("%Y%m%d%H%M%S"))
}
