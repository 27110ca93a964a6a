//! Fixed-width little-endian field writer and reader.
//!
//! Text fields are single-byte (Latin-1): each `char` up to U+00FF maps to
//! the byte of the same value. Short text is right-padded with NUL bytes;
//! decoding stops at the first NUL.

use crate::error::{CodecError, Result};

/// Appends fixed-width fields to a growing buffer.
pub(crate) struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn u16(&mut self, value: u16) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// Write `value` as a zero-padded text field of exactly `width` bytes.
    pub(crate) fn text(&mut self, field: &'static str, value: &str, width: usize) -> Result<&mut Self> {
        let encoded = encode_text(field, value, width)?;
        self.buf.extend_from_slice(&encoded);
        Ok(self)
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads fixed-width fields off a byte slice, front to back.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        let Some(slice) = self.buf.get(self.pos..end) else {
            return Err(CodecError::Malformed(format!(
                "needed {len} bytes at offset {}, only {} left",
                self.pos,
                self.remaining()
            )));
        };
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let slice = self.bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        self.array::<2>().map(u16::from_le_bytes)
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        self.array::<4>().map(u32::from_le_bytes)
    }

    pub(crate) fn text(&mut self, width: usize) -> Result<String> {
        self.bytes(width).map(decode_text)
    }

    pub(crate) const fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }
}

/// Encode `value` into exactly `width` bytes, rejecting anything that does
/// not fit rather than cutting it.
pub(crate) fn encode_text(field: &'static str, value: &str, width: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(width);
    for ch in value.chars() {
        let byte = u8::try_from(u32::from(ch)).map_err(|_| CodecError::Unencodable { field, ch })?;
        out.push(byte);
    }
    if out.len() > width {
        return Err(CodecError::FieldTooLong {
            field,
            len: out.len(),
            max: width,
        });
    }
    out.resize(width, 0);
    Ok(out)
}

/// Decode a NUL-terminated single-byte text field.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_zero_padded() {
        let encoded = encode_text("card", "ABC", 8).unwrap();
        assert_eq!(encoded, b"ABC\0\0\0\0\0");
    }

    #[test]
    fn text_exactly_width_has_no_padding() {
        let encoded = encode_text("card", "ABCD", 4).unwrap();
        assert_eq!(encoded, b"ABCD");
    }

    #[test]
    fn oversized_text_is_rejected_not_cut() {
        let err = encode_text("card", "ABCDE", 4).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldTooLong {
                field: "card",
                len: 5,
                max: 4
            }
        );
    }

    #[test]
    fn latin1_round_trips_and_wide_chars_fail() {
        let encoded = encode_text("msg", "Cartão", 8).unwrap();
        assert_eq!(encoded[4], 0xE3);
        assert_eq!(decode_text(&encoded), "Cartão");

        let err = encode_text("msg", "€", 8).unwrap_err();
        assert!(matches!(err, CodecError::Unencodable { ch: '€', .. }));
    }

    #[test]
    fn decode_stops_at_first_nul() {
        assert_eq!(decode_text(b"abc\0garbage"), "abc");
        assert_eq!(decode_text(b"\0abc"), "");
    }

    #[test]
    fn reader_reports_short_buffer() {
        let mut reader = FieldReader::new(&[1, 0, 0]);
        assert_eq!(reader.u16().unwrap(), 1);
        assert!(matches!(reader.u32(), Err(CodecError::Malformed(_))));
    }
}
