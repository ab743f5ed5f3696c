//! ## spejare-protocols::decoder
//! Typed big-endian extraction over a borrowed byte slice.
//!
//! The cursor never advances on a failed extraction, so a caller can treat
//! any error as "buffer state unchanged" and retry once more bytes arrive.

use std::borrow::Cow;

use thiserror::Error;

/// Errors that can occur while extracting from a byte slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("end of buffer reached")]
    EndOfBuffer,
    #[error("variable byte integer exceeds four bytes")]
    VarintOverflow,
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// Unsigned integers extractable in network byte order.
pub trait BigEndian: sealed::Sealed + Sized {
    const WIDTH: usize;
    fn from_be_slice(bytes: &[u8]) -> Self;
}

impl BigEndian for u8 {
    const WIDTH: usize = 1;
    fn from_be_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl BigEndian for u16 {
    const WIDTH: usize = 2;
    fn from_be_slice(bytes: &[u8]) -> Self {
        u16::from_be_bytes([bytes[0], bytes[1]])
    }
}

impl BigEndian for u32 {
    const WIDTH: usize = 4;
    fn from_be_slice(bytes: &[u8]) -> Self {
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

/// Cursor over a borrowed byte slice.
#[derive(Clone, Copy, Debug)]
pub struct BinaryDecoder<'a> {
    buf: &'a [u8],
}

impl<'a> BinaryDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Number of bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Extracts an unsigned big-endian integer of 1, 2 or 4 bytes.
    pub fn take_be<T: BigEndian>(&mut self) -> Result<T, DecodeError> {
        if self.buf.len() < T::WIDTH {
            return Err(DecodeError::EndOfBuffer);
        }
        let (head, rest) = self.buf.split_at(T::WIDTH);
        self.buf = rest;
        Ok(T::from_be_slice(head))
    }

    /// Extracts `n` bytes as a borrowed view without copying.
    pub fn take_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < n {
            return Err(DecodeError::EndOfBuffer);
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }

    /// Extracts `n` bytes as text. Invalid UTF-8 sequences are replaced
    /// rather than rejected, since captured traffic is not ours to refuse.
    pub fn take_string(&mut self, n: usize) -> Result<Cow<'a, str>, DecodeError> {
        let bytes = self.take_bytes(n)?;
        Ok(String::from_utf8_lossy(bytes))
    }

    /// Decodes an MQTT variable byte integer: up to 4 bytes, 7 value bits
    /// each, continuation in the top bit. Returns the value and the number of
    /// bytes consumed. A value needing a 5th byte is `VarintOverflow`.
    pub fn take_varint(&mut self) -> Result<(u32, usize), DecodeError> {
        let mut value: u32 = 0;
        for i in 0..4 {
            let byte = *self.buf.get(i).ok_or(DecodeError::EndOfBuffer)?;
            value |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                self.buf = &self.buf[i + 1..];
                return Ok((value, i + 1));
            }
        }
        Err(DecodeError::VarintOverflow)
    }

    /// Splits off a decoder bounded to exactly the next `n` bytes. The parent
    /// cursor advances past them; the sub-decoder cannot read beyond them.
    pub fn sub_decoder(&mut self, n: usize) -> Result<BinaryDecoder<'a>, DecodeError> {
        Ok(BinaryDecoder::new(self.take_bytes(n)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_be_widths() {
        let mut dec = BinaryDecoder::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(dec.take_be::<u8>().unwrap(), 0x01);
        assert_eq!(dec.take_be::<u16>().unwrap(), 0x0203);
        assert_eq!(dec.take_be::<u32>().unwrap(), 0x04050607);
        assert!(dec.is_empty());
    }

    #[test]
    fn take_be_does_not_advance_on_failure() {
        let mut dec = BinaryDecoder::new(&[0x01]);
        assert_eq!(dec.take_be::<u16>(), Err(DecodeError::EndOfBuffer));
        assert_eq!(dec.remaining(), 1);
        assert_eq!(dec.take_be::<u8>().unwrap(), 0x01);
    }

    #[test]
    fn take_string_is_lossy() {
        let mut dec = BinaryDecoder::new(&[b'h', b'i', 0xFF]);
        assert_eq!(dec.take_string(2).unwrap(), "hi");
        assert_eq!(dec.take_string(1).unwrap(), "\u{FFFD}");
    }

    #[test]
    fn varint_single_byte() {
        let mut dec = BinaryDecoder::new(&[0x7F, 0xAA]);
        assert_eq!(dec.take_varint().unwrap(), (127, 1));
        assert_eq!(dec.remaining(), 1);
    }

    #[test]
    fn varint_multi_byte() {
        // 321 = 0xC1 0x02 in variable encoding.
        let mut dec = BinaryDecoder::new(&[0xC1, 0x02]);
        assert_eq!(dec.take_varint().unwrap(), (321, 2));

        // Maximum representable value uses all four bytes.
        let mut dec = BinaryDecoder::new(&[0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(dec.take_varint().unwrap(), (268_435_455, 4));
    }

    #[test]
    fn varint_overflow() {
        let mut dec = BinaryDecoder::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
        assert_eq!(dec.take_varint(), Err(DecodeError::VarintOverflow));
        assert_eq!(dec.remaining(), 5);
    }

    #[test]
    fn varint_truncated() {
        let mut dec = BinaryDecoder::new(&[0x80]);
        assert_eq!(dec.take_varint(), Err(DecodeError::EndOfBuffer));
        assert_eq!(dec.remaining(), 1);
    }

    #[test]
    fn sub_decoder_is_bounded() {
        let mut dec = BinaryDecoder::new(&[0x01, 0x02, 0x03, 0x04]);
        let mut sub = dec.sub_decoder(2).unwrap();
        assert_eq!(sub.take_be::<u8>().unwrap(), 0x01);
        assert_eq!(sub.take_be::<u8>().unwrap(), 0x02);
        assert_eq!(sub.take_be::<u8>(), Err(DecodeError::EndOfBuffer));
        // Parent already advanced past the sub-range.
        assert_eq!(dec.take_be::<u8>().unwrap(), 0x03);
    }

    #[test]
    fn sub_decoder_too_large() {
        let mut dec = BinaryDecoder::new(&[0x01]);
        assert!(dec.sub_decoder(2).is_err());
        assert_eq!(dec.remaining(), 1);
    }
}
