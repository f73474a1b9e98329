// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XCDR1 little-endian decoder, the read side of [`super::CdrEncoder`].

use crate::error::{Error, Result};

/// CDR Decoder with fixed buffer
///
/// # Example
///
/// ```ignore
/// let mut decoder = CdrDecoder::new(body);
///
/// let sec = decoder.decode_i32()?;
/// let frame_id = decoder.decode_string()?;
/// ```
pub struct CdrDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

macro_rules! impl_decode_le {
    ($name:ident, $type:ty, $size:expr) => {
        #[doc = concat!("Decode ", stringify!($type))]
        pub fn $name(&mut self) -> Result<$type> {
            self.align($size)?;
            let mut arr = [0u8; $size];
            arr.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(arr))
        }
    };
}

impl<'a> CdrDecoder<'a> {
    /// Create a new CDR decoder
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Get current position
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn align(&mut self, alignment: usize) -> Result<()> {
        let remainder = self.pos % alignment;
        if remainder != 0 {
            let padding = alignment - remainder;
            if self.pos + padding > self.buf.len() {
                return Err(Error::BufferTooSmall {
                    required: self.pos + padding,
                    available: self.buf.len(),
                });
            }
            self.pos += padding;
        }
        Ok(())
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.pos + count > self.buf.len() {
            return Err(Error::BufferTooSmall {
                required: self.pos + count,
                available: self.buf.len(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    /// Decode u8
    pub fn decode_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Decode bool
    pub fn decode_bool(&mut self) -> Result<bool> {
        Ok(self.decode_u8()? != 0)
    }

    impl_decode_le!(decode_i16, i16, 2);
    impl_decode_le!(decode_u16, u16, 2);
    impl_decode_le!(decode_i32, i32, 4);
    impl_decode_le!(decode_u32, u32, 4);
    impl_decode_le!(decode_i64, i64, 8);
    impl_decode_le!(decode_u64, u64, 8);
    impl_decode_le!(decode_f32, f32, 4);
    impl_decode_le!(decode_f64, f64, 8);

    /// Decode a fixed-length character array, stripping trailing NULs.
    pub fn decode_chars(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(&bytes[..end])
    }

    /// Decode a length-prefixed string (borrowed, without NUL terminator)
    pub fn decode_string(&mut self) -> Result<&'a str> {
        self.align(4)?;
        let offset = self.pos;
        let malformed = Error::Decoding {
            what: "string",
            offset,
        };
        let len = self.decode_u32()? as usize;
        if len == 0 {
            return Err(malformed);
        }
        let bytes = self.read_bytes(len - 1)?;
        if self.decode_u8()? != 0 {
            return Err(malformed);
        }
        core::str::from_utf8(bytes).map_err(|_| malformed)
    }
}
