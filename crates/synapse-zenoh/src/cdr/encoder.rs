// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XCDR1 little-endian encoder over a caller-owned buffer.

use super::schema::{FieldType, Record, Schema, Value};
use crate::error::{Error, Result};

/// CDR Encoder with fixed buffer
///
/// Offsets (and therefore alignment) are relative to the start of `buf`,
/// which must be the first byte after the representation header.
///
/// # Example
///
/// ```ignore
/// let mut buf = [0u8; 256];
/// let mut encoder = CdrEncoder::new(&mut buf);
///
/// encoder.encode_u32(42)?;
/// encoder.encode_chars(b"base_link", 16)?;
///
/// let bytes = encoder.finish();
/// ```
pub struct CdrEncoder<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

macro_rules! impl_encode_le {
    ($name:ident, $type:ty, $size:expr) => {
        #[doc = concat!("Encode ", stringify!($type))]
        pub fn $name(&mut self, value: $type) -> Result<()> {
            self.align($size)?;
            self.write_bytes(&value.to_le_bytes())
        }
    };
}

impl<'a> CdrEncoder<'a> {
    /// Create a new CDR encoder
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Get current position
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Finish encoding and return written bytes
    pub fn finish(self) -> &'a [u8] {
        &self.buf[0..self.pos]
    }

    fn check(&self, len: usize) -> Result<()> {
        if self.pos + len > self.buf.len() {
            return Err(Error::BufferTooSmall {
                required: self.pos + len,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    /// Align to boundary, zero-filling the padding
    fn align(&mut self, alignment: usize) -> Result<()> {
        let remainder = self.pos % alignment;
        if remainder != 0 {
            let padding = alignment - remainder;
            self.check(padding)?;
            self.buf[self.pos..self.pos + padding].fill(0);
            self.pos += padding;
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.check(bytes.len())?;
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Encode u8
    pub fn encode_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Encode i8
    pub fn encode_i8(&mut self, value: i8) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Encode bool
    pub fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.encode_u8(u8::from(value))
    }

    impl_encode_le!(encode_u16, u16, 2);
    impl_encode_le!(encode_i16, i16, 2);
    impl_encode_le!(encode_u32, u32, 4);
    impl_encode_le!(encode_i32, i32, 4);
    impl_encode_le!(encode_u64, u64, 8);
    impl_encode_le!(encode_i64, i64, 8);
    impl_encode_le!(encode_f32, f32, 4);
    impl_encode_le!(encode_f64, f64, 8);

    /// Encode a fixed-length character array.
    ///
    /// Exactly `len` bytes are written: `bytes` is truncated or zero-padded.
    /// No length prefix.
    pub fn encode_chars(&mut self, bytes: &[u8], len: usize) -> Result<()> {
        self.check(len)?;
        let copied = bytes.len().min(len);
        self.buf[self.pos..self.pos + copied].copy_from_slice(&bytes[..copied]);
        self.buf[self.pos + copied..self.pos + len].fill(0);
        self.pos += len;
        Ok(())
    }

    /// Encode a bounded string (length prefix including the NUL terminator).
    ///
    /// Input longer than `max_len` bytes is truncated.
    pub fn encode_string(&mut self, value: &str, max_len: usize) -> Result<()> {
        self.encode_string_bytes(value.as_bytes(), max_len)
    }

    /// Encode raw bytes as a bounded string, stopping at the first NUL.
    pub fn encode_string_bytes(&mut self, bytes: &[u8], max_len: usize) -> Result<()> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let bytes = &bytes[..end.min(max_len)];

        self.encode_u32(bytes.len() as u32 + 1)?;
        self.write_bytes(bytes)?;
        self.encode_u8(0)
    }

    /// Encode every field of `record` as described by `schema`.
    pub fn encode_record(&mut self, schema: &Schema, record: &dyn Record) -> Result<()> {
        for (index, field) in schema.fields.iter().enumerate() {
            let mismatch = Error::SchemaMismatch {
                type_name: schema.type_name,
                field: index,
            };
            let value = record.field(index).ok_or(mismatch.clone())?;
            self.encode_value(&field.ty, value, &mismatch)?;
        }
        Ok(())
    }

    fn encode_value(&mut self, ty: &FieldType, value: Value<'_>, mismatch: &Error) -> Result<()> {
        match (ty, value) {
            (FieldType::Bool, Value::Bool(v)) => self.encode_bool(v),
            (FieldType::I8, Value::I8(v)) => self.encode_i8(v),
            (FieldType::U8, Value::U8(v)) => self.encode_u8(v),
            (FieldType::I16, Value::I16(v)) => self.encode_i16(v),
            (FieldType::U16, Value::U16(v)) => self.encode_u16(v),
            (FieldType::I32, Value::I32(v)) => self.encode_i32(v),
            (FieldType::U32, Value::U32(v)) => self.encode_u32(v),
            (FieldType::I64, Value::I64(v)) => self.encode_i64(v),
            (FieldType::U64, Value::U64(v)) => self.encode_u64(v),
            (FieldType::F32, Value::F32(v)) => self.encode_f32(v),
            (FieldType::F64, Value::F64(v)) => self.encode_f64(v),
            (FieldType::Chars(len), Value::Str(s)) => self.encode_chars(s.as_bytes(), *len),
            (FieldType::Chars(len), Value::Bytes(b)) => self.encode_chars(b, *len),
            (FieldType::String(max), Value::Str(s)) => self.encode_string(s, *max),
            (FieldType::String(max), Value::Bytes(b)) => self.encode_string_bytes(b, *max),
            (FieldType::Array(elem, count), Value::Array(items)) => {
                for i in 0..*count {
                    let item = items.field(i).ok_or(mismatch.clone())?;
                    self.encode_value(elem, item, mismatch)?;
                }
                Ok(())
            }
            (FieldType::Struct(schema), Value::Struct(inner)) => {
                self.encode_record(schema, inner)
            }
            _ => Err(mismatch.clone()),
        }
    }
}
