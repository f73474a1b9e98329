// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Static schema descriptors and the positional record interface.
//!
//! A [`Schema`] lists the fields of a message in wire order. Records do not
//! know how they are encoded; they only hand out field values by index
//! through [`Record::field`], and the encoder walks the schema.

/// Length of an RIHS01 type hash.
pub const TYPE_HASH_SIZE: usize = 32;

/// Wire type of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Boolean (1 byte)
    Bool,
    /// Signed 8-bit integer
    I8,
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    I16,
    /// Unsigned 16-bit integer
    U16,
    /// Signed 32-bit integer
    I32,
    /// Unsigned 32-bit integer
    U32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 64-bit integer
    U64,
    /// IEEE-754 single precision
    F32,
    /// IEEE-754 double precision
    F64,
    /// Fixed-length character array, copied verbatim and zero-padded.
    Chars(usize),
    /// Bounded DDS string (u32 length prefix including NUL).
    String(usize),
    /// Fixed-length array of another field type.
    Array(&'static FieldType, usize),
    /// Nested structure.
    Struct(&'static Schema),
}

impl FieldType {
    /// CDR alignment of the first byte written for this type.
    pub fn alignment(&self) -> usize {
        match self {
            FieldType::Bool | FieldType::I8 | FieldType::U8 | FieldType::Chars(_) => 1,
            FieldType::I16 | FieldType::U16 => 2,
            FieldType::I32 | FieldType::U32 | FieldType::F32 | FieldType::String(_) => 4,
            FieldType::I64 | FieldType::U64 | FieldType::F64 => 8,
            FieldType::Array(elem, _) => elem.alignment(),
            // Members align themselves; a struct adds no padding before it.
            FieldType::Struct(_) => 1,
        }
    }

    /// Offset after writing the largest possible value starting at `offset`.
    fn max_end(&self, offset: usize) -> usize {
        let start = align_up(offset, self.alignment());
        match self {
            FieldType::Bool | FieldType::I8 | FieldType::U8 => start + 1,
            FieldType::I16 | FieldType::U16 => start + 2,
            FieldType::I32 | FieldType::U32 | FieldType::F32 => start + 4,
            FieldType::I64 | FieldType::U64 | FieldType::F64 => start + 8,
            FieldType::Chars(len) => start + len,
            FieldType::String(max) => start + 4 + max + 1,
            FieldType::Array(elem, count) => {
                (0..*count).fold(start, |end, _| elem.max_end(end))
            }
            FieldType::Struct(schema) => schema.max_end(start),
        }
    }
}

/// Named field inside a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Field name (diagnostics only)
    pub name: &'static str,
    /// Wire type
    pub ty: FieldType,
}

impl Field {
    /// Create a field descriptor.
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// Message schema: ROS type name, RIHS01 hash and fields in wire order.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    /// DDS type name, e.g. `sensor_msgs::msg::dds_::Imu`
    pub type_name: &'static str,
    /// RIHS01 type hash
    pub type_hash: [u8; TYPE_HASH_SIZE],
    /// Fields in declaration order
    pub fields: &'static [Field],
}

impl Schema {
    /// Worst-case encoded body size, padding included.
    pub fn max_encoded_size(&self) -> usize {
        self.max_end(0)
    }

    fn max_end(&self, offset: usize) -> usize {
        self.fields.iter().fold(offset, |end, f| f.ty.max_end(end))
    }
}

/// Round `offset` up to a multiple of `alignment`.
pub(crate) const fn align_up(offset: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return offset;
    }
    let remainder = offset % alignment;
    if remainder == 0 {
        offset
    } else {
        offset + (alignment - remainder)
    }
}

/// Borrowed value of one field.
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// Boolean
    Bool(bool),
    /// i8
    I8(i8),
    /// u8
    U8(u8),
    /// i16
    I16(i16),
    /// u16
    U16(u16),
    /// i32
    I32(i32),
    /// u32
    U32(u32),
    /// i64
    I64(i64),
    /// u64
    U64(u64),
    /// f32
    F32(f32),
    /// f64
    F64(f64),
    /// Text for `Chars` or `String` fields
    Str(&'a str),
    /// Raw bytes for `Chars` fields
    Bytes(&'a [u8]),
    /// Array elements, indexed like fields
    Array(&'a dyn Record),
    /// Nested record
    Struct(&'a dyn Record),
}

/// Positional access to the fields of a record.
///
/// `field(i)` returns the value of the i-th schema field, or `None` past
/// the last field.
pub trait Record {
    /// Value of field `index`.
    fn field(&self, index: usize) -> Option<Value<'_>>;
}

macro_rules! impl_record_for_array {
    ($type:ty, $variant:ident) => {
        impl<const N: usize> Record for [$type; N] {
            fn field(&self, index: usize) -> Option<Value<'_>> {
                self.get(index).map(|v| Value::$variant(*v))
            }
        }
    };
}

impl_record_for_array!(bool, Bool);
impl_record_for_array!(i8, I8);
impl_record_for_array!(u8, U8);
impl_record_for_array!(i16, I16);
impl_record_for_array!(u16, U16);
impl_record_for_array!(i32, I32);
impl_record_for_array!(u32, U32);
impl_record_for_array!(i64, I64);
impl_record_for_array!(u64, U64);
impl_record_for_array!(f32, F32);
impl_record_for_array!(f64, F64);
