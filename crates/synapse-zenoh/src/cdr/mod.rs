// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CDR payload encoding for ROS 2 interoperability.
//!
//! Implements the XCDR1 (plain CDR) little-endian rules used by ROS 2
//! publishers, with fixed buffers and no heap allocations.
//!
//! ## Payload Layout
//!
//! ```text
//! +----+----+----+----+---------------------------------+
//! | 00 | 01 | 00 | 00 |  CDR body (aligned from here)   |
//! +----+----+----+----+---------------------------------+
//!   options   reserved
//!   + CDR_LE
//! ```
//!
//! Every primitive is aligned to its own size relative to the first body
//! byte. Padding is zero-filled so payloads are byte-for-byte reproducible.

mod decoder;
mod encoder;
pub mod schema;

pub use decoder::CdrDecoder;
pub use encoder::CdrEncoder;
pub use schema::{Field, FieldType, Record, Schema, Value, TYPE_HASH_SIZE};

use crate::error::{Error, Result};

/// Representation header: no options id, CDR little-endian, reserved bytes.
pub const REPRESENTATION_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

/// Encode `record` into `out` as a bare CDR body.
///
/// Returns the number of bytes written. Fails closed with
/// [`Error::BufferTooSmall`] when `out` cannot hold the body.
pub fn encode(schema: &Schema, record: &dyn Record, out: &mut [u8]) -> Result<usize> {
    let mut encoder = CdrEncoder::new(out);
    encoder.encode_record(schema, record)?;
    Ok(encoder.position())
}

/// Encode `record` as a full payload: representation header then body.
pub fn encode_payload(schema: &Schema, record: &dyn Record, out: &mut [u8]) -> Result<usize> {
    write_payload(out, |body| encode(schema, record, body))
}

/// Write the representation header into `out`, then let `body` fill the
/// bytes after it.
///
/// `body` returns the body length. Buffer errors are reported against the
/// whole of `out`.
pub fn write_payload<F>(out: &mut [u8], body: F) -> Result<usize>
where
    F: FnOnce(&mut [u8]) -> Result<usize>,
{
    let header_len = REPRESENTATION_HEADER.len();
    let available = out.len();
    if available < header_len {
        return Err(Error::BufferTooSmall {
            required: header_len,
            available,
        });
    }
    out[..header_len].copy_from_slice(&REPRESENTATION_HEADER);
    let body_len = body(&mut out[header_len..]).map_err(|err| match err {
        Error::BufferTooSmall { required, .. } => Error::BufferTooSmall {
            required: required + header_len,
            available,
        },
        other => other,
    })?;
    if header_len + body_len > available {
        return Err(Error::BufferTooSmall {
            required: header_len + body_len,
            available,
        });
    }
    Ok(header_len + body_len)
}

/// Split a payload into its body, checking the representation header.
pub fn payload_body(payload: &[u8]) -> Option<&[u8]> {
    payload.strip_prefix(&REPRESENTATION_HEADER[..])
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        id: u8,
        value: f64,
    }

    impl Record for Sample {
        fn field(&self, index: usize) -> Option<Value<'_>> {
            match index {
                0 => Some(Value::U8(self.id)),
                1 => Some(Value::F64(self.value)),
                _ => None,
            }
        }
    }

    static SAMPLE: Schema = Schema {
        type_name: "test::Sample",
        type_hash: [0; TYPE_HASH_SIZE],
        fields: &[
            Field::new("id", FieldType::U8),
            Field::new("value", FieldType::F64),
        ],
    };

    #[test]
    fn test_payload_starts_with_header() {
        let mut out = [0xffu8; 32];
        let len = encode_payload(&SAMPLE, &Sample { id: 7, value: 1.0 }, &mut out).unwrap();
        assert_eq!(len, 4 + 16);
        assert_eq!(&out[..4], &[0x00, 0x01, 0x00, 0x00]);
        // value aligned relative to the body, not the header
        assert_eq!(&out[4..12], &[7, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&out[12..20], &1.0f64.to_le_bytes());
    }

    #[test]
    fn test_one_byte_short_is_rejected() {
        let record = Sample { id: 1, value: 3.0 };
        let mut exact = [0u8; 20];
        let size = encode_payload(&SAMPLE, &record, &mut exact).unwrap();

        let mut short = [0u8; 19];
        assert_eq!(
            encode_payload(&SAMPLE, &record, &mut short),
            Err(Error::BufferTooSmall {
                required: size,
                available: size - 1
            })
        );
    }

    #[test]
    fn test_header_only_buffer() {
        let mut out = [0u8; 2];
        assert!(encode_payload(&SAMPLE, &Sample { id: 0, value: 0.0 }, &mut out)
            .unwrap_err()
            .is_buffer_error());
    }

    #[test]
    fn test_write_payload_prepends_header() {
        let mut out = [0xffu8; 8];
        let len = write_payload(&mut out, |body| {
            body[..2].copy_from_slice(&[0xab, 0xcd]);
            Ok(2)
        })
        .unwrap();
        assert_eq!(&out[..len], &[0x00, 0x01, 0x00, 0x00, 0xab, 0xcd]);

        // a body claiming more than it was given is rejected
        assert_eq!(
            write_payload(&mut out, |_| Ok(5)),
            Err(Error::BufferTooSmall {
                required: 9,
                available: 8
            })
        );
    }

    #[test]
    fn test_payload_body() {
        assert_eq!(payload_body(&[0, 1, 0, 0, 9]), Some(&[9u8][..]));
        assert_eq!(payload_body(&[1, 0, 0, 0, 9]), None);
    }
}
