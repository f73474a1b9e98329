// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rmw_zenoh key expressions for discovery and data routing.
//!
//! Three forms are produced, all pure functions of their inputs:
//!
//! ```text
//! node liveliness   @ros2_lv/0/<zid>/0/0/NN/%/%/spinali_<guid>
//! topic data        <domain><topic>/<type>_/RIHS01_<hash>
//! topic liveliness  @ros2_lv/<domain>/<zid>/0/11/<kind>/%/%/spinali_<guid>/<%topic>/<type>_/RIHS01_<hash>/::,7:,:,:,,
//! ```
//!
//! `<zid>` and `<guid>` are 16 bytes, `<hash>` is the 32-byte RIHS01 type
//! hash, all rendered as lowercase hex without separators. Inside the
//! liveliness form every `/` of the topic name becomes `%`.
//!
//! Discovery peers match these strings literally, so the layout must not
//! drift. Output goes either into a caller buffer (`write_*`, returning the
//! would-have-been length on truncation) or into a fixed-capacity
//! [`KeyExprString`].

use core::fmt::{self, Write};

use crate::cdr::TYPE_HASH_SIZE;
use crate::error::{Error, Result};

/// Length of session ids and GUIDs.
pub const ID_SIZE: usize = 16;

/// Longest topic or type name the bridge is sized for.
pub const MAX_NAME_LEN: usize = 96;

/// Capacity of [`KeyExprString`]: two name components plus literal overhead.
pub const KEY_EXPR_CAPACITY: usize = 2 * MAX_NAME_LEN + 256;

/// Node name prefix embedded in liveliness tokens.
pub const NODE_NAME_PREFIX: &str = "spinali_";

/// Fixed-capacity key expression.
pub type KeyExprString = heapless::String<KEY_EXPR_CAPACITY>;

/// Entity kind advertised by a topic liveliness token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Message publisher
    Publisher,
    /// Message subscriber
    Subscriber,
    /// Service server
    ServiceServer,
    /// Service client
    ServiceClient,
}

impl EntityKind {
    /// Token used in the liveliness key expression.
    pub const fn code(self) -> &'static str {
        match self {
            EntityKind::Publisher => "MP",
            EntityKind::Subscriber => "MS",
            EntityKind::ServiceServer => "SS",
            EntityKind::ServiceClient => "SC",
        }
    }
}

/// Identity shared by every key expression of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyExprContext {
    /// Transport session id
    pub session_id: [u8; ID_SIZE],
    /// Locally generated bridge GUID
    pub guid: [u8; ID_SIZE],
    /// ROS domain id
    pub domain_id: u32,
}

/// Naming inputs of one topic.
#[derive(Debug, Clone, Copy)]
pub struct TopicKey<'a> {
    /// Topic name with leading slash, e.g. `/imu`
    pub name: &'a str,
    /// DDS type name without the trailing underscore
    pub type_name: &'a str,
    /// RIHS01 type hash
    pub type_hash: &'a [u8; TYPE_HASH_SIZE],
}

struct Hex<'a>(&'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Topic name with `/` mangled to `%`.
struct Mangled<'a>(&'a str);

impl fmt::Display for Mangled<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.split('/').enumerate() {
            if i > 0 {
                f.write_char('%')?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// snprintf-style sink: copies what fits, counts everything.
struct BoundedWriter<'a> {
    buf: &'a mut [u8],
    required: usize,
}

impl<'a> BoundedWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, required: 0 }
    }

    fn finish(self) -> Result<usize> {
        if self.required > self.buf.len() {
            return Err(Error::KeyExprTruncated {
                required: self.required,
                available: self.buf.len(),
            });
        }
        Ok(self.required)
    }
}

impl Write for BoundedWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let start = self.required.min(self.buf.len());
        let fits = s.len().min(self.buf.len() - start);
        self.buf[start..start + fits].copy_from_slice(&s.as_bytes()[..fits]);
        self.required += s.len();
        Ok(())
    }
}

impl KeyExprContext {
    /// Create a context.
    pub const fn new(session_id: [u8; ID_SIZE], guid: [u8; ID_SIZE], domain_id: u32) -> Self {
        Self {
            session_id,
            guid,
            domain_id,
        }
    }

    fn render_node_liveliness<W: Write>(&self, w: &mut W) -> fmt::Result {
        write!(
            w,
            "@ros2_lv/0/{}/0/0/NN/%/%/{}{}",
            Hex(&self.session_id),
            NODE_NAME_PREFIX,
            Hex(&self.guid)
        )
    }

    fn render_topic_data<W: Write>(&self, topic: &TopicKey<'_>, w: &mut W) -> fmt::Result {
        write!(
            w,
            "{}{}/{}_/RIHS01_{}",
            self.domain_id,
            topic.name,
            topic.type_name,
            Hex(topic.type_hash)
        )
    }

    fn render_topic_liveliness<W: Write>(
        &self,
        topic: &TopicKey<'_>,
        kind: EntityKind,
        w: &mut W,
    ) -> fmt::Result {
        write!(
            w,
            "@ros2_lv/{}/{}/0/11/{}/%/%/{}{}/{}/{}_/RIHS01_{}/::,7:,:,:,,",
            self.domain_id,
            Hex(&self.session_id),
            kind.code(),
            NODE_NAME_PREFIX,
            Hex(&self.guid),
            Mangled(topic.name),
            topic.type_name,
            Hex(topic.type_hash)
        )
    }

    /// Write the node liveliness key expression into `out`.
    pub fn write_node_liveliness(&self, out: &mut [u8]) -> Result<usize> {
        let mut w = BoundedWriter::new(out);
        let _ = self.render_node_liveliness(&mut w);
        w.finish()
    }

    /// Write the topic data key expression into `out`.
    pub fn write_topic_data(&self, topic: &TopicKey<'_>, out: &mut [u8]) -> Result<usize> {
        let mut w = BoundedWriter::new(out);
        let _ = self.render_topic_data(topic, &mut w);
        w.finish()
    }

    /// Write the topic liveliness key expression into `out`.
    pub fn write_topic_liveliness(
        &self,
        topic: &TopicKey<'_>,
        kind: EntityKind,
        out: &mut [u8],
    ) -> Result<usize> {
        let mut w = BoundedWriter::new(out);
        let _ = self.render_topic_liveliness(topic, kind, &mut w);
        w.finish()
    }

    /// Node liveliness key expression.
    pub fn node_liveliness(&self) -> Result<KeyExprString> {
        into_string(|w| self.render_node_liveliness(w), |out| {
            self.write_node_liveliness(out)
        })
    }

    /// Topic data key expression.
    pub fn topic_data(&self, topic: &TopicKey<'_>) -> Result<KeyExprString> {
        into_string(|w| self.render_topic_data(topic, w), |out| {
            self.write_topic_data(topic, out)
        })
    }

    /// Topic liveliness key expression.
    pub fn topic_liveliness(&self, topic: &TopicKey<'_>, kind: EntityKind) -> Result<KeyExprString> {
        into_string(
            |w| self.render_topic_liveliness(topic, kind, w),
            |out| self.write_topic_liveliness(topic, kind, out),
        )
    }
}

fn into_string(
    render: impl FnOnce(&mut KeyExprString) -> fmt::Result,
    measure: impl FnOnce(&mut [u8]) -> Result<usize>,
) -> Result<KeyExprString> {
    let mut s = KeyExprString::new();
    if render(&mut s).is_ok() {
        return Ok(s);
    }
    // heapless reports overflow without a length; measure with an empty sink
    let required = match measure(&mut []) {
        Ok(required) | Err(Error::KeyExprTruncated { required, .. }) => required,
        Err(other) => return Err(other),
    };
    Err(Error::KeyExprTruncated {
        required,
        available: KEY_EXPR_CAPACITY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZERO_HASH: [u8; TYPE_HASH_SIZE] = [0; TYPE_HASH_SIZE];

    fn ctx() -> KeyExprContext {
        let mut sid = [0u8; ID_SIZE];
        let mut guid = [0u8; ID_SIZE];
        for i in 0..ID_SIZE {
            sid[i] = i as u8;
            guid[i] = 0xf0 | i as u8;
        }
        KeyExprContext::new(sid, guid, 7)
    }

    fn imu() -> TopicKey<'static> {
        TopicKey {
            name: "/imu/data",
            type_name: "sensor_msgs::msg::dds_::Imu",
            type_hash: &ZERO_HASH,
        }
    }

    #[test]
    fn test_node_liveliness_format() {
        let key = ctx().node_liveliness().unwrap();
        assert_eq!(
            key.as_str(),
            "@ros2_lv/0/000102030405060708090a0b0c0d0e0f/0/0/NN/%/%/\
             spinali_f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff"
        );
    }

    #[test]
    fn test_topic_data_format() {
        let key = ctx().topic_data(&imu()).unwrap();
        let expected = format!(
            "7/imu/data/sensor_msgs::msg::dds_::Imu_/RIHS01_{}",
            "00".repeat(32)
        );
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn test_topic_liveliness_mangles_only_topic_segment() {
        let key = ctx().topic_liveliness(&imu(), EntityKind::Publisher).unwrap();
        let expected = format!(
            "@ros2_lv/7/000102030405060708090a0b0c0d0e0f/0/11/MP/%/%/\
             spinali_f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff/%imu%data/\
             sensor_msgs::msg::dds_::Imu_/RIHS01_{}/::,7:,:,:,,",
            "00".repeat(32)
        );
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn test_hex_is_lowercase() {
        let hash = [0xabu8; TYPE_HASH_SIZE];
        let topic = TopicKey {
            name: "/t",
            type_name: "T",
            type_hash: &hash,
        };
        let key = ctx().topic_data(&topic).unwrap();
        assert!(key.ends_with(&"ab".repeat(32)));
    }

    #[test]
    fn test_deterministic() {
        let c = ctx();
        let a = c.topic_liveliness(&imu(), EntityKind::Subscriber).unwrap();
        let b = c.topic_liveliness(&imu(), EntityKind::Subscriber).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_truncation_reports_required_length() {
        let c = ctx();
        let full = c.write_node_liveliness(&mut [0u8; 128]).unwrap();

        let mut small = [0u8; 20];
        assert_eq!(
            c.write_node_liveliness(&mut small),
            Err(Error::KeyExprTruncated {
                required: full,
                available: 20
            })
        );
        assert_eq!(&small, b"@ros2_lv/0/000102030");
    }

    #[test]
    fn test_oversized_names_do_not_fit_string() {
        let long = "x".repeat(KEY_EXPR_CAPACITY);
        let topic = TopicKey {
            name: &long,
            type_name: "T",
            type_hash: &ZERO_HASH,
        };
        match ctx().topic_data(&topic) {
            Err(Error::KeyExprTruncated {
                required,
                available,
            }) => {
                assert!(required > available);
                assert_eq!(available, KEY_EXPR_CAPACITY);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_worst_case_names_fit_capacity() {
        let name = format!("/{}", "n".repeat(MAX_NAME_LEN - 1));
        let type_name = "t".repeat(MAX_NAME_LEN);
        let topic = TopicKey {
            name: &name,
            type_name: &type_name,
            type_hash: &ZERO_HASH,
        };
        let c = KeyExprContext::new([0xff; ID_SIZE], [0xff; ID_SIZE], u32::MAX);
        assert!(c.topic_liveliness(&topic, EntityKind::ServiceClient).is_ok());
    }
}
