// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher registry and frame dispatch.
//!
//! The registry is assembled once with [`RegistryBuilder`] and frozen. On
//! every frame the bridge calls [`Registry::dispatch`], which writes the
//! representation header, lets each descriptor carrying the same tag encode
//! the body after it, and hands the payload to a [`PublishSink`]. A
//! descriptor whose encoder fails is skipped; the others still publish.
//!
//! A schema that does not fit its tag's record is a programming error:
//! [`RegistryBuilder::build`] panics on it.

use crate::cdr::{self, Schema};
use crate::error::{Error, Result};
use crate::messages::{Frame, MessageTag};

/// Size of the bridge transmit buffer.
pub const TX_BUFFER_SIZE: usize = 8192;

/// Body encoder: writes the CDR body that follows the representation header
/// and returns its length.
pub type EncodeFn = Box<dyn Fn(&Frame, &mut [u8]) -> Result<usize> + Send>;

/// One published topic.
pub struct Descriptor {
    topic_name: &'static str,
    schema: &'static Schema,
    tag: MessageTag,
    encode: EncodeFn,
}

impl Descriptor {
    /// Topic name, e.g. `/imu`
    pub fn topic_name(&self) -> &'static str {
        self.topic_name
    }

    /// Message schema
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Tag of the frames published on this topic.
    pub fn tag(&self) -> MessageTag {
        self.tag
    }

    /// Encode the body of `frame` into `out`.
    pub fn encode(&self, frame: &Frame, out: &mut [u8]) -> Result<usize> {
        (self.encode)(frame, out)
    }

    /// Encode `frame` as a full payload: representation header then body.
    pub fn encode_payload(&self, frame: &Frame, out: &mut [u8]) -> Result<usize> {
        cdr::write_payload(out, |body| self.encode(frame, body))
    }
}

impl std::fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("topic_name", &self.topic_name)
            .field("type_name", &self.schema.type_name)
            .field("tag", &self.tag)
            .finish()
    }
}

/// Receives encoded payloads from [`Registry::dispatch`].
pub trait PublishSink {
    /// Publish `payload` for the descriptor at `index`.
    fn publish(&mut self, index: usize, descriptor: &Descriptor, payload: &[u8]) -> Result<()>;
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Descriptors whose tag matched the frame.
    pub matched: usize,
    /// Payloads accepted by the sink.
    pub published: usize,
    /// Descriptors skipped because encoding failed.
    pub skipped: usize,
    /// Payloads the sink rejected.
    pub failed: usize,
}

/// Builder collecting descriptors before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    descriptors: Vec<Descriptor>,
}

impl RegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic with a custom body encoder.
    pub fn register<F>(
        mut self,
        topic_name: &'static str,
        schema: &'static Schema,
        tag: MessageTag,
        encode: F,
    ) -> Self
    where
        F: Fn(&Frame, &mut [u8]) -> Result<usize> + Send + 'static,
    {
        self.descriptors.push(Descriptor {
            topic_name,
            schema,
            tag,
            encode: Box::new(encode),
        });
        self
    }

    /// Register a topic encoded straight from `schema`.
    pub fn register_schema(
        self,
        topic_name: &'static str,
        schema: &'static Schema,
        tag: MessageTag,
    ) -> Self {
        self.register(topic_name, schema, tag, move |frame, out| {
            cdr::encode(schema, frame.record(), out)
        })
    }

    /// Freeze the table.
    ///
    /// Each descriptor encodes a default frame of its tag once; a schema
    /// mismatch panics here instead of surfacing on every dispatch.
    pub fn build(self) -> Registry {
        let mut scratch = vec![0u8; TX_BUFFER_SIZE];
        for descriptor in &self.descriptors {
            let frame = descriptor.tag.default_frame();
            if let Err(err @ Error::SchemaMismatch { .. }) = descriptor.encode(&frame, &mut scratch)
            {
                schema_violation(descriptor, &err);
            }
        }
        Registry {
            descriptors: self.descriptors.into_boxed_slice(),
        }
    }
}

/// Immutable table of publisher descriptors.
#[derive(Debug)]
pub struct Registry {
    descriptors: Box<[Descriptor]>,
}

impl Registry {
    /// Start a new registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registered descriptors in registration order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True when nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Encode `frame` for every matching descriptor and publish it.
    ///
    /// `buf` is reused for each descriptor; encode and publish failures are
    /// logged and counted, never propagated. A schema mismatch panics.
    pub fn dispatch(
        &self,
        frame: &Frame,
        buf: &mut [u8],
        sink: &mut dyn PublishSink,
    ) -> DispatchReport {
        let tag = frame.tag();
        let mut report = DispatchReport::default();

        for (index, descriptor) in self.descriptors.iter().enumerate() {
            if descriptor.tag != tag {
                continue;
            }
            report.matched += 1;

            let len = match descriptor.encode_payload(frame, buf) {
                Ok(len) => len,
                Err(err @ Error::SchemaMismatch { .. }) => schema_violation(descriptor, &err),
                Err(err) => {
                    log::warn!(
                        "[zenoh] encode failed for {}: {}",
                        descriptor.topic_name,
                        err
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            match sink.publish(index, descriptor, &buf[..len]) {
                Ok(()) => report.published += 1,
                Err(err) => {
                    log::warn!(
                        "[zenoh] publish failed for {}: {}",
                        descriptor.topic_name,
                        err
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }
}

fn schema_violation(descriptor: &Descriptor, err: &Error) -> ! {
    log::error!("[zenoh] {}: {}", descriptor.topic_name, err);
    panic!(
        "{} cannot carry {:?} frames: {}",
        descriptor.topic_name, descriptor.tag, err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{payload_body, CdrDecoder};
    use crate::messages::{ClockOffset, Imu, CLOCK_OFFSET_SCHEMA, IMU_SCHEMA};

    #[derive(Default)]
    struct Recorder {
        published: Vec<(usize, &'static str, Vec<u8>)>,
        reject: Option<usize>,
    }

    impl PublishSink for Recorder {
        fn publish(&mut self, index: usize, descriptor: &Descriptor, payload: &[u8]) -> Result<()> {
            if self.reject == Some(index) {
                return Err(Error::Publish("rejected".into()));
            }
            self.published
                .push((index, descriptor.topic_name(), payload.to_vec()));
            Ok(())
        }
    }

    fn failing(_: &Frame, out: &mut [u8]) -> Result<usize> {
        Err(Error::BufferTooSmall {
            required: out.len() + 1,
            available: out.len(),
        })
    }

    #[test]
    fn test_dispatch_matches_tag_only() {
        let registry = Registry::builder()
            .register_schema("/clock_offset", &CLOCK_OFFSET_SCHEMA, MessageTag::ClockOffset)
            .register_schema("/imu", &IMU_SCHEMA, MessageTag::Imu)
            .build();

        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut sink = Recorder::default();
        let report = registry.dispatch(&Frame::from(Imu::default()), &mut buf, &mut sink);

        assert_eq!(
            report,
            DispatchReport {
                matched: 1,
                published: 1,
                ..Default::default()
            }
        );
        assert_eq!(sink.published.len(), 1);
        assert_eq!(sink.published[0].0, 1);
        assert_eq!(sink.published[0].1, "/imu");
    }

    #[test]
    fn test_payload_has_header_and_body() {
        let registry = Registry::builder()
            .register_schema("/clock_offset", &CLOCK_OFFSET_SCHEMA, MessageTag::ClockOffset)
            .build();

        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut sink = Recorder::default();
        let offset = ClockOffset { seconds: 5, nanos: 7 };
        registry.dispatch(&Frame::from(offset), &mut buf, &mut sink);

        let payload = &sink.published[0].2;
        assert_eq!(&payload[..4], &[0x00, 0x01, 0x00, 0x00]);
        let body = payload_body(payload).unwrap();
        assert_eq!(&body[..8], &5i64.to_le_bytes());
        assert_eq!(&body[8..12], &7i32.to_le_bytes());
    }

    #[test]
    fn test_encode_failure_is_isolated() {
        let registry = Registry::builder()
            .register("/imu_broken", &IMU_SCHEMA, MessageTag::Imu, failing)
            .register_schema("/imu", &IMU_SCHEMA, MessageTag::Imu)
            .build();

        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut sink = Recorder::default();
        let report = registry.dispatch(&Frame::from(Imu::default()), &mut buf, &mut sink);

        assert_eq!(report.matched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.published, 1);
        assert_eq!(sink.published[0].1, "/imu");
    }

    #[test]
    fn test_small_buffer_skips_descriptor() {
        let registry = Registry::builder()
            .register_schema("/imu", &IMU_SCHEMA, MessageTag::Imu)
            .build();

        let mut buf = [0u8; 64];
        let mut sink = Recorder::default();
        let report = registry.dispatch(&Frame::from(Imu::default()), &mut buf, &mut sink);
        assert_eq!(report.skipped, 1);
        assert!(sink.published.is_empty());
    }

    #[test]
    #[should_panic(expected = "/wrong cannot carry Imu frames")]
    fn test_schema_mismatch_fails_at_build() {
        // IMU frames encoded with the clock-offset schema
        let _ = Registry::builder()
            .register_schema("/wrong", &CLOCK_OFFSET_SCHEMA, MessageTag::Imu)
            .build();
    }

    #[test]
    fn test_custom_encoder_writes_body_only() {
        let registry = Registry::builder()
            .register("/imu", &IMU_SCHEMA, MessageTag::Imu, |frame, out| {
                cdr::encode(&IMU_SCHEMA, frame.record(), out)
            })
            .build();

        let mut imu = Imu::default();
        imu.header.stamp.sec = 42;
        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut sink = Recorder::default();
        registry.dispatch(&Frame::from(imu), &mut buf, &mut sink);

        let payload = &sink.published[0].2;
        assert_eq!(&payload[..4], &cdr::REPRESENTATION_HEADER);
        let mut decoder = CdrDecoder::new(payload_body(payload).unwrap());
        assert_eq!(decoder.decode_i32().unwrap(), 42);
    }

    #[test]
    fn test_buffer_shorter_than_header_skips() {
        let registry = Registry::builder()
            .register("/imu", &IMU_SCHEMA, MessageTag::Imu, |_, _| Ok(0))
            .build();

        let mut buf = [0u8; 3];
        let mut sink = Recorder::default();
        let report = registry.dispatch(&Frame::from(Imu::default()), &mut buf, &mut sink);
        assert_eq!(report.skipped, 1);
        assert!(sink.published.is_empty());
    }

    #[test]
    fn test_sink_failure_counted() {
        let registry = Registry::builder()
            .register_schema("/a", &CLOCK_OFFSET_SCHEMA, MessageTag::ClockOffset)
            .register_schema("/b", &CLOCK_OFFSET_SCHEMA, MessageTag::ClockOffset)
            .build();

        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut sink = Recorder {
            reject: Some(0),
            ..Default::default()
        };
        let report = registry.dispatch(&Frame::default(), &mut buf, &mut sink);
        assert_eq!(report.failed, 1);
        assert_eq!(report.published, 1);
        assert_eq!(sink.published[0].1, "/b");
    }

    #[test]
    fn test_no_match_publishes_nothing() {
        let registry = Registry::builder()
            .register_schema("/imu", &IMU_SCHEMA, MessageTag::Imu)
            .build();

        let mut buf = [0u8; TX_BUFFER_SIZE];
        let mut sink = Recorder::default();
        let report = registry.dispatch(&Frame::default(), &mut buf, &mut sink);
        assert_eq!(report, DispatchReport::default());
        assert_eq!(registry.len(), 1);
    }
}
