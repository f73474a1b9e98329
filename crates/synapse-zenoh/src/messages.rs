// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridged message types, their schemas and the [`Frame`] tagged union.

use std::time::Duration;

use crate::cdr::{Field, FieldType, Record, Schema, Value, TYPE_HASH_SIZE};

/// Size of `Header::frame_id`, NUL terminator included.
pub const FRAME_ID_LEN: usize = 32;

/// Default topic of IMU samples.
pub const IMU_TOPIC: &str = "/imu";

/// Default topic of the clock-offset heartbeat.
pub const CLOCK_OFFSET_TOPIC: &str = "/clock_offset";

// RIHS01 type hashes: SHA-256 of each type description, as produced by
// rosidl_generator_type_description.
const TIME_HASH: [u8; TYPE_HASH_SIZE] = [
    0xb1, 0x06, 0x23, 0x5e, 0x25, 0xa4, 0xc5, 0xed,
    0x35, 0x09, 0x8a, 0xa0, 0xa6, 0x1a, 0x3e, 0xe9,
    0xc9, 0xb1, 0x8d, 0x19, 0x7f, 0x39, 0x8b, 0x0e,
    0x42, 0x06, 0xce, 0xa9, 0xac, 0xf9, 0xc1, 0x97,
];

const HEADER_HASH: [u8; TYPE_HASH_SIZE] = [
    0xf4, 0x9f, 0xb3, 0xae, 0x2c, 0xf0, 0x70, 0xf7,
    0x93, 0x64, 0x5f, 0xf7, 0x49, 0x68, 0x3a, 0xc6,
    0xb0, 0x62, 0x03, 0xe4, 0x1c, 0x89, 0x1e, 0x17,
    0x70, 0x1b, 0x1c, 0xb5, 0x97, 0xce, 0x6a, 0x01,
];

const QUATERNION_HASH: [u8; TYPE_HASH_SIZE] = [
    0x8a, 0x76, 0x5f, 0x66, 0x77, 0x8c, 0x8f, 0xf7,
    0xc8, 0xab, 0x94, 0xaf, 0xcc, 0x59, 0x0a, 0x2e,
    0xd5, 0x32, 0x5a, 0x1d, 0x9a, 0x07, 0x6f, 0xff,
    0xf3, 0x8f, 0xbc, 0xe3, 0x6f, 0x45, 0x86, 0x84,
];

const VECTOR3_HASH: [u8; TYPE_HASH_SIZE] = [
    0xcc, 0x12, 0xfe, 0x83, 0xe4, 0xc0, 0x27, 0x19,
    0xf1, 0xce, 0x80, 0x70, 0xbf, 0xd1, 0x4a, 0xec,
    0xd4, 0x0f, 0x75, 0xa9, 0x66, 0x96, 0xa6, 0x7a,
    0x2a, 0x1f, 0x37, 0xf7, 0xdb, 0xb0, 0x76, 0x5d,
];

const IMU_HASH: [u8; TYPE_HASH_SIZE] = [
    0x7d, 0x9a, 0x00, 0xff, 0x13, 0x10, 0x80, 0x89,
    0x7a, 0x5e, 0xc7, 0xe2, 0x6e, 0x31, 0x59, 0x54,
    0xb8, 0xea, 0xe3, 0x35, 0x3c, 0x3f, 0x99, 0x5c,
    0x55, 0xfa, 0xf7, 0x15, 0x74, 0x00, 0x0b, 0x5b,
];

const CLOCK_OFFSET_HASH: [u8; TYPE_HASH_SIZE] = [
    0x8c, 0x88, 0x07, 0x8c, 0xc9, 0x19, 0xf9, 0x98,
    0x7f, 0xf1, 0x65, 0xb5, 0xf7, 0x17, 0x1a, 0xc5,
    0x3f, 0x6b, 0x41, 0x3f, 0x93, 0xa6, 0x88, 0x4c,
    0x37, 0x47, 0x14, 0x80, 0x8b, 0xae, 0x70, 0x58,
];

/// `builtin_interfaces/Time`
pub static TIME_SCHEMA: Schema = Schema {
    type_name: "builtin_interfaces::msg::dds_::Time",
    type_hash: TIME_HASH,
    fields: &[
        Field::new("sec", FieldType::I32),
        Field::new("nanosec", FieldType::U32),
    ],
};

/// `std_msgs/Header`; the frame id is a string bounded by the local buffer.
pub static HEADER_SCHEMA: Schema = Schema {
    type_name: "std_msgs::msg::dds_::Header",
    type_hash: HEADER_HASH,
    fields: &[
        Field::new("stamp", FieldType::Struct(&TIME_SCHEMA)),
        Field::new("frame_id", FieldType::String(FRAME_ID_LEN - 1)),
    ],
};

/// `geometry_msgs/Quaternion`
pub static QUATERNION_SCHEMA: Schema = Schema {
    type_name: "geometry_msgs::msg::dds_::Quaternion",
    type_hash: QUATERNION_HASH,
    fields: &[
        Field::new("x", FieldType::F64),
        Field::new("y", FieldType::F64),
        Field::new("z", FieldType::F64),
        Field::new("w", FieldType::F64),
    ],
};

/// `geometry_msgs/Vector3`
pub static VECTOR3_SCHEMA: Schema = Schema {
    type_name: "geometry_msgs::msg::dds_::Vector3",
    type_hash: VECTOR3_HASH,
    fields: &[
        Field::new("x", FieldType::F64),
        Field::new("y", FieldType::F64),
        Field::new("z", FieldType::F64),
    ],
};

static COVARIANCE: FieldType = FieldType::F64;

/// `sensor_msgs/Imu`
pub static IMU_SCHEMA: Schema = Schema {
    type_name: "sensor_msgs::msg::dds_::Imu",
    type_hash: IMU_HASH,
    fields: &[
        Field::new("header", FieldType::Struct(&HEADER_SCHEMA)),
        Field::new("orientation", FieldType::Struct(&QUATERNION_SCHEMA)),
        Field::new("orientation_covariance", FieldType::Array(&COVARIANCE, 9)),
        Field::new("angular_velocity", FieldType::Struct(&VECTOR3_SCHEMA)),
        Field::new("angular_velocity_covariance", FieldType::Array(&COVARIANCE, 9)),
        Field::new("linear_acceleration", FieldType::Struct(&VECTOR3_SCHEMA)),
        Field::new("linear_acceleration_covariance", FieldType::Array(&COVARIANCE, 9)),
    ],
};

/// Signed offset between the flight controller uptime and its epoch.
pub static CLOCK_OFFSET_SCHEMA: Schema = Schema {
    type_name: "synapse_msgs::msg::dds_::ClockOffset",
    type_hash: CLOCK_OFFSET_HASH,
    fields: &[
        Field::new("seconds", FieldType::I64),
        Field::new("nanos", FieldType::I32),
    ],
};

/// Discriminant of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// [`Imu`]
    Imu,
    /// [`ClockOffset`]
    ClockOffset,
}

impl MessageTag {
    /// Schema of messages carrying this tag.
    pub fn schema(self) -> &'static Schema {
        match self {
            MessageTag::Imu => &IMU_SCHEMA,
            MessageTag::ClockOffset => &CLOCK_OFFSET_SCHEMA,
        }
    }

    /// Frame of this tag holding a default message.
    pub fn default_frame(self) -> Frame {
        match self {
            MessageTag::Imu => Frame::Imu(Imu::default()),
            MessageTag::ClockOffset => Frame::ClockOffset(ClockOffset::default()),
        }
    }
}

/// Timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    /// Seconds
    pub sec: i32,
    /// Nanoseconds within the second
    pub nanosec: u32,
}

impl Record for Time {
    fn field(&self, index: usize) -> Option<Value<'_>> {
        match index {
            0 => Some(Value::I32(self.sec)),
            1 => Some(Value::U32(self.nanosec)),
            _ => None,
        }
    }
}

/// Stamp and coordinate frame of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    /// Acquisition time
    pub stamp: Time,
    /// NUL-terminated frame id
    pub frame_id: [u8; FRAME_ID_LEN],
}

impl Header {
    /// Set the frame id, truncating to `FRAME_ID_LEN - 1` bytes on a
    /// character boundary.
    pub fn set_frame_id(&mut self, frame_id: &str) {
        let mut len = frame_id.len().min(FRAME_ID_LEN - 1);
        while !frame_id.is_char_boundary(len) {
            len -= 1;
        }
        self.frame_id = [0; FRAME_ID_LEN];
        self.frame_id[..len].copy_from_slice(&frame_id.as_bytes()[..len]);
    }

    /// Frame id up to the first NUL.
    pub fn frame_id(&self) -> &[u8] {
        let end = self
            .frame_id
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(FRAME_ID_LEN);
        &self.frame_id[..end]
    }
}

impl Record for Header {
    fn field(&self, index: usize) -> Option<Value<'_>> {
        match index {
            0 => Some(Value::Struct(&self.stamp)),
            1 => Some(Value::Bytes(self.frame_id())),
            _ => None,
        }
    }
}

/// Orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quaternion {
    /// x
    pub x: f64,
    /// y
    pub y: f64,
    /// z
    pub z: f64,
    /// w
    pub w: f64,
}

impl Record for Quaternion {
    fn field(&self, index: usize) -> Option<Value<'_>> {
        match index {
            0 => Some(Value::F64(self.x)),
            1 => Some(Value::F64(self.y)),
            2 => Some(Value::F64(self.z)),
            3 => Some(Value::F64(self.w)),
            _ => None,
        }
    }
}

/// 3-vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// x
    pub x: f64,
    /// y
    pub y: f64,
    /// z
    pub z: f64,
}

impl Record for Vector3 {
    fn field(&self, index: usize) -> Option<Value<'_>> {
        match index {
            0 => Some(Value::F64(self.x)),
            1 => Some(Value::F64(self.y)),
            2 => Some(Value::F64(self.z)),
            _ => None,
        }
    }
}

/// IMU sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Imu {
    /// Stamp and frame
    pub header: Header,
    /// Attitude estimate
    pub orientation: Quaternion,
    /// Row-major 3x3 covariance
    pub orientation_covariance: [f64; 9],
    /// rad/s
    pub angular_velocity: Vector3,
    /// Row-major 3x3 covariance
    pub angular_velocity_covariance: [f64; 9],
    /// m/s^2
    pub linear_acceleration: Vector3,
    /// Row-major 3x3 covariance
    pub linear_acceleration_covariance: [f64; 9],
}

impl Record for Imu {
    fn field(&self, index: usize) -> Option<Value<'_>> {
        match index {
            0 => Some(Value::Struct(&self.header)),
            1 => Some(Value::Struct(&self.orientation)),
            2 => Some(Value::Array(&self.orientation_covariance)),
            3 => Some(Value::Struct(&self.angular_velocity)),
            4 => Some(Value::Array(&self.angular_velocity_covariance)),
            5 => Some(Value::Struct(&self.linear_acceleration)),
            6 => Some(Value::Array(&self.linear_acceleration_covariance)),
            _ => None,
        }
    }
}

/// Clock-offset heartbeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockOffset {
    /// Whole seconds
    pub seconds: i64,
    /// Nanoseconds within the second
    pub nanos: i32,
}

impl ClockOffset {
    /// Offset equal to the given uptime.
    pub fn from_uptime(uptime: Duration) -> Self {
        Self {
            seconds: i64::try_from(uptime.as_secs()).unwrap_or(i64::MAX),
            nanos: uptime.subsec_nanos() as i32,
        }
    }
}

impl Record for ClockOffset {
    fn field(&self, index: usize) -> Option<Value<'_>> {
        match index {
            0 => Some(Value::I64(self.seconds)),
            1 => Some(Value::I32(self.nanos)),
            _ => None,
        }
    }
}

/// One decoded topic sample plus its tag.
///
/// The worker keeps a single frame and overwrites it on every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    /// IMU sample
    Imu(Imu),
    /// Heartbeat
    ClockOffset(ClockOffset),
}

impl Frame {
    /// Tag of the contained message.
    pub const fn tag(&self) -> MessageTag {
        match self {
            Frame::Imu(_) => MessageTag::Imu,
            Frame::ClockOffset(_) => MessageTag::ClockOffset,
        }
    }

    /// The contained message as a CDR record.
    pub fn record(&self) -> &dyn Record {
        match self {
            Frame::Imu(imu) => imu,
            Frame::ClockOffset(offset) => offset,
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::ClockOffset(ClockOffset::default())
    }
}

impl From<Imu> for Frame {
    fn from(imu: Imu) -> Self {
        Frame::Imu(imu)
    }
}

impl From<ClockOffset> for Frame {
    fn from(offset: ClockOffset) -> Self {
        Frame::ClockOffset(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{encode, CdrDecoder};

    #[test]
    fn test_imu_max_size() {
        // stamp 8, frame_id 4 + 31 + 1, pad to 48, quaternion 32,
        // 3 * (72 covariance), 2 * 24
        assert_eq!(IMU_SCHEMA.max_encoded_size(), 48 + 32 + 72 + 24 + 72 + 24 + 72);
    }

    #[test]
    fn test_imu_encodes_in_schema_order() {
        let mut imu = Imu::default();
        imu.header.stamp = Time { sec: 12, nanosec: 34 };
        imu.header.set_frame_id("base_link");
        imu.orientation.w = 1.0;
        imu.linear_acceleration.z = -9.81;
        imu.linear_acceleration_covariance[8] = 0.5;

        let mut buf = [0u8; 512];
        let len = encode(&IMU_SCHEMA, &imu, &mut buf).unwrap();
        // frame_id ends at 8 + 4 + 10 = 22, quaternion starts at 24
        assert_eq!(len, 24 + 32 + 72 + 24 + 72 + 24 + 72);
        assert_eq!(&buf[8..12], &10u32.to_le_bytes());

        let mut d = CdrDecoder::new(&buf[..len]);
        assert_eq!(d.decode_i32().unwrap(), 12);
        assert_eq!(d.decode_u32().unwrap(), 34);
        assert_eq!(d.decode_string().unwrap(), "base_link");
        for _ in 0..3 {
            assert_eq!(d.decode_f64().unwrap(), 0.0);
        }
        assert_eq!(d.decode_f64().unwrap(), 1.0);
        for _ in 0..(9 + 3 + 9 + 2) {
            d.decode_f64().unwrap();
        }
        assert_eq!(d.decode_f64().unwrap(), -9.81);
        for _ in 0..8 {
            d.decode_f64().unwrap();
        }
        assert_eq!(d.decode_f64().unwrap(), 0.5);
        assert_eq!(d.remaining(), 0);
    }

    #[test]
    fn test_empty_frame_id_is_nul_only_string() {
        let mut buf = [0u8; 512];
        let len = encode(&HEADER_SCHEMA, &Header::default(), &mut buf).unwrap();
        assert_eq!(len, 8 + 4 + 1);
        assert_eq!(&buf[8..13], &[1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_type_hashes() {
        fn hex(hash: &[u8; TYPE_HASH_SIZE]) -> String {
            hash.iter().map(|b| format!("{b:02x}")).collect()
        }
        assert_eq!(
            hex(&IMU_SCHEMA.type_hash),
            "7d9a00ff131080897a5ec7e26e315954b8eae3353c3f995c55faf71574000b5b"
        );
        assert_eq!(
            hex(&HEADER_SCHEMA.type_hash),
            "f49fb3ae2cf070f793645ff749683ac6b06203e41c891e17701b1cb597ce6a01"
        );
        assert_eq!(
            hex(&TIME_SCHEMA.type_hash),
            "b106235e25a4c5ed35098aa0a61a3ee9c9b18d197f398b0e4206cea9acf9c197"
        );
        assert_eq!(
            hex(&CLOCK_OFFSET_SCHEMA.type_hash),
            "8c88078cc919f9987ff165b5f7171ac53f6b413f93a6884c374714808bae7058"
        );
    }

    #[test]
    fn test_clock_offset_from_uptime() {
        let offset = ClockOffset::from_uptime(Duration::new(3, 250_000_000));
        assert_eq!(offset.seconds, 3);
        assert_eq!(offset.nanos, 250_000_000);
        // i64 then i32: 12 bytes, no trailing padding
        assert_eq!(CLOCK_OFFSET_SCHEMA.max_encoded_size(), 12);
    }

    #[test]
    fn test_frame_tag() {
        assert_eq!(Frame::from(Imu::default()).tag(), MessageTag::Imu);
        assert_eq!(Frame::default().tag(), MessageTag::ClockOffset);
        assert_eq!(MessageTag::Imu.default_frame().tag(), MessageTag::Imu);
        assert_eq!(MessageTag::Imu.schema().type_name, "sensor_msgs::msg::dds_::Imu");
    }

    #[test]
    fn test_frame_id_truncates() {
        let mut header = Header::default();
        header.set_frame_id(&"f".repeat(40));
        assert_eq!(header.frame_id().len(), FRAME_ID_LEN - 1);

        // 'é' is two bytes; the cut may not split it
        header.set_frame_id(&format!("{}é", "f".repeat(30)));
        assert_eq!(header.frame_id(), "f".repeat(30).as_bytes());
    }
}
