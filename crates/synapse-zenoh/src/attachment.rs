// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-sample attachment carried next to every published payload.
//!
//! ```text
//! 0        8        16  17               33
//! +--------+--------+---+----------------+
//! |  seq   |  time  |len|      gid       |
//! | i64 LE | i64 LE |u8 |   16 bytes     |
//! +--------+--------+---+----------------+
//! ```
//!
//! The layout follows the rmw_zenoh attachment: the GID is a byte sequence
//! whose length (16) fits in a single-byte prefix.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::guid::Guid;
use crate::keyexpr::ID_SIZE;

/// Serialized attachment size.
pub const ATTACHMENT_SIZE: usize = 8 + 8 + 1 + ID_SIZE;

/// Source of the attachment timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampSource {
    /// Nanoseconds since the UNIX epoch.
    #[default]
    WallClock,
    /// Always zero.
    Zero,
}

impl TimestampSource {
    fn now(self) -> i64 {
        match self {
            TimestampSource::WallClock => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
                .unwrap_or(0),
            TimestampSource::Zero => 0,
        }
    }
}

/// Attachment state of one session.
///
/// Only the worker thread touches it; `build` is called once per publish.
#[derive(Debug, Clone)]
pub struct Attachment {
    sequence_number: i64,
    timestamp: i64,
    gid: Guid,
    source: TimestampSource,
}

impl Attachment {
    /// Fresh attachment state for a session publishing as `gid`.
    pub const fn new(gid: Guid, source: TimestampSource) -> Self {
        Self {
            sequence_number: 0,
            timestamp: 0,
            gid,
            source,
        }
    }

    /// Sequence number of the last built attachment (0 before the first).
    pub const fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    /// Timestamp of the last built attachment.
    pub const fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Advance the sequence number, stamp the time and serialize.
    ///
    /// # Panics
    ///
    /// Panics if the sequence number would overflow `i64`.
    pub fn build(&mut self) -> [u8; ATTACHMENT_SIZE] {
        self.sequence_number = match self.sequence_number.checked_add(1) {
            Some(next) => next,
            None => panic!("attachment sequence number overflow"),
        };
        self.timestamp = self.source.now();

        let mut out = [0u8; ATTACHMENT_SIZE];
        out[0..8].copy_from_slice(&self.sequence_number.to_le_bytes());
        out[8..16].copy_from_slice(&self.timestamp.to_le_bytes());
        out[16] = ID_SIZE as u8;
        out[17..].copy_from_slice(self.gid.as_bytes());
        out
    }
}
