// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local bridge GUID generation.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::keyexpr::ID_SIZE;

/// 16-byte identifier of the bridge node, embedded in liveliness tokens and
/// used as the publisher GID in attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(pub [u8; ID_SIZE]);

impl Guid {
    /// All-zero GUID
    pub const ZERO: Guid = Guid([0; ID_SIZE]);

    /// Generate a GUID from wall-clock time, process id and thread id.
    ///
    /// Called once per bridge; two bridges started in the same nanosecond
    /// on the same thread would collide.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        let mut hasher = DefaultHasher::new();
        nanos.hash(&mut hasher);
        std::process::id().hash(&mut hasher);
        std::thread::current().id().hash(&mut hasher);
        let mixed = hasher.finish();

        let mut bytes = [0u8; ID_SIZE];
        bytes[0..8].copy_from_slice(&(nanos as u64).to_le_bytes());
        bytes[8..16].copy_from_slice(&mixed.to_le_bytes());
        Guid(bytes)
    }

    /// Raw bytes
    pub const fn as_bytes(&self) -> &[u8; ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl From<[u8; ID_SIZE]> for Guid {
    fn from(bytes: [u8; ID_SIZE]) -> Self {
        Guid(bytes)
    }
}
