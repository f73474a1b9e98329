// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the telemetry bridge.

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = core::result::Result<T, Error>;

/// Errors emitted by the bridge and its codecs.
///
/// Encoder and key-expression variants carry only integers so they can be
/// produced on the publish path without allocating.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Destination buffer cannot hold the encoded record.
    #[error("buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall {
        /// Bytes needed to complete the write that failed.
        required: usize,
        /// Length of the destination buffer.
        available: usize,
    },

    /// Record does not match the schema it is encoded with.
    #[error("record does not match schema {type_name} at field {field}")]
    SchemaMismatch {
        /// Schema type name.
        type_name: &'static str,
        /// Index of the offending field.
        field: usize,
    },

    /// Input bytes are not valid CDR for the requested type.
    #[error("malformed {what} at byte {offset}")]
    Decoding {
        /// Type being decoded.
        what: &'static str,
        /// Byte offset of the offending value.
        offset: usize,
    },

    /// Key expression did not fit into the destination buffer.
    #[error("key expression truncated: {required} bytes required, {available} available")]
    KeyExprTruncated {
        /// Length the full key expression would have had.
        required: usize,
        /// Length of the destination buffer.
        available: usize,
    },

    /// Transport session could not be opened.
    #[error("transport open failed: {0}")]
    TransportOpen(String),

    /// Scouting finished without discovering a router or peer.
    #[error("scouting returned no results")]
    ScoutNoResults,

    /// Background read or lease task could not be started.
    #[error("failed to start {0} task")]
    TaskStart(&'static str),

    /// Liveliness token or publisher declaration was rejected.
    #[error("failed to declare {what} on {key_expr}")]
    Declaration {
        /// Kind of entity being declared.
        what: &'static str,
        /// Key expression the declaration targeted.
        key_expr: String,
    },

    /// Transport rejected a publish call.
    #[error("publish failed: {0}")]
    Publish(String),

    /// Any other transport failure, e.g. a session that refused to close.
    #[error("transport error: {0}")]
    Transport(String),

    /// Bridge worker is already running.
    #[error("already running")]
    AlreadyRunning,

    /// Bridge worker is not running.
    #[error("not running")]
    NotRunning,

    /// Worker thread could not be spawned or joined.
    #[error("worker thread failure: {0}")]
    Worker(String),
}

impl Error {
    /// Returns true for encoder/formatter errors caused by an undersized buffer.
    pub const fn is_buffer_error(&self) -> bool {
        matches!(
            self,
            Error::BufferTooSmall { .. } | Error::KeyExprTruncated { .. }
        )
    }
}
