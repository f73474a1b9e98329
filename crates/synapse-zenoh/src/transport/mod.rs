// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction for the bridge
//!
//! Defines the capability set the bridge needs from a Zenoh client.
//! Implementations:
//! - a full zenoh session (`zenoh` feature, see `zenoh` module)
//! - an in-process loopback (see [`loopback`])
//!
//! ## Design Principles
//!
//! - **Blocking calls** - the bridge runs on its own worker thread
//! - **Borrowed payloads** - `publish` takes slices of the bridge TX buffer
//! - **Handles owned by the caller** - tokens and publishers live in the
//!   bridge's per-session state and are dropped before `close`

use crate::error::Result;
use crate::keyexpr::ID_SIZE;

pub mod loopback;
#[cfg(feature = "zenoh")]
pub mod zenoh;

pub use loopback::{LoopbackPublisher, LoopbackTransport, PublishedSample};
#[cfg(feature = "zenoh")]
pub use self::zenoh::{ZenohSession, ZenohTransport};

/// Default router locator.
pub const DEFAULT_LOCATOR: &str = "tcp/192.0.2.2:7447";

/// Session role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Connect to a router
    #[default]
    Client,
    /// Peer-to-peer
    Peer,
}

impl SessionMode {
    /// Name as accepted by zenoh configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionMode::Client => "client",
            SessionMode::Peer => "peer",
        }
    }

    /// Parse `client` / `peer` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Some(SessionMode::Client),
            "peer" => Some(SessionMode::Peer),
            _ => None,
        }
    }
}

/// Parameters passed to [`Transport::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Session role
    pub mode: SessionMode,
    /// Router or peer locator, e.g. `tcp/192.0.2.2:7447`
    pub locator: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Client,
            locator: DEFAULT_LOCATOR.to_string(),
        }
    }
}

/// Factory for sessions.
///
/// Implementors must report open failures as
/// [`Error::TransportOpen`](crate::Error::TransportOpen) or
/// [`Error::ScoutNoResults`](crate::Error::ScoutNoResults) when they can
/// tell them apart; the connect loop logs them differently.
pub trait Transport {
    /// Open session type
    type Session: Session;

    /// Open a session.
    fn open(&self, config: &SessionConfig) -> Result<Self::Session>;
}

/// An open transport session.
pub trait Session {
    /// Liveliness token handle; dropping it withdraws the token.
    type Token;

    /// Declared publisher handle.
    type Publisher;

    /// Transport-assigned session id.
    fn session_id(&self) -> [u8; ID_SIZE];

    /// Start the background read task.
    fn start_read_task(&mut self) -> Result<()>;

    /// Start the background lease task.
    fn start_lease_task(&mut self) -> Result<()>;

    /// Declare a liveliness token on `key_expr`.
    fn declare_liveliness_token(&mut self, key_expr: &str) -> Result<Self::Token>;

    /// Declare a publisher on `key_expr`.
    fn declare_publisher(&mut self, key_expr: &str) -> Result<Self::Publisher>;

    /// Publish `payload` with `attachment` through `publisher`.
    fn publish(
        &mut self,
        publisher: &Self::Publisher,
        payload: &[u8],
        attachment: &[u8],
    ) -> Result<()>;

    /// Whether the session still has a live link.
    ///
    /// Transports that cannot tell report true until a publish fails.
    fn is_alive(&self) -> bool {
        true
    }

    /// Stop the background tasks and close the session.
    fn close(self) -> Result<()>;
}
