// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport over the `zenoh` crate.
//!
//! Every builder is resolved with `.wait()` on the calling thread, so the
//! bridge worker drives the session without an async runtime. Zenoh runs
//! its own read and lease machinery once the session is open; the task
//! start hooks only report success.

use std::fmt;

use ::zenoh::bytes::ZBytes;
use ::zenoh::liveliness::LivelinessToken;
use ::zenoh::pubsub::Publisher;
use ::zenoh::{Config, Wait};

use super::{Session, SessionConfig, Transport};
use crate::error::{Error, Result};
use crate::keyexpr::ID_SIZE;

/// Opens [`ZenohSession`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZenohTransport;

impl ZenohTransport {
    /// Create the transport.
    pub const fn new() -> Self {
        Self
    }
}

/// Translate the bridge session parameters into a zenoh configuration.
///
/// The locator becomes the single connect endpoint; an empty locator
/// leaves discovery to scouting.
pub fn zenoh_config(config: &SessionConfig) -> Result<Config> {
    let mut zenoh_config = Config::default();

    zenoh_config
        .insert_json5("mode", &format!("\"{}\"", config.mode.as_str()))
        .map_err(|e| Error::TransportOpen(format!("invalid mode: {e}")))?;

    if !config.locator.is_empty() {
        zenoh_config
            .insert_json5("connect/endpoints", &format!("[\"{}\"]", config.locator))
            .map_err(|e| {
                Error::TransportOpen(format!("invalid locator {}: {e}", config.locator))
            })?;
    }

    Ok(zenoh_config)
}

/// Map a failed `zenoh::open` onto the connect-loop error kinds.
fn open_error(err: impl fmt::Display) -> Error {
    let message = err.to_string();
    if message.to_ascii_lowercase().contains("scout") {
        Error::ScoutNoResults
    } else {
        Error::TransportOpen(message)
    }
}

impl Transport for ZenohTransport {
    type Session = ZenohSession;

    fn open(&self, config: &SessionConfig) -> Result<ZenohSession> {
        let session = ::zenoh::open(zenoh_config(config)?)
            .wait()
            .map_err(open_error)?;
        log::debug!("[zenoh] session {} open", session.zid());
        Ok(ZenohSession { session })
    }
}

/// An open zenoh session.
pub struct ZenohSession {
    session: ::zenoh::Session,
}

impl ZenohSession {
    /// The underlying zenoh session.
    pub fn inner(&self) -> &::zenoh::Session {
        &self.session
    }
}

impl fmt::Debug for ZenohSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZenohSession")
            .field("zid", &self.session.zid())
            .finish()
    }
}

impl Session for ZenohSession {
    type Token = LivelinessToken;
    type Publisher = Publisher<'static>;

    fn session_id(&self) -> [u8; ID_SIZE] {
        self.session.zid().to_le_bytes()
    }

    fn start_read_task(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_lease_task(&mut self) -> Result<()> {
        Ok(())
    }

    fn declare_liveliness_token(&mut self, key_expr: &str) -> Result<LivelinessToken> {
        self.session
            .liveliness()
            .declare_token(key_expr.to_string())
            .wait()
            .map_err(|e| {
                log::warn!("[zenoh] liveliness token {} rejected: {}", key_expr, e);
                Error::Declaration {
                    what: "liveliness token",
                    key_expr: key_expr.to_string(),
                }
            })
    }

    fn declare_publisher(&mut self, key_expr: &str) -> Result<Publisher<'static>> {
        self.session
            .declare_publisher(key_expr.to_string())
            .wait()
            .map_err(|e| {
                log::warn!("[zenoh] publisher {} rejected: {}", key_expr, e);
                Error::Declaration {
                    what: "publisher",
                    key_expr: key_expr.to_string(),
                }
            })
    }

    fn publish(
        &mut self,
        publisher: &Publisher<'static>,
        payload: &[u8],
        attachment: &[u8],
    ) -> Result<()> {
        publisher
            .put(ZBytes::from(payload.to_vec()))
            .attachment(ZBytes::from(attachment.to_vec()))
            .wait()
            .map_err(|e| Error::Publish(e.to_string()))
    }

    fn is_alive(&self) -> bool {
        !self.session.is_closed()
    }

    fn close(self) -> Result<()> {
        self.session
            .close()
            .wait()
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::SessionMode;

    #[test]
    fn test_open_error_classification() {
        assert_eq!(
            open_error("Unable to connect to any of [tcp/192.0.2.2:7447]"),
            Error::TransportOpen("Unable to connect to any of [tcp/192.0.2.2:7447]".into())
        );
        assert_eq!(
            open_error("Scouting delay elapsed before start conditions are met"),
            Error::ScoutNoResults
        );
    }

    #[test]
    fn test_config_accepts_defaults_and_peer_without_locator() {
        assert!(zenoh_config(&SessionConfig::default()).is_ok());
        let peer = SessionConfig {
            mode: SessionMode::Peer,
            locator: String::new(),
        };
        assert!(zenoh_config(&peer).is_ok());
    }

    #[test]
    #[ignore = "opens a real zenoh session"]
    fn test_peer_session_declares_and_publishes() {
        let config = SessionConfig {
            mode: SessionMode::Peer,
            locator: String::new(),
        };
        let mut session = ZenohTransport::new().open(&config).unwrap();
        assert_ne!(session.session_id(), [0u8; ID_SIZE]);
        session.start_read_task().unwrap();
        session.start_lease_task().unwrap();

        let _token = session
            .declare_liveliness_token("@ros2_lv/0/test/0/0/NN/%/%/spinali_test")
            .unwrap();
        let publisher = session.declare_publisher("0/imu/test").unwrap();
        session.publish(&publisher, &[0, 1, 0, 0], &[0u8; 33]).unwrap();
        assert!(session.is_alive());

        drop(publisher);
        session.close().unwrap();
    }
}
