// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process loopback transport.
//!
//! Records every declaration and publish instead of sending it. Failures can
//! be scripted ahead of time, which is how the connect loop is exercised on
//! a host without a router.
//!
//! ```
//! use synapse_zenoh::transport::{LoopbackTransport, Session, SessionConfig, Transport};
//!
//! let transport = LoopbackTransport::new();
//! let mut session = transport.open(&SessionConfig::default()).unwrap();
//! let publisher = session.declare_publisher("0/imu/T_/RIHS01_00").unwrap();
//! session.publish(&publisher, &[0, 1, 0, 0], &[]).unwrap();
//! assert_eq!(transport.samples()[0].key_expr, "0/imu/T_/RIHS01_00");
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{Session, SessionConfig, Transport};
use crate::error::{Error, Result};
use crate::keyexpr::ID_SIZE;

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedSample {
    /// Key expression of the publisher
    pub key_expr: String,
    /// Payload bytes (representation header included)
    pub payload: Vec<u8>,
    /// Attachment bytes
    pub attachment: Vec<u8>,
}

#[derive(Default)]
struct State {
    session_id: [u8; ID_SIZE],
    open_failures: VecDeque<Error>,
    task_failures: usize,
    declaration_failures: usize,
    declaration_failure_in: Option<usize>,
    close_failures: usize,
    opens: usize,
    closes: usize,
    incarnation: u64,
    alive: bool,
    last_config: Option<SessionConfig>,
    tokens: Vec<String>,
    publishers: Vec<String>,
    samples: Vec<PublishedSample>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

impl Shared {
    fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let result = f(&mut self.state.lock());
        self.changed.notify_all();
        result
    }
}

/// Loopback transport; clones share the same recorded state.
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Create a transport handing out all-zero session ids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session id reported by sessions opened from now on.
    pub fn with_session_id(self, session_id: [u8; ID_SIZE]) -> Self {
        self.shared.state.lock().session_id = session_id;
        self
    }

    /// Make the next `open` calls fail with `errors`, in order.
    pub fn fail_next_opens(&self, errors: impl IntoIterator<Item = Error>) {
        self.shared
            .update(|state| state.open_failures.extend(errors));
    }

    /// Make the next `count` task starts fail.
    pub fn fail_next_task_starts(&self, count: usize) {
        self.shared.update(|state| state.task_failures += count);
    }

    /// Make the next `count` declarations fail.
    pub fn fail_next_declarations(&self, count: usize) {
        self.shared
            .update(|state| state.declaration_failures += count);
    }

    /// Make the next `count` closes report an error. The session still
    /// goes down.
    pub fn fail_next_closes(&self, count: usize) {
        self.shared.update(|state| state.close_failures += count);
    }

    /// Let `successes` declarations through, then fail the next one.
    pub fn fail_declaration_after(&self, successes: usize) {
        self.shared
            .update(|state| state.declaration_failure_in = Some(successes));
    }

    /// Drop the link of the current session; `is_alive` turns false.
    pub fn disconnect(&self) {
        self.shared.update(|state| state.alive = false);
    }

    /// Number of `open` calls, failed ones included.
    pub fn opens(&self) -> usize {
        self.shared.state.lock().opens
    }

    /// Number of sessions closed.
    pub fn closes(&self) -> usize {
        self.shared.state.lock().closes
    }

    /// Configuration passed to the last `open`.
    pub fn last_config(&self) -> Option<SessionConfig> {
        self.shared.state.lock().last_config.clone()
    }

    /// Key expressions of the liveliness tokens currently declared.
    pub fn live_tokens(&self) -> Vec<String> {
        self.shared.state.lock().tokens.clone()
    }

    /// Key expressions of every publisher declared so far.
    pub fn declared_publishers(&self) -> Vec<String> {
        self.shared.state.lock().publishers.clone()
    }

    /// Every sample published so far.
    pub fn samples(&self) -> Vec<PublishedSample> {
        self.shared.state.lock().samples.clone()
    }

    /// Block until at least `count` samples were published.
    pub fn wait_for_samples(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.samples.len() >= count)
    }

    /// Block until `open` was called at least `count` times.
    pub fn wait_for_opens(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.opens >= count)
    }

    /// Block until at least `count` sessions were closed.
    pub fn wait_for_closes(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.closes >= count)
    }

    fn wait_until(&self, timeout: Duration, mut done: impl FnMut(&State) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while !done(&state) {
            if self.shared.changed.wait_until(&mut state, deadline).timed_out() {
                return done(&state);
            }
        }
        true
    }
}

impl Transport for LoopbackTransport {
    type Session = LoopbackSession;

    fn open(&self, config: &SessionConfig) -> Result<LoopbackSession> {
        self.shared.update(|state| {
            state.opens += 1;
            state.last_config = Some(config.clone());
            if let Some(err) = state.open_failures.pop_front() {
                return Err(err);
            }
            state.incarnation += 1;
            state.alive = true;
            Ok(LoopbackSession {
                shared: Arc::clone(&self.shared),
                session_id: state.session_id,
                incarnation: state.incarnation,
            })
        })
    }
}

/// Session opened by [`LoopbackTransport`].
pub struct LoopbackSession {
    shared: Arc<Shared>,
    session_id: [u8; ID_SIZE],
    incarnation: u64,
}

impl LoopbackSession {
    fn take_failure(counter: &mut usize) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }

    fn declaration_fails(state: &mut State) -> bool {
        match state.declaration_failure_in {
            Some(0) => {
                state.declaration_failure_in = None;
                true
            }
            Some(remaining) => {
                state.declaration_failure_in = Some(remaining - 1);
                Self::take_failure(&mut state.declaration_failures)
            }
            None => Self::take_failure(&mut state.declaration_failures),
        }
    }

    fn start_task(&mut self, name: &'static str) -> Result<()> {
        self.shared.update(|state| {
            if Self::take_failure(&mut state.task_failures) {
                Err(Error::TaskStart(name))
            } else {
                Ok(())
            }
        })
    }
}

/// Liveliness token; withdrawn on drop.
pub struct LoopbackToken {
    shared: Arc<Shared>,
    key_expr: String,
}

impl Drop for LoopbackToken {
    fn drop(&mut self) {
        self.shared.update(|state| {
            if let Some(pos) = state.tokens.iter().position(|k| *k == self.key_expr) {
                state.tokens.remove(pos);
            }
        });
    }
}

/// Declared loopback publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackPublisher {
    key_expr: String,
}

impl LoopbackPublisher {
    /// Key expression the publisher was declared on.
    pub fn key_expr(&self) -> &str {
        &self.key_expr
    }
}

impl Session for LoopbackSession {
    type Token = LoopbackToken;
    type Publisher = LoopbackPublisher;

    fn session_id(&self) -> [u8; ID_SIZE] {
        self.session_id
    }

    fn start_read_task(&mut self) -> Result<()> {
        self.start_task("read")
    }

    fn start_lease_task(&mut self) -> Result<()> {
        self.start_task("lease")
    }

    fn declare_liveliness_token(&mut self, key_expr: &str) -> Result<LoopbackToken> {
        self.shared.update(|state| {
            if Self::declaration_fails(state) {
                return Err(Error::Declaration {
                    what: "liveliness token",
                    key_expr: key_expr.to_string(),
                });
            }
            state.tokens.push(key_expr.to_string());
            Ok(())
        })?;
        Ok(LoopbackToken {
            shared: Arc::clone(&self.shared),
            key_expr: key_expr.to_string(),
        })
    }

    fn declare_publisher(&mut self, key_expr: &str) -> Result<LoopbackPublisher> {
        self.shared.update(|state| {
            if Self::declaration_fails(state) {
                return Err(Error::Declaration {
                    what: "publisher",
                    key_expr: key_expr.to_string(),
                });
            }
            state.publishers.push(key_expr.to_string());
            Ok(LoopbackPublisher {
                key_expr: key_expr.to_string(),
            })
        })
    }

    fn publish(
        &mut self,
        publisher: &LoopbackPublisher,
        payload: &[u8],
        attachment: &[u8],
    ) -> Result<()> {
        let incarnation = self.incarnation;
        self.shared.update(|state| {
            if !state.alive || state.incarnation != incarnation {
                return Err(Error::Publish("session closed".to_string()));
            }
            state.samples.push(PublishedSample {
                key_expr: publisher.key_expr.clone(),
                payload: payload.to_vec(),
                attachment: attachment.to_vec(),
            });
            Ok(())
        })
    }

    fn is_alive(&self) -> bool {
        let state = self.shared.state.lock();
        state.alive && state.incarnation == self.incarnation
    }

    fn close(self) -> Result<()> {
        let incarnation = self.incarnation;
        self.shared.update(|state| {
            state.closes += 1;
            if state.incarnation == incarnation {
                state.alive = false;
            }
            if state.close_failures > 0 {
                state.close_failures -= 1;
                return Err(Error::Transport("close rejected".into()));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failures_are_consumed_in_order() {
        let transport = LoopbackTransport::new();
        transport.fail_next_opens([Error::ScoutNoResults, Error::TransportOpen("refused".into())]);

        let config = SessionConfig::default();
        assert_eq!(transport.open(&config).err(), Some(Error::ScoutNoResults));
        assert!(matches!(transport.open(&config), Err(Error::TransportOpen(_))));
        assert!(transport.open(&config).is_ok());
        assert_eq!(transport.opens(), 3);
        assert_eq!(transport.last_config(), Some(config));
    }

    #[test]
    fn test_tokens_withdrawn_on_drop() {
        let transport = LoopbackTransport::new();
        let mut session = transport.open(&SessionConfig::default()).unwrap();
        let token = session.declare_liveliness_token("@ros2_lv/0/x").unwrap();
        assert_eq!(transport.live_tokens(), vec!["@ros2_lv/0/x".to_string()]);
        drop(token);
        assert!(transport.live_tokens().is_empty());
    }

    #[test]
    fn test_declaration_failure() {
        let transport = LoopbackTransport::new();
        transport.fail_next_declarations(1);
        let mut session = transport.open(&SessionConfig::default()).unwrap();
        assert!(matches!(
            session.declare_publisher("k"),
            Err(Error::Declaration { what: "publisher", .. })
        ));
        assert!(session.declare_publisher("k").is_ok());
    }

    #[test]
    fn test_declaration_failure_after_successes() {
        let transport = LoopbackTransport::new();
        transport.fail_declaration_after(2);
        let mut session = transport.open(&SessionConfig::default()).unwrap();
        let _a = session.declare_liveliness_token("a").unwrap();
        let _b = session.declare_publisher("b").unwrap();
        assert!(session.declare_liveliness_token("c").is_err());
        assert!(session.declare_liveliness_token("d").is_ok());
    }

    #[test]
    fn test_task_start_failure() {
        let transport = LoopbackTransport::new();
        transport.fail_next_task_starts(1);
        let mut session = transport.open(&SessionConfig::default()).unwrap();
        assert_eq!(session.start_read_task(), Err(Error::TaskStart("read")));
        assert_eq!(session.start_lease_task(), Ok(()));
    }

    #[test]
    fn test_disconnect_and_close() {
        let transport = LoopbackTransport::new().with_session_id([7; ID_SIZE]);
        let mut session = transport.open(&SessionConfig::default()).unwrap();
        assert_eq!(session.session_id(), [7; ID_SIZE]);
        let publisher = session.declare_publisher("k").unwrap();
        assert!(session.is_alive());

        transport.disconnect();
        assert!(!session.is_alive());
        assert!(matches!(
            session.publish(&publisher, b"x", b""),
            Err(Error::Publish(_))
        ));

        session.close().unwrap();
        assert_eq!(transport.closes(), 1);
        assert!(transport.samples().is_empty());
    }

    #[test]
    fn test_close_failure_still_closes() {
        let transport = LoopbackTransport::new();
        transport.fail_next_closes(1);
        let session = transport.open(&SessionConfig::default()).unwrap();
        assert_eq!(
            session.close(),
            Err(Error::Transport("close rejected".into()))
        );
        assert_eq!(transport.closes(), 1);

        let session = transport.open(&SessionConfig::default()).unwrap();
        assert_eq!(session.close(), Ok(()));
    }

    #[test]
    fn test_stale_session_is_not_alive() {
        let transport = LoopbackTransport::new();
        let old = transport.open(&SessionConfig::default()).unwrap();
        let new = transport.open(&SessionConfig::default()).unwrap();
        assert!(!old.is_alive());
        assert!(new.is_alive());
    }

    #[test]
    fn test_wait_for_samples_times_out() {
        let transport = LoopbackTransport::new();
        assert!(!transport.wait_for_samples(1, Duration::from_millis(10)));
        assert!(transport.wait_for_opens(0, Duration::from_millis(10)));
    }
}
