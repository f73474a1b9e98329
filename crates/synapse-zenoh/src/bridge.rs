// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge worker: connect loop, publish loop and run control.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::messages::{ClockOffset, Frame};
use crate::registry::{DispatchReport, Registry, TX_BUFFER_SIZE};
use crate::session::{FailureKind, NodeIdentity, OpenSession, SessionState};
use crate::topic::SubscriptionSet;
use crate::transport::{SessionConfig, Transport};

/// Run/stop flag shared between the worker and its controller.
///
/// Waits on it are cancellable: [`StopSignal::request_stop`] wakes every
/// thread blocked in [`StopSignal::wait_timeout`].
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    changed: Condvar,
    state: Mutex<SessionState>,
}

impl StopSignal {
    /// Fresh, not stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the worker to stop.
    pub fn request_stop(&self) {
        *self.stopped.lock() = true;
        self.changed.notify_all();
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Clear a previous stop request.
    pub fn reset(&self) {
        *self.stopped.lock() = false;
    }

    /// Sleep for `timeout` unless a stop is requested first.
    ///
    /// Returns true if stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.changed.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }

    /// Connection state last reported by the worker.
    pub fn session_state(&self) -> SessionState {
        *self.state.lock()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }
}

/// Telemetry bridge: subscriptions in, Zenoh samples out.
pub struct Bridge<T: Transport> {
    transport: T,
    config: BridgeConfig,
    registry: Registry,
    subscriptions: SubscriptionSet,
    guid: Guid,
    frame: Frame,
    tx_buf: Box<[u8]>,
    started_at: Instant,
}

impl<T: Transport> Bridge<T> {
    /// Create a bridge with a freshly generated GUID.
    pub fn new(
        transport: T,
        config: BridgeConfig,
        registry: Registry,
        subscriptions: SubscriptionSet,
    ) -> Self {
        Self {
            transport,
            config,
            registry,
            subscriptions,
            guid: Guid::generate(),
            frame: Frame::default(),
            tx_buf: vec![0u8; TX_BUFFER_SIZE].into_boxed_slice(),
            started_at: Instant::now(),
        }
    }

    /// Replace the generated GUID.
    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = guid;
        self
    }

    /// Local GUID
    pub fn guid(&self) -> Guid {
        self.guid
    }

    /// Configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Publisher registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Connect, publish and reconnect until `signal` requests a stop.
    ///
    /// The open session is closed before returning.
    pub fn run(&mut self, signal: &StopSignal) {
        log::info!(
            "[zenoh] bridge {} starting ({} {}, domain {})",
            self.guid,
            self.config.mode.as_str(),
            self.config.locator,
            self.config.domain_id
        );

        let session_config = self.config.session_config();
        while let Some(mut open) = self.connect(&session_config, signal) {
            self.serve(&mut open, signal);
            signal.set_state(SessionState::Closed);
            if let Err(err) = open.close() {
                log::warn!("[zenoh] failed to close session: {}", err);
            }
        }

        signal.set_state(SessionState::Closed);
        log::info!("[zenoh] bridge {} stopped", self.guid);
    }

    fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            guid: self.guid,
            domain_id: self.config.domain_id,
            timestamps: self.config.timestamps,
        }
    }

    /// Retry until a session is open; `None` once a stop is requested.
    fn connect(
        &self,
        session_config: &SessionConfig,
        signal: &StopSignal,
    ) -> Option<OpenSession<T::Session>> {
        let identity = self.identity();
        let mut attempt: u32 = 0;

        loop {
            if signal.is_stopped() {
                return None;
            }
            attempt = attempt.saturating_add(1);
            signal.set_state(SessionState::Connecting { attempt });
            log::debug!("[zenoh] opening session, attempt {}", attempt);

            match OpenSession::establish(&self.transport, session_config, &identity, &self.registry)
            {
                Ok(open) => {
                    signal.set_state(SessionState::Open);
                    log::info!(
                        "[zenoh] session open after {} attempt(s), {} publisher(s) declared",
                        attempt,
                        self.registry.len()
                    );
                    return Some(open);
                }
                Err(err) => match FailureKind::classify(&err) {
                    FailureKind::TransportOpen => {
                        log::warn!("[zenoh] unable to open session: {}", err);
                    }
                    FailureKind::ScoutNoResults => {
                        log::warn!(
                            "[zenoh] no router found at {}, retrying",
                            session_config.locator
                        );
                    }
                    FailureKind::Other => {
                        log::error!("[zenoh] session setup failed: {}", err);
                    }
                },
            }

            if signal.wait_timeout(self.config.reconnect_backoff) {
                return None;
            }
        }
    }

    /// Publish until stopped or the link is lost.
    fn serve(&mut self, open: &mut OpenSession<T::Session>, signal: &StopSignal) {
        let heartbeat = self.config.heartbeat_interval;
        let mut next_heartbeat = Instant::now() + heartbeat;

        loop {
            if signal.is_stopped() {
                return;
            }
            if !open.is_alive() {
                log::warn!("[zenoh] session lost, reconnecting");
                return;
            }

            let until_heartbeat = next_heartbeat.saturating_duration_since(Instant::now());
            self.subscriptions
                .wait(self.config.poll_timeout.min(until_heartbeat));

            for subscription in self.subscriptions.iter_mut() {
                if subscription.update_available() && subscription.apply_update(&mut self.frame) {
                    let report = self.registry.dispatch(&self.frame, &mut self.tx_buf, &mut *open);
                    log_report(subscription.topic_name(), &report);
                }
            }

            let now = Instant::now();
            if now >= next_heartbeat {
                self.frame =
                    Frame::ClockOffset(ClockOffset::from_uptime(self.started_at.elapsed()));
                let report = self.registry.dispatch(&self.frame, &mut self.tx_buf, &mut *open);
                log_report("heartbeat", &report);
                next_heartbeat = now + heartbeat;
            }
        }
    }
}

fn log_report(source: &str, report: &DispatchReport) {
    if report.skipped > 0 || report.failed > 0 {
        log::debug!(
            "[zenoh] {}: {} matched, {} published, {} skipped, {} failed",
            source,
            report.matched,
            report.published,
            report.skipped,
            report.failed
        );
    } else {
        log::trace!("[zenoh] {}: {} published", source, report.published);
    }
}

/// Start/stop/status control of a bridge running on its own thread.
///
/// The worker hands the [`Bridge`] back when joined, so a stopped bridge
/// can be started again.
pub struct BridgeHandle<T: Transport + Send + 'static> {
    bridge: Option<Bridge<T>>,
    worker: Option<JoinHandle<Bridge<T>>>,
    signal: Arc<StopSignal>,
}

impl<T: Transport + Send + 'static> BridgeHandle<T> {
    /// Wrap a bridge; nothing runs until [`BridgeHandle::start`].
    pub fn new(bridge: Bridge<T>) -> Self {
        Self {
            bridge: Some(bridge),
            worker: None,
            signal: Arc::new(StopSignal::new()),
        }
    }

    /// Spawn the worker thread.
    pub fn start(&mut self) -> Result<()> {
        self.reap_finished();
        if self.worker.is_some() {
            log::warn!("[zenoh] already running");
            return Err(Error::AlreadyRunning);
        }
        let mut bridge = self
            .bridge
            .take()
            .ok_or_else(|| Error::Worker("bridge lost by a failed worker".into()))?;

        bridge.config().apply_log_level();
        self.signal.reset();
        let signal = Arc::clone(&self.signal);
        let handle = thread::Builder::new()
            .name("zenoh".into())
            .spawn(move || {
                bridge.run(&signal);
                bridge
            })
            .map_err(|e| Error::Worker(format!("failed to spawn thread: {}", e)))?;

        self.worker = Some(handle);
        Ok(())
    }

    /// Signal the worker and wait for it to exit.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.worker.take() else {
            log::info!("[zenoh] not running");
            return Err(Error::NotRunning);
        };
        self.signal.request_stop();
        self.join(handle)
    }

    /// Whether the worker thread is alive.
    pub fn status(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Connection state of the worker.
    pub fn session_state(&self) -> SessionState {
        self.signal.session_state()
    }

    /// The bridge, when not running.
    pub fn bridge(&self) -> Option<&Bridge<T>> {
        self.bridge.as_ref()
    }

    fn join(&mut self, handle: JoinHandle<Bridge<T>>) -> Result<()> {
        match handle.join() {
            Ok(bridge) => {
                self.bridge = Some(bridge);
                Ok(())
            }
            Err(_) => {
                log::error!("[zenoh] worker panicked");
                Err(Error::Worker("worker panicked".into()))
            }
        }
    }

    fn reap_finished(&mut self) {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            if let Some(handle) = self.worker.take() {
                let _ = self.join(handle);
            }
        }
    }
}

impl<T: Transport + Send + 'static> Drop for BridgeHandle<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.take() {
            self.signal.request_stop();
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_wait_times_out() {
        let signal = StopSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stop_signal_cancels_wait() {
        let signal = Arc::new(StopSignal::new());
        let stopper = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            stopper.request_stop();
        });

        let start = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();

        signal.reset();
        assert!(!signal.is_stopped());
    }
}
