// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Internal latest-value topics feeding the bridge.
//!
//! A [`Topic`] keeps the most recent sample. Each [`Subscription`] owns a
//! one-slot notification channel; the bridge multiplexes those channels
//! with [`SubscriptionSet::wait`] and copies the sample out with
//! `apply_update`. Samples published faster than the bridge drains them
//! are coalesced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Select, Sender, TrySendError};
use parking_lot::Mutex;

use crate::messages::{Frame, MessageTag};

struct Shared<T> {
    name: &'static str,
    latest: Mutex<Option<T>>,
    generation: AtomicU64,
    subscribers: Mutex<Vec<Sender<()>>>,
}

/// Latest-value topic.
pub struct Topic<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Copy + Send> Topic<T> {
    /// Create an empty topic.
    pub fn new(name: &'static str) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                latest: Mutex::new(None),
                generation: AtomicU64::new(0),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Topic name
    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Replace the latest sample and wake every subscriber.
    pub fn publish(&self, value: T) {
        *self.shared.latest.lock() = Some(value);
        self.shared.generation.fetch_add(1, Ordering::AcqRel);

        self.shared.subscribers.lock().retain(|tx| {
            // Full means a wakeup is already pending.
            !matches!(tx.try_send(()), Err(TrySendError::Disconnected(_)))
        });
    }

    /// Subscribe; only samples published after this call are reported.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = channel::bounded(1);
        self.shared.subscribers.lock().push(tx);
        Subscription {
            seen: self.shared.generation.load(Ordering::Acquire),
            shared: Arc::clone(&self.shared),
            notify: rx,
        }
    }
}

/// Subscription to a [`Topic`].
pub struct Subscription<T> {
    shared: Arc<Shared<T>>,
    notify: Receiver<()>,
    seen: u64,
}

impl<T: Copy + Send> Subscription<T> {
    /// Whether a sample newer than the last applied one exists.
    pub fn update_available(&self) -> bool {
        self.shared.generation.load(Ordering::Acquire) > self.seen
    }

    /// Copy the latest sample into `out`. Returns false if none is pending.
    pub fn apply_update(&mut self, out: &mut T) -> bool {
        while self.notify.try_recv().is_ok() {}

        let latest = self.shared.latest.lock();
        let generation = self.shared.generation.load(Ordering::Acquire);
        match *latest {
            Some(value) if generation > self.seen => {
                *out = value;
                self.seen = generation;
                true
            }
            _ => false,
        }
    }

    /// Wakeup channel watched by [`SubscriptionSet::wait`].
    pub fn notifier(&self) -> &Receiver<()> {
        &self.notify
    }
}

/// Type-erased subscription delivering into a [`Frame`].
pub trait FrameSubscription: Send {
    /// Tag of the frames this subscription produces.
    fn tag(&self) -> MessageTag;

    /// Topic name, for logging.
    fn topic_name(&self) -> &'static str;

    /// Wakeup channel.
    fn notifier(&self) -> &Receiver<()>;

    /// See [`Subscription::update_available`].
    fn update_available(&self) -> bool;

    /// Overwrite `frame` with the latest sample.
    fn apply_update(&mut self, frame: &mut Frame) -> bool;
}

impl<T> FrameSubscription for Subscription<T>
where
    T: Copy + Send + Default + Into<Frame> + 'static,
{
    fn tag(&self) -> MessageTag {
        Into::<Frame>::into(T::default()).tag()
    }

    fn topic_name(&self) -> &'static str {
        self.shared.name
    }

    fn notifier(&self) -> &Receiver<()> {
        &self.notify
    }

    fn update_available(&self) -> bool {
        Subscription::update_available(self)
    }

    fn apply_update(&mut self, frame: &mut Frame) -> bool {
        let mut value = T::default();
        if Subscription::apply_update(self, &mut value) {
            *frame = value.into();
            true
        } else {
            false
        }
    }
}

/// Subscriptions of one bridge node.
#[derive(Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Box<dyn FrameSubscription>>,
}

impl SubscriptionSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription.
    pub fn add(&mut self, subscription: impl FrameSubscription + 'static) {
        self.subscriptions.push(Box::new(subscription));
    }

    /// Number of subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// True when no subscription was added.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Block until any subscription is notified or `timeout` elapses.
    ///
    /// Returns true if woken by a notification.
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.subscriptions.iter().any(|s| s.update_available()) {
            return true;
        }
        if self.subscriptions.is_empty() {
            std::thread::sleep(timeout);
            return false;
        }
        let mut select = Select::new();
        for subscription in &self.subscriptions {
            select.recv(subscription.notifier());
        }
        select.ready_timeout(timeout).is_ok()
    }

    /// Iterate mutably over the subscriptions.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn FrameSubscription>> {
        self.subscriptions.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{ClockOffset, Imu};
    use std::time::Instant;

    #[test]
    fn test_update_available_after_publish() {
        let topic = Topic::new("/clock_offset");
        let mut sub = topic.subscribe();
        assert!(!sub.update_available());

        topic.publish(ClockOffset { seconds: 1, nanos: 2 });
        assert!(sub.update_available());

        let mut out = ClockOffset::default();
        assert!(sub.apply_update(&mut out));
        assert_eq!(out, ClockOffset { seconds: 1, nanos: 2 });
        assert!(!sub.update_available());
        assert!(!sub.apply_update(&mut out));
    }

    #[test]
    fn test_updates_coalesce_to_latest() {
        let topic = Topic::new("/clock_offset");
        let mut sub = topic.subscribe();
        for s in 0..5 {
            topic.publish(ClockOffset { seconds: s, nanos: 0 });
        }
        let mut out = ClockOffset::default();
        assert!(sub.apply_update(&mut out));
        assert_eq!(out.seconds, 4);
    }

    #[test]
    fn test_frame_subscription_tag() {
        let topic = Topic::<Imu>::new("/imu");
        let sub = topic.subscribe();
        assert_eq!(FrameSubscription::tag(&sub), MessageTag::Imu);
        assert_eq!(FrameSubscription::topic_name(&sub), "/imu");
    }

    #[test]
    fn test_wait_times_out_without_data() {
        let topic = Topic::<Imu>::new("/imu");
        let mut set = SubscriptionSet::new();
        set.add(topic.subscribe());

        let start = Instant::now();
        assert!(!set.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_wait_wakes_on_publish_from_other_thread() {
        let topic = Topic::<Imu>::new("/imu");
        let mut set = SubscriptionSet::new();
        set.add(topic.subscribe());

        let publisher = topic.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            publisher.publish(Imu::default());
        });

        assert!(set.wait(Duration::from_secs(5)));
        handle.join().unwrap();

        let mut frame = Frame::default();
        let applied = set.iter_mut().any(|s| s.apply_update(&mut frame));
        assert!(applied);
        assert_eq!(frame.tag(), MessageTag::Imu);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let topic = Topic::<Imu>::new("/imu");
        drop(topic.subscribe());
        topic.publish(Imu::default());
        assert!(topic.shared.subscribers.lock().is_empty());
    }
}
