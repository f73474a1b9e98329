// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # synapse-zenoh - Flight controller telemetry bridge
//!
//! Republishes internal topic samples (IMU, clock offset) on Zenoh using
//! the ROS 2 `rmw_zenoh` conventions, so ROS 2 nodes on the ground see the
//! flight controller as a regular node.
//!
//! ## Design Constraints
//!
//! - **Fixed buffers** on the publish path (8 KiB TX buffer, bounded key
//!   expressions)
//! - **One worker thread** per bridge; no locks around frame, attachment or
//!   session state
//! - **Never gives up** connecting; the backoff is cancellable
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------+
//! |  Topic subscriptions (IMU, ...)         |
//! +-----------------------------------------+
//!           v
//! +-----------------------------------------+
//! |  Bridge worker (connect / serve loop)   |
//! +-----------------------------------------+
//!           v
//! +-----------------------------------------+
//! |  Registry dispatch -> CDR encoder       |
//! +-----------------------------------------+
//!           v
//! +-----------------------------------------+
//! |  Session: key exprs + attachment        |
//! +-----------------------------------------+
//!           v
//! +-----------------------------------------+
//! |  Transport (zenoh client / loopback)    |
//! +-----------------------------------------+
//! ```
//!
//! ## Features
//!
//! - `zenoh`: `transport::ZenohTransport` over the `zenoh` crate. Without
//!   it only the in-process loopback transport is available.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use synapse_zenoh::messages::{Imu, IMU_SCHEMA, IMU_TOPIC};
//! use synapse_zenoh::topic::{SubscriptionSet, Topic};
//! use synapse_zenoh::transport::LoopbackTransport;
//! use synapse_zenoh::{Bridge, BridgeConfig, BridgeHandle, MessageTag, Registry};
//!
//! let imu = Topic::<Imu>::new(IMU_TOPIC);
//! let mut subscriptions = SubscriptionSet::new();
//! subscriptions.add(imu.subscribe());
//!
//! let registry = Registry::builder()
//!     .register_schema(IMU_TOPIC, &IMU_SCHEMA, MessageTag::Imu)
//!     .build();
//!
//! let transport = LoopbackTransport::new();
//! let config = BridgeConfig {
//!     poll_timeout: Duration::from_millis(10),
//!     ..BridgeConfig::default()
//! };
//! let mut handle = BridgeHandle::new(Bridge::new(transport.clone(), config, registry, subscriptions));
//! handle.start().unwrap();
//!
//! imu.publish(Imu::default());
//! assert!(transport.wait_for_samples(1, Duration::from_secs(5)));
//! handle.stop().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Attachment sent next to every payload
pub mod attachment;

/// Bridge worker and run control
pub mod bridge;

/// CDR encoder/decoder (fixed buffer, no allocations)
pub mod cdr;

/// Configuration and environment overrides
pub mod config;

/// Error types
pub mod error;

/// Local GUID
pub mod guid;

/// rmw_zenoh key expressions
pub mod keyexpr;

/// Bridged message types
pub mod messages;

/// Publisher registry and dispatch
pub mod registry;

/// Session lifecycle
pub mod session;

/// Internal latest-value topics
pub mod topic;

/// Transport abstraction, loopback and zenoh sessions
pub mod transport;

// Re-exports for convenience
pub use crate::bridge::{Bridge, BridgeHandle, StopSignal};
pub use crate::config::BridgeConfig;
pub use crate::error::{Error, Result};
pub use crate::guid::Guid;
pub use crate::messages::{Frame, MessageTag};
pub use crate::registry::{DispatchReport, Registry, RegistryBuilder};
pub use crate::session::SessionState;
