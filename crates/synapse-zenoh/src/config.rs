// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bridge configuration.
//!
//! Defaults match the flight controller deployment. [`BridgeConfig::from_env`]
//! overrides them from environment variables:
//!
//! - `SYNAPSE_ZENOH_MODE`: `client` or `peer` (default: client)
//! - `SYNAPSE_ZENOH_LOCATOR`: router locator (default: `tcp/192.0.2.2:7447`)
//! - `SYNAPSE_ZENOH_DOMAIN_ID`: ROS domain id (default: 0, or ROS_DOMAIN_ID if set)
//! - `SYNAPSE_ZENOH_RECONNECT_MS`: delay between connect attempts (default: 5000)
//! - `SYNAPSE_ZENOH_LOG_LEVEL`: log level (default: "info")
//!
//! # Example
//!
//! ```bash
//! export SYNAPSE_ZENOH_LOCATOR=tcp/10.0.0.1:7447
//! export ROS_DOMAIN_ID=7
//! ```

use std::env;
use std::time::Duration;

use crate::attachment::TimestampSource;
use crate::transport::{SessionConfig, SessionMode, DEFAULT_LOCATOR};

/// Session mode variable
pub const ENV_MODE: &str = "SYNAPSE_ZENOH_MODE";
/// Locator variable
pub const ENV_LOCATOR: &str = "SYNAPSE_ZENOH_LOCATOR";
/// Domain id variable
pub const ENV_DOMAIN_ID: &str = "SYNAPSE_ZENOH_DOMAIN_ID";
/// Reconnect backoff variable, in milliseconds
pub const ENV_RECONNECT_MS: &str = "SYNAPSE_ZENOH_RECONNECT_MS";
/// Log level variable
pub const ENV_LOG_LEVEL: &str = "SYNAPSE_ZENOH_LOG_LEVEL";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// Default delay between connect attempts.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Default bound on one subscription wait.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Default clock-offset heartbeat period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Runtime configuration of a bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Session role
    pub mode: SessionMode,

    /// Router or peer locator
    pub locator: String,

    /// ROS domain id used in topic key expressions
    pub domain_id: u32,

    /// Wait between failed connect attempts
    pub reconnect_backoff: Duration,

    /// Upper bound of one subscription wait; also bounds stop latency
    pub poll_timeout: Duration,

    /// Period of the clock-offset heartbeat
    pub heartbeat_interval: Duration,

    /// Attachment timestamp source
    pub timestamps: TimestampSource,

    /// Logging level (trace, debug, info, warn, error, off)
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Client,
            locator: DEFAULT_LOCATOR.to_string(),
            domain_id: 0,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            timestamps: TimestampSource::WallClock,
            log_level: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. SYNAPSE_ZENOH_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. Default (0)
    ///
    /// Unparsable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mode = env::var(ENV_MODE)
            .ok()
            .and_then(|s| SessionMode::parse(&s))
            .unwrap_or(defaults.mode);

        let locator = env::var(ENV_LOCATOR)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.locator);

        let domain_id = env::var(ENV_DOMAIN_ID)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .or_else(|| {
                env::var(ENV_ROS_DOMAIN_ID)
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
            })
            .unwrap_or(defaults.domain_id);

        let reconnect_backoff = env::var(ENV_RECONNECT_MS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_backoff);

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.log_level);

        Self {
            mode,
            locator,
            domain_id,
            reconnect_backoff,
            log_level,
            ..defaults
        }
    }

    /// Parameters for opening a transport session.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            mode: self.mode,
            locator: self.locator.clone(),
        }
    }

    /// `log_level` as a filter; unknown names map to `Info`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    /// Apply `log_level` as the global maximum log level.
    ///
    /// The logger itself is installed by the application.
    pub fn apply_log_level(&self) {
        log::set_max_level(self.log_level_filter());
    }
}
