//! # Relay Configuration System
//!
//! Layered configuration for the relay: a base TOML file, an optional
//! environment-specific override file, and `TELEMETRY_RELAY__*` environment
//! variables, merged by the `config` crate and deserialized into
//! [`RelayConfig`]. Every field has a default, so an absent file yields the
//! stock behavior.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use telemetry_relay::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let attempts = manager.config().companion.max_attempts;
//! let timeout = manager.config().companion.attempt_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{self, timing};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/telemetry-relay.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Trigger validation and rate limiting
    pub gating: GatingConfig,

    /// Companion device addressing and query timing
    pub companion: CompanionConfig,

    /// Best-effort positioning
    pub location: LocationConfig,

    /// Durable rate-limit storage
    pub storage: StorageConfig,

    /// Log output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GatingConfig {
    pub trigger_phrase: String,
    pub min_interval_seconds: i64,
    /// Identifiers accepted by the static directory
    pub trusted_senders: Vec<String>,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            trigger_phrase: constants::TRIGGER_PHRASE.to_string(),
            min_interval_seconds: timing::MIN_REQUEST_INTERVAL_SECONDS,
            trusted_senders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompanionConfig {
    /// Node id the relay itself answers on
    pub phone_node_id: String,
    /// Node id of the companion device
    pub node_id: String,
    pub attempt_timeout_ms: u64,
    pub max_attempts: u32,
    pub sampling_window_ms: u64,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            phone_node_id: constants::DEFAULT_PHONE_NODE.to_string(),
            node_id: constants::DEFAULT_COMPANION_NODE.to_string(),
            attempt_timeout_ms: timing::COMPANION_ATTEMPT_TIMEOUT_MS,
            max_attempts: timing::COMPANION_MAX_ATTEMPTS,
            sampling_window_ms: timing::SAMPLING_WINDOW_MS,
        }
    }
}

impl CompanionConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn sampling_window(&self) -> Duration {
        Duration::from_millis(self.sampling_window_ms)
    }

    /// Longest the orchestrator can wait on the companion before giving up
    pub fn total_query_budget(&self) -> Duration {
        self.attempt_timeout() * self.max_attempts
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: timing::LOCATION_TIMEOUT_MS,
        }
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding `last_req_ts`; in-memory storage when unset
    pub rate_limit_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Explicit filter directive, e.g. `info` or `telemetry_relay=debug`
    pub level: Option<String>,
    /// Directory for JSON log files; console only when unset
    pub log_directory: Option<PathBuf>,
}

impl RelayConfig {
    /// Validate cross-field constraints that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gating.trigger_phrase.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "gating.trigger_phrase",
                "gating configuration",
            ));
        }

        if self.gating.min_interval_seconds < 0 {
            return Err(ConfigurationError::invalid_value(
                "gating.min_interval_seconds",
                self.gating.min_interval_seconds.to_string(),
                "interval must not be negative",
            ));
        }

        if self.companion.node_id.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "companion.node_id",
                "companion configuration",
            ));
        }

        if self.companion.phone_node_id == self.companion.node_id {
            return Err(ConfigurationError::invalid_value(
                "companion.phone_node_id",
                self.companion.phone_node_id.clone(),
                "phone and companion must use distinct node ids",
            ));
        }

        if self.companion.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "companion.max_attempts",
                "0",
                "at least one attempt is required",
            ));
        }

        for (field, value) in [
            ("companion.attempt_timeout_ms", self.companion.attempt_timeout_ms),
            ("companion.sampling_window_ms", self.companion.sampling_window_ms),
            ("location.timeout_ms", self.location.timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "timeout must be greater than 0",
                ));
            }
        }

        let reply_deadline = self
            .companion
            .attempt_timeout_ms
            .saturating_sub(timing::REPLY_MARGIN_MS);
        if self.companion.sampling_window_ms > reply_deadline {
            return Err(ConfigurationError::invalid_value(
                "companion.sampling_window_ms",
                self.companion.sampling_window_ms.to_string(),
                format!(
                    "sampling window must end at least {}ms before companion.attempt_timeout_ms ({})",
                    timing::REPLY_MARGIN_MS,
                    self.companion.attempt_timeout_ms
                ),
            ));
        }

        Ok(())
    }
}
