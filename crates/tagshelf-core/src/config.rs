//! Scan session configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Default time a scan session waits for a tag.
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// Default pause after a hard reset before the reader is used again.
pub(crate) const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Configuration for scan sessions.
///
/// The timeout and settle delay are tuned per device rather than fixed, so
/// both are exposed here instead of living as constants in the controller.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// How long a session waits for a tag, in milliseconds.
    #[builder(default = "DEFAULT_TIMEOUT_MS")]
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause after a hard reset, in milliseconds.
    #[builder(default = "DEFAULT_SETTLE_DELAY_MS")]
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Refuse to scan when the reader radio reports it is switched off.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub require_enabled: bool,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_true() -> bool {
    true
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == Some(0) {
            return Err("Scan timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Scan timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Hard reset settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validate a config that did not come through the builder (e.g. from TOML).
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms == 0 {
            return Err("Scan timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            require_enabled: true,
        }
    }
}
