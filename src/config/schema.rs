//! Configuration schema.
//!
//! Every section is optional in the TOML file; missing keys fall back to the
//! defaults baked in here, which match the discovery engine's built-in sweep
//! plan.

use crate::classify::ClassifierThresholds;
use crate::descriptor::LineEnding;
use crate::probe::ProbeOptions;
use crate::reader::TailReadConfig;
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discovery sweep plan and timing.
    pub discovery: DiscoveryConfig,
    /// Classifier decision thresholds.
    pub classifier: ClassifierThresholds,
    /// Command session timing and terminators.
    pub session: SessionConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Sweep plan: what to try on each candidate port, and how long to wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Baud rates in sweep order, most likely first.
    pub baud_rates: Vec<u32>,
    /// Probe commands to send at each baud.
    pub probe_commands: Vec<String>,
    /// Line endings to append to each command.
    pub line_endings: Vec<LineEnding>,
    /// Settle delay after opening a port, in milliseconds.
    pub settle_delay_ms: u64,
    /// Maximum wait for the first response byte, in milliseconds.
    pub first_byte_timeout_ms: u64,
    /// Quiet period that ends a response, in milliseconds.
    pub tail_timeout_ms: u64,
    /// Hard cap on response collection after the first byte, in milliseconds.
    pub max_after_first_data_ms: u64,
    /// Poll interval of the tail reader, in milliseconds.
    pub poll_interval_ms: u64,
    /// Swallow boot banners with a throwaway read before probing.
    pub drain_boot_noise: bool,
    /// Ports to probe before all others, in preference order.
    pub prefer_first: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let probe = ProbeOptions::default();
        Self {
            baud_rates: probe.baud_rates,
            probe_commands: probe.probe_commands,
            line_endings: probe.line_endings,
            settle_delay_ms: 600,
            first_byte_timeout_ms: 3_000,
            tail_timeout_ms: 2_000,
            max_after_first_data_ms: 12_000,
            poll_interval_ms: 10,
            drain_boot_noise: true,
            prefer_first: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    /// Materialize probe options from this section plus the classifier
    /// thresholds.
    pub fn probe_options(&self, thresholds: ClassifierThresholds) -> ProbeOptions {
        let defaults = ProbeOptions::default();
        ProbeOptions {
            baud_rates: self.baud_rates.clone(),
            probe_commands: self.probe_commands.clone(),
            line_endings: self.line_endings.clone(),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            drain_boot_noise: self.drain_boot_noise,
            read: TailReadConfig {
                first_byte_timeout: Duration::from_millis(self.first_byte_timeout_ms),
                tail_timeout: Duration::from_millis(self.tail_timeout_ms),
                max_after_first_data: Duration::from_millis(self.max_after_first_data_ms),
                poll_interval: Duration::from_millis(self.poll_interval_ms),
            },
            boot_drain_read: defaults.boot_drain_read,
            thresholds,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridable via `FIXTURE_SCOUT_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
