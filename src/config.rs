//! Runtime configuration.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The orchestrator's logging config, which uses Rust's `env_logger` directives.
    pub rust_log: String,

    /// The root namespace of this cluster within the coordination tree.
    #[serde(default = "Config::default_namespace")]
    pub namespace: String,

    /// The interval, in milliseconds, between checks for a written
    /// deployment's container-side confirmation record.
    #[serde(default = "Config::default_deploy_confirm_interval_ms")]
    pub deploy_confirm_interval_ms: u64,
    /// The overall bound, in milliseconds, on waiting for a deployment's
    /// confirmation record before the attempt is treated as failed.
    #[serde(default = "Config::default_deploy_confirm_timeout_ms")]
    pub deploy_confirm_timeout_ms: u64,
}

impl Config {
    /// Create a new config instance from the runtime environment.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        envy::from_env().context("error building config from env")
    }

    /// The confirmation poll interval.
    pub fn deploy_confirm_interval(&self) -> Duration {
        Duration::from_millis(self.deploy_confirm_interval_ms)
    }

    /// The confirmation poll bound.
    pub fn deploy_confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.deploy_confirm_timeout_ms)
    }

    fn default_namespace() -> String {
        "rill".into()
    }

    fn default_deploy_confirm_interval_ms() -> u64 {
        10
    }

    fn default_deploy_confirm_timeout_ms() -> u64 {
        30_000
    }

    /// Create a config instance for tests.
    #[cfg(test)]
    pub fn new_test() -> Self {
        Self {
            rust_log: "error".into(),
            namespace: "rill".into(),
            deploy_confirm_interval_ms: 2,
            deploy_confirm_timeout_ms: 500,
        }
    }
}
