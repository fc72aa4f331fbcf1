// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Client configuration
//!
//! Resolution order: built-in defaults, then environment variables
//! (`FAKENEWS_API_URL`, `FAKENEWS_TIMEOUT_SECS`), then explicit CLI flags.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_API_URL: &str = "FAKENEWS_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "FAKENEWS_TIMEOUT_SECS";

/// Upper bound on the per-request timeout (one hour)
pub const MAX_TIMEOUT_SECS: u64 = 3600;

/// Configuration for talking to the classification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base address of the service, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Per-request timeout enforced by the transport
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with whatever the environment provides
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|v| !v.trim().is_empty()) {
            config.timeout_secs = raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidEnv {
                var: ENV_TIMEOUT_SECS,
                reason: e.to_string(),
            })?;
        }

        Ok(config)
    }

    /// Apply explicit overrides (typically CLI flags)
    pub fn with_overrides(mut self, base_url: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        if let Some(secs) = timeout_secs {
            self.timeout_secs = secs;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the base URL is an absolute http(s) address and the timeout is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::TimeoutTooLarge {
                secs: self.timeout_secs,
                max: MAX_TIMEOUT_SECS,
            });
        }

        Ok(())
    }

    /// Join an endpoint path onto the base address
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
