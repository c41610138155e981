// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Configuration schema

use crate::error::{ConfigError, ConfigResult};
use crate::loader::ConfigFormat;
use certgate_tls::{
    ChainError, IgnorableErrorSet, TrustAnchors, TrustedPin, ValidationPolicy,
    DEFAULT_VALIDATION_BUDGET,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Certificate validation settings
    pub validation: ValidationConfig,

    /// HTTP transport settings
    pub transport: TransportConfig,

    /// Logging settings
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Render the configuration in `format`
    pub fn render(&self, format: ConfigFormat) -> ConfigResult<String> {
        let rendered = match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| e.to_string()),
        };
        rendered.map_err(|reason| ConfigError::Render {
            format: format.name(),
            reason,
        })
    }
}

/// Certificate validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationConfig {
    /// Validation policy
    #[serde(default)]
    pub policy: ValidationPolicy,

    /// Chain errors suppressed under `ignored-errors-plus-custom`
    #[serde(default)]
    pub ignorable_errors: Vec<ChainError>,

    /// Expected hash of the server's leaf certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_pin: Option<TrustedPin>,

    /// Latency budget of the custom check in milliseconds
    #[serde(default = "default_budget_ms")]
    pub budget_ms: u64,

    /// Trust the bundled Mozilla roots
    #[serde(default = "default_true")]
    pub webpki_roots: bool,

    /// Extra PEM files with trusted CA certificates
    #[serde(default)]
    pub extra_roots: Vec<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            ignorable_errors: Vec::new(),
            trusted_pin: None,
            budget_ms: default_budget_ms(),
            webpki_roots: true,
            extra_roots: Vec::new(),
        }
    }
}

impl ValidationConfig {
    /// Ignorable errors as a checked set
    pub fn ignorable_set(&self) -> ConfigResult<IgnorableErrorSet> {
        IgnorableErrorSet::try_from_kinds(self.ignorable_errors.iter().copied()).map_err(|e| {
            ConfigError::invalid_value("validation.ignorable_errors", e.to_string())
        })
    }

    /// Latency budget of the custom check
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    /// Root certificates for platform validation
    pub fn trust_anchors(&self) -> ConfigResult<TrustAnchors> {
        let mut anchors = if self.webpki_roots {
            TrustAnchors::webpki()
        } else {
            TrustAnchors::empty()
        };

        for path in &self.extra_roots {
            anchors
                .add_pem_file(path)
                .map_err(|source| ConfigError::TrustAnchor {
                    path: path.clone(),
                    source,
                })?;
        }

        Ok(anchors)
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// Connect plus handshake timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl TransportConfig {
    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_budget_ms() -> u64 {
    DEFAULT_VALIDATION_BUDGET.as_millis() as u64
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("certgate/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
