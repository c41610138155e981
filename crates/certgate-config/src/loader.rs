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
//! Configuration loading

use crate::error::{ConfigError, ConfigResult};
use crate::schema::Config;
use crate::validation::Validator;
use certgate_tls::{ChainError, TrustedPin, ValidationPolicy};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

/// Environment variable selecting the validation policy
pub const ENV_POLICY: &str = "CERTGATE_POLICY";
/// Environment variable with a comma-separated list of ignorable chain errors
pub const ENV_IGNORABLE_ERRORS: &str = "CERTGATE_IGNORABLE_ERRORS";
/// Environment variable with the trusted pin (`alg:hex`)
pub const ENV_TRUSTED_PIN: &str = "CERTGATE_TRUSTED_PIN";
/// Environment variable with the custom check budget in milliseconds
pub const ENV_VALIDATION_BUDGET_MS: &str = "CERTGATE_VALIDATION_BUDGET_MS";
/// Environment variable with the connect timeout in seconds
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "CERTGATE_CONNECT_TIMEOUT_SECS";
/// Environment variable with the request timeout in seconds
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CERTGATE_REQUEST_TIMEOUT_SECS";
/// Environment variable with the log level
pub const ENV_LOG_LEVEL: &str = "CERTGATE_LOG_LEVEL";
/// Environment variable with the log format
pub const ENV_LOG_FORMAT: &str = "CERTGATE_LOG_FORMAT";

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::MissingExtension(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
#[derive(Debug)]
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let config = self.read_file(path.as_ref()).await?;
        self.check(&config)?;
        Ok(config)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config = parse(content, format)?;
        self.check(&config)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// Validation runs once, after the overrides are applied.
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.read_file(path.as_ref()).await?;
        self.apply_env_overrides(&mut config)?;
        self.check(&config)?;
        Ok(config)
    }

    /// Defaults plus environment variable overrides, for runs without a file
    pub fn load_defaults_with_overrides(&self) -> ConfigResult<Config> {
        let mut config = Config::default();
        self.apply_env_overrides(&mut config)?;
        self.check(&config)?;
        Ok(config)
    }

    /// Apply `CERTGATE_*` environment variable overrides
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        self.apply_overrides_from(config, |name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`
    pub fn apply_overrides_from<F>(&self, config: &mut Config, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Validation settings
        if let Some(value) = lookup(ENV_POLICY) {
            config.validation.policy = parse_env(ENV_POLICY, &value, |v| {
                ValidationPolicy::from_str(v).map_err(|e| e.to_string())
            })?;
        }
        if let Some(value) = lookup(ENV_IGNORABLE_ERRORS) {
            config.validation.ignorable_errors = parse_env(ENV_IGNORABLE_ERRORS, &value, |v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|kind| !kind.is_empty())
                    .map(|kind| kind.parse::<ChainError>().map_err(|e| e.to_string()))
                    .collect()
            })?;
        }
        if let Some(value) = lookup(ENV_TRUSTED_PIN) {
            let pin = parse_env(ENV_TRUSTED_PIN, &value, |v| {
                TrustedPin::from_str(v).map_err(|e| e.to_string())
            })?;
            config.validation.trusted_pin = Some(pin);
        }
        if let Some(value) = lookup(ENV_VALIDATION_BUDGET_MS) {
            config.validation.budget_ms = parse_env(ENV_VALIDATION_BUDGET_MS, &value, |v| {
                v.parse()
                    .map_err(|_| "expected a number of milliseconds".to_string())
            })?;
        }

        // Transport settings
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_SECS) {
            config.transport.connect_timeout_secs =
                parse_env(ENV_CONNECT_TIMEOUT_SECS, &value, |v| {
                    v.parse().map_err(|_| "expected a number of seconds".to_string())
                })?;
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.transport.request_timeout_secs =
                parse_env(ENV_REQUEST_TIMEOUT_SECS, &value, |v| {
                    v.parse().map_err(|_| "expected a number of seconds".to_string())
                })?;
        }

        // Observability settings
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            config.observability.log_level = value.to_lowercase();
        }
        if let Some(value) = lookup(ENV_LOG_FORMAT) {
            config.observability.log_format = value.to_lowercase();
        }

        Ok(())
    }

    async fn read_file(&self, path: &Path) -> ConfigResult<Config> {
        debug!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        parse(&content, format)
    }

    fn check(&self, config: &Config) -> ConfigResult<()> {
        if self.validate {
            config.validate()?;
            debug!(policy = %config.validation.policy, "Configuration validated successfully");
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse(content: &str, format: ConfigFormat) -> ConfigResult<Config> {
    let config: Config = match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Json => serde_json::from_str(content)?,
    };
    debug!("Configuration parsed from {}", format.name());
    Ok(config)
}

fn parse_env<T, F>(variable: &str, value: &str, parse: F) -> ConfigResult<T>
where
    F: FnOnce(&str) -> Result<T, String>,
{
    parse(value.trim())
        .map_err(|reason| ConfigError::env_var_parsing_error(variable, value, reason))
}
