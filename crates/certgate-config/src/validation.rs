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
//! Configuration validation

use crate::error::{ConfigError, ConfigResult};
use crate::schema::*;

/// Log levels accepted in `observability.log_level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Formats accepted in `observability.log_format`
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validator for configuration settings
pub trait Validator {
    /// Check the settings, reporting the first problem found
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        self.validation.validate()?;
        self.transport.validate()?;
        self.observability.validate()?;

        let budget_ms = u128::from(self.validation.budget_ms);
        if budget_ms >= self.transport.connect_timeout().as_millis() {
            return Err(ConfigError::ConflictingValues(format!(
                "validation.budget_ms ({}) must be below transport.connect_timeout_secs ({}s)",
                self.validation.budget_ms, self.transport.connect_timeout_secs
            )));
        }

        Ok(())
    }
}

impl Validator for ValidationConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.policy.requires_custom_validation() && self.trusted_pin.is_none() {
            return Err(ConfigError::MissingRequired(format!(
                "validation.trusted_pin (required by policy '{}')",
                self.policy
            )));
        }

        self.ignorable_set()?;

        if self.budget_ms == 0 {
            return Err(ConfigError::invalid_value(
                "validation.budget_ms",
                "must be greater than 0",
            ));
        }

        if !self.webpki_roots && self.extra_roots.is_empty() {
            return Err(ConfigError::ConflictingValues(
                "validation.webpki_roots is false and no validation.extra_roots are configured"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

impl Validator for TransportConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "transport.connect_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.request_timeout_secs < self.connect_timeout_secs {
            return Err(ConfigError::invalid_value(
                "transport.request_timeout_secs",
                format!(
                    "must be at least transport.connect_timeout_secs ({})",
                    self.connect_timeout_secs
                ),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingRequired("transport.user_agent".to_string()));
        }

        Ok(())
    }
}

impl Validator for ObservabilityConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_level",
                format!("must be one of: {}", LOG_LEVELS.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ConfigError::invalid_value(
                "observability.log_format",
                format!("must be one of: {}", LOG_FORMATS.join(", ")),
            ));
        }

        Ok(())
    }
}
