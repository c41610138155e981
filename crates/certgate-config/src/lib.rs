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
//! Configuration management for certgate
//!
//! Loads validation, transport, and logging settings from TOML, YAML, or
//! JSON files and applies `CERTGATE_*` environment variable overrides.
//!
//! # Example
//!
//! ```no_run
//! use certgate_config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = ConfigLoader::new();
//!     let config = loader.load_with_overrides("certgate.toml").await?;
//!
//!     println!("Validation policy: {}", config.validation.policy);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

// Re-export commonly used items
pub use error::{ConfigError, ConfigResult};
pub use loader::{
    ConfigFormat, ConfigLoader, ENV_CONNECT_TIMEOUT_SECS, ENV_IGNORABLE_ERRORS, ENV_LOG_FORMAT,
    ENV_LOG_LEVEL, ENV_POLICY, ENV_REQUEST_TIMEOUT_SECS, ENV_TRUSTED_PIN,
    ENV_VALIDATION_BUDGET_MS,
};
pub use schema::*;
pub use validation::{Validator, LOG_FORMATS, LOG_LEVELS};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();
        assert_eq!(config.validation.budget_ms, 500);
        assert!(config.validation.webpki_roots);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_config_renders_in_every_format() {
        let config = Config::default();
        for format in [ConfigFormat::Toml, ConfigFormat::Yaml, ConfigFormat::Json] {
            let rendered = config.render(format).unwrap();
            assert!(rendered.contains("platform-default"), "{}", format.name());
            let parsed = ConfigLoader::new()
                .load_from_string(&rendered, format)
                .unwrap();
            assert_eq!(parsed, config);
        }
    }
}
