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

use crate::output;
use anyhow::Result;
use certgate_config::{Config, ConfigFormat, Validator};
use clap::{Parser, ValueEnum};

/// Output format for `certgate config`
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum RenderFormat {
    /// TOML
    #[default]
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl From<RenderFormat> for ConfigFormat {
    fn from(format: RenderFormat) -> Self {
        match format {
            RenderFormat::Toml => ConfigFormat::Toml,
            RenderFormat::Yaml => ConfigFormat::Yaml,
            RenderFormat::Json => ConfigFormat::Json,
        }
    }
}

/// Show the effective configuration
///
/// Prints the settings after the configuration file and `CERTGATE_*`
/// environment variables have been applied.
#[derive(Parser, Debug)]
pub struct ConfigCmd {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = RenderFormat::Toml)]
    pub format: RenderFormat,
}

impl ConfigCmd {
    pub fn execute(&self, config: &Config) -> Result<()> {
        if let Err(e) = config.validate() {
            output::warning(&format!("Configuration is not usable as is: {}", e));
        }

        print!("{}", config.render(self.format.into())?);
        Ok(())
    }
}
