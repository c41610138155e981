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
mod commands;
mod output;
mod reporter;

use anyhow::{Context, Result};
use certgate_client::RequestResult;
use certgate_config::{Config, ConfigLoader};
use certgate_observability::{init_tracing_with_config, LogConfig, LogFormat};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use std::io;
use std::path::{Path, PathBuf};

/// Exit status after Ctrl-C, as shells report SIGINT
const EXIT_CANCELED: i32 = 130;

#[derive(Parser)]
#[command(name = "certgate")]
#[command(version, about = "HTTPS requests with policy-driven server certificate validation")]
#[command(
    long_about = "certgate issues HTTP GET requests whose TLS server certificates are judged by a
validation policy: platform chain validation, an additional pin check, or a pin
check with selected chain errors suppressed."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log format (pretty, compact, json)
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URI through the certificate validation gate
    Fetch(FetchCmd),

    /// Print the trusted pin of certificates in a PEM file
    Pin(PinCmd),

    /// Show the effective configuration
    Config(ConfigCmd),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle color output
    match cli.color.as_str() {
        "never" => console::set_colors_enabled(false),
        "always" => console::set_colors_enabled(true),
        "auto" => {}
        _ => {
            output::error(&format!("Invalid color option: {}", cli.color));
            std::process::exit(2);
        }
    }

    match run(cli).await {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let Cli {
        command,
        verbose,
        quiet,
        log_format,
        config,
        ..
    } = cli;
    let session = Session {
        config_path: config,
        verbose,
        quiet,
        log_format,
    };

    match command {
        Commands::Fetch(cmd) => {
            let config = session.prepare().await?;
            let result = cmd.execute(config, quiet).await?;
            Ok(match result {
                RequestResult::Success(_) => 0,
                RequestResult::Failure(_) => 1,
                RequestResult::Canceled => EXIT_CANCELED,
            })
        }
        Commands::Pin(cmd) => {
            session.prepare().await?;
            cmd.execute(quiet).map(|()| 0)
        }
        Commands::Config(cmd) => {
            let config = session.prepare().await?;
            cmd.execute(&config).map(|()| 0)
        }
        Commands::Version => {
            print_version();
            Ok(0)
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(0)
        }
    }
}

/// Global options of the commands that read configuration
struct Session {
    config_path: Option<PathBuf>,
    verbose: bool,
    quiet: bool,
    log_format: Option<LogFormat>,
}

impl Session {
    /// Load configuration and start logging with it
    async fn prepare(&self) -> Result<Config> {
        let config = load_config(self.config_path.as_deref()).await?;
        self.init_logging(&config);
        Ok(config)
    }

    fn init_logging(&self, config: &Config) {
        let level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            config.observability.log_level.as_str()
        };
        let format = self
            .log_format
            .or_else(|| config.observability.log_format.parse().ok())
            .unwrap_or_default();

        let log_config = LogConfig::new()
            .with_format(format)
            .with_level(level)
            .with_color(console::colors_enabled_stderr());

        // Ignore errors if already initialized
        init_tracing_with_config(&log_config).ok();
    }
}

/// File and environment settings; validated once command-line flags are applied
async fn load_config(path: Option<&Path>) -> Result<Config> {
    let loader = ConfigLoader::without_validation();
    match path {
        Some(path) => loader
            .load_with_overrides(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => loader
            .load_defaults_with_overrides()
            .context("Failed to read configuration from the environment"),
    }
}

fn print_version() {
    println!("certgate {}", env!("CARGO_PKG_VERSION"));
    println!("rust-version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("license: {}", env!("CARGO_PKG_LICENSE"));
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "certgate", &mut io::stdout());
}
