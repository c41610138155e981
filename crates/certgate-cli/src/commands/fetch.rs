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
use crate::reporter::ConsoleReporter;
use anyhow::{Context, Result};
use certgate_client::{HttpsSettings, HttpsTransport, RequestExecutor, RequestResult};
use certgate_config::{Config, Validator};
use certgate_tls::{CertificateGate, ChainError, TrustedPin, ValidationPolicy};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Fetch a URI through the certificate validation gate
///
/// Issues one GET request. The server certificate is judged by the selected
/// policy: platform validation alone, platform validation plus the pin
/// check, or the pin check with selected chain errors suppressed.
///
/// # Examples
///
/// Platform validation only:
/// ```bash
/// certgate fetch https://www.example.com/
/// ```
///
/// Accept a self-signed server by its pin:
/// ```bash
/// certgate fetch https://localhost:8443/ \
///     --policy ignored-errors-plus-custom --ignore untrusted \
///     --pin sha256:5f1e...
/// ```
#[derive(Parser, Debug)]
pub struct FetchCmd {
    /// Target URI (http or https)
    #[arg(value_name = "URI")]
    pub uri: String,

    /// Validation policy (platform-default, platform-default-plus-custom, ignored-errors-plus-custom)
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<ValidationPolicy>,

    /// Chain errors to suppress under ignored-errors-plus-custom
    #[arg(long = "ignore", value_name = "KIND", value_delimiter = ',')]
    pub ignore: Vec<ChainError>,

    /// Trusted pin of the server certificate (sha256:<hex> or sha1:<hex>)
    #[arg(long, value_name = "ALG:HEX")]
    pub pin: Option<TrustedPin>,

    /// Extra trusted CA certificates (PEM)
    #[arg(long = "ca-file", value_name = "FILE")]
    pub ca_files: Vec<PathBuf>,

    /// Do not trust the bundled Mozilla roots
    #[arg(long)]
    pub no_webpki_roots: bool,

    /// Latency budget of the pin check in milliseconds
    #[arg(long, value_name = "MS")]
    pub budget_ms: Option<u64>,
}

impl FetchCmd {
    pub async fn execute(&self, mut config: Config, quiet: bool) -> Result<RequestResult> {
        self.apply_overrides(&mut config);
        config.validate().context("Invalid validation settings")?;

        let validation = &config.validation;
        let anchors = validation
            .trust_anchors()
            .context("Failed to load trusted roots")?;
        let settings = HttpsSettings {
            connect_timeout: config.transport.connect_timeout(),
            request_timeout: config.transport.request_timeout(),
            user_agent: config.transport.user_agent.clone(),
        };
        let transport =
            HttpsTransport::new(anchors, settings).context("Failed to set up HTTPS transport")?;

        let gate = match &validation.trusted_pin {
            Some(pin) => CertificateGate::pinned(pin.clone()),
            None => CertificateGate::platform_only(),
        }
        .with_budget(validation.budget());

        let mut executor = RequestExecutor::new(
            Arc::new(transport),
            gate,
            Arc::new(ConsoleReporter::new(quiet)),
        );
        executor.configure(validation.policy, validation.ignorable_set()?);

        if !quiet {
            output::header(&format!("Fetching {}", self.uri.trim()));
            output::detail("Policy", validation.policy.as_str());
            if validation.policy == ValidationPolicy::IgnoredErrorsPlusCustom {
                let ignorable = executor.gate().effective_ignorable_errors();
                let ignorable = if ignorable.is_empty() {
                    "none".to_string()
                } else {
                    ignorable.to_string()
                };
                output::detail("Ignored errors", &ignorable);
            }
            if let Some(pin) = &validation.trusted_pin {
                output::detail("Trusted pin", &pin.to_string());
            }
        }

        // Ctrl-C cancels the request in flight
        let cancel = executor.cancel_source();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received");
                cancel.cancel();
            }
        });

        let result = executor.execute(&self.uri).await;
        interrupt.abort();

        if let RequestResult::Success(summary) = &result {
            if !quiet {
                output::detail("Status", &summary.status.to_string());
                output::detail(
                    "Elapsed",
                    &format!("{} ms", summary.elapsed.as_millis()),
                );
                if executor.gate().requires_custom_validation() {
                    output::detail(
                        "Pin checks",
                        &executor.gate().invocation_count().to_string(),
                    );
                }
            }
        }

        Ok(result)
    }

    /// Command-line flags take precedence over file and environment settings
    fn apply_overrides(&self, config: &mut Config) {
        let validation = &mut config.validation;
        if let Some(policy) = self.policy {
            validation.policy = policy;
        }
        if !self.ignore.is_empty() {
            validation.ignorable_errors.clone_from(&self.ignore);
        }
        if let Some(pin) = &self.pin {
            validation.trusted_pin = Some(pin.clone());
        }
        validation.extra_roots.extend(self.ca_files.iter().cloned());
        if self.no_webpki_roots {
            validation.webpki_roots = false;
        }
        if let Some(budget_ms) = self.budget_ms {
            validation.budget_ms = budget_ms;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> FetchCmd {
        let mut argv = vec!["fetch"];
        argv.extend_from_slice(args);
        FetchCmd::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_config() {
        let cmd = parse(&[
            "https://localhost/",
            "--policy",
            "ignored-errors-plus-custom",
            "--ignore",
            "untrusted,invalid-name",
            "--pin",
            "sha1:28b88504f609f685f168b9a49c8f0ec49ead8bc2",
            "--budget-ms",
            "250",
        ]);

        let mut config = Config::default();
        cmd.apply_overrides(&mut config);

        assert_eq!(
            config.validation.policy,
            ValidationPolicy::IgnoredErrorsPlusCustom
        );
        assert_eq!(
            config.validation.ignorable_errors,
            vec![ChainError::Untrusted, ChainError::InvalidName]
        );
        assert!(config.validation.trusted_pin.is_some());
        assert_eq!(config.validation.budget_ms, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let cmd = parse(&["https://localhost/"]);
        let mut config = Config::default();
        config.validation.budget_ms = 123;
        config.validation.ignorable_errors = vec![ChainError::Expired];

        cmd.apply_overrides(&mut config);
        assert_eq!(config.validation.budget_ms, 123);
        assert_eq!(config.validation.ignorable_errors, vec![ChainError::Expired]);
        assert!(config.validation.webpki_roots);
    }

    #[test]
    fn test_bad_flag_values_are_rejected() {
        assert!(FetchCmd::try_parse_from(["fetch", "https://a/", "--policy", "trust-all"]).is_err());
        assert!(FetchCmd::try_parse_from(["fetch", "https://a/", "--pin", "md5:00"]).is_err());
        assert!(FetchCmd::try_parse_from(["fetch", "https://a/", "--ignore", "bogus"]).is_err());
    }
}
