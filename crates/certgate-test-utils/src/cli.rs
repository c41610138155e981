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
//! CLI command helpers for testing the certgate binary.
//!
//! Provides convenient wrappers around assert_cmd.

use assert_cmd::Command;
use std::path::Path;

/// Creates a new certgate Command for testing.
///
/// # Example
/// ```ignore
/// use certgate_test_utils::certgate;
///
/// certgate()
///     .args(["fetch", "not a uri"])
///     .assert()
///     .failure();
/// ```
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn certgate() -> Command {
    let mut cmd = Command::cargo_bin("certgate").expect("certgate binary not found");
    // Keep the environment from leaking configuration into tests
    for var in [
        "CERTGATE_POLICY",
        "CERTGATE_IGNORABLE_ERRORS",
        "CERTGATE_TRUSTED_PIN",
        "CERTGATE_VALIDATION_BUDGET_MS",
        "CERTGATE_CONNECT_TIMEOUT_SECS",
        "CERTGATE_REQUEST_TIMEOUT_SECS",
        "CERTGATE_LOG_LEVEL",
        "CERTGATE_LOG_FORMAT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Fluent API wrapper for common certgate command patterns.
pub struct CertgateCommand {
    cmd: Command,
}

impl Default for CertgateCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl CertgateCommand {
    /// Create a new CertgateCommand.
    pub fn new() -> Self {
        Self { cmd: certgate() }
    }

    /// Set the working directory for the command.
    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Add an argument to the command.
    pub fn arg(mut self, arg: &str) -> Self {
        self.cmd.arg(arg);
        self
    }

    /// Add multiple arguments to the command.
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    /// Set an environment variable for the command.
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Execute the command and assert success.
    pub fn run_success(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().success()
    }

    /// Execute the command and assert failure.
    pub fn run_failure(mut self) -> assert_cmd::assert::Assert {
        self.cmd.assert().failure()
    }

    /// Get the underlying Command for custom assertions.
    pub fn into_inner(self) -> Command {
        self.cmd
    }
}
