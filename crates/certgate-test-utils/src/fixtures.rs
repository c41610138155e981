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
//! Test fixture management.
//!
//! Writes certificates and configuration files into temporary directories.

use anyhow::{anyhow, Result};
use certgate_tls::{Certificate, CertificateBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Pin used by sample configurations; matches no real certificate.
pub const SAMPLE_PIN: &str = "sha1:28b88504f609f685f168b9a49c8f0ec49ead8bc2";

/// Test fixture management utilities.
pub struct TestFixtures;

impl TestFixtures {
    /// Generate a self-signed certificate for `host`.
    pub fn certificate(host: &str) -> Result<Certificate> {
        CertificateBuilder::new(host)
            .add_san_dns(host)
            .generate_self_signed()
            .map_err(|e| anyhow!("failed to generate certificate: {}", e))
    }

    /// Write `certificate` and its key as `<name>.pem` and `<name>.key` in `dir`.
    ///
    /// Returns the certificate path.
    pub fn write_pem(dir: &Path, name: &str, certificate: &Certificate) -> Result<PathBuf> {
        let cert_path = dir.join(format!("{}.pem", name));
        let key_path = dir.join(format!("{}.key", name));
        certificate
            .save_pem_files(&cert_path, &key_path)
            .map_err(|e| anyhow!("failed to write PEM files: {}", e))?;
        Ok(cert_path)
    }

    /// Write a text file into `dir`.
    pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Sample TOML configuration selecting `policy`.
    pub fn sample_toml(policy: &str, pin: Option<&str>) -> String {
        let mut toml = format!("[validation]\npolicy = \"{}\"\n", policy);
        if let Some(pin) = pin {
            toml.push_str(&format!("trusted_pin = \"{}\"\n", pin));
        }
        toml
    }

    /// Fresh temporary directory.
    pub fn temp_dir() -> Result<TempDir> {
        Ok(TempDir::new()?)
    }
}
