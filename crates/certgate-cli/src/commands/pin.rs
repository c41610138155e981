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
use anyhow::{Context, Result};
use certgate_tls::{Certificate, HashAlgorithm};
use clap::Parser;
use std::path::PathBuf;

/// Print the trusted pin of each certificate in a PEM file
///
/// The printed value can be passed to `certgate fetch --pin` or stored as
/// `validation.trusted_pin`.
///
/// # Examples
///
/// ```bash
/// certgate pin server.pem
/// certgate pin server.pem --algorithm sha1
/// ```
#[derive(Parser, Debug)]
pub struct PinCmd {
    /// PEM file holding one or more certificates
    #[arg(value_name = "PEM_FILE")]
    pub file: PathBuf,

    /// Hash algorithm (sha1 or sha256)
    #[arg(short, long, value_name = "ALG", default_value = "sha256")]
    pub algorithm: HashAlgorithm,
}

impl PinCmd {
    pub fn execute(&self, quiet: bool) -> Result<()> {
        let certificates = Certificate::load_pem_file(&self.file)
            .with_context(|| format!("Failed to read certificates from {}", self.file.display()))?;

        if !quiet && certificates.len() > 1 {
            output::info(&format!(
                "{} certificates in {}, leaf first",
                certificates.len(),
                self.file.display()
            ));
        }

        for certificate in &certificates {
            println!("{}", certificate.pin(self.algorithm));
        }

        Ok(())
    }
}
