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
//! Certificate content hashes and trusted pins
//!
//! A pin is written as `<algorithm>:<hex>`, e.g.
//! `sha256:9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08`.
//! Hex digits may be separated by `:` as printed by most certificate tools.

use super::{TlsError, TlsResult};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Digest used to compute a certificate's content hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 over the DER encoding (20 bytes)
    Sha1,
    /// SHA-256 over the DER encoding (32 bytes)
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }

    /// Hash `data` with this algorithm
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        }
    }

    /// Algorithm name as written in pins
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    fn from_output_len(len: usize) -> Option<Self> {
        match len {
            20 => Some(HashAlgorithm::Sha1),
            32 => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            other => Err(TlsError::InvalidPin(format!(
                "unsupported hash algorithm '{}', expected sha1 or sha256",
                other
            ))),
        }
    }
}

/// Expected content hash of the server's leaf certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrustedPin {
    algorithm: HashAlgorithm,
    hash: Vec<u8>,
}

impl TrustedPin {
    /// Create a pin from raw hash bytes
    pub fn new(algorithm: HashAlgorithm, hash: impl Into<Vec<u8>>) -> TlsResult<Self> {
        let hash = hash.into();
        if hash.len() != algorithm.output_len() {
            return Err(TlsError::InvalidPin(format!(
                "{} pin must be {} bytes, got {}",
                algorithm,
                algorithm.output_len(),
                hash.len()
            )));
        }
        Ok(Self { algorithm, hash })
    }

    /// Pin the given DER-encoded certificate
    pub fn for_certificate(algorithm: HashAlgorithm, der: &[u8]) -> Self {
        Self {
            algorithm,
            hash: algorithm.digest(der),
        }
    }

    /// Parse a hex-encoded hash for a known algorithm
    pub fn from_hex(algorithm: HashAlgorithm, hex_str: &str) -> TlsResult<Self> {
        let cleaned: String = hex_str
            .chars()
            .filter(|c| *c != ':' && !c.is_whitespace())
            .collect();
        let hash = hex::decode(&cleaned)
            .map_err(|e| TlsError::InvalidPin(format!("invalid hex '{}': {}", hex_str, e)))?;
        Self::new(algorithm, hash)
    }

    /// Digest algorithm of this pin
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Expected hash bytes
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    /// Lowercase hex of the expected hash
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(&self.hash)
    }

    /// Exact-length, exact-byte comparison against a presented hash
    pub fn matches(&self, presented_hash: &[u8]) -> bool {
        self.hash.as_slice() == presented_hash
    }
}

impl fmt::Display for TrustedPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.fingerprint_hex())
    }
}

impl FromStr for TrustedPin {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TlsError::InvalidPin("pin is empty".to_string()));
        }

        if let Some((prefix, rest)) = s.split_once(':') {
            if let Ok(algorithm) = prefix.parse::<HashAlgorithm>() {
                return Self::from_hex(algorithm, rest);
            }
        }

        // Bare hex: infer the algorithm from the digest length
        let digits = s.chars().filter(|c| c.is_ascii_hexdigit()).count();
        let algorithm = HashAlgorithm::from_output_len(digits / 2).ok_or_else(|| {
            TlsError::InvalidPin(format!(
                "cannot infer hash algorithm from {} hex digits; prefix the pin with sha1: or sha256:",
                digits
            ))
        })?;
        Self::from_hex(algorithm, s)
    }
}

impl TryFrom<String> for TrustedPin {
    type Error = TlsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrustedPin> for String {
    fn from(pin: TrustedPin) -> Self {
        pin.to_string()
    }
}
