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
//! Validation policies and chain-validation error kinds

use super::{TlsError, TlsResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How server certificates are validated for a request session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationPolicy {
    /// Only the platform's own chain validation runs
    #[default]
    PlatformDefault,

    /// Platform validation must pass, then the custom check runs
    PlatformDefaultPlusCustom,

    /// Selected platform errors are suppressed, then the custom check runs
    IgnoredErrorsPlusCustom,
}

impl ValidationPolicy {
    /// Whether this policy registers the custom validation callback
    pub fn requires_custom_validation(&self) -> bool {
        !matches!(self, ValidationPolicy::PlatformDefault)
    }

    /// Policy name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPolicy::PlatformDefault => "platform-default",
            ValidationPolicy::PlatformDefaultPlusCustom => "platform-default-plus-custom",
            ValidationPolicy::IgnoredErrorsPlusCustom => "ignored-errors-plus-custom",
        }
    }
}

impl fmt::Display for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationPolicy {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "platform-default" | "default" => Ok(ValidationPolicy::PlatformDefault),
            "platform-default-plus-custom" | "default-plus-custom" => {
                Ok(ValidationPolicy::PlatformDefaultPlusCustom)
            }
            "ignored-errors-plus-custom" | "ignore-errors-plus-custom" => {
                Ok(ValidationPolicy::IgnoredErrorsPlusCustom)
            }
            _ => Err(TlsError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Reason a certificate chain failed platform trust evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainError {
    /// Chain does not terminate in a trusted root
    Untrusted,
    /// Certificate is not valid for the requested host name
    InvalidName,
    /// Certificate is outside its validity period
    Expired,
    /// Issuer could not be located to complete the chain
    IncompleteChain,
    /// Certificate is not valid for server authentication
    WrongUsage,
    /// Revocation status could not be determined
    RevocationInformationMissing,
    /// Revocation check failed to complete
    RevocationFailure,
    /// Certificate has been revoked
    Revoked,
    /// A signature in the chain does not verify
    InvalidSignature,
    /// Any other validation failure
    OtherErrors,
}

impl ChainError {
    /// All kinds, in declaration order
    pub const ALL: [ChainError; 10] = [
        ChainError::Untrusted,
        ChainError::InvalidName,
        ChainError::Expired,
        ChainError::IncompleteChain,
        ChainError::WrongUsage,
        ChainError::RevocationInformationMissing,
        ChainError::RevocationFailure,
        ChainError::Revoked,
        ChainError::InvalidSignature,
        ChainError::OtherErrors,
    ];

    /// Whether the transport may be told to treat this kind as non-fatal
    pub fn is_ignorable(&self) -> bool {
        !matches!(
            self,
            ChainError::Revoked | ChainError::InvalidSignature | ChainError::OtherErrors
        )
    }

    /// Name as used in configuration files
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainError::Untrusted => "untrusted",
            ChainError::InvalidName => "invalid-name",
            ChainError::Expired => "expired",
            ChainError::IncompleteChain => "incomplete-chain",
            ChainError::WrongUsage => "wrong-usage",
            ChainError::RevocationInformationMissing => "revocation-information-missing",
            ChainError::RevocationFailure => "revocation-failure",
            ChainError::Revoked => "revoked",
            ChainError::InvalidSignature => "invalid-signature",
            ChainError::OtherErrors => "other-errors",
        }
    }

    /// Classify a rustls verification error
    pub fn from_rustls(error: &rustls::Error) -> Self {
        use rustls::CertificateError as E;

        match error {
            rustls::Error::InvalidCertificate(cert_error) => match cert_error {
                E::UnknownIssuer => ChainError::Untrusted,
                E::NotValidForName | E::NotValidForNameContext { .. } => ChainError::InvalidName,
                E::Expired
                | E::ExpiredContext { .. }
                | E::NotValidYet
                | E::NotValidYetContext { .. } => ChainError::Expired,
                E::InvalidPurpose | E::InvalidPurposeContext { .. } => ChainError::WrongUsage,
                E::UnknownRevocationStatus => ChainError::RevocationInformationMissing,
                E::ExpiredRevocationList | E::ExpiredRevocationListContext { .. } => {
                    ChainError::RevocationFailure
                }
                E::Revoked => ChainError::Revoked,
                E::BadSignature => ChainError::InvalidSignature,
                _ => ChainError::OtherErrors,
            },
            _ => ChainError::OtherErrors,
        }
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainError {
    type Err = TlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        ChainError::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| TlsError::UnknownChainError(s.to_string()))
    }
}

/// Chain errors the transport suppresses before invoking the custom callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChainError>", into = "Vec<ChainError>")]
pub struct IgnorableErrorSet {
    kinds: BTreeSet<ChainError>,
}

impl IgnorableErrorSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kind, refusing those that can never be suppressed
    pub fn insert(&mut self, kind: ChainError) -> TlsResult<()> {
        if !kind.is_ignorable() {
            return Err(TlsError::NotIgnorable(kind));
        }
        self.kinds.insert(kind);
        Ok(())
    }

    /// Builder-style insert
    pub fn with(mut self, kind: ChainError) -> TlsResult<Self> {
        self.insert(kind)?;
        Ok(self)
    }

    /// Build a set from any iterator of kinds
    pub fn try_from_kinds<I>(kinds: I) -> TlsResult<Self>
    where
        I: IntoIterator<Item = ChainError>,
    {
        let mut set = Self::new();
        for kind in kinds {
            set.insert(kind)?;
        }
        Ok(set)
    }

    /// Parse a comma-separated list such as `untrusted,invalid-name`
    pub fn parse_list(list: &str) -> TlsResult<Self> {
        let kinds = list
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ChainError::from_str)
            .collect::<TlsResult<Vec<_>>>()?;
        Self::try_from_kinds(kinds)
    }

    /// Whether `kind` is suppressed
    pub fn contains(&self, kind: ChainError) -> bool {
        self.kinds.contains(&kind)
    }

    /// Whether no kind is suppressed
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Number of suppressed kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Iterate over suppressed kinds in order
    pub fn iter(&self) -> impl Iterator<Item = ChainError> + '_ {
        self.kinds.iter().copied()
    }
}

impl TryFrom<Vec<ChainError>> for IgnorableErrorSet {
    type Error = TlsError;

    fn try_from(kinds: Vec<ChainError>) -> Result<Self, Self::Error> {
        Self::try_from_kinds(kinds)
    }
}

impl From<IgnorableErrorSet> for Vec<ChainError> {
    fn from(set: IgnorableErrorSet) -> Self {
        set.kinds.into_iter().collect()
    }
}

impl fmt::Display for IgnorableErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.kinds.iter().map(ChainError::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('_', "-")
}
