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
//! Server-certificate validation gate
//!
//! Decides whether a TLS connection may proceed based on a configured
//! [`ValidationPolicy`] and the certificate material the server presents
//! during the handshake.
//!
//! # Features
//! - Platform-default chain validation (WebPKI) with an optional custom hook
//! - Suppression of selected chain-validation errors before the hook runs
//! - Certificate pinning against a configured [`TrustedPin`]
//! - Time-bounded, panic-safe custom checks that always default to reject
//! - A rustls [`ServerCertVerifier`](rustls::client::danger::ServerCertVerifier)
//!   adapter wiring the gate into any rustls-based HTTP client

pub mod anchors;
pub mod cert;
pub mod gate;
pub mod pin;
pub mod policy;
pub mod verifier;

pub use anchors::TrustAnchors;
pub use cert::Certificate;
#[cfg(feature = "self-signed")]
pub use cert::CertificateBuilder;
pub use gate::{
    CertificateCheck, CertificateGate, CheckError, PinnedHashCheck, PresentedCertificate,
    PresentedChain, RejectAllCheck, ServerCertificateValidator, ValidationOutcome,
    DEFAULT_VALIDATION_BUDGET,
};
pub use pin::{HashAlgorithm, TrustedPin};
pub use policy::{ChainError, IgnorableErrorSet, ValidationPolicy};
pub use verifier::{build_client_config, GatedServerVerifier, HandshakeLog, HandshakeVerdict};

use thiserror::Error;

/// Certificate validation errors
#[derive(Debug, Error)]
pub enum TlsError {
    /// Certificate loading failed
    #[error("Certificate loading failed: {0}")]
    CertificateLoading(String),

    /// Certificate generation failed
    #[error("Certificate generation failed: {0}")]
    CertificateGeneration(String),

    /// Invalid trusted pin
    #[error("Invalid trusted pin: {0}")]
    InvalidPin(String),

    /// Unknown validation policy name
    #[error("Unknown validation policy: {0}. Expected one of: platform-default, platform-default-plus-custom, ignored-errors-plus-custom")]
    UnknownPolicy(String),

    /// Unknown chain error name
    #[error("Unknown chain validation error: {0}")]
    UnknownChainError(String),

    /// Chain error that can never be suppressed
    #[error("Chain validation error '{0}' cannot be ignored")]
    NotIgnorable(ChainError),

    /// Verifier construction failed
    #[error("Failed to build certificate verifier: {0}")]
    Verifier(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for certificate validation operations
pub type TlsResult<T> = Result<T, TlsError>;
