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
//! rustls verifier adapter
//!
//! [`GatedServerVerifier`] runs the platform chain check (WebPKI) and then,
//! when a validator is registered, suppresses the configured ignorable
//! chain errors and hands the certificate to the validator. Its decision
//! becomes the handshake's decision.
//!
//! WebPKI reports only the first error it meets. When a non-name error is
//! suppressed and [`ChainError::InvalidName`] is not ignorable, the host
//! name is checked again on its own so a suppressed trust failure cannot
//! hide a name mismatch. Any other failure that WebPKI would have reported
//! after a suppressed one is left to the custom check.

use crate::anchors::TrustAnchors;
use crate::gate::{PresentedCertificate, PresentedChain, ServerCertificateValidator};
use crate::policy::{ChainError, IgnorableErrorSet};
use crate::{TlsError, TlsResult};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{Resumption, WebPkiServerVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, Error, SignatureScheme};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// What happened at one step of a certificate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeVerdict {
    /// Platform chain validation succeeded
    ChainPassed,
    /// Platform chain validation failed with an error that was suppressed
    ChainErrorIgnored(ChainError),
    /// Platform chain validation failed and the handshake was aborted
    ChainRejected(ChainError),
    /// The custom validator accepted the certificate
    CustomAccepted,
    /// The custom validator rejected the certificate
    CustomRejected,
}

/// Verdicts recorded while a client's handshakes ran
///
/// The transport reads it after a failed request to tell a validator
/// rejection apart from a chain failure or a network error.
#[derive(Debug, Default)]
pub struct HandshakeLog {
    verdicts: Mutex<Vec<HandshakeVerdict>>,
}

impl HandshakeLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a verdict
    pub fn record(&self, verdict: HandshakeVerdict) {
        self.verdicts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(verdict);
    }

    /// Snapshot of every verdict so far
    pub fn verdicts(&self) -> Vec<HandshakeVerdict> {
        self.verdicts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the custom validator rejected a certificate
    pub fn custom_rejected(&self) -> bool {
        self.verdicts()
            .iter()
            .any(|v| matches!(v, HandshakeVerdict::CustomRejected))
    }

    /// The chain error that aborted a handshake, if any
    pub fn chain_rejection(&self) -> Option<ChainError> {
        self.verdicts().iter().find_map(|v| match v {
            HandshakeVerdict::ChainRejected(kind) => Some(*kind),
            _ => None,
        })
    }

    /// How many times the custom validator reached a decision
    pub fn custom_invocations(&self) -> usize {
        self.verdicts()
            .iter()
            .filter(|v| {
                matches!(
                    v,
                    HandshakeVerdict::CustomAccepted | HandshakeVerdict::CustomRejected
                )
            })
            .count()
    }
}

/// Server certificate verifier that consults a [`ServerCertificateValidator`]
#[derive(Debug)]
pub struct GatedServerVerifier {
    inner: Arc<WebPkiServerVerifier>,
    validator: Option<Arc<dyn ServerCertificateValidator>>,
    ignorable: IgnorableErrorSet,
    log: Arc<HandshakeLog>,
}

impl GatedServerVerifier {
    /// Build a verifier over `anchors`
    ///
    /// With no validator the verifier behaves exactly like the platform
    /// verifier and `ignorable` has no effect.
    pub fn new(
        anchors: &TrustAnchors,
        validator: Option<Arc<dyn ServerCertificateValidator>>,
        ignorable: IgnorableErrorSet,
        log: Arc<HandshakeLog>,
    ) -> TlsResult<Self> {
        let roots = Arc::new(anchors.root_store()?);
        let inner = WebPkiServerVerifier::builder_with_provider(roots, crypto_provider())
            .build()
            .map_err(|e| TlsError::Verifier(e.to_string()))?;

        Ok(Self {
            inner,
            validator,
            ignorable,
            log,
        })
    }

    /// Log shared with the transport
    pub fn log(&self) -> &Arc<HandshakeLog> {
        &self.log
    }

    fn reject_chain(&self, kind: ChainError, error: Error) -> Result<ServerCertVerified, Error> {
        debug!(error = %kind, "Platform chain validation rejected the server certificate");
        self.log.record(HandshakeVerdict::ChainRejected(kind));
        Err(error)
    }

    fn consult(
        &self,
        validator: &dyn ServerCertificateValidator,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
    ) -> Result<ServerCertVerified, Error> {
        let cert = PresentedCertificate::new(end_entity.as_ref());
        let chain = PresentedChain::new(intermediates.iter().map(|c| c.as_ref()).collect());

        if validator
            .on_server_certificate_presented(&cert, &chain)
            .is_accept()
        {
            self.log.record(HandshakeVerdict::CustomAccepted);
            Ok(ServerCertVerified::assertion())
        } else {
            self.log.record(HandshakeVerdict::CustomRejected);
            Err(Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }
}

impl ServerCertVerifier for GatedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, Error> {
        let platform =
            self.inner
                .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now);

        let Some(validator) = self.validator.as_deref() else {
            return match platform {
                Ok(verified) => {
                    self.log.record(HandshakeVerdict::ChainPassed);
                    Ok(verified)
                }
                Err(e) => self.reject_chain(ChainError::from_rustls(&e), e),
            };
        };

        match platform {
            Ok(_) => self.log.record(HandshakeVerdict::ChainPassed),
            Err(e) => {
                let kind = ChainError::from_rustls(&e);
                if !self.ignorable.contains(kind) {
                    return self.reject_chain(kind, e);
                }

                warn!(error = %kind, "Ignoring chain validation error");
                self.log.record(HandshakeVerdict::ChainErrorIgnored(kind));

                if kind != ChainError::InvalidName && !self.ignorable.contains(ChainError::InvalidName)
                {
                    let parsed = ParsedCertificate::try_from(end_entity)?;
                    if let Err(name_error) = rustls::client::verify_server_name(&parsed, server_name)
                    {
                        return self.reject_chain(ChainError::InvalidName, name_error);
                    }
                }
            }
        }

        self.consult(validator, end_entity, intermediates)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Client configuration whose every handshake goes through `verifier`
///
/// Session resumption is disabled so each connection performs a full
/// handshake and the certificate is evaluated every time.
pub fn build_client_config(verifier: Arc<GatedServerVerifier>) -> TlsResult<ClientConfig> {
    let mut config = ClientConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Verifier(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    config.resumption = Resumption::disabled();
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_log_summaries() {
        let log = HandshakeLog::new();
        assert!(!log.custom_rejected());
        assert_eq!(log.chain_rejection(), None);

        log.record(HandshakeVerdict::ChainErrorIgnored(ChainError::Untrusted));
        log.record(HandshakeVerdict::CustomRejected);
        assert!(log.custom_rejected());
        assert_eq!(log.custom_invocations(), 1);
        assert_eq!(log.chain_rejection(), None);
    }

    #[test]
    fn test_log_chain_rejection() {
        let log = HandshakeLog::new();
        log.record(HandshakeVerdict::ChainRejected(ChainError::Expired));
        assert_eq!(log.chain_rejection(), Some(ChainError::Expired));
        assert_eq!(log.custom_invocations(), 0);
    }

    #[test]
    fn test_client_config_disables_resumption() {
        let verifier = GatedServerVerifier::new(
            &TrustAnchors::webpki(),
            None,
            IgnorableErrorSet::new(),
            Arc::new(HandshakeLog::new()),
        )
        .unwrap();
        let config = build_client_config(Arc::new(verifier)).unwrap();
        let resumption = format!("{:?}", config.resumption);
        assert!(resumption.contains("NoClientSessionStorage"), "{}", resumption);
        assert!(resumption.contains("Disabled"), "{}", resumption);
        assert!(config.alpn_protocols.contains(&b"http/1.1".to_vec()));
    }
}
