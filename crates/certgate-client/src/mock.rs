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
//! In-memory mock transport for testing
//!
//! Simulates a server handshake without any network: the configured chain
//! errors play the part of platform validation, and the registered
//! validator is consulted exactly as [`HttpsTransport`](crate::HttpsTransport)
//! would consult it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use certgate_client::mock::{MockServer, MockTransport};
//! use certgate_client::{Transport, TransportOutcome, TransportRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let transport = MockTransport::new(MockServer::new(b"leaf der".to_vec()));
//!     let url = "https://example.com/".parse().unwrap();
//!     let outcome = transport
//!         .send(TransportRequest::get(url), &CancellationToken::new())
//!         .await;
//!     assert_eq!(outcome, TransportOutcome::Completed { status: 200 });
//!     assert_eq!(transport.send_count(), 1);
//! }
//! ```

use crate::transport::Transport;
use crate::types::{
    CacheControl, TransportErrorCode, TransportFailure, TransportOutcome, TransportRequest,
};
use async_trait::async_trait;
use certgate_tls::{
    ChainError, IgnorableErrorSet, PresentedCertificate, PresentedChain,
    ServerCertificateValidator,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The simulated server
#[derive(Debug, Clone)]
pub struct MockServer {
    /// Leaf certificate DER
    pub leaf: Vec<u8>,
    /// Intermediates DER, in presentation order
    pub intermediates: Vec<Vec<u8>>,
    /// Errors platform validation reports, in order
    pub chain_errors: Vec<ChainError>,
    /// HTTP status of the response
    pub status: u16,
    /// Time before the response arrives
    pub latency: Duration,
    /// Network failure returned instead of a response
    pub failure: Option<TransportFailure>,
}

impl MockServer {
    /// A server presenting `leaf` that passes platform validation
    pub fn new(leaf: Vec<u8>) -> Self {
        Self {
            leaf,
            intermediates: Vec::new(),
            chain_errors: Vec::new(),
            status: 200,
            latency: Duration::ZERO,
            failure: None,
        }
    }

    /// Platform validation reports `errors`
    pub fn with_chain_errors(mut self, errors: &[ChainError]) -> Self {
        self.chain_errors = errors.to_vec();
        self
    }

    /// Add an intermediate certificate
    pub fn with_intermediate(mut self, der: Vec<u8>) -> Self {
        self.intermediates.push(der);
        self
    }

    /// Respond with `status`
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Delay the response
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every request with `failure`
    pub fn with_failure(mut self, failure: TransportFailure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// What one send observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRecord {
    /// Requested URL
    pub url: String,
    /// Whether a validator was registered when the send started
    pub validator_registered: bool,
    /// Cache control in effect
    pub cache: CacheControl,
    /// Chain errors suppressed at send time
    pub ignorable: IgnorableErrorSet,
}

#[derive(Debug, Default)]
struct MockState {
    validator: Option<Arc<dyn ServerCertificateValidator>>,
    ignorable: IgnorableErrorSet,
    cache: CacheControl,
    sends: Vec<SendRecord>,
}

/// In-memory transport that simulates handshakes
///
/// Clones share state, so a test can keep one handle while an executor owns
/// another.
#[derive(Debug, Clone)]
pub struct MockTransport {
    server: Arc<Mutex<MockServer>>,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport talking to `server`
    pub fn new(server: MockServer) -> Self {
        Self {
            server: Arc::new(Mutex::new(server)),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Replace the simulated server
    pub fn set_server(&self, server: MockServer) {
        *self.server.lock().unwrap_or_else(PoisonError::into_inner) = server;
    }

    /// Number of sends so far
    pub fn send_count(&self) -> usize {
        self.lock_state().sends.len()
    }

    /// Every send so far
    pub fn sends(&self) -> Vec<SendRecord> {
        self.lock_state().sends.clone()
    }

    /// Whether a validator is currently registered
    pub fn has_validator(&self) -> bool {
        self.lock_state().validator.is_some()
    }

    /// Currently suppressed chain errors
    pub fn ignorable_errors(&self) -> IgnorableErrorSet {
        self.lock_state().ignorable.clone()
    }

    /// Current cache control
    pub fn cache_control(&self) -> CacheControl {
        self.lock_state().cache
    }

    fn lock_state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handshake(
        server: &MockServer,
        validator: Option<&dyn ServerCertificateValidator>,
        ignorable: &IgnorableErrorSet,
    ) -> Result<(), TransportFailure> {
        let Some(validator) = validator else {
            return match server.chain_errors.first() {
                Some(kind) => Err(chain_failure(*kind)),
                None => Ok(()),
            };
        };

        if let Some(kind) = server
            .chain_errors
            .iter()
            .find(|kind| !ignorable.contains(**kind))
        {
            return Err(chain_failure(*kind));
        }

        let cert = PresentedCertificate::new(&server.leaf);
        let chain = PresentedChain::new(server.intermediates.iter().map(Vec::as_slice).collect());
        if validator
            .on_server_certificate_presented(&cert, &chain)
            .is_accept()
        {
            Ok(())
        } else {
            Err(TransportFailure::new(
                TransportErrorCode::ServerCertificateRejected,
                "server certificate rejected by the validation callback",
            ))
        }
    }
}

fn chain_failure(kind: ChainError) -> TransportFailure {
    TransportFailure::new(
        TransportErrorCode::CertificateChain(kind),
        format!("certificate chain validation failed: {}", kind),
    )
}

#[async_trait]
impl Transport for MockTransport {
    fn register_validator(&self, validator: Arc<dyn ServerCertificateValidator>) {
        self.lock_state().validator = Some(validator);
    }

    fn unregister_validator(&self) {
        self.lock_state().validator = None;
    }

    fn set_ignorable_errors(&self, errors: IgnorableErrorSet) {
        self.lock_state().ignorable = errors;
    }

    fn set_cache_control(&self, cache: CacheControl) {
        self.lock_state().cache = cache;
    }

    async fn send(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> TransportOutcome {
        let server = self
            .server
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let (validator, ignorable) = {
            let mut state = self.lock_state();
            let record = SendRecord {
                url: request.url.to_string(),
                validator_registered: state.validator.is_some(),
                cache: state.cache,
                ignorable: state.ignorable.clone(),
            };
            state.sends.push(record);
            (state.validator.clone(), state.ignorable.clone())
        };

        if cancel.is_cancelled() {
            return TransportOutcome::Canceled;
        }

        if !server.latency.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return TransportOutcome::Canceled,
                _ = tokio::time::sleep(server.latency) => {}
            }
        }

        if let Some(failure) = server.failure.clone() {
            return TransportOutcome::Failed(failure);
        }

        if request.url.scheme() == "https" {
            if let Err(failure) = Self::handshake(&server, validator.as_deref(), &ignorable) {
                return TransportOutcome::Failed(failure);
            }
        }

        TransportOutcome::Completed {
            status: server.status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use certgate_tls::{CertificateGate, HashAlgorithm, TrustedPin, ValidationPolicy};

    const LEAF: &[u8] = b"mock leaf";

    fn url() -> reqwest::Url {
        "https://mock.example/".parse().unwrap()
    }

    fn pinned(policy: ValidationPolicy, ignorable: &str) -> Arc<CertificateGate> {
        let mut gate =
            CertificateGate::pinned(TrustedPin::for_certificate(HashAlgorithm::Sha1, LEAF));
        gate.configure(policy, IgnorableErrorSet::parse_list(ignorable).unwrap());
        Arc::new(gate)
    }

    #[tokio::test]
    async fn test_clean_chain_completes() {
        let transport = MockTransport::new(MockServer::new(LEAF.to_vec()).with_status(204));
        let outcome = transport
            .send(TransportRequest::get(url()), &CancellationToken::new())
            .await;
        assert_eq!(outcome, TransportOutcome::Completed { status: 204 });
    }

    #[tokio::test]
    async fn test_chain_error_without_validator_fails() {
        let transport = MockTransport::new(
            MockServer::new(LEAF.to_vec()).with_chain_errors(&[ChainError::Untrusted]),
        );
        let outcome = transport
            .send(TransportRequest::get(url()), &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            TransportOutcome::Failed(chain_failure(ChainError::Untrusted))
        );
    }

    #[tokio::test]
    async fn test_suppressed_errors_reach_validator() {
        let transport = MockTransport::new(
            MockServer::new(LEAF.to_vec())
                .with_chain_errors(&[ChainError::Untrusted, ChainError::InvalidName]),
        );
        let gate = pinned(ValidationPolicy::IgnoredErrorsPlusCustom, "untrusted,invalid-name");
        transport.register_validator(Arc::clone(&gate) as Arc<dyn ServerCertificateValidator>);
        transport.set_ignorable_errors(gate.effective_ignorable_errors());

        let outcome = transport
            .send(TransportRequest::get(url()), &CancellationToken::new())
            .await;
        assert_eq!(outcome, TransportOutcome::Completed { status: 200 });
        assert_eq!(gate.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_partially_suppressed_errors_fail() {
        let transport = MockTransport::new(
            MockServer::new(LEAF.to_vec())
                .with_chain_errors(&[ChainError::Untrusted, ChainError::Expired]),
        );
        let gate = pinned(ValidationPolicy::IgnoredErrorsPlusCustom, "untrusted");
        transport.register_validator(Arc::clone(&gate) as Arc<dyn ServerCertificateValidator>);
        transport.set_ignorable_errors(gate.effective_ignorable_errors());

        let outcome = transport
            .send(TransportRequest::get(url()), &CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            TransportOutcome::Failed(chain_failure(ChainError::Expired))
        );
        assert_eq!(gate.invocation_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_latency() {
        let transport = MockTransport::new(
            MockServer::new(LEAF.to_vec()).with_latency(Duration::from_secs(30)),
        );
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = transport.send(TransportRequest::get(url()), &token).await;
        assert_eq!(outcome, TransportOutcome::Canceled);
    }

    #[tokio::test]
    async fn test_plain_http_skips_handshake() {
        let transport = MockTransport::new(
            MockServer::new(LEAF.to_vec()).with_chain_errors(&[ChainError::Untrusted]),
        );
        let outcome = transport
            .send(
                TransportRequest::get("http://mock.example/".parse().unwrap()),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(outcome, TransportOutcome::Completed { status: 200 });
    }
}
