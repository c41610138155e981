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
//! Transport abstraction
//!
//! A [`Transport`] sends one request at a time and exposes the hooks the
//! validation gate needs:
//!
//! - a slot for a certificate validation callback, invoked once per handshake
//! - the chain errors to suppress before that callback runs
//! - per-request cache control
//! - a cancellable send that tells success, failure and cancellation apart
//!
//! # Implementing a transport
//!
//! 1. Use `#[async_trait]` on the impl block
//! 2. Make the setters take `&self`; they are called while the transport is
//!    shared behind an `Arc`
//! 3. Snapshot the registered validator when `send` starts, so a request
//!    never observes a registration change mid-flight

use crate::types::{CacheControl, TransportOutcome, TransportRequest};
use async_trait::async_trait;
use certgate_tls::{CertificateGate, IgnorableErrorSet, ServerCertificateValidator};
use std::fmt::Debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP transport with a certificate validation hook
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Install the callback invoked with the server certificate
    fn register_validator(&self, validator: Arc<dyn ServerCertificateValidator>);

    /// Remove the callback, restoring platform-only validation
    fn unregister_validator(&self);

    /// Chain errors to suppress before the callback runs
    fn set_ignorable_errors(&self, errors: IgnorableErrorSet);

    /// Cache behaviour for subsequent requests
    fn set_cache_control(&self, cache: CacheControl);

    /// Send `request`, giving up as soon as `cancel` fires
    async fn send(&self, request: TransportRequest, cancel: &CancellationToken)
        -> TransportOutcome;
}

/// Validator registration scoped to one request
///
/// Registers the gate and its effective ignorable errors on creation and
/// removes both when dropped, whichever way the request ends.
#[derive(Debug)]
pub struct ValidationRegistration<'a> {
    transport: &'a dyn Transport,
}

impl<'a> ValidationRegistration<'a> {
    /// Register `gate` on `transport` if its policy needs the callback
    ///
    /// Returns `None` under `PlatformDefault`; nothing is registered then.
    pub fn acquire(transport: &'a dyn Transport, gate: &Arc<CertificateGate>) -> Option<Self> {
        if !gate.requires_custom_validation() {
            return None;
        }

        transport.set_ignorable_errors(gate.effective_ignorable_errors());
        transport.register_validator(Arc::clone(gate) as Arc<dyn ServerCertificateValidator>);
        debug!(policy = %gate.policy(), "Validation callback registered");

        Some(Self { transport })
    }
}

impl Drop for ValidationRegistration<'_> {
    fn drop(&mut self) {
        self.transport.unregister_validator();
        self.transport.set_ignorable_errors(IgnorableErrorSet::new());
        debug!("Validation callback unregistered");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mock::{MockServer, MockTransport};
    use certgate_tls::{HashAlgorithm, TrustedPin, ValidationPolicy};

    fn gate(policy: ValidationPolicy) -> Arc<CertificateGate> {
        let mut gate =
            CertificateGate::pinned(TrustedPin::for_certificate(HashAlgorithm::Sha256, b"leaf"));
        gate.configure(policy, IgnorableErrorSet::parse_list("untrusted").unwrap());
        Arc::new(gate)
    }

    #[test]
    fn test_platform_default_registers_nothing() {
        let transport = MockTransport::new(MockServer::new(b"leaf".to_vec()));
        let registration =
            ValidationRegistration::acquire(&transport, &gate(ValidationPolicy::PlatformDefault));
        assert!(registration.is_none());
        assert!(!transport.has_validator());
    }

    #[test]
    fn test_registration_is_released_on_drop() {
        let transport = MockTransport::new(MockServer::new(b"leaf".to_vec()));
        {
            let _registration = ValidationRegistration::acquire(
                &transport,
                &gate(ValidationPolicy::IgnoredErrorsPlusCustom),
            )
            .unwrap();
            assert!(transport.has_validator());
            assert_eq!(transport.ignorable_errors().len(), 1);
        }
        assert!(!transport.has_validator());
        assert!(transport.ignorable_errors().is_empty());
    }

    #[test]
    fn test_registration_is_released_on_unwind() {
        let transport = MockTransport::new(MockServer::new(b"leaf".to_vec()));
        let gate = gate(ValidationPolicy::PlatformDefaultPlusCustom);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _registration = ValidationRegistration::acquire(&transport, &gate);
            panic!("request handler failed");
        }));

        assert!(result.is_err());
        assert!(!transport.has_validator());
    }
}
