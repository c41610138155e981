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
//! The certificate validation gate
//!
//! [`CertificateGate`] is the callback a transport invokes while a TLS
//! handshake is suspended on the server's certificate. It runs a pluggable
//! [`CertificateCheck`] under a latency budget and turns every unexpected
//! condition into [`ValidationOutcome::Reject`].
//!
//! The callback runs on whatever thread drives the handshake. The gate only
//! reads state that is immutable while a request is in flight, so it is safe
//! to share across threads.

use crate::pin::{HashAlgorithm, TrustedPin};
use crate::policy::{IgnorableErrorSet, ValidationPolicy};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Upper bound on the time a custom check may take inside the handshake
pub const DEFAULT_VALIDATION_BUDGET: Duration = Duration::from_millis(500);

/// Terminal decision for one handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationOutcome {
    /// Let the handshake proceed
    Accept,
    /// Abort the handshake
    Reject,
}

impl ValidationOutcome {
    /// Whether the outcome lets the connection proceed
    pub fn is_accept(&self) -> bool {
        matches!(self, ValidationOutcome::Accept)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationOutcome::Accept => f.write_str("accept"),
            ValidationOutcome::Reject => f.write_str("reject"),
        }
    }
}

/// Leaf certificate offered by the server, borrowed from the handshake
#[derive(Debug, Clone, Copy)]
pub struct PresentedCertificate<'a> {
    der: &'a [u8],
}

impl<'a> PresentedCertificate<'a> {
    /// Wrap DER-encoded certificate bytes
    pub fn new(der: &'a [u8]) -> Self {
        Self { der }
    }

    /// DER encoding
    pub fn der(&self) -> &'a [u8] {
        self.der
    }

    /// Content hash of the DER encoding
    pub fn content_hash(&self, algorithm: HashAlgorithm) -> Vec<u8> {
        algorithm.digest(self.der)
    }
}

/// Intermediate certificates accompanying the leaf, in presentation order
#[derive(Debug, Clone, Default)]
pub struct PresentedChain<'a> {
    certs: Vec<&'a [u8]>,
}

impl<'a> PresentedChain<'a> {
    /// Wrap DER-encoded intermediates
    pub fn new(certs: Vec<&'a [u8]>) -> Self {
        Self { certs }
    }

    /// Chain with no intermediates
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of intermediates
    pub fn len(&self) -> usize {
        self.certs.len()
    }

    /// Whether the server sent no intermediates
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Iterate over the intermediates
    pub fn iter(&self) -> impl Iterator<Item = PresentedCertificate<'a>> + '_ {
        self.certs.iter().copied().map(PresentedCertificate::new)
    }
}

/// Failure raised by a custom certificate check
#[derive(Debug, Error)]
pub enum CheckError {
    /// The check could not reach a decision
    #[error("certificate check failed: {0}")]
    Failed(String),

    /// The check gave up because its deadline passed
    #[error("certificate check exceeded its deadline")]
    DeadlineExceeded,
}

/// Pluggable acceptance predicate run inside the handshake
///
/// Implementations must return before `deadline`; a result produced after
/// it is treated as a rejection. Any external lookup should be bounded by
/// the deadline rather than by its own timeout.
pub trait CertificateCheck: Send + Sync + fmt::Debug {
    /// Decide whether `cert` is acceptable
    fn check(
        &self,
        cert: &PresentedCertificate<'_>,
        chain: &PresentedChain<'_>,
        deadline: Instant,
    ) -> Result<bool, CheckError>;
}

/// Accepts exactly the certificate whose content hash equals the pin
#[derive(Debug, Clone)]
pub struct PinnedHashCheck {
    pin: TrustedPin,
}

impl PinnedHashCheck {
    /// Create a check for `pin`
    pub fn new(pin: TrustedPin) -> Self {
        Self { pin }
    }

    /// The configured pin
    pub fn pin(&self) -> &TrustedPin {
        &self.pin
    }
}

impl CertificateCheck for PinnedHashCheck {
    fn check(
        &self,
        cert: &PresentedCertificate<'_>,
        _chain: &PresentedChain<'_>,
        _deadline: Instant,
    ) -> Result<bool, CheckError> {
        let presented = cert.content_hash(self.pin.algorithm());
        let matched = self.pin.matches(&presented);
        debug!(
            algorithm = %self.pin.algorithm(),
            presented = %hex::encode(&presented),
            expected = %self.pin.fingerprint_hex(),
            matched,
            "Compared certificate hash against trusted pin"
        );
        Ok(matched)
    }
}

/// Rejects every certificate
///
/// Backs gates that only ever run under `PlatformDefault`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAllCheck;

impl CertificateCheck for RejectAllCheck {
    fn check(
        &self,
        _cert: &PresentedCertificate<'_>,
        _chain: &PresentedChain<'_>,
        _deadline: Instant,
    ) -> Result<bool, CheckError> {
        Ok(false)
    }
}

/// Callback a transport invokes with the server's certificate material
pub trait ServerCertificateValidator: Send + Sync + fmt::Debug {
    /// Produce exactly one outcome for the presented certificate
    fn on_server_certificate_presented(
        &self,
        cert: &PresentedCertificate<'_>,
        chain: &PresentedChain<'_>,
    ) -> ValidationOutcome;
}

/// Validation policy plus the custom check it drives
#[derive(Debug, Clone)]
pub struct CertificateGate {
    policy: ValidationPolicy,
    ignorable: IgnorableErrorSet,
    check: Arc<dyn CertificateCheck>,
    budget: Duration,
    invocations: Arc<AtomicU64>,
}

impl CertificateGate {
    /// Create a gate around a custom check, starting with `PlatformDefault`
    pub fn new(check: Arc<dyn CertificateCheck>) -> Self {
        Self {
            policy: ValidationPolicy::PlatformDefault,
            ignorable: IgnorableErrorSet::new(),
            check,
            budget: DEFAULT_VALIDATION_BUDGET,
            invocations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create a gate that pins the leaf certificate
    pub fn pinned(pin: TrustedPin) -> Self {
        Self::new(Arc::new(PinnedHashCheck::new(pin)))
    }

    /// Create a gate with no custom check, for platform validation only
    ///
    /// Switching it to a custom policy rejects every certificate.
    pub fn platform_only() -> Self {
        Self::new(Arc::new(RejectAllCheck))
    }

    /// Set the latency budget for the custom check
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Set the active policy and the chain errors to suppress
    ///
    /// `ignorable` only takes effect under
    /// [`ValidationPolicy::IgnoredErrorsPlusCustom`].
    pub fn configure(&mut self, policy: ValidationPolicy, ignorable: IgnorableErrorSet) {
        if !ignorable.is_empty() && policy != ValidationPolicy::IgnoredErrorsPlusCustom {
            debug!(
                policy = %policy,
                ignorable = %ignorable,
                "Ignorable errors have no effect under this policy"
            );
        }
        self.policy = policy;
        self.ignorable = ignorable;
        info!(policy = %self.policy, ignorable = %self.ignorable, "Certificate gate configured");
    }

    /// Active policy
    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Whether the custom callback must be registered
    pub fn requires_custom_validation(&self) -> bool {
        self.policy.requires_custom_validation()
    }

    /// Chain errors the transport should suppress under the active policy
    pub fn effective_ignorable_errors(&self) -> IgnorableErrorSet {
        match self.policy {
            ValidationPolicy::IgnoredErrorsPlusCustom => self.ignorable.clone(),
            _ => IgnorableErrorSet::new(),
        }
    }

    /// Latency budget of the custom check
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// How many times the callback has run
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl ServerCertificateValidator for CertificateGate {
    fn on_server_certificate_presented(
        &self,
        cert: &PresentedCertificate<'_>,
        chain: &PresentedChain<'_>,
    ) -> ValidationOutcome {
        self.invocations.fetch_add(1, Ordering::SeqCst);

        if !self.policy.requires_custom_validation() {
            warn!(policy = %self.policy, "Custom validation invoked under a policy that does not use it");
            return ValidationOutcome::Reject;
        }

        let started = Instant::now();
        let deadline = started + self.budget;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.check.check(cert, chain, deadline)
        }));
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(Ok(true)) if elapsed <= self.budget => ValidationOutcome::Accept,
            Ok(Ok(true)) => {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = self.budget.as_millis() as u64,
                    "Certificate check overran its budget"
                );
                ValidationOutcome::Reject
            }
            Ok(Ok(false)) => ValidationOutcome::Reject,
            Ok(Err(e)) => {
                warn!(error = %e, "Certificate check failed");
                ValidationOutcome::Reject
            }
            Err(_) => {
                error!("Certificate check panicked");
                ValidationOutcome::Reject
            }
        };

        info!(
            policy = %self.policy,
            outcome = %outcome,
            chain_len = chain.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Server certificate evaluated"
        );
        outcome
    }
}
