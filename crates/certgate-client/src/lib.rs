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
//! Gated HTTPS requests
//!
//! This crate issues cancellable HTTP GET requests whose TLS handshakes are
//! decided by a [`CertificateGate`](certgate_tls::CertificateGate).
//!
//! # Example
//!
//! ```rust,no_run
//! use certgate_client::{HttpsTransport, RequestExecutor, TracingReporter};
//! use certgate_tls::{CertificateGate, IgnorableErrorSet, TrustedPin, ValidationPolicy};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pin: TrustedPin = "sha1:28b88504f609f685f168b9a49c8f0ec49ead8bc2".parse()?;
//!     let transport = Arc::new(HttpsTransport::with_defaults()?);
//!     let mut executor =
//!         RequestExecutor::new(transport, CertificateGate::pinned(pin), Arc::new(TracingReporter));
//!
//!     executor.configure(
//!         ValidationPolicy::IgnoredErrorsPlusCustom,
//!         IgnorableErrorSet::parse_list("untrusted,invalid-name")?,
//!     );
//!     let result = executor.execute("https://www.example.com/").await;
//!     println!("{}", result.status_message());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod executor;
pub mod https;
pub mod mock;
pub mod status;
pub mod transport;
pub mod types;
pub mod uri;

// Re-export commonly used types
pub use error::{ClientError, ClientResult, RequestError};
pub use executor::{CancelSource, ExecutorState, RequestExecutor};
pub use https::{HttpsSettings, HttpsTransport};
pub use status::{MemoryReporter, NotifyKind, StatusReporter, TracingReporter};
pub use transport::{Transport, ValidationRegistration};
pub use types::{
    CacheControl, CacheReadBehavior, CacheWriteBehavior, RequestResult, ResponseSummary,
    TransportErrorCode, TransportFailure, TransportOutcome, TransportRequest, CANCELED_MESSAGE,
    INVALID_URI_MESSAGE, IN_PROGRESS_MESSAGE, SUCCESS_MESSAGE,
};
pub use uri::parse_http_uri;
