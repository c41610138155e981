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
//! reqwest-backed HTTPS transport
//!
//! Every send builds a fresh `reqwest::Client` around a rustls configuration
//! whose verifier is a [`GatedServerVerifier`]. Nothing is pooled and TLS
//! sessions are never resumed, so each request performs a full handshake and
//! the registered validator sees the certificate every time.
//!
//! A request settles once the response headers arrive. The body is never
//! read; the response is dropped with the client that fetched it.

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;
use crate::types::{
    CacheControl, TransportErrorCode, TransportFailure, TransportOutcome, TransportRequest,
};
use async_trait::async_trait;
use certgate_tls::{
    build_client_config, GatedServerVerifier, HandshakeLog, IgnorableErrorSet,
    ServerCertificateValidator, TrustAnchors,
};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Connection settings for [`HttpsTransport`]
#[derive(Debug, Clone)]
pub struct HttpsSettings {
    /// TCP connect plus TLS handshake limit
    pub connect_timeout: Duration,
    /// Whole-request limit
    pub request_timeout: Duration,
    /// `User-Agent` header
    pub user_agent: String,
}

impl Default for HttpsSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("certgate/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Registration {
    validator: Option<Arc<dyn ServerCertificateValidator>>,
    ignorable: IgnorableErrorSet,
    cache: CacheControl,
}

/// HTTPS transport that routes certificate decisions through a validator
#[derive(Debug)]
pub struct HttpsTransport {
    anchors: TrustAnchors,
    settings: HttpsSettings,
    registration: Mutex<Registration>,
}

impl HttpsTransport {
    /// Create a transport trusting `anchors`
    ///
    /// Fails early if the anchors cannot form a root store.
    pub fn new(anchors: TrustAnchors, settings: HttpsSettings) -> ClientResult<Self> {
        anchors.root_store()?;
        Ok(Self {
            anchors,
            settings,
            registration: Mutex::new(Registration::default()),
        })
    }

    /// Transport trusting the bundled Mozilla roots with default settings
    pub fn with_defaults() -> ClientResult<Self> {
        Self::new(TrustAnchors::webpki(), HttpsSettings::default())
    }

    /// Active settings
    pub fn settings(&self) -> &HttpsSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, Registration> {
        self.registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn build_client(
        &self,
        validator: Option<Arc<dyn ServerCertificateValidator>>,
        ignorable: IgnorableErrorSet,
        log: &Arc<HandshakeLog>,
    ) -> ClientResult<reqwest::Client> {
        let verifier =
            GatedServerVerifier::new(&self.anchors, validator, ignorable, Arc::clone(log))?;
        let tls = build_client_config(Arc::new(verifier))?;

        reqwest::Client::builder()
            .use_preconfigured_tls(tls)
            .pool_max_idle_per_host(0)
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .user_agent(self.settings.user_agent.clone())
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))
    }
}

/// Render an error with its sources, outermost first
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

fn classify(err: &reqwest::Error, log: &HandshakeLog) -> TransportFailure {
    let detail = error_chain(err);

    let code = if log.custom_rejected() {
        TransportErrorCode::ServerCertificateRejected
    } else if let Some(kind) = log.chain_rejection() {
        TransportErrorCode::CertificateChain(kind)
    } else if err.is_timeout() {
        TransportErrorCode::Timeout
    } else if err.is_connect() {
        TransportErrorCode::ConnectionFailed
    } else if err.is_request() || err.is_body() || err.is_decode() || err.is_redirect() {
        TransportErrorCode::Protocol
    } else {
        TransportErrorCode::Other
    };

    TransportFailure::new(code, detail)
}

#[async_trait]
impl Transport for HttpsTransport {
    fn register_validator(&self, validator: Arc<dyn ServerCertificateValidator>) {
        self.lock().validator = Some(validator);
    }

    fn unregister_validator(&self) {
        self.lock().validator = None;
    }

    fn set_ignorable_errors(&self, errors: IgnorableErrorSet) {
        self.lock().ignorable = errors;
    }

    fn set_cache_control(&self, cache: CacheControl) {
        self.lock().cache = cache;
    }

    async fn send(
        &self,
        request: TransportRequest,
        cancel: &CancellationToken,
    ) -> TransportOutcome {
        let (validator, ignorable, cache) = {
            let registration = self.lock();
            (
                registration.validator.clone(),
                registration.ignorable.clone(),
                registration.cache,
            )
        };

        let log = Arc::new(HandshakeLog::new());
        let client = match self.build_client(validator, ignorable, &log) {
            Ok(client) => client,
            Err(e) => {
                return TransportOutcome::Failed(TransportFailure::new(
                    TransportErrorCode::Other,
                    e.to_string(),
                ))
            }
        };

        let mut builder = client.get(request.url.clone());
        if let Some(value) = cache.header_value() {
            builder = builder.header(CACHE_CONTROL, value);
        }
        if cache.is_no_cache() {
            builder = builder.header(PRAGMA, "no-cache");
        }

        debug!(url = %request.url, "Sending request");
        let exchange = async move {
            let response = builder.send().await?;
            Ok::<_, reqwest::Error>(response.status().as_u16())
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(url = %request.url, "Request canceled");
                TransportOutcome::Canceled
            }
            result = exchange => match result {
                Ok(status) => {
                    debug!(url = %request.url, status, "Response headers received");
                    TransportOutcome::Completed { status }
                }
                Err(e) => {
                    let failure = classify(&e, &log);
                    debug!(url = %request.url, code = %failure.code, "Request failed");
                    TransportOutcome::Failed(failure)
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Layer {
        message: &'static str,
        source: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_error_chain_skips_repeated_text() {
        let err = Layer {
            message: "error sending request",
            source: Some(Box::new(Layer {
                message: "invalid peer certificate: UnknownIssuer",
                source: Some(Box::new(Layer {
                    message: "UnknownIssuer",
                    source: None,
                })),
            })),
        };
        assert_eq!(
            error_chain(&err),
            "error sending request: invalid peer certificate: UnknownIssuer"
        );
    }

    #[test]
    fn test_empty_anchors_are_rejected() {
        let result = HttpsTransport::new(TrustAnchors::empty(), HttpsSettings::default());
        assert!(matches!(result, Err(ClientError::Tls(_))));
    }

    #[test]
    fn test_registration_setters() {
        let transport = HttpsTransport::with_defaults().unwrap();
        transport.set_cache_control(CacheControl::no_cache());
        transport.set_ignorable_errors(IgnorableErrorSet::parse_list("untrusted").unwrap());
        let registration = transport.lock();
        assert!(registration.cache.is_no_cache());
        assert_eq!(registration.ignorable.len(), 1);
        assert!(registration.validator.is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = HttpsTransport::with_defaults().unwrap();
        let url = format!("https://127.0.0.1:{}/", port).parse().unwrap();
        let outcome = transport
            .send(TransportRequest::get(url), &CancellationToken::new())
            .await;

        match outcome {
            TransportOutcome::Failed(failure) => {
                assert_eq!(failure.code, TransportErrorCode::ConnectionFailed)
            }
            other => panic!("expected a connection failure, got {:?}", other),
        }
    }
}
