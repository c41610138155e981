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
//! Local HTTPS server with a self-signed certificate.
//!
//! The certificate is issued for `localhost` and `127.0.0.1` and chains to
//! no trusted root, so platform validation reports it as untrusted.
//!
//! Routes: `/` answers immediately, `/slow` delays the whole response and
//! `/stalled` sends headers plus a first chunk, then never finishes the body.

use anyhow::{anyhow, Context, Result};
use axum::body::{Body, Bytes};
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use certgate_tls::{Certificate, CertificateBuilder, HashAlgorithm, TrustedPin};
use futures::stream::{self, StreamExt};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Body served at `/`
pub const ROOT_BODY: &str = "certgate test server";

/// How long `/slow` waits before responding
pub const SLOW_DELAY: Duration = Duration::from_secs(10);

/// First chunk `/stalled` sends before its body stops forever
pub const STALLED_PREFIX: &str = "partial body";

/// HTTPS server running on an ephemeral local port.
///
/// Shuts down when dropped.
pub struct TestHttpsServer {
    addr: SocketAddr,
    certificate: Certificate,
    handle: Handle,
    task: JoinHandle<()>,
}

impl TestHttpsServer {
    /// Start a server with a fresh self-signed certificate.
    pub async fn start() -> Result<Self> {
        let certificate = CertificateBuilder::new("localhost")
            .organization("certgate tests")
            .add_san_dns("localhost")
            .add_san_ip("127.0.0.1")
            .generate_self_signed()
            .map_err(|e| anyhow!("failed to generate certificate: {}", e))?;

        Self::start_with(certificate).await
    }

    /// Start a server presenting `certificate`, which must carry its key.
    pub async fn start_with(certificate: Certificate) -> Result<Self> {
        let key_der = certificate
            .key_der
            .clone()
            .context("certificate has no private key")?;

        let mut server_config = rustls::ServerConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(
            vec![CertificateDer::from(certificate.cert_der.clone())],
            PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_der)),
        )?;
        server_config.alpn_protocols = vec![b"http/1.1".to_vec()];
        let tls = RustlsConfig::from_config(Arc::new(server_config));

        // Find available port
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        drop(listener);

        let app = Router::new()
            .route("/", get(|| async { ROOT_BODY }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(SLOW_DELAY).await;
                    ROOT_BODY
                }),
            )
            .route("/stalled", get(|| async { stalled_body() }));

        let handle = Handle::new();
        let server_handle = handle.clone();
        let task = tokio::spawn(async move {
            axum_server::bind_rustls(addr, tls)
                .handle(server_handle)
                .serve(app.into_make_service())
                .await
                .ok();
        });

        handle
            .listening()
            .await
            .context("test server failed to start")?;

        Ok(Self {
            addr,
            certificate,
            handle,
            task,
        })
    }

    /// Bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `https://127.0.0.1:<port>` followed by `path`.
    pub fn url(&self, path: &str) -> String {
        format!("https://{}{}", self.addr, path)
    }

    /// Certificate the server presents.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Pin matching the presented certificate.
    pub fn pin(&self, algorithm: HashAlgorithm) -> TrustedPin {
        self.certificate.pin(algorithm)
    }
}

/// Body that yields one chunk after the headers and then never completes
fn stalled_body() -> Body {
    let prefix =
        stream::once(async { Ok::<_, Infallible>(Bytes::from_static(STALLED_PREFIX.as_bytes())) });
    Body::from_stream(prefix.chain(stream::pending()))
}

impl Drop for TestHttpsServer {
    fn drop(&mut self) {
        self.handle.shutdown();
        self.task.abort();
    }
}
