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
//! Trust anchors for platform-default chain validation

use super::{TlsError, TlsResult};
use rustls::pki_types::CertificateDer;
use rustls::RootCertStore;
use std::path::Path;
use tracing::debug;

/// Root certificates the platform verifier trusts
#[derive(Debug, Clone)]
pub struct TrustAnchors {
    include_webpki_roots: bool,
    extra: Vec<CertificateDer<'static>>,
}

impl Default for TrustAnchors {
    fn default() -> Self {
        Self::webpki()
    }
}

impl TrustAnchors {
    /// Mozilla's root program, as bundled by `webpki-roots`
    pub fn webpki() -> Self {
        Self {
            include_webpki_roots: true,
            extra: Vec::new(),
        }
    }

    /// No roots at all; add some before building a verifier
    pub fn empty() -> Self {
        Self {
            include_webpki_roots: false,
            extra: Vec::new(),
        }
    }

    /// Trust an additional DER-encoded root
    pub fn add_der(&mut self, der: impl Into<Vec<u8>>) -> &mut Self {
        self.extra.push(CertificateDer::from(der.into()));
        self
    }

    /// Trust every certificate in a PEM bundle, returning how many were added
    pub fn add_pem(&mut self, pem: &[u8]) -> TlsResult<usize> {
        let mut reader = pem;
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TlsError::CertificateLoading(e.to_string()))?;

        if certs.is_empty() {
            return Err(TlsError::CertificateLoading(
                "no certificates found in PEM data".to_string(),
            ));
        }

        let added = certs.len();
        self.extra.extend(certs);
        Ok(added)
    }

    /// Trust every certificate in a PEM file
    pub fn add_pem_file<P: AsRef<Path>>(&mut self, path: P) -> TlsResult<usize> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            TlsError::CertificateLoading(format!("{}: {}", path.display(), e))
        })?;
        let added = self.add_pem(&pem)?;
        debug!(path = %path.display(), added, "Loaded extra trust anchors");
        Ok(added)
    }

    /// Number of extra roots on top of the bundled ones
    pub fn extra_count(&self) -> usize {
        self.extra.len()
    }

    /// Build a rustls root store
    pub fn root_store(&self) -> TlsResult<RootCertStore> {
        let mut store = RootCertStore::empty();

        if self.include_webpki_roots {
            store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        }

        for der in &self.extra {
            store
                .add(der.clone())
                .map_err(|e| TlsError::CertificateLoading(format!("invalid trust anchor: {}", e)))?;
        }

        if store.is_empty() {
            return Err(TlsError::Verifier("no trust anchors configured".to_string()));
        }

        Ok(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_webpki_roots_are_loaded() {
        let store = TrustAnchors::webpki().root_store().unwrap();
        assert!(store.len() > 100);
    }

    #[test]
    fn test_empty_anchors_are_rejected() {
        assert!(TrustAnchors::empty().root_store().is_err());
    }

    #[test]
    fn test_pem_without_certificates() {
        let mut anchors = TrustAnchors::empty();
        assert!(anchors.add_pem(b"not a pem bundle").is_err());
        assert_eq!(anchors.extra_count(), 0);
    }

    #[test]
    fn test_missing_pem_file() {
        let mut anchors = TrustAnchors::webpki();
        let err = anchors.add_pem_file("/definitely/not/here.pem").unwrap_err();
        assert!(matches!(err, TlsError::CertificateLoading(_)));
    }
}
