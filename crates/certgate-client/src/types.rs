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
//! Request, response and result types shared by transports and the executor

use crate::error::RequestError;
use certgate_tls::ChainError;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// Status shown when a response was received
pub const SUCCESS_MESSAGE: &str =
    "Success - response received from server. Server certificate was valid.";
/// Status shown while a request runs
pub const IN_PROGRESS_MESSAGE: &str = "In progress";
/// Status shown for a malformed target URI
pub const INVALID_URI_MESSAGE: &str = "Invalid URI.";
/// Status shown after cancellation
pub const CANCELED_MESSAGE: &str = "Request canceled.";

/// How a transport may read from its response cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheReadBehavior {
    /// Transport decides
    #[default]
    Default,
    /// Revalidate any cached response with the server
    MostRecent,
    /// Never answer from cache
    NoCache,
}

/// How a transport may write to its response cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheWriteBehavior {
    /// Transport decides
    #[default]
    Default,
    /// Never store responses
    NoCache,
}

/// Per-request cache settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheControl {
    /// Read behaviour
    pub read: CacheReadBehavior,
    /// Write behaviour
    pub write: CacheWriteBehavior,
}

impl CacheControl {
    /// Neither read from nor write to any cache
    pub fn no_cache() -> Self {
        Self {
            read: CacheReadBehavior::NoCache,
            write: CacheWriteBehavior::NoCache,
        }
    }

    /// Whether both directions bypass the cache
    pub fn is_no_cache(&self) -> bool {
        self.read == CacheReadBehavior::NoCache && self.write == CacheWriteBehavior::NoCache
    }

    /// `Cache-Control` request header value, if any
    pub fn header_value(&self) -> Option<String> {
        let mut directives = Vec::new();
        match self.read {
            CacheReadBehavior::Default => {}
            CacheReadBehavior::MostRecent => directives.push("max-age=0"),
            CacheReadBehavior::NoCache => directives.push("no-cache"),
        }
        if self.write == CacheWriteBehavior::NoCache {
            directives.push("no-store");
        }

        if directives.is_empty() {
            None
        } else {
            Some(directives.join(", "))
        }
    }
}

/// A request handed to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Absolute http(s) target
    pub url: Url,
}

impl TransportRequest {
    /// GET `url`
    pub fn get(url: Url) -> Self {
        Self { url }
    }
}

/// Structured error codes a transport reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    /// The registered validator rejected the server certificate
    ServerCertificateRejected,
    /// Platform chain validation failed with an error that was not suppressed
    CertificateChain(ChainError),
    /// The connection could not be established
    ConnectionFailed,
    /// The connect or request timeout elapsed
    Timeout,
    /// The server sent something that is not valid HTTP
    Protocol,
    /// Anything else
    Other,
}

impl fmt::Display for TransportErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorCode::ServerCertificateRejected => {
                f.write_str("server-certificate-rejected")
            }
            TransportErrorCode::CertificateChain(kind) => write!(f, "certificate-chain: {}", kind),
            TransportErrorCode::ConnectionFailed => f.write_str("connection-failed"),
            TransportErrorCode::Timeout => f.write_str("timeout"),
            TransportErrorCode::Protocol => f.write_str("protocol"),
            TransportErrorCode::Other => f.write_str("other"),
        }
    }
}

/// Transport failure with its detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    /// Structured code
    pub code: TransportErrorCode,
    /// Human-readable detail
    pub detail: String,
}

impl TransportFailure {
    /// Create a failure
    pub fn new(code: TransportErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.detail)
    }
}

/// What a transport send produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// A response was received
    Completed {
        /// HTTP status code
        status: u16,
    },
    /// The request failed
    Failed(TransportFailure),
    /// The cancellation token fired before the request completed
    Canceled,
}

/// Summary of a received response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSummary {
    /// Requested URL
    pub url: Url,
    /// HTTP status code
    pub status: u16,
    /// Time from send to response
    pub elapsed: Duration,
}

/// Discriminated result of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestResult {
    /// A response was received
    Success(ResponseSummary),
    /// The request failed
    Failure(RequestError),
    /// The request was canceled
    Canceled,
}

impl RequestResult {
    /// Whether a response was received
    pub fn is_success(&self) -> bool {
        matches!(self, RequestResult::Success(_))
    }

    /// The error, for failures
    pub fn error(&self) -> Option<&RequestError> {
        match self {
            RequestResult::Failure(e) => Some(e),
            _ => None,
        }
    }

    /// Human-readable status line
    pub fn status_message(&self) -> String {
        match self {
            RequestResult::Success(_) => SUCCESS_MESSAGE.to_string(),
            RequestResult::Failure(RequestError::InvalidInput(_)) => {
                INVALID_URI_MESSAGE.to_string()
            }
            RequestResult::Failure(e) => e.to_string(),
            RequestResult::Canceled => CANCELED_MESSAGE.to_string(),
        }
    }
}
