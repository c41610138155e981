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
//! Request error types

use crate::types::TransportErrorCode;
use certgate_tls::TlsError;
use thiserror::Error;

/// Why a request did not produce a response
///
/// Cancellation is not an error and is reported through
/// [`RequestResult::Canceled`](crate::RequestResult::Canceled).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The target was not an absolute http(s) URI; nothing was sent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The validation callback rejected the server certificate
    #[error("validation failed")]
    ValidationFailed,

    /// Network or TLS failure unrelated to the validation callback
    #[error("transport error ({code}): {detail}")]
    Transport {
        /// Structured error code supplied by the transport
        code: TransportErrorCode,
        /// Transport-supplied detail
        detail: String,
    },

    /// Another request is already running on this executor
    #[error("a request is already in progress")]
    Busy,
}

impl RequestError {
    /// Create an InvalidInput error
    pub fn invalid_input<S: Into<String>>(reason: S) -> Self {
        RequestError::InvalidInput(reason.into())
    }

    /// Whether this is a local input error
    pub fn is_input_error(&self) -> bool {
        matches!(self, RequestError::InvalidInput(_))
    }
}

/// Errors building a transport
#[derive(Error, Debug)]
pub enum ClientError {
    /// Certificate or verifier setup failed
    #[error(transparent)]
    Tls(#[from] TlsError),

    /// The HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    Http(String),
}

/// Result alias for transport construction
pub type ClientResult<T> = Result<T, ClientError>;
