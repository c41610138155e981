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
//! Target URI validation

use crate::error::RequestError;
use reqwest::Url;

/// Parse free-text input as an absolute http or https URL with a host
pub fn parse_http_uri(input: &str) -> Result<Url, RequestError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RequestError::invalid_input("URI is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| {
        RequestError::invalid_input(format!("'{}' is not an absolute URI: {}", trimmed, e))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(RequestError::invalid_input(format!(
                "unsupported scheme '{}', expected http or https",
                other
            )))
        }
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(RequestError::invalid_input(format!(
            "'{}' has no host",
            trimmed
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_absolute_https() {
        let url = parse_http_uri("  https://www.example.com/path?q=1 ").unwrap();
        assert_eq!(url.host_str(), Some("www.example.com"));
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_accepts_http_and_ip_hosts() {
        assert!(parse_http_uri("http://127.0.0.1:8080/").is_ok());
        assert!(parse_http_uri("https://[::1]/").is_ok());
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in ["not a uri", "", "   ", "/relative/path", "example.com"] {
            let err = parse_http_uri(input).unwrap_err();
            assert!(err.is_input_error(), "{input:?} should be an input error");
        }
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert!(parse_http_uri("ftp://example.com/").is_err());
        assert!(parse_http_uri("mailto:someone@example.com").is_err());
        assert!(parse_http_uri("file:///etc/hosts").is_err());
    }
}
