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
//! # certgate Test Utilities
//!
//! Shared test utilities for certgate crates providing:
//! - A local HTTPS server presenting a self-signed certificate
//! - CLI command helpers for testing the certgate binary
//! - Certificate and configuration fixtures

pub mod cli;
pub mod fixtures;
pub mod server;

// Re-export commonly used items at crate root
pub use cli::{certgate, CertgateCommand};
pub use fixtures::{TestFixtures, SAMPLE_PIN};
pub use predicates;
pub use server::{TestHttpsServer, ROOT_BODY, SLOW_DELAY, STALLED_PREFIX};
