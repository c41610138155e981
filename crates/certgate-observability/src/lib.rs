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
//! Structured logging for certgate
//!
//! Wraps `tracing-subscriber` with pretty, compact, and JSON output. The
//! other crates log through `tracing` with structured fields such as the
//! validation policy, handshake verdict, and certificate fingerprint.
//!
//! # Example
//!
//! ```ignore
//! use certgate_observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Compact, Some("debug"))?;
//! tracing::info!(policy = "platform-default", "Starting request");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
