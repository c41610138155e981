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
//! Status reporting
//!
//! The executor reports progress to a [`StatusReporter`] it is given, so a
//! front end decides how messages are shown.

use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Kind of status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    /// Progress or a successful result
    Status,
    /// A failed result
    Error,
}

/// Receives human-readable status messages
pub trait StatusReporter: Send + Sync + fmt::Debug {
    /// Show `message`
    fn notify(&self, message: &str, kind: NotifyKind);
}

/// Forwards messages to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Status => tracing::info!(status = message),
            NotifyKind::Error => tracing::warn!(status = message),
        }
    }
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct MemoryReporter {
    messages: Mutex<Vec<(NotifyKind, String)>>,
}

impl MemoryReporter {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages so far, oldest first
    pub fn messages(&self) -> Vec<(NotifyKind, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent message
    pub fn last(&self) -> Option<(NotifyKind, String)> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl StatusReporter for MemoryReporter {
    fn notify(&self, message: &str, kind: NotifyKind) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, message.to_string()));
    }
}
