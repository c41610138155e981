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
//! Console status reporter

use crate::output;
use certgate_client::{NotifyKind, StatusReporter, CANCELED_MESSAGE, SUCCESS_MESSAGE};

/// Shows executor status messages on the console
///
/// Errors are always printed; progress is dropped in quiet mode.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl StatusReporter for ConsoleReporter {
    fn notify(&self, message: &str, kind: NotifyKind) {
        match kind {
            NotifyKind::Error => output::error(message),
            NotifyKind::Status if self.quiet => {}
            NotifyKind::Status if message == SUCCESS_MESSAGE => output::success(message),
            NotifyKind::Status if message == CANCELED_MESSAGE => output::warning(message),
            NotifyKind::Status => output::progress(message),
        }
    }
}
