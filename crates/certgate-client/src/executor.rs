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
//! Request executor
//!
//! Issues one cancellable GET at a time through a [`Transport`], with the
//! validation callback registered only for the lifetime of that request.
//!
//! ```text
//! Idle -> Running -> {Completed, Failed, Canceled} -> Idle
//! ```

use crate::error::RequestError;
use crate::status::{NotifyKind, StatusReporter};
use crate::transport::{Transport, ValidationRegistration};
use crate::types::{
    CacheControl, RequestResult, ResponseSummary, TransportErrorCode, TransportOutcome,
    TransportRequest, CANCELED_MESSAGE, INVALID_URI_MESSAGE, IN_PROGRESS_MESSAGE, SUCCESS_MESSAGE,
};
use crate::uri::parse_http_uri;
use certgate_tls::{CertificateGate, IgnorableErrorSet, ValidationPolicy};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`RequestExecutor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// Ready for a request
    Idle,
    /// A request is in flight
    Running,
    /// The last request received a response
    Completed,
    /// The last request failed
    Failed,
    /// The last request was canceled
    Canceled,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutorState::Idle => "idle",
            ExecutorState::Running => "running",
            ExecutorState::Completed => "completed",
            ExecutorState::Failed => "failed",
            ExecutorState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// Replaceable cancellation token
///
/// Clones share the same slot, so one clone can cancel a request another is
/// running.
#[derive(Debug, Clone, Default)]
pub struct CancelSource {
    current: Arc<Mutex<CancellationToken>>,
}

impl CancelSource {
    /// Create a source with a fresh token
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the next request
    pub fn token(&self) -> CancellationToken {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the current token and install a fresh one
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.cancel();
        *current = CancellationToken::new();
    }

    /// Install a fresh token if the current one was cancelled
    pub fn renew_if_cancelled(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.is_cancelled() {
            *current = CancellationToken::new();
        }
    }
}

#[derive(Debug)]
struct StateCell {
    current: ExecutorState,
    last_terminal: Option<ExecutorState>,
}

/// Holds the executor in `Running`; dropping it returns to `Idle`
struct RunGuard<'a> {
    state: &'a Mutex<StateCell>,
    cancel: &'a CancelSource,
    terminal: ExecutorState,
}

impl<'a> RunGuard<'a> {
    fn begin(state: &'a Mutex<StateCell>, cancel: &'a CancelSource) -> Option<Self> {
        let mut cell = state.lock().unwrap_or_else(PoisonError::into_inner);
        if cell.current != ExecutorState::Idle {
            return None;
        }
        cell.current = ExecutorState::Running;
        Some(Self {
            state,
            cancel,
            // A future dropped before finishing counts as canceled
            terminal: ExecutorState::Canceled,
        })
    }

    fn finish(&mut self, terminal: ExecutorState) {
        self.terminal = terminal;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut cell = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(from = %ExecutorState::Running, to = %self.terminal, "Request settled");
        cell.last_terminal = Some(self.terminal);
        cell.current = ExecutorState::Idle;
        self.cancel.renew_if_cancelled();
    }
}

/// Issues gated requests and reports their status
#[derive(Debug)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    gate: Arc<CertificateGate>,
    reporter: Arc<dyn StatusReporter>,
    cancel: CancelSource,
    state: Mutex<StateCell>,
}

impl RequestExecutor {
    /// Create an executor
    pub fn new(
        transport: Arc<dyn Transport>,
        gate: CertificateGate,
        reporter: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            transport,
            gate: Arc::new(gate),
            reporter,
            cancel: CancelSource::new(),
            state: Mutex::new(StateCell {
                current: ExecutorState::Idle,
                last_terminal: None,
            }),
        }
    }

    /// Set the policy and ignorable errors for subsequent requests
    pub fn configure(&mut self, policy: ValidationPolicy, ignorable: IgnorableErrorSet) {
        Arc::make_mut(&mut self.gate).configure(policy, ignorable);
    }

    /// The gate requests are validated with
    pub fn gate(&self) -> &CertificateGate {
        &self.gate
    }

    /// Handle that cancels the in-flight request
    pub fn cancel_source(&self) -> CancelSource {
        self.cancel.clone()
    }

    /// Cancel the in-flight request, if any
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExecutorState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
    }

    /// Terminal state of the most recent request
    pub fn last_terminal_state(&self) -> Option<ExecutorState> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_terminal
    }

    /// GET `uri`, cancellable through [`cancel`](Self::cancel)
    pub async fn execute(&self, uri: &str) -> RequestResult {
        let token = self.cancel.token();
        self.execute_with(uri, token).await
    }

    /// GET `uri`, cancellable through `token`
    pub async fn execute_with(&self, uri: &str, token: CancellationToken) -> RequestResult {
        let Some(mut run) = RunGuard::begin(&self.state, &self.cancel) else {
            warn!(uri, "Request rejected, another one is in progress");
            let error = RequestError::Busy;
            self.reporter.notify(&error.to_string(), NotifyKind::Error);
            return RequestResult::Failure(error);
        };

        let url = match parse_http_uri(uri) {
            Ok(url) => url,
            Err(error) => {
                debug!(uri, error = %error, "Rejected target URI");
                self.reporter.notify(INVALID_URI_MESSAGE, NotifyKind::Error);
                run.finish(ExecutorState::Failed);
                return RequestResult::Failure(error);
            }
        };

        self.reporter.notify(IN_PROGRESS_MESSAGE, NotifyKind::Status);
        info!(url = %url, policy = %self.gate.policy(), "Starting request");

        self.transport.set_cache_control(CacheControl::no_cache());
        let started = Instant::now();
        let outcome = {
            let _registration = ValidationRegistration::acquire(self.transport.as_ref(), &self.gate);
            self.transport
                .send(TransportRequest::get(url.clone()), &token)
                .await
        };

        let (result, terminal) = match outcome {
            TransportOutcome::Completed { status } => {
                info!(url = %url, status, "Response received");
                self.reporter.notify(SUCCESS_MESSAGE, NotifyKind::Status);
                let summary = ResponseSummary {
                    url,
                    status,
                    elapsed: started.elapsed(),
                };
                (RequestResult::Success(summary), ExecutorState::Completed)
            }
            TransportOutcome::Failed(failure) => {
                let error = match failure.code {
                    TransportErrorCode::ServerCertificateRejected => RequestError::ValidationFailed,
                    code => RequestError::Transport {
                        code,
                        detail: failure.detail,
                    },
                };
                warn!(url = %url, error = %error, "Request failed");
                self.reporter.notify(&error.to_string(), NotifyKind::Error);
                (RequestResult::Failure(error), ExecutorState::Failed)
            }
            TransportOutcome::Canceled => {
                info!(url = %url, "Request canceled");
                self.reporter.notify(CANCELED_MESSAGE, NotifyKind::Status);
                (RequestResult::Canceled, ExecutorState::Canceled)
            }
        };

        run.finish(terminal);
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_source_replaces_token() {
        let source = CancelSource::new();
        let first = source.token();
        source.cancel();
        assert!(first.is_cancelled());
        assert!(!source.token().is_cancelled());
    }

    #[test]
    fn test_clones_share_slot() {
        let source = CancelSource::new();
        let handle = source.clone();
        let token = source.token();
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_renew_keeps_live_token() {
        let source = CancelSource::new();
        let token = source.token();
        source.renew_if_cancelled();
        token.cancel();
        assert!(source.token().is_cancelled());
        source.renew_if_cancelled();
        assert!(!source.token().is_cancelled());
    }

    #[test]
    fn test_run_guard_is_exclusive() {
        let state = Mutex::new(StateCell {
            current: ExecutorState::Idle,
            last_terminal: None,
        });
        let cancel = CancelSource::new();

        let mut run = RunGuard::begin(&state, &cancel).unwrap();
        assert!(RunGuard::begin(&state, &cancel).is_none());
        run.finish(ExecutorState::Completed);
        drop(run);

        let cell = state.lock().unwrap();
        assert_eq!(cell.current, ExecutorState::Idle);
        assert_eq!(cell.last_terminal, Some(ExecutorState::Completed));
    }

    #[test]
    fn test_invalid_uri_never_reaches_transport() {
        use crate::mock::{MockServer, MockTransport};
        use crate::status::MemoryReporter;

        let transport = MockTransport::new(MockServer::new(b"leaf".to_vec()));
        let reporter = Arc::new(MemoryReporter::new());
        let executor = RequestExecutor::new(
            Arc::new(transport.clone()),
            CertificateGate::platform_only(),
            Arc::clone(&reporter) as Arc<dyn StatusReporter>,
        );

        let result = tokio_test::block_on(executor.execute("not a uri"));
        assert!(matches!(
            result,
            RequestResult::Failure(RequestError::InvalidInput(_))
        ));
        assert_eq!(transport.send_count(), 0);
        assert_eq!(executor.last_terminal_state(), Some(ExecutorState::Failed));
        assert_eq!(
            reporter.last(),
            Some((NotifyKind::Error, INVALID_URI_MESSAGE.to_string()))
        );
    }

    #[test]
    fn test_abandoned_run_counts_as_canceled() {
        let state = Mutex::new(StateCell {
            current: ExecutorState::Idle,
            last_terminal: None,
        });
        let cancel = CancelSource::new();
        drop(RunGuard::begin(&state, &cancel));
        assert_eq!(
            state.lock().unwrap().last_terminal,
            Some(ExecutorState::Canceled)
        );
    }
}
