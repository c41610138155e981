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
#![allow(clippy::unwrap_used)]
//! Executor behaviour against the in-memory transport
//!
//! Covers input validation, cancellation and reuse, policy scoping across
//! requests, and the mapping of transport outcomes to request results.

use certgate_client::mock::{MockServer, MockTransport};
use certgate_client::{
    ExecutorState, MemoryReporter, NotifyKind, RequestError, RequestExecutor, RequestResult,
    StatusReporter, TransportErrorCode, TransportFailure, CANCELED_MESSAGE, INVALID_URI_MESSAGE,
    IN_PROGRESS_MESSAGE, SUCCESS_MESSAGE,
};
use certgate_tls::{
    CertificateGate, ChainError, HashAlgorithm, IgnorableErrorSet, TrustedPin, ValidationPolicy,
};
use std::sync::Arc;
use std::time::Duration;

const LEAF: &[u8] = b"server leaf certificate";
const TARGET: &str = "https://www.example.com/";

struct Harness {
    transport: MockTransport,
    reporter: Arc<MemoryReporter>,
    executor: RequestExecutor,
}

fn harness(server: MockServer, pinned: &[u8]) -> Harness {
    let transport = MockTransport::new(server);
    let reporter = Arc::new(MemoryReporter::new());
    let gate = CertificateGate::pinned(TrustedPin::for_certificate(HashAlgorithm::Sha1, pinned));
    let executor = RequestExecutor::new(
        Arc::new(transport.clone()),
        gate,
        Arc::clone(&reporter) as Arc<dyn StatusReporter>,
    );
    Harness {
        transport,
        reporter,
        executor,
    }
}

fn untrusted_server() -> MockServer {
    MockServer::new(LEAF.to_vec())
        .with_chain_errors(&[ChainError::Untrusted, ChainError::InvalidName])
}

fn ignore_untrusted_and_name() -> IgnorableErrorSet {
    IgnorableErrorSet::parse_list("untrusted,invalid-name").unwrap()
}

#[tokio::test]
async fn test_malformed_uri_is_input_error_without_send() {
    let h = harness(MockServer::new(LEAF.to_vec()), LEAF);

    let result = h.executor.execute("not a uri").await;

    assert!(matches!(
        result,
        RequestResult::Failure(RequestError::InvalidInput(_))
    ));
    assert_eq!(h.transport.send_count(), 0);
    assert_eq!(
        h.reporter.last(),
        Some((NotifyKind::Error, INVALID_URI_MESSAGE.to_string()))
    );
    assert_eq!(h.executor.state(), ExecutorState::Idle);
    assert_eq!(h.executor.last_terminal_state(), Some(ExecutorState::Failed));
}

#[tokio::test]
async fn test_matching_pin_succeeds_with_ignored_errors() {
    let mut h = harness(untrusted_server(), LEAF);
    h.executor.configure(
        ValidationPolicy::IgnoredErrorsPlusCustom,
        ignore_untrusted_and_name(),
    );

    let result = h.executor.execute(TARGET).await;

    assert!(result.is_success(), "unexpected result: {:?}", result);
    assert_eq!(h.executor.gate().invocation_count(), 1);
    let messages: Vec<String> = h.reporter.messages().into_iter().map(|(_, m)| m).collect();
    assert_eq!(messages, vec![IN_PROGRESS_MESSAGE, SUCCESS_MESSAGE]);
}

#[tokio::test]
async fn test_mismatched_pin_is_validation_failure() {
    let mut h = harness(untrusted_server(), b"some other certificate");
    h.executor.configure(
        ValidationPolicy::IgnoredErrorsPlusCustom,
        ignore_untrusted_and_name(),
    );

    let result = h.executor.execute(TARGET).await;

    assert_eq!(result, RequestResult::Failure(RequestError::ValidationFailed));
    assert_eq!(result.status_message(), "validation failed");
    assert_eq!(h.executor.last_terminal_state(), Some(ExecutorState::Failed));
}

#[tokio::test]
async fn test_platform_default_never_invokes_callback() {
    let h = harness(MockServer::new(LEAF.to_vec()), LEAF);

    let result = h.executor.execute(TARGET).await;

    assert!(result.is_success());
    assert_eq!(h.executor.gate().invocation_count(), 0);
    assert!(!h.transport.sends()[0].validator_registered);
}

#[tokio::test]
async fn test_platform_default_reports_chain_error() {
    let h = harness(untrusted_server(), LEAF);

    let result = h.executor.execute(TARGET).await;

    match result {
        RequestResult::Failure(RequestError::Transport { code, .. }) => {
            assert_eq!(code, TransportErrorCode::CertificateChain(ChainError::Untrusted))
        }
        other => panic!("expected a chain failure, got {:?}", other),
    }
    assert_eq!(h.executor.gate().invocation_count(), 0);
}

#[tokio::test]
async fn test_ignorable_errors_unused_without_matching_policy() {
    let mut h = harness(untrusted_server(), LEAF);
    h.executor.configure(
        ValidationPolicy::PlatformDefaultPlusCustom,
        ignore_untrusted_and_name(),
    );

    let result = h.executor.execute(TARGET).await;

    assert!(matches!(
        result,
        RequestResult::Failure(RequestError::Transport { .. })
    ));
    assert!(h.transport.sends()[0].ignorable.is_empty());
    assert_eq!(h.executor.gate().invocation_count(), 0);
}

#[tokio::test]
async fn test_no_policy_leakage_across_requests() {
    let mut h = harness(untrusted_server(), LEAF);
    h.executor.configure(
        ValidationPolicy::IgnoredErrorsPlusCustom,
        ignore_untrusted_and_name(),
    );
    assert!(h.executor.execute(TARGET).await.is_success());
    assert_eq!(h.executor.gate().invocation_count(), 1);
    assert!(!h.transport.has_validator());

    h.executor
        .configure(ValidationPolicy::PlatformDefault, IgnorableErrorSet::new());
    h.transport.set_server(MockServer::new(LEAF.to_vec()));
    assert!(h.executor.execute(TARGET).await.is_success());

    let sends = h.transport.sends();
    assert_eq!(sends.len(), 2);
    assert!(sends[0].validator_registered);
    assert!(!sends[1].validator_registered);
    assert!(sends[1].ignorable.is_empty());
    assert_eq!(h.executor.gate().invocation_count(), 1);
}

#[tokio::test]
async fn test_every_request_disables_cache() {
    let h = harness(MockServer::new(LEAF.to_vec()), LEAF);
    h.executor.execute(TARGET).await;
    assert!(h.transport.sends()[0].cache.is_no_cache());
}

#[tokio::test]
async fn test_cancel_then_reuse() {
    let h = harness(
        MockServer::new(LEAF.to_vec()).with_latency(Duration::from_secs(30)),
        LEAF,
    );
    let cancel = h.executor.cancel_source();

    let (result, _) = tokio::join!(h.executor.execute(TARGET), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    assert_eq!(result, RequestResult::Canceled);
    assert_eq!(h.executor.last_terminal_state(), Some(ExecutorState::Canceled));
    assert_eq!(
        h.reporter.last(),
        Some((NotifyKind::Status, CANCELED_MESSAGE.to_string()))
    );
    assert!(!h.transport.has_validator());

    h.transport.set_server(MockServer::new(LEAF.to_vec()));
    let result = h.executor.execute(TARGET).await;
    assert!(result.is_success(), "executor not reusable: {:?}", result);
}

#[tokio::test]
async fn test_explicit_token_cancellation() {
    let h = harness(
        MockServer::new(LEAF.to_vec()).with_latency(Duration::from_secs(30)),
        LEAF,
    );
    let token = tokio_util::sync::CancellationToken::new();
    token.cancel();

    let result = h.executor.execute_with(TARGET, token).await;
    assert_eq!(result, RequestResult::Canceled);
}

#[tokio::test]
async fn test_concurrent_execute_is_busy() {
    let h = harness(
        MockServer::new(LEAF.to_vec()).with_latency(Duration::from_millis(200)),
        LEAF,
    );

    let (first, second) = tokio::join!(h.executor.execute(TARGET), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.executor.execute(TARGET).await
    });

    assert!(first.is_success());
    assert_eq!(second, RequestResult::Failure(RequestError::Busy));
    assert_eq!(h.transport.send_count(), 1);
}

#[tokio::test]
async fn test_transport_failure_keeps_detail() {
    let failure = TransportFailure::new(TransportErrorCode::ConnectionFailed, "host unreachable");
    let h = harness(MockServer::new(LEAF.to_vec()).with_failure(failure), LEAF);

    let result = h.executor.execute(TARGET).await;

    assert_eq!(
        result,
        RequestResult::Failure(RequestError::Transport {
            code: TransportErrorCode::ConnectionFailed,
            detail: "host unreachable".to_string(),
        })
    );
    assert_eq!(
        h.reporter.last(),
        Some((
            NotifyKind::Error,
            "transport error (connection-failed): host unreachable".to_string()
        ))
    );
}

#[tokio::test]
async fn test_dropped_request_returns_to_idle() {
    let h = harness(
        MockServer::new(LEAF.to_vec()).with_latency(Duration::from_secs(30)),
        LEAF,
    );

    let timed_out = tokio::time::timeout(Duration::from_millis(20), h.executor.execute(TARGET)).await;

    assert!(timed_out.is_err());
    assert_eq!(h.executor.state(), ExecutorState::Idle);
    assert!(!h.transport.has_validator());
}
