//! Diagnostics pipeline integration tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use pharmrep_core::api::{
    ApiClient, ApiRequest, HttpMethod, HttpTransport, MockTransport, RawResponse, TransportError,
};
use pharmrep_core::config::ApiConfig;
use pharmrep_core::diagnostics::{
    DiagnosticsBoard, DiagnosticsError, DiagnosticsRunner, PROBE_CONFIGURATION,
    PROBE_CONNECTIVITY, PROBE_CREDENTIAL, PROBE_SERVER_STATUS, PROBE_SUBJECT_LOOKUP,
};
use pharmrep_core::models::TestStatus;
use serde_json::json;

fn client(mock: MockTransport, token: Option<&str>) -> ApiClient {
    ApiClient::new(ApiConfig::new("http://crm.test/api"), Arc::new(mock))
        .with_token(token.map(String::from))
}

fn healthy() -> MockTransport {
    MockTransport::new().respond(HttpMethod::Get, "/health", 200, json!({"status": "ok"}))
}

#[test]
fn test_probe_order_without_subject() {
    let client = client(healthy(), Some("token-abc"));
    let results = DiagnosticsRunner::new(&client).run(None);

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![PROBE_CONFIGURATION, PROBE_CREDENTIAL, PROBE_CONNECTIVITY, PROBE_SERVER_STATUS]
    );
    assert!(results.iter().all(|r| r.status == TestStatus::Success));
}

#[test]
fn test_probe_order_with_subject() {
    let mock = healthy().respond(
        HttpMethod::Get,
        "/users/u-7",
        200,
        json!({"success": true, "data": {"id": "u-7", "fullName": "Mona Adel"}}),
    );
    let client = client(mock, Some("token-abc"));
    let results = DiagnosticsRunner::new(&client).run(Some("u-7"));

    assert_eq!(results.len(), 5);
    assert_eq!(results[3].name, PROBE_SUBJECT_LOOKUP);
    assert_eq!(results[3].status, TestStatus::Success);
    assert!(results[3].message.contains("Mona Adel"));
    assert_eq!(results[4].name, PROBE_SERVER_STATUS);
}

#[test]
fn test_configuration_reports_settings() {
    let client = client(healthy(), None);
    let results = DiagnosticsRunner::new(&client).run(None);

    let config = &results[0];
    assert_eq!(config.status, TestStatus::Success);
    assert!(config.message.contains("http://crm.test/api"));
    let details = config.details.as_ref().unwrap();
    assert_eq!(details["timeoutMs"], 30_000);
    assert_eq!(details["withCredentials"], true);
}

#[test]
fn test_missing_credential_is_error_but_run_continues() {
    let client = client(healthy(), None);
    let results = DiagnosticsRunner::new(&client).run(None);

    assert_eq!(results[1].status, TestStatus::Error);
    assert_eq!(results[2].status, TestStatus::Success);
    assert_eq!(results[3].status, TestStatus::Success);
}

#[test]
fn test_credential_override() {
    let client = client(healthy(), None);
    let results = DiagnosticsRunner::new(&client)
        .with_credential(Some("stored-token-123".into()))
        .run(None);

    assert_eq!(results[1].status, TestStatus::Success);
    let details = results[1].details.as_ref().unwrap();
    assert_eq!(details["tokenLength"], 16);
}

#[test]
fn test_connectivity_reports_elapsed_time() {
    let client = client(healthy(), Some("t"));
    let results = DiagnosticsRunner::new(&client).run(None);

    let connectivity = &results[2];
    assert!(connectivity.message.starts_with("Server responded in "));
    assert!(connectivity.message.ends_with("ms"));
    assert_eq!(connectivity.details.as_ref().unwrap()["response"]["status"], "ok");
}

#[test]
fn test_connectivity_uses_short_timeout() {
    let mock = Arc::new(healthy());
    let client = ApiClient::new(ApiConfig::default(), mock.clone());
    DiagnosticsRunner::new(&client).run(None);

    let timeouts: Vec<u64> = mock
        .requests()
        .iter()
        .filter_map(|r| r.timeout.map(|t| t.as_secs()))
        .collect();
    assert_eq!(timeouts, vec![5, 10]);
}

#[test]
fn test_missing_health_endpoint_is_warning() {
    let mock = MockTransport::new().respond(
        HttpMethod::Get,
        "/health",
        404,
        json!({"message": "Cannot GET /api/health"}),
    );
    let client = client(mock, Some("t"));
    let results = DiagnosticsRunner::new(&client).run(None);

    assert_eq!(results[2].status, TestStatus::Error);
    assert_eq!(results[3].status, TestStatus::Warning);
    assert!(results[3].message.contains("404"));
}

#[test]
fn test_server_status_timeout_message() {
    let mock = MockTransport::new().fail(
        HttpMethod::Get,
        "/health",
        TransportError::Timeout("deadline elapsed".into()),
    );
    let client = client(mock, Some("t"));
    let results = DiagnosticsRunner::new(&client).run(None);

    assert_eq!(results[2].message, "Connection timed out after 5s");
    assert_eq!(results[3].status, TestStatus::Error);
    assert_eq!(results[3].message, "Server status check timed out after 10s");
    assert_eq!(results[3].details.as_ref().unwrap()["kind"], "timeout");
}

#[test]
fn test_unreachable_server() {
    let client = client(MockTransport::new(), Some("t"));
    let results = DiagnosticsRunner::new(&client).run(Some("u-1"));

    assert_eq!(results.len(), 5);
    assert!(results[2].message.starts_with("Cannot reach server"));
    assert!(results[2..].iter().all(|r| r.status == TestStatus::Error));
}

#[test]
fn test_unknown_subject() {
    let mock = healthy().respond(
        HttpMethod::Get,
        "/users/ghost",
        404,
        json!({"message": "User not found"}),
    );
    let client = client(mock, Some("t"));
    let results = DiagnosticsRunner::new(&client).run(Some("ghost"));

    assert_eq!(results[3].status, TestStatus::Error);
    assert!(results[3].message.contains("404"));
}

#[test]
fn test_observer_sees_growing_prefixes() {
    let client = client(healthy(), Some("t"));
    let mut seen = Vec::new();
    let results = DiagnosticsRunner::new(&client).run_with(Some("u-1"), |partial| {
        seen.push(partial.to_vec());
    });

    assert_eq!(seen.len(), results.len());
    for (i, partial) in seen.iter().enumerate() {
        assert_eq!(partial.len(), i + 1);
        assert_eq!(partial.as_slice(), &results[..i + 1]);
    }
}

#[test]
fn test_board_publishes_final_list() {
    let board = DiagnosticsBoard::new();
    assert!(board.snapshot().is_empty());

    let client = client(healthy(), Some("t"));
    let runner = DiagnosticsRunner::new(&client);
    let results = board.run(&runner, None).unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(*board.snapshot(), *results);
    assert!(!board.is_running());

    // A second run replaces the list
    let results = board.run(&runner, Some("u-9")).unwrap();
    assert_eq!(board.snapshot().len(), results.len());
}

/// Blocks the first request until the test releases it.
struct GatedTransport {
    inner: MockTransport,
    gated: AtomicBool,
    started: Barrier,
    release: Barrier,
}

impl HttpTransport for GatedTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        if !self.gated.swap(true, Ordering::SeqCst) {
            self.started.wait();
            self.release.wait();
        }
        self.inner.send(request)
    }
}

#[test]
fn test_board_rejects_reentrant_run() {
    let gate = Arc::new(GatedTransport {
        inner: healthy(),
        gated: AtomicBool::new(false),
        started: Barrier::new(2),
        release: Barrier::new(2),
    });
    let slow_client = ApiClient::new(ApiConfig::default(), gate.clone()).with_token(Some("t".into()));
    let fast_client = client(healthy(), Some("t"));
    let board = DiagnosticsBoard::new();

    let outcome = std::thread::scope(|scope| {
        let handle = scope.spawn(|| board.run(&DiagnosticsRunner::new(&slow_client), None));

        // First request is the connectivity probe; two results are already published
        gate.started.wait();
        assert!(board.is_running());
        assert_eq!(board.snapshot().len(), 2);

        let second = board.run(&DiagnosticsRunner::new(&fast_client), None);
        assert!(matches!(second, Err(DiagnosticsError::AlreadyRunning)));

        gate.release.wait();
        handle.join().unwrap()
    });

    assert_eq!(outcome.unwrap().len(), 4);
    assert!(!board.is_running());
    assert_eq!(board.snapshot().len(), 4);
}
