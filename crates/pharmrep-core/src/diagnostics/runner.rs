//! Ordered probe pipeline.

use std::time::Duration;

use serde_json::json;

use crate::api::{ApiClient, ApiError};
use crate::config::{CONNECTIVITY_TIMEOUT, SERVER_STATUS_TIMEOUT};
use crate::models::DiagnosticTestResult;

pub const PROBE_CONFIGURATION: &str = "API Configuration";
pub const PROBE_CREDENTIAL: &str = "Authentication Token";
pub const PROBE_CONNECTIVITY: &str = "Server Connectivity";
pub const PROBE_SUBJECT_LOOKUP: &str = "User Lookup";
pub const PROBE_SERVER_STATUS: &str = "Server Status";

/// One step of a diagnostics run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Configuration,
    Credential,
    Connectivity,
    SubjectLookup(String),
    ServerStatus,
}

impl Probe {
    pub fn name(&self) -> &'static str {
        match self {
            Probe::Configuration => PROBE_CONFIGURATION,
            Probe::Credential => PROBE_CREDENTIAL,
            Probe::Connectivity => PROBE_CONNECTIVITY,
            Probe::SubjectLookup(_) => PROBE_SUBJECT_LOOKUP,
            Probe::ServerStatus => PROBE_SERVER_STATUS,
        }
    }
}

/// Probes for a run, in execution order. The subject lookup only runs when
/// a subject ID is supplied.
pub fn plan(subject_id: Option<&str>) -> Vec<Probe> {
    let mut probes = vec![Probe::Configuration, Probe::Credential, Probe::Connectivity];
    if let Some(id) = subject_id.map(str::trim).filter(|id| !id.is_empty()) {
        probes.push(Probe::SubjectLookup(id.to_string()));
    }
    probes.push(Probe::ServerStatus);
    probes
}

/// Runs the probe pipeline against one API client.
pub struct DiagnosticsRunner<'a> {
    client: &'a ApiClient,
    credential: Option<String>,
}

impl<'a> DiagnosticsRunner<'a> {
    /// Runner that checks the client's own token.
    pub fn new(client: &'a ApiClient) -> Self {
        Self {
            client,
            credential: client.token().map(str::to_string),
        }
    }

    /// Check a credential read from somewhere else (e.g., local storage).
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    /// Run every probe and return the results.
    pub fn run(&self, subject_id: Option<&str>) -> Vec<DiagnosticTestResult> {
        self.run_with(subject_id, |_| {})
    }

    /// Run every probe in order, publishing the accumulated list after each one.
    ///
    /// The observer always sees a prefix of the final list. A probe failure
    /// never stops later probes.
    pub fn run_with<F>(&self, subject_id: Option<&str>, mut on_progress: F) -> Vec<DiagnosticTestResult>
    where
        F: FnMut(&[DiagnosticTestResult]),
    {
        let probes = plan(subject_id);
        tracing::info!(probes = probes.len(), "Starting diagnostics");

        let mut results = Vec::with_capacity(probes.len());
        for probe in &probes {
            tracing::debug!(probe = probe.name(), "Running diagnostic probe");
            let result = self.execute(probe);
            tracing::info!(
                probe = result.name.as_str(),
                status = result.status.as_str(),
                message = %result.message,
                "Diagnostic probe finished"
            );
            results.push(result);
            on_progress(&results);
        }
        results
    }

    /// Execute one probe.
    pub fn execute(&self, probe: &Probe) -> DiagnosticTestResult {
        match probe {
            Probe::Configuration => self.check_configuration(),
            Probe::Credential => self.check_credential(),
            Probe::Connectivity => self.check_connectivity(),
            Probe::SubjectLookup(id) => self.check_subject(id),
            Probe::ServerStatus => self.check_server_status(),
        }
    }

    fn check_configuration(&self) -> DiagnosticTestResult {
        let config = self.client.config();
        DiagnosticTestResult::success(
            PROBE_CONFIGURATION,
            format!(
                "Base URL: {}, timeout: {}s, credentials: {}",
                config.base_url,
                config.timeout.as_secs(),
                if config.with_credentials { "included" } else { "omitted" }
            ),
        )
        .with_details(json!({
            "baseUrl": config.base_url,
            "timeoutMs": config.timeout.as_millis() as u64,
            "withCredentials": config.with_credentials,
        }))
    }

    fn check_credential(&self) -> DiagnosticTestResult {
        match self.credential.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => DiagnosticTestResult::success(PROBE_CREDENTIAL, "Authentication token found")
                .with_details(json!({
                    "tokenLength": token.len(),
                    "tokenPreview": token_preview(token),
                })),
            None => DiagnosticTestResult::error(
                PROBE_CREDENTIAL,
                "No authentication token found; log in again",
            ),
        }
    }

    fn check_connectivity(&self) -> DiagnosticTestResult {
        match self.client.health_check(Some(CONNECTIVITY_TIMEOUT)) {
            Ok(report) => DiagnosticTestResult::success(
                PROBE_CONNECTIVITY,
                format!("Server responded in {}ms", report.elapsed_ms),
            )
            .with_details(json!({
                "status": report.status,
                "elapsedMs": report.elapsed_ms,
                "response": report.body,
            })),
            Err(e) => DiagnosticTestResult::error(
                PROBE_CONNECTIVITY,
                describe_failure(&e, CONNECTIVITY_TIMEOUT),
            )
            .with_details(error_details(&e)),
        }
    }

    fn check_subject(&self, id: &str) -> DiagnosticTestResult {
        match self.client.get_user(id) {
            Ok(user) => DiagnosticTestResult::success(
                PROBE_SUBJECT_LOOKUP,
                format!("User {} found", user.display_name()),
            )
            .with_details(serde_json::to_value(&user).unwrap_or_default()),
            Err(ApiError::NotFound(_)) => {
                DiagnosticTestResult::error(PROBE_SUBJECT_LOOKUP, format!("User {} not found", id))
            }
            Err(ApiError::Http { status, message }) => DiagnosticTestResult::error(
                PROBE_SUBJECT_LOOKUP,
                format!("User lookup failed (HTTP {}): {}", status, message),
            )
            .with_details(json!({ "status": status, "message": message })),
            Err(e) => DiagnosticTestResult::error(
                PROBE_SUBJECT_LOOKUP,
                format!("User lookup failed: {}", e),
            )
            .with_details(error_details(&e)),
        }
    }

    fn check_server_status(&self) -> DiagnosticTestResult {
        match self.client.health_check(Some(SERVER_STATUS_TIMEOUT)) {
            Ok(report) => DiagnosticTestResult::success(PROBE_SERVER_STATUS, "Server is healthy")
                .with_details(json!({
                    "status": report.status,
                    "elapsedMs": report.elapsed_ms,
                    "response": report.body,
                })),
            // A missing health endpoint still proves the server answers
            Err(e) if e.status() == Some(404) => DiagnosticTestResult::warning(
                PROBE_SERVER_STATUS,
                "Health endpoint not implemented (404); server is reachable",
            )
            .with_details(error_details(&e)),
            Err(e) if e.is_timeout() => DiagnosticTestResult::error(
                PROBE_SERVER_STATUS,
                format!(
                    "Server status check timed out after {}s",
                    SERVER_STATUS_TIMEOUT.as_secs()
                ),
            )
            .with_details(error_details(&e)),
            Err(e) => DiagnosticTestResult::error(
                PROBE_SERVER_STATUS,
                format!("Server status check failed: {}", e),
            )
            .with_details(error_details(&e)),
        }
    }
}

fn describe_failure(e: &ApiError, timeout: Duration) -> String {
    match e {
        _ if e.is_timeout() => format!("Connection timed out after {}s", timeout.as_secs()),
        ApiError::Transport(t) => format!("Cannot reach server: {}", t),
        ApiError::Http { status, message } => format!("Server returned {}: {}", status, message),
        other => other.to_string(),
    }
}

fn error_details(e: &ApiError) -> serde_json::Value {
    let kind = match e {
        _ if e.is_timeout() => "timeout",
        ApiError::Transport(_) => "network",
        ApiError::Http { .. } => "http",
        ApiError::Application(_) => "application",
        ApiError::NotFound(_) => "not_found",
        ApiError::Decode(_) => "decode",
    };
    json!({
        "kind": kind,
        "status": e.status(),
        "error": e.to_string(),
    })
}

fn token_preview(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{}…", prefix)
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_without_subject() {
        assert_eq!(
            plan(None),
            vec![Probe::Configuration, Probe::Credential, Probe::Connectivity, Probe::ServerStatus]
        );
        // Blank IDs count as absent
        assert_eq!(plan(Some("  ")).len(), 4);
    }

    #[test]
    fn test_plan_with_subject() {
        let probes = plan(Some("u-7"));
        assert_eq!(probes.len(), 5);
        assert_eq!(probes[3], Probe::SubjectLookup("u-7".into()));
        assert_eq!(probes[4], Probe::ServerStatus);
    }

    #[test]
    fn test_results_named_after_probes() {
        let client = ApiClient::new(
            crate::config::ApiConfig::default(),
            std::sync::Arc::new(crate::api::MockTransport::new()),
        );
        let runner = DiagnosticsRunner::new(&client);
        for probe in plan(Some("u-1")) {
            assert_eq!(runner.execute(&probe).name, probe.name());
        }
    }

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("short"), "short");
        assert_eq!(token_preview("abcdefghijkl"), "abcdefgh…");
    }
}
