//! Diagnostic probe results.

use serde::{Deserialize, Serialize};

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Success,
    Error,
    /// Degraded but tolerated (e.g., missing health endpoint)
    Warning,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Pending => "pending",
            TestStatus::Success => "success",
            TestStatus::Error => "error",
            TestStatus::Warning => "warning",
        }
    }
}

/// One row of a diagnostics run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticTestResult {
    /// Probe name
    pub name: String,
    pub status: TestStatus,
    /// Human-readable summary
    pub message: String,
    /// Opaque payload for the expandable details view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl DiagnosticTestResult {
    pub fn new(name: impl Into<String>, status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn success(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, TestStatus::Success, message)
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, TestStatus::Error, message)
    }

    pub fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, TestStatus::Warning, message)
    }

    /// Attach a details payload.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
