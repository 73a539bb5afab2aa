//! Environment and connectivity diagnostics.
//!
//! Probes run strictly one after another:
//!
//! ```text
//! config → credential → connectivity (5s) → [user lookup] → server status (10s)
//! ```
//!
//! Every probe is independently failable; the run never aborts.

mod board;
mod runner;

pub use board::*;
pub use runner::*;

use thiserror::Error;

use crate::models::{DiagnosticTestResult, TestStatus};

#[derive(Error, Debug)]
pub enum DiagnosticsError {
    #[error("Diagnostics are already running")]
    AlreadyRunning,

    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

pub type DiagnosticsResult<T> = Result<T, DiagnosticsError>;

/// Count of results per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSummary {
    pub success: usize,
    pub warning: usize,
    pub error: usize,
    pub pending: usize,
}

impl DiagnosticsSummary {
    pub fn from_results(results: &[DiagnosticTestResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                TestStatus::Success => summary.success += 1,
                TestStatus::Warning => summary.warning += 1,
                TestStatus::Error => summary.error += 1,
                TestStatus::Pending => summary.pending += 1,
            }
        }
        summary
    }

    pub fn all_passed(&self) -> bool {
        self.error == 0 && self.pending == 0
    }
}

/// Plain-text report, one line per probe.
pub fn format_report(results: &[DiagnosticTestResult]) -> String {
    let mut report = String::new();
    for result in results {
        let mark = match result.status {
            TestStatus::Success => "[ OK ]",
            TestStatus::Warning => "[WARN]",
            TestStatus::Error => "[FAIL]",
            TestStatus::Pending => "[ .. ]",
        };
        report.push_str(&format!("{} {}: {}\n", mark, result.name, result.message));
    }

    let summary = DiagnosticsSummary::from_results(results);
    report.push_str(&format!(
        "{} passed, {} warnings, {} failed\n",
        summary.success, summary.warning, summary.error
    ));
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_report() {
        let results = vec![
            DiagnosticTestResult::success(PROBE_CONFIGURATION, "ok"),
            DiagnosticTestResult::error(PROBE_CREDENTIAL, "missing"),
            DiagnosticTestResult::warning(PROBE_SERVER_STATUS, "404"),
        ];

        let summary = DiagnosticsSummary::from_results(&results);
        assert_eq!(summary.success, 1);
        assert_eq!(summary.error, 1);
        assert_eq!(summary.warning, 1);
        assert!(!summary.all_passed());

        let report = format_report(&results);
        assert!(report.contains("[FAIL] Authentication Token: missing"));
        assert!(report.ends_with("1 passed, 1 warnings, 1 failed\n"));
    }

    #[test]
    fn test_warnings_still_pass() {
        let results = vec![DiagnosticTestResult::warning(PROBE_SERVER_STATUS, "404")];
        assert!(DiagnosticsSummary::from_results(&results).all_passed());
    }
}
