//! Published diagnostics state shared with the host UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{DiagnosticsError, DiagnosticsResult, DiagnosticsRunner};
use crate::models::DiagnosticTestResult;

/// Latest diagnostics list, replaced wholesale after every probe.
///
/// Only one run at a time: a second trigger while a run is in flight is
/// rejected, not queued.
#[derive(Default)]
pub struct DiagnosticsBoard {
    results: Mutex<Arc<Vec<DiagnosticTestResult>>>,
    running: AtomicBool,
}

/// Clears the running flag when the run ends, even by unwinding.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DiagnosticsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current published list (a prefix of the in-flight run, or the last full run).
    pub fn snapshot(&self) -> Arc<Vec<DiagnosticTestResult>> {
        self.results
            .lock()
            .map(|r| Arc::clone(&r))
            .unwrap_or_default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run diagnostics, discarding the previous list first.
    pub fn run(
        &self,
        runner: &DiagnosticsRunner<'_>,
        subject_id: Option<&str>,
    ) -> DiagnosticsResult<Arc<Vec<DiagnosticTestResult>>> {
        if self.running.swap(true, Ordering::AcqRel) {
            tracing::debug!("Diagnostics already running; ignoring trigger");
            return Err(DiagnosticsError::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        self.publish(Vec::new())?;
        let mut publish_error = None;
        let results = runner.run_with(subject_id, |partial| {
            if let Err(e) = self.publish(partial.to_vec()) {
                publish_error.get_or_insert(e);
            }
        });
        if let Some(e) = publish_error {
            return Err(e);
        }

        let results = Arc::new(results);
        self.publish_arc(Arc::clone(&results))?;
        Ok(results)
    }

    fn publish(&self, results: Vec<DiagnosticTestResult>) -> DiagnosticsResult<()> {
        self.publish_arc(Arc::new(results))
    }

    fn publish_arc(&self, results: Arc<Vec<DiagnosticTestResult>>) -> DiagnosticsResult<()> {
        let mut slot = self
            .results
            .lock()
            .map_err(|e| DiagnosticsError::Poisoned(e.to_string()))?;
        *slot = results;
        Ok(())
    }
}
