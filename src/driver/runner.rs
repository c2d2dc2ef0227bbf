//! Sequential batch runner
//!
//! Runs each test specification to completion before starting the next,
//! writing a `<name>: <VERDICT>` line to the run log after every test. A
//! test that cannot even be started is recorded as `FAIL` and the batch
//! moves on.

use std::path::PathBuf;
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::common::RunnerSettings;
use crate::sink::LogSink;
use crate::testcase::{TestCase, TestSpecification, Verdict};

/// Outcome of one test
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub name: String,
    pub verdict: Verdict,
    /// Signed exit status: negative values are signal numbers
    pub exit_status: Option<i32>,
    pub force_killed: bool,
    pub duration_ms: u64,
    /// Why the test could not be started
    pub error: Option<String>,
}

impl TestReport {
    /// The line written to the run log and the console
    pub fn verdict_line(&self) -> String {
        format!("{}: {}", self.name, self.verdict)
    }
}

/// Outcome of a whole batch
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub log_path: Option<PathBuf>,
    pub results: Vec<TestReport>,
    /// The run was aborted before every test ran
    pub interrupted: bool,
}

impl BatchReport {
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.verdict.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        !self.interrupted && self.failed() == 0
    }
}

/// Run a single test through its whole lifecycle
pub async fn run_test(
    spec: &TestSpecification,
    settings: RunnerSettings,
    sink: Option<&mut LogSink>,
    cancel: &CancellationToken,
) -> TestReport {
    let started = Instant::now();
    let mut tcase = TestCase::new(spec, settings, sink);

    let (verdict, error) = match tcase.start(cancel.clone()).await {
        Ok(()) => {
            tcase.wait().await;
            (tcase.verdict(), None)
        }
        Err(e) => {
            tracing::error!("Could not start test '{}'. Skipping", tcase.name());
            (Verdict::Fail, Some(e.to_string()))
        }
    };

    TestReport {
        name: tcase.name().to_string(),
        verdict,
        exit_status: tcase.exit_status(),
        force_killed: tcase.was_force_killed(),
        duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        error,
    }
}

/// Run every test in order, stopping early only if `cancel` fires
///
/// With `echo`, each verdict line is also printed to stdout as it lands.
pub async fn run_batch(
    tests: &[TestSpecification],
    settings: RunnerSettings,
    sink: &mut LogSink,
    cancel: &CancellationToken,
    echo: bool,
) -> BatchReport {
    let mut report = BatchReport {
        log_path: Some(sink.path().to_path_buf()),
        ..Default::default()
    };

    for spec in tests {
        if cancel.is_cancelled() {
            report.interrupted = true;
            break;
        }

        let result = run_test(spec, settings, Some(&mut *sink), cancel).await;
        let line = result.verdict_line();

        if echo {
            print_verdict(&result);
        }
        tracing::info!(
            test = %result.name,
            verdict = %result.verdict,
            duration_ms = result.duration_ms,
            "Test finished"
        );

        sink.write(&format!("\n{line}\n"));
        sink.flush();
        report.results.push(result);

        if cancel.is_cancelled() {
            report.interrupted = true;
            break;
        }
    }

    report
}

fn print_verdict(result: &TestReport) {
    let verdict = result.verdict.to_string();
    let verdict = if result.verdict.is_pass() {
        verdict.green().bold()
    } else {
        verdict.red().bold()
    };
    println!("{}: {}", result.name, verdict);
    if let Some(error) = &result.error {
        println!("  {}", error.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, verdict: Verdict) -> TestReport {
        TestReport {
            name: name.to_string(),
            verdict,
            exit_status: None,
            force_killed: false,
            duration_ms: 0,
            error: None,
        }
    }

    #[test]
    fn test_verdict_line() {
        assert_eq!(
            report("/bin/true", Verdict::Pass).verdict_line(),
            "/bin/true: PASS"
        );
        assert_eq!(
            report("test-signal", Verdict::Signal(11)).verdict_line(),
            "test-signal: FAIL/SIGNAL(11)"
        );
    }

    #[test]
    fn test_counts() {
        let mut batch = BatchReport::default();
        batch.results.push(report("a", Verdict::Pass));
        batch.results.push(report("b", Verdict::Timeout));
        batch.results.push(report("c", Verdict::Pass));
        assert_eq!(batch.passed(), 2);
        assert_eq!(batch.failed(), 1);
        assert!(!batch.all_passed());

        batch.results.remove(1);
        assert!(batch.all_passed());
        batch.interrupted = true;
        assert!(!batch.all_passed());
    }

    #[test]
    fn test_report_json_uses_verdict_literals() {
        let json = serde_json::to_value(report("x", Verdict::Timeout)).unwrap();
        assert_eq!(json["verdict"], "FAIL/TIMEOUT");
    }
}
