//! Single-test lifecycle controller
//!
//! A [`TestCase`] runs one external program in its own process group,
//! drains its merged output into the run log while it runs, kills it when
//! the deadline passes or the run is cancelled, and turns the result into
//! a [`Verdict`].
//!
//! A test case is single use: `start`, `wait`, `verdict`, done.

mod capture;
mod spec;
mod verdict;

use capture::OutputCapture;

pub use spec::TestSpecification;
pub use verdict::{Termination, Verdict};

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::common::{timestamp, Error, Result, RunnerSettings};
use crate::sink::{LogSink, OUTPUT_RULE, SECTION_RULE};

/// Stand-in deadline for timeouts too large to represent as an instant
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Lower bound on the output poll interval
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// What ended one iteration of the wait loop
enum WaitEvent {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    DeadlineElapsed,
    Tick,
}

/// Runtime state of one test execution
pub struct TestCase<'a> {
    name: String,
    program_path: PathBuf,
    arguments: Vec<String>,
    timeout: Duration,
    expect_failure: bool,
    expect_signal: bool,
    settings: RunnerSettings,
    sink: Option<&'a mut LogSink>,

    cancel: CancellationToken,
    started: bool,
    child: Option<Child>,
    pid: Option<u32>,
    capture: Option<OutputCapture>,
    deadline: Option<Instant>,
    was_force_killed: bool,
    exit_status: Option<Termination>,
    finalized: bool,
}

impl<'a> TestCase<'a> {
    /// Build a test case from its specification
    ///
    /// `sink` receives markers and captured output; with `None` the output
    /// is still drained but discarded.
    pub fn new(
        spec: &TestSpecification,
        settings: RunnerSettings,
        sink: Option<&'a mut LogSink>,
    ) -> Self {
        let timeout = spec
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(settings.default_timeout);
        let settings = RunnerSettings {
            poll_interval: settings.poll_interval.max(MIN_POLL_INTERVAL),
            ..settings
        };

        Self {
            name: spec.display_name(),
            program_path: spec.program_path.clone(),
            arguments: spec.arguments.clone(),
            timeout,
            expect_failure: spec.expect_failure,
            expect_signal: spec.expect_signal,
            settings,
            sink,
            cancel: CancellationToken::new(),
            started: false,
            child: None,
            pid: None,
            capture: None,
            deadline: None,
            was_force_killed: false,
            exit_status: None,
            finalized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// OS process id, once spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit status in signed encoding (negative = signal number), once
    /// the process has terminated
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status.map(Termination::raw)
    }

    pub fn was_force_killed(&self) -> bool {
        self.was_force_killed
    }

    /// Spawn the test program
    ///
    /// Fails with [`Error::ProgramNotFound`] when the program does not
    /// exist (nothing is spawned and only an error note reaches the log),
    /// or [`Error::SpawnFailure`] when the OS refuses to create the
    /// process. `cancel` aborts a later [`TestCase::wait`] early.
    pub async fn start(&mut self, cancel: CancellationToken) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted(self.name.clone()));
        }

        let command = match std::path::absolute(&self.program_path) {
            Ok(path) if path.exists() => path,
            Ok(path) => return Err(self.not_found(path)),
            Err(_) => return Err(self.not_found(self.program_path.clone())),
        };

        self.started = true;
        self.cancel = cancel;
        let now = Instant::now();
        self.deadline = Some(now.checked_add(self.timeout).unwrap_or_else(|| now + FAR_FUTURE));
        self.was_force_killed = false;

        self.log_write(&format!("{SECTION_RULE}\n"));
        self.log_write(&format!("BEGIN TEST '{}' at {}\n", self.name, timestamp()));
        self.log_write(&format!("{OUTPUT_RULE}\n"));
        self.log_flush();

        let mut cmd = Command::new(&command);
        cmd.args(&self.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: terminal signals don't reach the test directly,
        // and a kill reaches anything the test spawned
        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        match cmd.spawn() {
            Ok(mut child) => {
                self.pid = child.id();
                self.capture = Some(OutputCapture::spawn(
                    child.stdout.take(),
                    child.stderr.take(),
                ));
                self.child = Some(child);
                tracing::debug!(
                    test = %self.name,
                    pid = ?self.pid,
                    timeout_secs = self.timeout.as_secs(),
                    "Test started"
                );
                Ok(())
            }
            Err(source) => {
                let err = Error::spawn_failure(command, source);
                tracing::error!(test = %self.name, "{}", err);
                self.log_write(&format!("ERROR: {err}\n"));
                self.finalize_log();
                Err(err)
            }
        }
    }

    fn not_found(&mut self, path: PathBuf) -> Error {
        let err = Error::ProgramNotFound(path);
        tracing::error!(test = %self.name, "{}", err);
        self.log_write(&format!("ERROR: {err}\n"));
        self.log_flush();
        err
    }

    /// Block until the test finishes, its deadline passes, or the run is
    /// cancelled
    ///
    /// Output is drained into the log every poll interval while waiting.
    /// Returns `true` when the process exited on its own; `false` when it
    /// had to be killed (or was never started).
    pub async fn wait(&mut self) -> bool {
        if self.child.is_none() {
            tracing::error!(test = %self.name, "Test was never started");
            return false;
        }
        if self.exit_status.is_some() || self.finalized {
            return !self.was_force_killed;
        }
        let Some(deadline) = self.deadline else {
            return false;
        };

        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let event = {
                let Some(child) = self.child.as_mut() else {
                    return false;
                };
                tokio::select! {
                    biased;
                    status = child.wait() => WaitEvent::Exited(status),
                    _ = self.cancel.cancelled() => WaitEvent::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => WaitEvent::DeadlineElapsed,
                    _ = ticker.tick() => WaitEvent::Tick,
                }
            };

            match event {
                WaitEvent::Tick => self.drain_output(),
                WaitEvent::Exited(Ok(status)) => {
                    let termination = Termination::from(status);
                    self.exit_status = Some(termination);
                    tracing::debug!(test = %self.name, status = termination.raw(), "Test exited");
                    self.finish_output().await;
                    self.finalize_log();
                    return true;
                }
                WaitEvent::Exited(Err(e)) => {
                    tracing::error!(test = %self.name, error = %e, "Failed to wait for test process");
                    self.kill().await;
                    return false;
                }
                WaitEvent::DeadlineElapsed => {
                    tracing::warn!(
                        test = %self.name,
                        timeout_secs = self.timeout.as_secs(),
                        "Test exceeded its timeout"
                    );
                    self.kill().await;
                    return false;
                }
                WaitEvent::Cancelled => {
                    tracing::warn!(test = %self.name, "Run cancelled, aborting current test");
                    self.kill().await;
                    return false;
                }
            }
        }
    }

    /// Kill the running test
    ///
    /// Sends SIGTERM to the test's process group, gives it the grace period
    /// to exit, then SIGKILLs whatever is left. Returns `false` if the test
    /// was never started. Calling this on a test that already finished
    /// changes nothing.
    pub async fn kill(&mut self) -> bool {
        let grace = self.settings.grace_period;
        let pid = self.pid;
        let Some(child) = self.child.as_mut() else {
            tracing::warn!(test = %self.name, "Killing a test that was never started");
            return false;
        };
        if self.exit_status.is_some() || self.finalized {
            tracing::debug!(test = %self.name, "Test already terminated, nothing to kill");
            return true;
        }

        self.was_force_killed = true;

        #[cfg(unix)]
        {
            if let Some(pid) = pid {
                signal_group(pid, libc::SIGTERM);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }

        let status = match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!(test = %self.name, error = %e, "Failed to wait for test process");
                None
            }
            Err(_) => {
                tracing::debug!(test = %self.name, "Still running after grace period, sending SIGKILL");
                if let Err(e) = child.kill().await {
                    tracing::warn!(test = %self.name, error = %e, "Failed to kill test process");
                }
                child.wait().await.ok()
            }
        };

        // Sweep up anything the test left behind in its group
        #[cfg(unix)]
        {
            if let Some(pid) = pid {
                signal_group(pid, libc::SIGKILL);
            }
        }

        self.exit_status = status.map(Termination::from);
        self.finish_output().await;
        self.log_write("\nKilling process by request...\n");
        self.log_flush();
        self.finalize_log();
        true
    }

    /// Judge the finished test
    ///
    /// A test that never ran to termination gets `FAIL`, so every test in a
    /// batch still yields exactly one verdict.
    pub fn verdict(&self) -> Verdict {
        match self.exit_status {
            Some(termination) => Verdict::classify(
                termination,
                self.was_force_killed,
                self.expect_failure,
                self.expect_signal,
            ),
            None if self.was_force_killed => Verdict::Timeout,
            None => {
                tracing::error!(test = %self.name, "Verdict requested for a test that has not terminated");
                Verdict::Fail
            }
        }
    }

    fn drain_output(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.drain_into(self.sink.as_deref_mut());
        }
    }

    async fn finish_output(&mut self) {
        if let Some(capture) = self.capture.as_mut() {
            capture.finish(self.settings.poll_interval).await;
        }
        self.drain_output();
    }

    fn finalize_log(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        self.log_write(&format!("{OUTPUT_RULE}\n"));
        self.log_write(&format!("END TEST '{}' at {}\n", self.name, timestamp()));
        self.log_write(&format!("{SECTION_RULE}\n"));
        self.log_flush();
    }

    fn log_write(&mut self, text: &str) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.write(text);
        }
    }

    fn log_flush(&mut self) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.flush();
        }
    }
}

/// Send `signal` to the process group led by `pid`
#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // Safety: killpg takes no pointers; a stale group only yields ESRCH
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, signal, error = %err, "Failed to signal process group");
        }
    }
}
