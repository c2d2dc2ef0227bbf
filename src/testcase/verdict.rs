//! Verdict classification
//!
//! The verdict strings are scraped by downstream tooling, so their exact
//! spelling is part of the interface.

use std::fmt;
use std::process::ExitStatus;

use serde::{Serialize, Serializer};

/// How a test process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Normal exit with a status code
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
}

impl Termination {
    /// Signed encoding: non-negative is an exit code, negative is the
    /// signal number
    pub fn raw(self) -> i32 {
        match self {
            Termination::Exited(code) => code,
            Termination::Signaled(signal) => -signal,
        }
    }
}

impl From<ExitStatus> for Termination {
    fn from(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Termination::Signaled(signal);
            }
        }
        // Without a code or a signal there is nothing better than a generic failure
        Termination::Exited(status.code().unwrap_or(1))
    }
}

/// Final classification of one test execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Timeout,
    Signal(i32),
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    /// Judge a finished test
    ///
    /// First match wins:
    /// 1. a forced kill is always a timeout
    /// 2. signal death passes only when a signal was expected
    /// 3. with `expect_failure`, any non-zero exit passes
    /// 4. otherwise only exit code 0 passes
    ///
    /// Signal death is judged before the exit-code rules, so a crash never
    /// satisfies `expect_failure`.
    pub fn classify(
        termination: Termination,
        force_killed: bool,
        expect_failure: bool,
        expect_signal: bool,
    ) -> Self {
        if force_killed {
            return Verdict::Timeout;
        }
        match termination {
            Termination::Signaled(_) if expect_signal => Verdict::Pass,
            Termination::Signaled(signal) => Verdict::Signal(signal),
            Termination::Exited(code) if expect_failure => {
                if code != 0 {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                }
            }
            Termination::Exited(0) => Verdict::Pass,
            Termination::Exited(_) => Verdict::Fail,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("PASS"),
            Verdict::Fail => f.write_str("FAIL"),
            Verdict::Timeout => f.write_str("FAIL/TIMEOUT"),
            Verdict::Signal(n) => write!(f, "FAIL/SIGNAL({n})"),
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGSEGV: i32 = 11;
    const SIGKILL: i32 = 9;

    #[test]
    fn test_display_literals() {
        assert_eq!(Verdict::Pass.to_string(), "PASS");
        assert_eq!(Verdict::Fail.to_string(), "FAIL");
        assert_eq!(Verdict::Timeout.to_string(), "FAIL/TIMEOUT");
        assert_eq!(Verdict::Signal(SIGSEGV).to_string(), "FAIL/SIGNAL(11)");
    }

    #[test]
    fn test_normal_expectations() {
        assert_eq!(
            Verdict::classify(Termination::Exited(0), false, false, false),
            Verdict::Pass
        );
        for code in [1, 2, 127, 255] {
            assert_eq!(
                Verdict::classify(Termination::Exited(code), false, false, false),
                Verdict::Fail
            );
        }
    }

    #[test]
    fn test_expect_failure_inverts_exit_code() {
        assert_eq!(
            Verdict::classify(Termination::Exited(1), false, true, false),
            Verdict::Pass
        );
        assert_eq!(
            Verdict::classify(Termination::Exited(0), false, true, false),
            Verdict::Fail
        );
    }

    #[test]
    fn test_crash_does_not_satisfy_expect_failure() {
        assert_eq!(
            Verdict::classify(Termination::Signaled(SIGSEGV), false, true, false),
            Verdict::Signal(SIGSEGV)
        );
    }

    #[test]
    fn test_expect_signal() {
        assert_eq!(
            Verdict::classify(Termination::Signaled(SIGSEGV), false, false, true),
            Verdict::Pass
        );
        assert_eq!(
            Verdict::classify(Termination::Signaled(SIGSEGV), false, false, false),
            Verdict::Signal(SIGSEGV)
        );
        // A normal exit is judged as if no signal was expected
        assert_eq!(
            Verdict::classify(Termination::Exited(0), false, false, true),
            Verdict::Pass
        );
        assert_eq!(
            Verdict::classify(Termination::Exited(3), false, false, true),
            Verdict::Fail
        );
    }

    #[test]
    fn test_both_expectations() {
        assert_eq!(
            Verdict::classify(Termination::Signaled(SIGSEGV), false, true, true),
            Verdict::Pass
        );
        assert_eq!(
            Verdict::classify(Termination::Exited(1), false, true, true),
            Verdict::Pass
        );
        assert_eq!(
            Verdict::classify(Termination::Exited(0), false, true, true),
            Verdict::Fail
        );
    }

    #[test]
    fn test_forced_kill_dominates() {
        for termination in [
            Termination::Exited(0),
            Termination::Exited(1),
            Termination::Signaled(SIGKILL),
        ] {
            for (expect_failure, expect_signal) in
                [(false, false), (true, false), (false, true), (true, true)]
            {
                assert_eq!(
                    Verdict::classify(termination, true, expect_failure, expect_signal),
                    Verdict::Timeout
                );
            }
        }
    }

    #[test]
    fn test_raw_encoding() {
        assert_eq!(Termination::Exited(3).raw(), 3);
        assert_eq!(Termination::Signaled(SIGSEGV).raw(), -11);
        assert_eq!(Termination::Signaled(SIGKILL).raw(), -9);
    }

    #[test]
    fn test_serializes_as_literal() {
        let json = serde_json::to_string(&Verdict::Signal(6)).unwrap();
        assert_eq!(json, "\"FAIL/SIGNAL(6)\"");
    }
}
