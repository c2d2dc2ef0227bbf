//! flinger - sandboxed test execution engine
//!
//! Launches external test programs as detached child processes, enforces a
//! wall-clock timeout, captures their merged output into a run log, and
//! classifies each outcome as `PASS`, `FAIL`, `FAIL/TIMEOUT` or
//! `FAIL/SIGNAL(n)`.

pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod sink;
pub mod testcase;

// Re-export commonly used types for tests
pub use common::{Error, Result, RunnerSettings};
pub use sink::LogSink;
pub use testcase::{TestCase, TestSpecification, Verdict};
