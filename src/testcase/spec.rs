//! Test specification records

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What to run and how to judge it
///
/// Deserialized from a manifest entry; absent optional fields take their
/// defaults, and a missing `timeout` falls back to the runner's configured
/// default when the test case is built. Keys this version doesn't know are
/// kept in `unknown_fields` and otherwise ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpecification {
    /// Display name for markers and verdict lines (default: `program`)
    #[serde(default)]
    pub name: Option<String>,

    /// Path to the executable test program
    #[serde(rename = "program")]
    pub program_path: PathBuf,

    /// Command line arguments for the program
    #[serde(default, rename = "args", deserialize_with = "null_as_empty")]
    pub arguments: Vec<String>,

    /// Upper limit on execution time in seconds
    #[serde(default, rename = "timeout")]
    pub timeout_seconds: Option<u64>,

    /// The test passes only if the program exits non-zero
    #[serde(default, rename = "expect_fail", alias = "expect-fail")]
    pub expect_failure: bool,

    /// The test passes only if the program is killed by a signal
    #[serde(default, alias = "expect-signal")]
    pub expect_signal: bool,

    #[serde(flatten, skip_serializing)]
    pub unknown_fields: BTreeMap<String, serde_yaml::Value>,
}

/// `args: null` is accepted as "no arguments"
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TestSpecification {
    /// Specification for `program` with every option at its default
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            program_path: program.into(),
            arguments: Vec::new(),
            timeout_seconds: None,
            expect_failure: false,
            expect_signal: false,
            unknown_fields: BTreeMap::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_seconds = Some(secs);
        self
    }

    pub fn expect_failure(mut self, expect: bool) -> Self {
        self.expect_failure = expect;
        self
    }

    pub fn expect_signal(mut self, expect: bool) -> Self {
        self.expect_signal = expect;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name used in run log markers and verdict lines
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.program_path.display().to_string())
    }
}
