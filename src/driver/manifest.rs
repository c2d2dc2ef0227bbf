//! Test manifest loading
//!
//! A manifest is the fixed list of tests for one batch plus what the
//! machine needs before any of them can run.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::{Error, Result};
use crate::testcase::TestSpecification;

/// A batch of tests loaded from a YAML file
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Executables that must be available, explicitly or on PATH
    #[serde(default)]
    pub required_executables: Vec<String>,
    /// Files that must exist
    #[serde(default)]
    pub required_files: Vec<PathBuf>,
    /// Tests to run, in order
    pub tests: Vec<TestSpecification>,
}

impl Manifest {
    /// Load a manifest file
    ///
    /// Relative program paths resolve against the manifest's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let mut manifest =
            Self::parse(&content).map_err(|e| Error::manifest_parse(path, e))?;

        let base = path.parent().unwrap_or(Path::new("."));
        for spec in &mut manifest.tests {
            for key in spec.unknown_fields.keys() {
                tracing::warn!(
                    test = %spec.display_name(),
                    field = %key,
                    "Ignoring unknown test field"
                );
            }
            if spec.program_path.is_relative() {
                if spec.name.is_none() {
                    spec.name = Some(spec.program_path.display().to_string());
                }
                spec.program_path = base.join(&spec.program_path);
            }
        }

        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse manifest text without resolving paths
    pub fn parse(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Check the invariants serde can't express
    pub fn validate(&self) -> Result<()> {
        if self.tests.is_empty() {
            return Err(Error::InvalidManifest("no tests listed".to_string()));
        }
        for spec in &self.tests {
            if spec.program_path.as_os_str().is_empty() {
                return Err(Error::InvalidManifest("test with an empty program".to_string()));
            }
            if spec.timeout_seconds == Some(0) {
                return Err(Error::InvalidManifest(format!(
                    "test '{}' has a zero timeout; timeouts must be positive",
                    spec.display_name()
                )));
            }
        }
        Ok(())
    }
}
