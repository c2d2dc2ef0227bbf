//! Pre-flight checks
//!
//! Confirms that the executables and files a manifest depends on are
//! present before the first test starts, so a missing tool shows up as one
//! clear report instead of a string of failed tests.

use std::path::Path;

use crate::common::{Error, Result};

use super::manifest::Manifest;

/// Whether `name` can be executed, either as an explicit path or via PATH
pub fn executable_available(name: &str) -> bool {
    if name.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(name).is_file();
    }
    which::which(name).is_ok()
}

/// Collect every missing requirement of the manifest
pub fn problems(manifest: &Manifest) -> Vec<String> {
    let mut problems = Vec::new();

    for name in &manifest.required_executables {
        if !executable_available(name) {
            problems.push(format!("cannot find the executable '{name}'"));
        }
    }
    for file in &manifest.required_files {
        if !file.exists() {
            problems.push(format!("cannot find the file '{}'", file.display()));
        }
    }

    problems
}

/// Fail with every missing requirement listed
pub fn check(manifest: &Manifest) -> Result<()> {
    let problems = problems(manifest);
    if problems.is_empty() {
        tracing::debug!(
            executables = manifest.required_executables.len(),
            files = manifest.required_files.len(),
            "Pre-flight check passed"
        );
        Ok(())
    } else {
        for problem in &problems {
            tracing::error!("{}", problem);
        }
        Err(Error::Preflight(problems))
    }
}
