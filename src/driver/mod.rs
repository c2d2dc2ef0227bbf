//! Batch driver
//!
//! Loads a manifest, checks that its requirements are present, and runs
//! the listed tests one after another against a shared run log.

pub mod interrupt;
mod manifest;
pub mod preflight;
mod runner;

pub use manifest::Manifest;
pub use runner::{run_batch, run_test, BatchReport, TestReport};
