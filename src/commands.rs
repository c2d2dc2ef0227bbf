//! CLI command definitions
//!
//! Defines the clap commands for the flinger CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run every test listed in a manifest
    Run {
        /// Path to the YAML test manifest
        manifest: PathBuf,

        /// Write the run log to this file (replaced if it exists)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Directory for the generated run log name
        #[arg(long, conflicts_with = "log")]
        log_dir: Option<PathBuf>,

        /// Timeout in seconds for tests that don't set one
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        default_timeout: Option<u64>,

        /// Skip the required executables/files check
        #[arg(long)]
        skip_preflight: bool,

        /// Print the batch report as JSON instead of verdict lines
        #[arg(long)]
        json: bool,
    },

    /// Run a single program as a test
    Exec {
        /// Path to the test program
        program: PathBuf,

        /// Arguments to pass to the program
        #[arg(last = true)]
        args: Vec<String>,

        /// Timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Pass only if the program exits non-zero
        #[arg(long)]
        expect_fail: bool,

        /// Pass only if the program is killed by a signal
        #[arg(long)]
        expect_signal: bool,

        /// Write the run log to this file (replaced if it exists)
        #[arg(long)]
        log: Option<PathBuf>,

        /// Directory for the generated run log name
        #[arg(long, conflicts_with = "log")]
        log_dir: Option<PathBuf>,
    },

    /// Validate a manifest and check its requirements without running it
    Check {
        /// Path to the YAML test manifest
        manifest: PathBuf,
    },
}
