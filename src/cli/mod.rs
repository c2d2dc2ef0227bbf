//! CLI command handling
//!
//! Dispatches CLI commands to the driver and formats the summary.

use std::path::{Path, PathBuf};

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::commands::Commands;
use crate::common::{paths, Config, Result, RunnerSettings};
use crate::driver::{self, preflight, BatchReport, Manifest};
use crate::sink::LogSink;
use crate::testcase::TestSpecification;

/// Every test passed
pub const EXIT_PASSED: i32 = 0;
/// At least one test failed
pub const EXIT_FAILED: i32 = 1;
/// The manifest or its requirements are broken; nothing ran
pub const EXIT_UNRUNNABLE: i32 = 2;
/// The run was interrupted
pub const EXIT_INTERRUPTED: i32 = 130;

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    let config = Config::load()?;

    match command {
        Commands::Run {
            manifest,
            log,
            log_dir,
            default_timeout,
            skip_preflight,
            json,
        } => {
            let manifest = Manifest::load(&manifest)?;
            if !skip_preflight {
                if let Err(e) = preflight::check(&manifest) {
                    eprintln!("{} {}", "Error:".red().bold(), e);
                    return Ok(EXIT_UNRUNNABLE);
                }
            }

            let mut settings = config.runner_settings();
            if let Some(secs) = default_timeout {
                settings = settings.with_default_timeout(secs);
            }
            let log_dir = resolve_log_dir(log_dir, &config);

            let report = run(&manifest.tests, settings, log.as_deref(), &log_dir, !json).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
            Ok(exit_code(&report))
        }

        Commands::Exec {
            program,
            args,
            timeout,
            expect_fail,
            expect_signal,
            log,
            log_dir,
        } => {
            let mut spec = TestSpecification::new(program)
                .with_args(args)
                .expect_failure(expect_fail)
                .expect_signal(expect_signal);
            if let Some(secs) = timeout {
                spec = spec.with_timeout(secs);
            }

            let log_dir = resolve_log_dir(log_dir, &config);
            let report = run(
                std::slice::from_ref(&spec),
                config.runner_settings(),
                log.as_deref(),
                &log_dir,
                true,
            )
            .await?;
            print_summary(&report);
            Ok(exit_code(&report))
        }

        Commands::Check { manifest } => {
            let loaded = Manifest::load(&manifest)?;
            let problems = preflight::problems(&loaded);
            if problems.is_empty() {
                println!(
                    "{} {} ({} tests)",
                    "✓".green(),
                    manifest.display(),
                    loaded.tests.len()
                );
                Ok(EXIT_PASSED)
            } else {
                for problem in &problems {
                    println!("  {} {}", "✗".red(), problem);
                }
                Ok(EXIT_UNRUNNABLE)
            }
        }
    }
}

/// Open the run log, run the batch with interrupt routing, close the log
async fn run(
    tests: &[TestSpecification],
    settings: RunnerSettings,
    log: Option<&Path>,
    log_dir: &Path,
    echo: bool,
) -> Result<BatchReport> {
    let mut sink = LogSink::open(log, log_dir)?;
    if echo {
        println!("Logging to {}", sink.path().display());
    }

    let cancel = CancellationToken::new();
    let listener = driver::interrupt::install(cancel.clone());

    let report = driver::run_batch(tests, settings, &mut sink, &cancel, echo).await;

    if report.interrupted {
        sink.write("\nTest set interrupted\n");
    }
    if let Err(e) = sink.close() {
        tracing::warn!(error = %e, "Failed to close run log");
    }

    // Stops the interrupt listener if nothing fired
    cancel.cancel();
    let _ = listener.await;

    Ok(report)
}

fn resolve_log_dir(cli: Option<PathBuf>, config: &Config) -> PathBuf {
    cli.or_else(|| config.log.directory.clone())
        .unwrap_or_else(paths::default_log_dir)
}

fn exit_code(report: &BatchReport) -> i32 {
    if report.interrupted {
        EXIT_INTERRUPTED
    } else if report.all_passed() {
        EXIT_PASSED
    } else {
        EXIT_FAILED
    }
}

fn print_summary(report: &BatchReport) {
    let total = report.results.len();
    let passed = report.passed();
    let failed = report.failed();

    println!();
    if report.interrupted {
        println!("{}", "Run interrupted".yellow().bold());
    }
    let summary = format!("{passed}/{total} passed, {failed} failed");
    if failed == 0 && !report.interrupted {
        println!("{} {}", "✓".green().bold(), summary.green().bold());
    } else {
        println!("{} {}", "✗".red().bold(), summary.red().bold());
    }
    if let Some(path) = &report.log_path {
        println!("Log: {}", path.display().to_string().dimmed());
    }
}
