//! flinger - sandboxed runner for crash-prone and hanging test programs
//!
//! Runs each test program in its own process group with a timeout and
//! reports one verdict per test, so a crash or a hang never takes the rest
//! of the batch down.

use clap::Parser;
use flinger::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "flinger", about = "Sandboxed test program runner")]
#[command(version, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(cli::EXIT_UNRUNNABLE);
        }
    }
}
