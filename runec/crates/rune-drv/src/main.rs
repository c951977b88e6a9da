//! Rune CLI - runs a Rune source file.
//!
//! `rune <sourcefile>` reads the file, drives the interpreter pipeline,
//! and exits non-zero on any failure. Parse and runtime errors are
//! rendered as positioned banners on stderr; the script's own output goes
//! to stdout untouched.
//!
//! Set `RUNE_LOG` (a tracing filter, e.g. `debug`) to see pipeline events
//! on stderr.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rune_vm::RuneVm;

/// Run a Rune script.
#[derive(Parser, Debug)]
#[command(name = "rune")]
#[command(author = "Rune Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a Rune script", long_about = None)]
struct Cli {
    /// Path to the Rune source file.
    source: PathBuf,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RUNE_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let source = match fs::read_to_string(&cli.source) {
        Ok(source) => source,
        Err(_) => {
            eprintln!("ERROR: Can't find source file '{}'.", cli.source.display());
            return ExitCode::FAILURE;
        }
    };

    let mut vm = RuneVm::new();
    match vm.run(&source, &cli.source.to_string_lossy()) {
        Ok(_) => {
            debug!("script completed");
            ExitCode::SUCCESS
        }
        Err(diag) => {
            eprintln!("{}", vm.render(&diag));
            ExitCode::FAILURE
        }
    }
}
