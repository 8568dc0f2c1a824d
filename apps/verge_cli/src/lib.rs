//! Library behind the `verge` binary.
//!
//! The command-line surface lives in [`cli`], the compilation pipeline in
//! [`compile`], and the leveled stderr logger in [`log`]. The binary is a
//! thin `main` over [`run_cli`] so the whole flow is testable in-process.

pub mod cli;
pub mod compile;
pub mod log;

use clap::Parser;

/// Parses the command line and runs the compiler.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = cli::Cli::parse();
    let logger = log::Logger::new(cli.log_level(), cli.color_enabled());
    compile::compile(&cli, &logger)?;
    Ok(())
}
