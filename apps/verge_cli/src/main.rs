//! verge - standalone binary
//!
//! This is the entry point for the `verge` command-line tool.
//!
//! The binary is a thin wrapper around [`verge_cli::run_cli`], handling
//! error display and exit codes. All command logic is implemented in the
//! library crate for testability.
//!
//! # Exit Codes
//!
//! - `0` - Checker source generated successfully
//! - `1` - Error (message printed to stderr)

fn main() {
    if let Err(e) = verge_cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
