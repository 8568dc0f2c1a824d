//! One-shot subprocess harness for the SMT solver.
//!
//! The solver runs once per query: spawn with piped stdio, feed the whole
//! SMT-LIB script to stdin (from a helper thread, so neither side can
//! deadlock on a full pipe), read stdout to EOF, and reap the child. Any
//! failure along the way is an I/O error the caller downgrades to an
//! inconclusive query.

use crate::error::{VerifyError, VerifyResult};
use std::io::{Read, Write};
use std::process::{Command, Stdio};

/// Runs `path args...`, writes `input` to its stdin, and returns its
/// stdout.
pub fn run_one_shot(path: &str, args: &[String], input: &str) -> VerifyResult<String> {
    let mut child = Command::new(path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| VerifyError::io(format!("failed to spawn \"{}\": {}", path, e)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| VerifyError::io("no pipe to solver stdin"))?;
    let script = input.to_string();
    let writer = std::thread::spawn(move || {
        // the solver may exit before reading everything; that's fine
        let _ = stdin.write_all(script.as_bytes());
    });

    let mut output = String::new();
    let read = child
        .stdout
        .take()
        .ok_or_else(|| VerifyError::io("no pipe from solver stdout"))
        .and_then(|mut stdout| {
            stdout
                .read_to_string(&mut output)
                .map_err(|e| VerifyError::io(format!("failed to read solver output: {}", e)))
        });

    let _ = writer.join();
    let status = child
        .wait()
        .map_err(|e| VerifyError::io(format!("failed to reap solver: {}", e)))?;
    read?;

    if output.is_empty() && !status.success() {
        return Err(VerifyError::io(format!(
            "solver exited with {} and no output",
            status
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipes_stdin_to_stdout() {
        let out = run_one_shot("cat", &[], "unsat\n").expect("cat failed");
        assert_eq!(out, "unsat\n");
    }

    #[test]
    fn missing_binary_is_an_io_error() {
        let err = run_one_shot("/nonexistent/solver", &[], "").unwrap_err();
        assert!(matches!(err, VerifyError::Io { .. }));
    }

    #[test]
    fn large_scripts_do_not_deadlock() {
        // bigger than a pipe buffer, with the reader consuming nothing
        // until EOF
        let script = "x".repeat(1 << 20);
        let out = run_one_shot("head", &["-c".into(), "4".into()], &script).expect("head failed");
        assert_eq!(out, "xxxx");
    }
}
