//! The solver façade.
//!
//! A [`Solver`] accumulates declarations and assertions in a stack of
//! prelude buffers — one per open lexical scope, mirroring the symbol
//! resolver — and answers validity queries by running the external solver
//! binary once per question. You might think `(push)`/`(pop)` could
//! implement the scoping, but several solvers only support those in
//! incremental mode and we run one-shot, so closing a scope simply drops
//! its buffer.
//!
//! Every query is charged against a wall-clock budget in milliseconds;
//! once spent, further queries fail with `BudgetExhausted` and the
//! simplification pass stops asking.

use crate::error::{VerifyError, VerifyResult};
use crate::process::run_one_shot;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

pub struct Solver {
    path: String,
    args: Vec<String>,
    /// User-supplied prelude text emitted before our declarations.
    user_prelude: Vec<String>,
    /// One buffer per open scope.
    prelude: Vec<String>,
    budget_ms: u128,
    used_ms: u128,
}

impl Solver {
    pub fn new(path: impl Into<String>, args: Vec<String>, budget_ms: u64) -> Self {
        Self {
            path: path.into(),
            args,
            user_prelude: Vec::new(),
            prelude: Vec::new(),
            budget_ms: budget_ms as u128,
            used_ms: 0,
        }
    }

    pub fn add_prelude(&mut self, text: impl Into<String>) {
        self.user_prelude.push(text.into());
    }

    /// Opens a lexical scope; subsequent declarations go into it.
    pub fn open_scope(&mut self) {
        self.prelude.push(String::new());
    }

    /// Closes the innermost scope, dropping its declarations.
    pub fn close_scope(&mut self) {
        debug_assert!(!self.prelude.is_empty(), "closing a scope when none are open");
        self.prelude.pop();
    }

    /// Appends declaration text to the innermost scope.
    pub fn write(&mut self, text: &str) {
        debug_assert!(!self.prelude.is_empty(), "writing SMT content without an open scope");
        if let Some(top) = self.prelude.last_mut() {
            top.push_str(text);
        }
    }

    /// Milliseconds of solver time spent so far.
    pub fn used_ms(&self) -> u128 {
        self.used_ms
    }

    /// Test hook: the accumulated scope buffers.
    #[cfg(test)]
    pub(crate) fn prelude_for_tests(&self) -> &[String] {
        &self.prelude
    }

    /// Checks satisfiability of the accumulated context plus `claim`
    /// (negated when `negate` is set, for validity checks).
    pub fn solve(&mut self, claim: &str, negate: bool) -> VerifyResult<SatResult> {
        if self.used_ms >= self.budget_ms {
            return Err(VerifyError::BudgetExhausted);
        }

        let mut query = String::new();
        query.push_str("(set-option :print-success false)\n");
        for text in &self.user_prelude {
            query.push_str(text);
            query.push('\n');
        }
        for scope in &self.prelude {
            query.push_str(scope);
        }
        if negate {
            query.push_str(&format!("(assert (not {}))\n", claim));
        } else {
            query.push_str(&format!("(assert {})\n", claim));
        }
        query.push_str("(check-sat)\n");

        let started = Instant::now();
        let output = run_one_shot(&self.path, &self.args, &query);
        self.used_ms += started.elapsed().as_millis();

        let output = output?;
        for line in output.lines() {
            match line.trim() {
                "sat" => return Ok(SatResult::Sat),
                "unsat" => return Ok(SatResult::Unsat),
                "unknown" => return Ok(SatResult::Unknown),
                _ => continue,
            }
        }
        Err(VerifyError::inconclusive(format!(
            "no sat/unsat line in solver output {:?}",
            output.lines().next().unwrap_or("")
        )))
    }

    /// Whether `claim` holds in every interpretation: its negation is
    /// unsatisfiable.
    pub fn is_true(&mut self, claim: &str) -> VerifyResult<bool> {
        Ok(self.solve(claim, true)? == SatResult::Unsat)
    }

    /// Whether `claim` is unsatisfiable outright.
    pub fn is_false(&mut self, claim: &str) -> VerifyResult<bool> {
        Ok(self.solve(claim, false)? == SatResult::Unsat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    /// Writes a fake solver script that always answers `answer`.
    fn fake_solver(answer: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.sh");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "#!/bin/sh\ncat > /dev/null\necho {}", answer).unwrap();
        drop(f);
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    #[test]
    fn unsat_negation_means_valid() {
        let (_dir, path) = fake_solver("unsat");
        let mut solver = Solver::new(path, vec![], 10_000);
        solver.open_scope();
        assert!(solver.is_true("(= 1 1)").unwrap());
        assert!(solver.is_false("(= 1 2)").unwrap());
    }

    #[test]
    fn unknown_is_not_conclusive() {
        let (_dir, path) = fake_solver("unknown");
        let mut solver = Solver::new(path, vec![], 10_000);
        solver.open_scope();
        assert!(!solver.is_true("(= 1 1)").unwrap());
        assert!(!solver.is_false("(= 1 1)").unwrap());
    }

    #[test]
    fn zero_budget_exhausts_immediately() {
        let (_dir, path) = fake_solver("unsat");
        let mut solver = Solver::new(path, vec![], 0);
        solver.open_scope();
        assert!(matches!(
            solver.is_true("true").unwrap_err(),
            VerifyError::BudgetExhausted
        ));
    }

    #[test]
    fn scopes_nest_and_drop() {
        let mut solver = Solver::new("true", vec![], 1_000);
        solver.open_scope();
        solver.write("(declare-fun a () Int)\n");
        solver.open_scope();
        solver.write("(declare-fun b () Int)\n");
        assert_eq!(solver.prelude.len(), 2);
        solver.close_scope();
        assert_eq!(solver.prelude.len(), 1);
        assert!(solver.prelude[0].contains("a"));
    }
}
