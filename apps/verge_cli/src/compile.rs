//! The compilation pipeline.
//!
//! Read → lex/parse → resolve → validate → (optional SMT simplify, then
//! re-resolve and re-validate, because substituted literals are fresh
//! nodes) → layout → codegen → write. The compiler surfaces the first
//! error and stops; only the simplification stage is allowed to fail
//! soft.

use crate::cli::Cli;
use crate::log::{Logger, Style};
use std::fmt;
use verge_compile::generate_checker;
use verge_language::analysis::{layout, resolve, validate};
use verge_language::{ast, parser};
use verge_verify::{simplify, Logic, LogicMode, Solver};

/// A pipeline failure: a located model error or an I/O problem.
#[derive(Debug)]
pub enum CompileError {
    Model(verge_base::LocatedError),
    Io { path: String, message: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Model(e) => write!(f, "{}", e),
            CompileError::Io { path, message } => write!(f, "{}: {}", path, message),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<verge_base::LocatedError> for CompileError {
    fn from(e: verge_base::LocatedError) -> Self {
        CompileError::Model(e)
    }
}

/// Runs the whole pipeline for one invocation.
pub fn compile(cli: &Cli, logger: &Logger) -> Result<(), CompileError> {
    let input_path = cli.input.display().to_string();
    let source = std::fs::read_to_string(&cli.input).map_err(|e| CompileError::Io {
        path: input_path.clone(),
        message: e.to_string(),
    })?;

    logger.info(&format!("parsing {}...", input_path));
    let mut model = parser::parse(&source, Some(&input_path))?;

    logger.info("resolving symbols...");
    let mut bindings = resolve(&model)?;

    logger.info("validating...");
    let mut validated = validate(&model, &bindings)?;

    if let Some(smt_path) = &cli.smt_path {
        logger.info("simplifying with the SMT solver...");
        let mut solver = Solver::new(smt_path.clone(), cli.smt_args.clone(), cli.smt_budget);
        for text in &cli.smt_prelude {
            solver.add_prelude(text.clone());
        }
        let mode = if cli.smt_bitvectors {
            LogicMode::BitVector
        } else {
            LogicMode::Integer
        };
        let logic = Logic::new(mode);
        let stats = simplify(&mut model, &bindings, &mut solver, &logic);
        for note in &stats.notes {
            logger.debug(note);
        }
        logger.info(&format!(
            "SMT simplification: {} queries, {} substitutions, {} unsupported, {}ms solver time",
            stats.queries,
            stats.simplified,
            stats.unsupported,
            solver.used_ms()
        ));

        /* substituted literals are fresh nodes; rebuild ids, bindings and
         * validation facts before layout and codegen
         */
        if stats.simplified > 0 {
            ast::reindex(&mut model);
            bindings = resolve(&model)?;
            validated = validate(&model, &bindings)?;
        }
    }

    logger.info("computing the state layout...");
    let state_layout = layout(&mut model, &bindings)?;
    logger.info(&format!(
        "state is {} bits over {} variables",
        state_layout.state_size_bits,
        state_layout.vars.len()
    ));

    logger.info("generating the checker...");
    let options = cli.checker_options();
    let checker = generate_checker(
        &model,
        &bindings,
        &validated,
        &state_layout,
        &options,
        &input_path,
    )?;

    std::fs::write(&cli.output, checker).map_err(|e| CompileError::Io {
        path: cli.output.display().to_string(),
        message: e.to_string(),
    })?;
    logger.info(&format!("wrote {}", cli.output.display()));
    Ok(())
}

/// Formats a model error for terminal display, with the offending source
/// line when available.
pub fn render_error(source: &str, error: &verge_base::LocatedError, color: bool) -> String {
    let mut out = String::new();
    let header = format!("{}", error);
    if color {
        out.push_str(&Style::bold_red("error"));
        out.push_str(": ");
    } else {
        out.push_str("error: ");
    }
    out.push_str(&header);
    out.push('\n');

    let line_number = error.location.begin.line as usize;
    if let Some(line) = source.lines().nth(line_number.saturating_sub(1)) {
        out.push_str(&format!("{:>5} | {}\n", line_number, line));
        let column = error.location.begin.column as usize;
        out.push_str(&format!("{:>5} | {}^\n", "", " ".repeat(column.saturating_sub(1))));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::log::{LogLevel, Logger};
    use clap::Parser;

    fn run(args: &[&str]) -> Result<(), CompileError> {
        let cli = Cli::try_parse_from(args).expect("argument parsing failed");
        let logger = Logger::new(LogLevel::Silent, false);
        compile(&cli, &logger)
    }

    #[test]
    fn compiles_a_model_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("smoke.m");
        let output = dir.path().join("checker.rs");
        std::fs::write(
            &model,
            "var v: boolean;\n\
             startstate begin v := false; end;\n\
             rule \"flip\" !v ==> begin v := true; end;\n\
             invariant \"sane\" v | !v;",
        )
        .unwrap();

        run(&[
            "verge",
            model.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--threads",
            "2",
        ])
        .expect("compilation failed");

        let generated = std::fs::read_to_string(&output).unwrap();
        assert!(generated.contains("pub const THREADS: usize = 2;"));
        assert!(generated.contains("fn startstate0("));
        assert!(generated.contains("rt::run(model(), config)"));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let err = run(&["verge", "/nonexistent/model.m", "-o", "/tmp/x.rs"]).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn model_errors_carry_locations() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("bad.m");
        let output = dir.path().join("checker.rs");
        std::fs::write(&model, "var x: missing_type;").unwrap();

        let err = run(&[
            "verge",
            model.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .unwrap_err();
        match err {
            CompileError::Model(e) => {
                assert!(e.to_string().contains("unresolved type"));
                assert_eq!(e.location.begin.line, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn render_error_points_at_the_column() {
        let source = "var x: missing;";
        let error = verge_base::LocatedError::new(
            "unresolved type \"missing\"",
            verge_base::Location::new(
                verge_base::Position::new(1, 8),
                verge_base::Position::new(1, 15),
            ),
        );
        let rendered = render_error(source, &error, false);
        assert!(rendered.contains("var x: missing;"));
        assert!(rendered.contains("       ^"));
    }
}
