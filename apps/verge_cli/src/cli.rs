//! Command-line interface for the verge compiler.
//!
//! Invoked as `verge [options] input.m`. The only required option is
//! `--output`; everything else has the defaults the generated checker
//! bakes in. Repeatable options (`--trace`, `--smt-arg`,
//! `--smt-prelude`) accumulate; trace categories combine bitwise.

use crate::log::LogLevel;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use verge_compile::{
    CheckerOptions, CounterexampleTrace, DeadlockDetection, SymmetryReduction, TraceCategory,
    Tristate,
};

#[derive(Parser)]
#[command(name = "verge")]
#[command(about = "Compile a protocol model into a native state-space checker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// The model source file.
    pub input: PathBuf,

    /// Where to write the generated checker source.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Worker threads in the generated checker (0 = detect processors).
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Depth bound for exploration (0 = unbounded).
    #[arg(long, default_value_t = 0)]
    pub bound: u64,

    /// Initial capacity of the seen-state set, in bytes.
    #[arg(long, default_value_t = 8 * 1024 * 1024)]
    pub set_capacity: usize,

    /// Occupancy percentage at which the seen set expands (1-100).
    #[arg(long, default_value_t = 65, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub set_expand_threshold: u8,

    /// Number of errors the checker reports before stopping.
    #[arg(long, default_value_t = 1)]
    pub max_errors: u64,

    /// Colour in the checker's output.
    #[arg(long, value_enum, default_value_t = ColorArg::Auto)]
    pub color: ColorArg,

    /// Diagnostic trace categories (repeatable, combined).
    #[arg(long = "trace", value_enum)]
    pub traces: Vec<TraceArg>,

    /// Deadlock detection mode.
    #[arg(long, value_enum, default_value_t = DeadlockArg::Stuck)]
    pub deadlock_detection: DeadlockArg,

    /// Symmetry reduction mode.
    #[arg(long, value_enum, default_value_t = SymmetryArg::Heuristic)]
    pub symmetry_reduction: SymmetryArg,

    /// Counterexample trace style.
    #[arg(long, value_enum, default_value_t = CexArg::Diff)]
    pub counterexample_trace: CexArg,

    /// Have the checker drop OS capabilities at startup.
    #[arg(long, value_enum, default_value_t = OnOffArg::Off)]
    pub sandbox: OnOffArg,

    /// Emit the checker's report as XML.
    #[arg(long)]
    pub machine_readable: bool,

    /// Bit-pack state metadata to its minimal widths.
    #[arg(long)]
    pub pack_state: bool,

    /// Path to an SMT solver; enables expression simplification.
    #[arg(long)]
    pub smt_path: Option<String>,

    /// Argument passed to the SMT solver (repeatable).
    #[arg(long = "smt-arg", allow_hyphen_values = true)]
    pub smt_args: Vec<String>,

    /// Total solver time budget in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub smt_budget: u64,

    /// Model values as 64-bit bitvectors instead of unbounded integers.
    #[arg(long)]
    pub smt_bitvectors: bool,

    /// SMT-LIB text emitted before generated declarations (repeatable).
    #[arg(long = "smt-prelude")]
    pub smt_prelude: Vec<String>,

    /// Suppress warnings.
    #[arg(long, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// Report progress through the pipeline.
    #[arg(long)]
    pub verbose: bool,

    /// Report everything, including solver interactions.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    On,
    Off,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnOffArg {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceArg {
    HandleReads,
    HandleWrites,
    Queue,
    Set,
    SymmetryReduction,
    MemoryUsage,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeadlockArg {
    Off,
    Stuck,
    Stuttering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SymmetryArg {
    Off,
    Heuristic,
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CexArg {
    Off,
    Diff,
    Full,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        if self.quiet {
            LogLevel::Silent
        } else if self.debug {
            LogLevel::Debug
        } else if self.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warnings
        }
    }

    /// Whether the compiler's own stderr output should be coloured.
    pub fn color_enabled(&self) -> bool {
        match self.color {
            ColorArg::On => true,
            ColorArg::Off => false,
            ColorArg::Auto => unsafe { libc_isatty_stderr() },
        }
    }

    /// The generation options this invocation selects.
    pub fn checker_options(&self) -> CheckerOptions {
        let mut traces = TraceCategory::empty();
        for t in &self.traces {
            traces |= match t {
                TraceArg::HandleReads => TraceCategory::HANDLE_READS,
                TraceArg::HandleWrites => TraceCategory::HANDLE_WRITES,
                TraceArg::Queue => TraceCategory::QUEUE,
                TraceArg::Set => TraceCategory::SET,
                TraceArg::SymmetryReduction => TraceCategory::SYMMETRY_REDUCTION,
                TraceArg::MemoryUsage => TraceCategory::MEMORY_USAGE,
                TraceArg::All => TraceCategory::all(),
            };
        }
        CheckerOptions {
            threads: self.threads,
            bound: self.bound,
            set_capacity: self.set_capacity,
            set_expand_threshold: self.set_expand_threshold as usize,
            max_errors: self.max_errors,
            deadlock_detection: match self.deadlock_detection {
                DeadlockArg::Off => DeadlockDetection::Off,
                DeadlockArg::Stuck => DeadlockDetection::Stuck,
                DeadlockArg::Stuttering => DeadlockDetection::Stuttering,
            },
            symmetry_reduction: match self.symmetry_reduction {
                SymmetryArg::Off => SymmetryReduction::Off,
                SymmetryArg::Heuristic => SymmetryReduction::Heuristic,
                SymmetryArg::Exhaustive => SymmetryReduction::Exhaustive,
            },
            counterexample_trace: match self.counterexample_trace {
                CexArg::Off => CounterexampleTrace::Off,
                CexArg::Diff => CounterexampleTrace::Diff,
                CexArg::Full => CounterexampleTrace::Full,
            },
            color: match self.color {
                ColorArg::On => Tristate::On,
                ColorArg::Off => Tristate::Off,
                ColorArg::Auto => Tristate::Auto,
            },
            traces,
            machine_readable: self.machine_readable,
            pack_state: self.pack_state,
            sandbox: self.sandbox == OnOffArg::On,
        }
    }
}

/// Whether stderr is a terminal, without pulling a dependency in for one
/// call.
unsafe fn libc_isatty_stderr() -> bool {
    extern "C" {
        fn isatty(fd: i32) -> i32;
    }
    isatty(2) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("argument parsing failed")
    }

    #[test]
    fn minimal_invocation() {
        let cli = parse(&["verge", "model.m", "--output", "checker.rs"]);
        assert_eq!(cli.input.to_str(), Some("model.m"));
        assert_eq!(cli.threads, 0);
        assert_eq!(cli.max_errors, 1);
        assert_eq!(cli.log_level(), LogLevel::Warnings);
    }

    #[test]
    fn traces_accumulate() {
        let cli = parse(&[
            "verge", "model.m", "-o", "c.rs", "--trace", "queue", "--trace", "set",
        ]);
        let options = cli.checker_options();
        assert!(options.traces.contains(TraceCategory::QUEUE));
        assert!(options.traces.contains(TraceCategory::SET));
        assert!(!options.traces.contains(TraceCategory::HANDLE_READS));
    }

    #[test]
    fn expand_threshold_is_range_checked() {
        assert!(Cli::try_parse_from(["verge", "m", "-o", "c", "--set-expand-threshold", "0"])
            .is_err());
        assert!(Cli::try_parse_from(["verge", "m", "-o", "c", "--set-expand-threshold", "101"])
            .is_err());
        let cli = parse(&["verge", "m", "-o", "c", "--set-expand-threshold", "80"]);
        assert_eq!(cli.checker_options().set_expand_threshold, 80);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["verge", "m", "-o", "c", "--quiet", "--verbose"]).is_err());
    }

    #[test]
    fn smt_flags_collect() {
        let cli = parse(&[
            "verge",
            "m",
            "-o",
            "c",
            "--smt-path",
            "z3",
            "--smt-arg",
            "-in",
            "--smt-arg",
            "-smt2",
            "--smt-bitvectors",
        ]);
        assert_eq!(cli.smt_path.as_deref(), Some("z3"));
        assert_eq!(cli.smt_args, vec!["-in", "-smt2"]);
        assert!(cli.smt_bitvectors);
    }

    #[test]
    fn mode_flags_map_to_options() {
        let cli = parse(&[
            "verge",
            "m",
            "-o",
            "c",
            "--deadlock-detection",
            "stuttering",
            "--symmetry-reduction",
            "exhaustive",
            "--counterexample-trace",
            "full",
            "--sandbox",
            "on",
        ]);
        let options = cli.checker_options();
        assert_eq!(options.deadlock_detection, DeadlockDetection::Stuttering);
        assert_eq!(options.symmetry_reduction, SymmetryReduction::Exhaustive);
        assert_eq!(options.counterexample_trace, CounterexampleTrace::Full);
        assert!(options.sandbox);
    }
}
