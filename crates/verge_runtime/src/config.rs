//! Runtime configuration.
//!
//! A generated checker bakes its options in at generation time and builds
//! one [`Config`] in `main`. Nothing here is read from the environment or
//! the command line at run time.

/// Trace categories, combined bitwise. These mirror the compiler's
/// repeatable `--trace` option.
pub mod trace {
    pub const HANDLE_READS: u64 = 0x1;
    pub const HANDLE_WRITES: u64 = 0x2;
    pub const QUEUE: u64 = 0x4;
    pub const SET: u64 = 0x8;
    pub const SYMMETRY_REDUCTION: u64 = 0x10;
    pub const MEMORY_USAGE: u64 = 0x20;
    pub const ALL: u64 = u64::MAX;
}

/// Whether to use ANSI colour codes in checker output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    Off,
    On,
    /// Decide by whether stdout is a terminal.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlockDetection {
    Off,
    /// A state with no enabled rule is a deadlock.
    Stuck,
    /// A state whose every enabled rule reproduces the state byte-for-byte
    /// is also a deadlock.
    Stuttering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryReduction {
    Off,
    /// Canonicalize each scalarset independently.
    Heuristic,
    /// Canonicalize over the full product of scalarset permutations.
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterexampleTrace {
    Off,
    /// Print only the fields that changed in each step.
    Diff,
    /// Print every state in full.
    Full,
}

/// All options of a generated checker.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count; at least 1.
    pub threads: usize,
    /// Depth bound; 0 means unbounded.
    pub bound: u64,
    /// Initial seen-set capacity in bytes of slot storage.
    pub set_capacity: usize,
    /// Occupancy percentage at which the seen set expands.
    pub set_expand_threshold: usize,
    /// Number of errors to report before terminating.
    pub max_errors: u64,
    pub deadlock_detection: DeadlockDetection,
    pub symmetry_reduction: SymmetryReduction,
    pub counterexample_trace: CounterexampleTrace,
    pub color: Tristate,
    /// Enabled trace categories (see [`trace`]).
    pub traces: u64,
    /// Emit the report as XML instead of human-readable text.
    pub machine_readable: bool,
    /// Bit-pack state metadata to its minimal widths.
    pub pack_state: bool,
    /// Drop OS capabilities before exploring.
    pub sandbox: bool,
}

impl Config {
    /// Whether any trace category in `mask` is enabled.
    pub fn tracing(&self, mask: u64) -> bool {
        self.traces & mask != 0
    }

    /// States need a predecessor link only when someone will walk it.
    pub fn wants_previous(&self, liveness_count: usize) -> bool {
        self.counterexample_trace != CounterexampleTrace::Off || liveness_count > 0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threads: 1,
            bound: 0,
            set_capacity: 8 * 1024 * 1024,
            set_expand_threshold: 65,
            max_errors: 1,
            deadlock_detection: DeadlockDetection::Stuck,
            symmetry_reduction: SymmetryReduction::Heuristic,
            counterexample_trace: CounterexampleTrace::Diff,
            color: Tristate::Auto,
            traces: 0,
            machine_readable: false,
            pack_state: false,
            sandbox: false,
        }
    }
}
