//! Checker generation options.
//!
//! Everything here is fixed at generation time and baked into the emitted
//! source as constants; the generated binary takes no arguments.

use bitflags::bitflags;

bitflags! {
    /// Diagnostic trace categories, combined bitwise across repeated
    /// `--trace` options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceCategory: u64 {
        const HANDLE_READS = 0x1;
        const HANDLE_WRITES = 0x2;
        const QUEUE = 0x4;
        const SET = 0x8;
        const SYMMETRY_REDUCTION = 0x10;
        const MEMORY_USAGE = 0x20;
    }
}

impl TraceCategory {
    /// Parses one `--trace` argument.
    pub fn parse(text: &str) -> Option<TraceCategory> {
        match text {
            "handle_reads" => Some(TraceCategory::HANDLE_READS),
            "handle_writes" => Some(TraceCategory::HANDLE_WRITES),
            "queue" => Some(TraceCategory::QUEUE),
            "set" => Some(TraceCategory::SET),
            "symmetry_reduction" => Some(TraceCategory::SYMMETRY_REDUCTION),
            "memory_usage" => Some(TraceCategory::MEMORY_USAGE),
            "all" => Some(TraceCategory::all()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    Off,
    On,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlockDetection {
    Off,
    Stuck,
    Stuttering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetryReduction {
    Off,
    Heuristic,
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterexampleTrace {
    Off,
    Diff,
    Full,
}

/// All options of a generation run.
#[derive(Debug, Clone)]
pub struct CheckerOptions {
    /// Worker thread count; 0 means detect the processor count.
    pub threads: usize,
    /// Depth bound; 0 means unbounded.
    pub bound: u64,
    /// Initial seen-set capacity in bytes.
    pub set_capacity: usize,
    /// Occupancy percentage (1..=100) at which the seen set expands.
    pub set_expand_threshold: usize,
    /// Errors to report before stopping.
    pub max_errors: u64,
    pub deadlock_detection: DeadlockDetection,
    pub symmetry_reduction: SymmetryReduction,
    pub counterexample_trace: CounterexampleTrace,
    pub color: Tristate,
    pub traces: TraceCategory,
    /// Emit the checker's report as XML.
    pub machine_readable: bool,
    /// Bit-pack state metadata to minimal widths.
    pub pack_state: bool,
    /// Have the checker drop OS capabilities at startup.
    pub sandbox: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            bound: 0,
            set_capacity: 8 * 1024 * 1024,
            set_expand_threshold: 65,
            max_errors: 1,
            deadlock_detection: DeadlockDetection::Stuck,
            symmetry_reduction: SymmetryReduction::Heuristic,
            counterexample_trace: CounterexampleTrace::Diff,
            color: Tristate::Auto,
            traces: TraceCategory::empty(),
            machine_readable: false,
            pack_state: false,
            sandbox: false,
        }
    }
}

impl CheckerOptions {
    /// The thread count the checker will actually use.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_categories_combine_bitwise() {
        let combined = TraceCategory::parse("queue").unwrap()
            | TraceCategory::parse("set").unwrap();
        assert!(combined.contains(TraceCategory::QUEUE));
        assert!(combined.contains(TraceCategory::SET));
        assert!(!combined.contains(TraceCategory::HANDLE_READS));
    }

    #[test]
    fn all_covers_every_category() {
        let all = TraceCategory::parse("all").unwrap();
        assert!(all.contains(TraceCategory::MEMORY_USAGE));
        assert!(TraceCategory::parse("bogus").is_none());
    }

    #[test]
    fn effective_threads_detects_when_zero() {
        let options = CheckerOptions::default();
        assert!(options.effective_threads() >= 1);
        let fixed = CheckerOptions {
            threads: 3,
            ..CheckerOptions::default()
        };
        assert_eq!(fixed.effective_threads(), 3);
    }
}
