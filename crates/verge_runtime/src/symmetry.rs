//! Symmetry reduction: canonicalization over scalarset permutations.
//!
//! Values of a scalarset type are interchangeable, so states that differ
//! only by a permutation of them are equivalent. Canonicalization replaces
//! a state by the lexicographically least member of its equivalence class:
//! it enumerates permutations with Heap's algorithm — driven by a
//! per-scalarset schedule array, swapping against index 0 or
//! `schedule[i]` according to the parity of `i` — applies the generated
//! `swap` functions to a working copy, and keeps the minimum image found.
//!
//! Exhaustive mode enumerates the full cross product of all scalarsets'
//! permutation spaces; heuristic mode canonicalizes each scalarset
//! independently, which considers only a subset of the product but is
//! cheap enough for large bounds. Both are deterministic and idempotent.
//!
//! When states carry schedule metadata, the schedule that produced the
//! chosen representative is recorded for the trace output.

use crate::config::{Config, SymmetryReduction};
use crate::model::Model;
use crate::output::Output;
use crate::state::{bits_for, StateLayout, StateRef};
use crate::value::Value;
use crate::config::trace;

/// Schedule width in bits for a scalarset of the given bound, when
/// schedules are recorded: `bound` entries of `bits_for(bound - 1)` bits.
pub fn schedule_width(bound: u64) -> usize {
    bound as usize * bits_for(bound.saturating_sub(1))
}

/// Canonicalizes `s` in place according to the configured mode.
///
/// # Safety contract
/// The caller must own `s` exclusively (pre-publication).
pub fn canonicalize(
    model: &Model,
    layout: &StateLayout,
    cfg: &Config,
    out: &Output,
    s: StateRef,
) {
    match cfg.symmetry_reduction {
        SymmetryReduction::Off => {}
        SymmetryReduction::Heuristic => {
            for index in 0..model.scalarsets.len() {
                canonicalize_sets(model, layout, out, s, index..index + 1);
            }
        }
        SymmetryReduction::Exhaustive => {
            canonicalize_sets(model, layout, out, s, 0..model.scalarsets.len());
        }
    }
}

/// Canonicalizes over the product of the permutation spaces of the given
/// scalarset range.
fn canonicalize_sets(
    model: &Model,
    layout: &StateLayout,
    out: &Output,
    s: StateRef,
    sets: std::ops::Range<usize>,
) {
    if sets.is_empty() {
        return;
    }

    let best = unsafe { s.data_mut(layout) };
    let mut candidate = best.to_vec();
    let mut walker = Walker {
        model,
        best,
        schedules: model
            .scalarsets
            .iter()
            .map(|d| vec![0u64; d.bound as usize])
            .collect(),
        best_schedules: None,
        improved: false,
    };
    walker.walk(sets.clone(), &mut candidate);

    // record the schedule that produced the representative
    if layout.schedule_count() > 0 {
        if let Some(best_schedules) = walker.best_schedules.take() {
            for (i, schedule) in best_schedules.iter().enumerate() {
                let bound = model.scalarsets[i].bound;
                let elem_bits = bits_for(bound.saturating_sub(1));
                if elem_bits == 0 {
                    continue;
                }
                for (elem, v) in schedule.iter().enumerate() {
                    unsafe {
                        s.set_schedule_elem(layout, i, elem, elem_bits, *v);
                    }
                }
            }
        }
    }

    if walker.improved && out.tracing(trace::SYMMETRY_REDUCTION) {
        out.trace(
            trace::SYMMETRY_REDUCTION,
            &format!("canonicalized state {:#x}", s.addr()),
        );
    }
}

struct Walker<'a> {
    model: &'a Model,
    best: &'a mut [u8],
    /// The Heap's-algorithm working arrays, one per scalarset.
    schedules: Vec<Vec<u64>>,
    /// Snapshot of the schedules at the moment `best` was last improved.
    best_schedules: Option<Vec<Vec<u64>>>,
    improved: bool,
}

impl<'a> Walker<'a> {
    /// Considers the current candidate arrangement.
    fn consider(&mut self, candidate: &[u8]) {
        if candidate < &*self.best {
            self.best.copy_from_slice(candidate);
            self.best_schedules = Some(self.schedules.clone());
            self.improved = true;
        }
    }

    /// Enumerates all permutations of `sets` applied to `candidate`,
    /// innermost sets varying fastest.
    fn walk(&mut self, sets: std::ops::Range<usize>, candidate: &mut Vec<u8>) {
        let Some(index) = sets.clone().next() else {
            self.consider(candidate);
            return;
        };
        let rest = index + 1..sets.end;

        let bound = self.model.scalarsets[index].bound as usize;
        for slot in self.schedules[index].iter_mut() {
            *slot = 0;
        }

        // identity permutation first
        self.walk(rest.clone(), candidate);

        let mut i = 0usize;
        while i < bound {
            if (self.schedules[index][i] as usize) < i {
                let (x, y) = if i % 2 == 0 {
                    (0, i)
                } else {
                    (self.schedules[index][i] as usize, i)
                };
                (self.model.scalarsets[index].swap)(candidate, x as Value, y as Value);
                self.walk(rest.clone(), candidate);
                self.schedules[index][i] += 1;
                i = 0;
            } else {
                self.schedules[index][i] = 0;
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StateAllocator;
    use crate::config::Tristate;
    use crate::handle::{read_raw, write_raw};
    use crate::model::ScalarsetDesc;

    /// A model with one scalarset of bound 3 indexing an array of 2-bit
    /// cells at state offset 0 (cell `i` at bits `2 * i`), mirroring what
    /// the code generator emits for `array [scalarset(3)] of boolean`.
    fn test_model() -> Model {
        let swap: crate::model::SwapFn = Box::new(|data: &mut [u8], x: Value, y: Value| {
            if x != y {
                let a = read_raw(data, 2 * x as usize, 2);
                let b = read_raw(data, 2 * y as usize, 2);
                write_raw(data, 2 * y as usize, 2, a);
                write_raw(data, 2 * x as usize, 2, b);
            }
        });
        Model {
            state_bits: 6,
            start_states: vec![],
            rules: vec![],
            properties: vec![],
            scalarsets: vec![ScalarsetDesc {
                name: "pid".into(),
                bound: 3,
                swap,
            }],
            print_state: None,
        }
    }

    fn test_output() -> Output {
        Output::new(&Config {
            color: Tristate::Off,
            ..Config::default()
        })
    }

    fn make_state(layout: &StateLayout, arena: &mut StateAllocator, cells: [u64; 3]) -> StateRef {
        let s = StateRef::from_block(arena.alloc());
        let data = unsafe { s.data_mut(layout) };
        for (i, v) in cells.iter().enumerate() {
            write_raw(data, 2 * i, 2, *v);
        }
        s
    }

    fn canon(mode: SymmetryReduction, cells: [u64; 3]) -> Vec<u8> {
        let model = test_model();
        let cfg = Config {
            symmetry_reduction: mode,
            ..Config::default()
        };
        let layout = StateLayout::new(&cfg, model.state_bits, 0, 1, &[]);
        let mut arena = StateAllocator::new(layout.total_words);
        let out = test_output();
        let s = make_state(&layout, &mut arena, cells);
        canonicalize(&model, &layout, &cfg, &out, s);
        s.data(&layout).to_vec()
    }

    #[test]
    fn permuted_states_share_a_canonical_form() {
        // all single-true arrangements are permutations of one another
        let a = canon(SymmetryReduction::Exhaustive, [2, 1, 1]);
        let b = canon(SymmetryReduction::Exhaustive, [1, 2, 1]);
        let c = canon(SymmetryReduction::Exhaustive, [1, 1, 2]);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let model = test_model();
        let cfg = Config {
            symmetry_reduction: SymmetryReduction::Exhaustive,
            ..Config::default()
        };
        let layout = StateLayout::new(&cfg, model.state_bits, 0, 1, &[]);
        let mut arena = StateAllocator::new(layout.total_words);
        let out = test_output();
        let s = make_state(&layout, &mut arena, [2, 1, 2]);
        canonicalize(&model, &layout, &cfg, &out, s);
        let once = s.data(&layout).to_vec();
        canonicalize(&model, &layout, &cfg, &out, s);
        assert_eq!(s.data(&layout), &once[..]);
    }

    #[test]
    fn off_leaves_the_state_unchanged() {
        let raw = canon(SymmetryReduction::Off, [1, 1, 2]);
        let layout = StateLayout::new(&Config::default(), 6, 0, 1, &[]);
        assert_eq!(read_raw(&raw, 4, 2), 2);
        let _ = layout;
    }

    #[test]
    fn heuristic_agrees_with_exhaustive_for_one_scalarset() {
        // with a single scalarset the heuristic subset is the whole space
        for cells in [[2, 1, 1], [1, 2, 1], [1, 1, 2], [2, 2, 1]] {
            assert_eq!(
                canon(SymmetryReduction::Heuristic, cells),
                canon(SymmetryReduction::Exhaustive, cells)
            );
        }
    }

    #[test]
    fn distinct_classes_stay_distinct() {
        let one_true = canon(SymmetryReduction::Exhaustive, [2, 1, 1]);
        let two_true = canon(SymmetryReduction::Exhaustive, [2, 2, 1]);
        assert_ne!(one_true, two_true);
    }
}
