//! Liveness bookkeeping.
//!
//! Each state carries one bit per liveness property. A bit is set when the
//! property holds in the state itself, and propagates backwards along the
//! `previous` links (a DAG rooted at the start states), because a path
//! through a state that satisfies the property also satisfies it for every
//! ancestor on that path. Accumulation uses per-word atomic fetch-or, so a
//! set bit is never lost and propagation is monotone.
//!
//! Exploration alone cannot see every edge of the state graph: a successor
//! that deduplicated against an existing state never linked back to its
//! parent. The driver therefore runs a final pass after the search,
//! re-firing every rule from every seen state and learning bits from each
//! successor's canonical twin, until a fixpoint.

use crate::state::{StateLayout, StateRef};
use std::sync::atomic::Ordering;

/// Marks liveness property `index` as satisfied in `s` and propagates the
/// bit to all predecessors.
pub fn mark(layout: &StateLayout, s: StateRef, index: usize) {
    debug_assert!(index < layout.liveness_count, "out of range liveness write");
    let mut current = Some(s);
    while let Some(state) = current {
        let word = index / 64;
        let mask = 1u64 << (index % 64);
        let previous_value = state
            .liveness_word(layout, word)
            .fetch_or(mask, Ordering::SeqCst);
        if previous_value & mask != 0 {
            /* Already set here, so every ancestor is already marked too
             * and we can stop early.
             */
            break;
        }
        current = state.previous(layout);
    }
}

/// Whether property `index` is known satisfied for `s`.
pub fn is_marked(layout: &StateLayout, s: StateRef, index: usize) -> bool {
    let word = index / 64;
    let mask = 1u64 << (index % 64);
    s.liveness_word(layout, word).load(Ordering::SeqCst) & mask != 0
}

/// Number of liveness properties not yet known satisfied for `s`.
pub fn unknown(layout: &StateLayout, s: StateRef) -> usize {
    let mut unknown = 0;
    for index in 0..layout.liveness_count {
        if !is_marked(layout, s, index) {
            unknown += 1;
        }
    }
    unknown
}

/// Learns liveness facts `successor` knows that `s` does not. Typically
/// `successor` is not literally a child of `s` but the de-duplicated twin
/// of one. Returns the number of new facts learnt.
pub fn learn(layout: &StateLayout, s: StateRef, successor: StateRef) -> usize {
    let mut new_info = 0;
    for word in 0..layout.liveness_words {
        let from = successor.liveness_word(layout, word).load(Ordering::SeqCst);
        let have = s.liveness_word(layout, word).load(Ordering::SeqCst);
        let mut missing = from & !have;
        while missing != 0 {
            let bit = missing.trailing_zeros() as usize;
            let index = word * 64 + bit;
            if index >= layout.liveness_count {
                break;
            }
            mark(layout, s, index);
            missing &= missing - 1;
            new_info += 1;
        }
    }
    new_info
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StateAllocator;
    use crate::config::Config;

    fn chain(layout: &StateLayout, arena: &mut StateAllocator, len: usize) -> Vec<StateRef> {
        let mut states = Vec::new();
        let root = StateRef::from_block(arena.alloc());
        states.push(root);
        for i in 1..len {
            let s = StateRef::from_block(arena.alloc());
            unsafe {
                s.init_duplicate(layout, states[i - 1]);
            }
            states.push(s);
        }
        states
    }

    fn test_layout(liveness: usize) -> StateLayout {
        StateLayout::new(&Config::default(), 16, liveness, 1, &[])
    }

    #[test]
    fn marking_propagates_to_all_predecessors() {
        let layout = test_layout(2);
        let mut arena = StateAllocator::new(layout.total_words);
        let states = chain(&layout, &mut arena, 4);

        mark(&layout, states[3], 1);
        for s in &states {
            assert!(is_marked(&layout, *s, 1));
            assert!(!is_marked(&layout, *s, 0));
        }
    }

    #[test]
    fn bits_are_monotone() {
        let layout = test_layout(3);
        let mut arena = StateAllocator::new(layout.total_words);
        let states = chain(&layout, &mut arena, 2);

        mark(&layout, states[1], 0);
        mark(&layout, states[1], 0);
        mark(&layout, states[1], 2);
        assert!(is_marked(&layout, states[1], 0));
        assert!(is_marked(&layout, states[1], 2));
        assert_eq!(unknown(&layout, states[1]), 1);
    }

    #[test]
    fn learn_copies_only_missing_bits() {
        let layout = test_layout(2);
        let mut arena = StateAllocator::new(layout.total_words);
        let a = StateRef::from_block(arena.alloc());
        let b = StateRef::from_block(arena.alloc());

        mark(&layout, b, 0);
        mark(&layout, b, 1);
        mark(&layout, a, 0);

        assert_eq!(learn(&layout, a, b), 1);
        assert_eq!(unknown(&layout, a), 0);
        assert_eq!(learn(&layout, a, b), 0);
    }

    #[test]
    fn learning_propagates_through_ancestors() {
        let layout = test_layout(1);
        let mut arena = StateAllocator::new(layout.total_words);
        let states = chain(&layout, &mut arena, 3);
        let twin = StateRef::from_block(arena.alloc());
        mark(&layout, twin, 0);

        assert_eq!(learn(&layout, states[2], twin), 1);
        assert!(is_marked(&layout, states[0], 0));
    }
}
