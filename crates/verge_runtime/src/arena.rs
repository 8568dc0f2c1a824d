//! Per-thread state allocation.
//!
//! Candidate successor states are built one at a time: a thread duplicates
//! the state it is expanding, applies a rule, and either the candidate is
//! accepted into the seen set (it then lives forever) or it is a duplicate
//! and is discarded. The allocator exploits that shape: blocks come from a
//! bump arena, and the single most recently freed block is kept aside and
//! reused for the next allocation, so duplicate candidates cost no arena
//! growth. At most one candidate per thread is in flight at a time.
//!
//! Blocks are `u64` arrays so the liveness words at the front of a state
//! block are properly aligned for atomic access.

use bumpalo::Bump;
use std::ptr::NonNull;

/// Initial arena chunk size.
const ARENA_BYTES: usize = 8 * 1024 * 1024;

/// Bump allocator for the fixed-size state blocks of one thread.
pub struct StateAllocator {
    bump: Bump,
    spare: Option<NonNull<u64>>,
    words: usize,
}

// Allocators are moved into worker threads whole; the blocks they hand out
// are published to other threads only via the seen set.
unsafe impl Send for StateAllocator {}

impl StateAllocator {
    /// An allocator of `words`-word state blocks.
    pub fn new(words: usize) -> Self {
        let capacity = ARENA_BYTES.max(words * 8);
        Self {
            bump: Bump::with_capacity(capacity),
            spare: None,
            words: words.max(1),
        }
    }

    /// Allocates a zeroed state block.
    pub fn alloc(&mut self) -> NonNull<u64> {
        if let Some(spare) = self.spare.take() {
            unsafe {
                std::ptr::write_bytes(spare.as_ptr(), 0, self.words);
            }
            return spare;
        }
        let slice = self.bump.alloc_slice_fill_copy(self.words, 0u64);
        NonNull::new(slice.as_mut_ptr()).expect("bump allocation returned null")
    }

    /// Returns a block for reuse. Only the most recent allocation may be
    /// freed, and only while it has not been published to other threads.
    pub fn free(&mut self, block: NonNull<u64>) {
        debug_assert!(self.spare.is_none(), "freeing two states at once");
        self.spare = Some(block);
    }

    /// Total bytes the arena currently holds.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_zeroed() {
        let mut arena = StateAllocator::new(4);
        let block = arena.alloc();
        let words = unsafe { std::slice::from_raw_parts(block.as_ptr(), 4) };
        assert_eq!(words, &[0, 0, 0, 0]);
    }

    #[test]
    fn freed_block_is_recycled_and_rezeroed() {
        let mut arena = StateAllocator::new(2);
        let a = arena.alloc();
        unsafe {
            *a.as_ptr() = 0xdead;
        }
        arena.free(a);
        let b = arena.alloc();
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(unsafe { *b.as_ptr() }, 0);
    }

    #[test]
    fn distinct_live_blocks_do_not_alias() {
        let mut arena = StateAllocator::new(2);
        let a = arena.alloc();
        let b = arena.alloc();
        assert_ne!(a.as_ptr(), b.as_ptr());
    }
}
