//! The seen-state set.
//!
//! An open-addressed hash table of slots, each `empty`, `tombstone`, or a
//! state pointer. Insertion hashes the state's packed data, probes
//! linearly, and claims slots by CAS; duplicates are detected by full
//! data-byte comparison, so insertion is linearizable: of two racing
//! inserts of byte-identical states exactly one succeeds.
//!
//! When occupancy crosses the configured threshold the set expands: one
//! thread (behind a double-checked lock) publishes a double-size table as
//! `next`, and every thread that notices — by the publication itself or by
//! hitting a tombstone mid-probe — joins the migration, claiming 4 KiB
//! chunks of slots via an atomic cursor, tombstoning each migrated slot
//! and re-inserting live entries into the new table. A rendezvous after
//! migration lets its leader free the old table and shift `next` into
//! `current`. At most two tables are ever in flight.
//!
//! The `current`/`next` table pointers are reference-counted `(pointer,
//! count)` pairs held in double-word atomics; the count tracks threads
//! holding a cached pointer to the table, and the last release during the
//! shift is what makes freeing the old table safe.

use crate::config::trace;
use crate::dword::DwordAtomic;
use crate::output::Output;
use crate::rendezvous::Rendezvous;
use crate::state::{StateLayout, StateRef};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const TOMBSTONE: usize = usize::MAX;

/// Slots migrated per claimed chunk.
const CHUNK_SLOTS: usize = 4096 / std::mem::size_of::<usize>();

struct Table {
    exponent: u32,
    slots: Box<[AtomicUsize]>,
}

impl Table {
    fn new(exponent: u32) -> *mut Table {
        let size = 1usize << exponent;
        let slots = (0..size).map(|_| AtomicUsize::new(0)).collect();
        Box::into_raw(Box::new(Table { exponent, slots }))
    }

    fn size(&self) -> usize {
        1 << self.exponent
    }

    fn index(&self, hash: u64) -> usize {
        (hash as usize) & (self.size() - 1)
    }
}

// ----------------------------------------------------------------------
// Reference-counted pointer pairs
// ----------------------------------------------------------------------

fn rp_set(p: &DwordAtomic, ptr: usize) {
    debug_assert_eq!(p.load().1, 0, "overwriting a referenced pointer source");
    p.store((ptr as u64, 0));
}

/// Takes a reference; returns the pointer.
fn rp_get(p: &DwordAtomic) -> usize {
    loop {
        let old = p.load();
        if p.cas(old, (old.0, old.1 + 1)) == old {
            return old.0 as usize;
        }
    }
}

/// Releases a reference taken with [`rp_get`].
fn rp_put(p: &DwordAtomic, ptr: usize) {
    loop {
        let old = p.load();
        debug_assert_eq!(old.0 as usize, ptr, "releasing a stale reference");
        debug_assert!(old.1 > 0, "releasing a reference that was never taken");
        if p.cas(old, (old.0, old.1 - 1)) == old {
            return;
        }
    }
}

fn rp_peek(p: &DwordAtomic) -> usize {
    p.load().0 as usize
}

/// Shifts `next` into `current`. The caller must have excluded all other
/// threads (the rendezvous leader inside the barrier).
fn rp_shift(current: &DwordAtomic, next: &DwordAtomic) {
    debug_assert_eq!(current.load().1, 0, "shifting over outstanding references");
    current.store(next.load());
    next.store((0, 0));
}

// ----------------------------------------------------------------------
// The set
// ----------------------------------------------------------------------

/// Per-thread set state: the cached pointer to the current table.
pub struct SetThread {
    local: *const Table,
}

unsafe impl Send for SetThread {}

/// The shared seen set.
pub struct SeenSet {
    current: DwordAtomic,
    next: DwordAtomic,
    count: AtomicUsize,
    next_migration: AtomicUsize,
    expand_lock: Mutex<()>,
    threshold_percent: usize,
}

unsafe impl Send for SeenSet {}
unsafe impl Sync for SeenSet {}

impl SeenSet {
    /// A set sized so that roughly `capacity_bytes` of state storage maps
    /// to the initial slot count (mirroring the compile-time capacity
    /// option).
    pub fn new(capacity_bytes: usize, threshold_percent: usize, state_bytes: usize) -> Self {
        let per_state = state_bytes.max(1) * std::mem::size_of::<usize>();
        let desired = (capacity_bytes / per_state).max(16);
        let exponent = (usize::BITS - 1 - desired.leading_zeros()) as u32;
        let set = Self {
            current: DwordAtomic::new(0, 0),
            next: DwordAtomic::new(0, 0),
            count: AtomicUsize::new(0),
            next_migration: AtomicUsize::new(0),
            expand_lock: Mutex::new(()),
            threshold_percent: threshold_percent.clamp(1, 100),
        };
        rp_set(&set.current, Table::new(exponent) as usize);
        set
    }

    /// Takes a per-thread reference to the current table.
    pub fn thread_init(&self) -> SetThread {
        SetThread {
            local: rp_get(&self.current) as *const Table,
        }
    }

    /// Releases a thread's reference on exit. The caller must follow with
    /// [`Rendezvous::opt_out`] passing [`SeenSet::update`] as the action.
    pub fn release(&self, st: &SetThread) {
        rp_put(&self.current, st.local as usize);
    }

    /// Releases the thread's table reference and leaves the rendezvous
    /// protocol: the exit path of a worker thread.
    pub fn leave(&self, st: SetThread, rendezvous: &Rendezvous) {
        self.release(&st);
        rendezvous.opt_out(|| self.update(st.local));
    }

    /// Current number of hash table slots.
    pub fn slot_count(&self) -> usize {
        let table = rp_peek(&self.current) as *const Table;
        unsafe { (*table).size() }
    }

    /// Number of states in the set.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn local<'a>(st: &SetThread) -> &'a Table {
        unsafe { &*st.local }
    }

    /// The leader's single-threaded cleanup inside the post-migration
    /// rendezvous (also safe to run from the opt-out path, where it may
    /// find no migration in progress).
    pub fn update(&self, old: *const Table) {
        if rp_peek(&self.next) == 0 {
            return;
        }
        drop(unsafe { Box::from_raw(old as *mut Table) });
        self.next_migration.store(0, Ordering::SeqCst);
        rp_shift(&self.current, &self.next);
    }

    /// Helps migrate the old table into `next`, then rendezvouses. On
    /// return the thread's cached table pointer is the new table.
    fn migrate(
        &self,
        st: &mut SetThread,
        rendezvous: &Rendezvous,
        out: &Output,
        layout: &StateLayout,
    ) {
        out.trace(trace::SET, "assisting in set migration...");

        let next = rp_get(&self.next) as *const Table;
        let next_ref = unsafe { &*next };
        let old = Self::local(st);

        loop {
            let chunk = self.next_migration.fetch_add(1, Ordering::SeqCst);
            let start = chunk * CHUNK_SLOTS;
            if start >= old.size() {
                break;
            }
            let end = (start + CHUNK_SLOTS).min(old.size());

            for i in start..end {
                // claim the slot by tombstoning it
                let s = old.slots[i].swap(TOMBSTONE, Ordering::SeqCst);
                debug_assert_ne!(s, TOMBSTONE, "attempted double slot migration");

                /* Rehash live entries into the new table, shuffling any
                 * colliding entry one slot along. No equality checks are
                 * needed: everything in the old table is unique.
                 */
                if s != 0 {
                    let state = unsafe { StateRef::from_addr(s) };
                    let mut j = next_ref.index(state.hash(layout));
                    let mut carried = s;
                    while carried != 0 {
                        carried = next_ref.slots[j].swap(carried, Ordering::SeqCst);
                        j = (j + 1) & (next_ref.size() - 1);
                    }
                }
            }
        }

        let old_ptr = st.local;
        rp_put(&self.current, old_ptr as usize);

        /* All threads must arrive here before anyone proceeds, so at most
         * two tables are ever in flight.
         */
        rendezvous.arrive(|| self.update(old_ptr));

        st.local = next;
    }

    /// Doubles the table, or joins an expansion another thread started.
    fn expand(
        &self,
        st: &mut SetThread,
        rendezvous: &Rendezvous,
        out: &Output,
        layout: &StateLayout,
    ) {
        if rp_peek(&self.next) != 0 {
            out.trace(
                trace::SET,
                "attempted expansion failed because another thread got there first",
            );
            self.migrate(st, rendezvous, out, layout);
            return;
        }

        let guard = self.expand_lock.lock().unwrap_or_else(|e| e.into_inner());
        if rp_peek(&self.next) != 0 {
            drop(guard);
            out.trace(
                trace::SET,
                "attempted expansion failed because another thread got there first",
            );
            self.migrate(st, rendezvous, out, layout);
            return;
        }

        let old = Self::local(st);
        out.trace(
            trace::SET,
            &format!(
                "expanding set from {} slots to {} slots...",
                old.size(),
                old.size() * 2
            ),
        );
        rp_set(&self.next, Table::new(old.exponent + 1) as usize);
        drop(guard);

        self.migrate(st, rendezvous, out, layout);
    }

    /// Inserts a state. Returns `Some(new_count)` when the state was
    /// fresh, `None` when a byte-identical state was already present.
    pub fn insert(
        &self,
        st: &mut SetThread,
        rendezvous: &Rendezvous,
        out: &Output,
        layout: &StateLayout,
        s: StateRef,
    ) -> Option<usize> {
        'restart: loop {
            let table = Self::local(st);
            if self.count.load(Ordering::SeqCst) * 100 / table.size()
                >= self.threshold_percent
            {
                self.expand(st, rendezvous, out, layout);
                continue 'restart;
            }

            let table = Self::local(st);
            let index = table.index(s.hash(layout));

            let mut attempts = 0;
            let mut i = index;
            while attempts < table.size() {
                match table.slots[i].compare_exchange(
                    0,
                    s.addr(),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                ) {
                    Ok(_) => {
                        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
                        if out.tracing(trace::SET) {
                            out.trace(
                                trace::SET,
                                &format!(
                                    "added state {:#x}, set size is now {}",
                                    s.addr(),
                                    count
                                ),
                            );
                        }
                        return Some(count);
                    }
                    Err(c) if c == TOMBSTONE => {
                        /* This slot was migrated out from under us; help
                         * finish the migration and retry against the new
                         * table.
                         */
                        self.migrate(st, rendezvous, out, layout);
                        continue 'restart;
                    }
                    Err(c) => {
                        let existing = unsafe { StateRef::from_addr(c) };
                        if s.data_eq(existing, layout) {
                            if out.tracing(trace::SET) {
                                out.trace(
                                    trace::SET,
                                    &format!(
                                        "skipped adding state {:#x} that was already in set",
                                        s.addr()
                                    ),
                                );
                            }
                            return None;
                        }
                    }
                }
                i = (i + 1) & (table.size() - 1);
                attempts += 1;
            }

            // the table is full; expand and retry
            self.expand(st, rendezvous, out, layout);
        }
    }

    /// Finds the already-inserted twin of `s`, if any. Only valid when no
    /// migration is in progress (the final liveness pass).
    pub fn find(
        &self,
        st: &SetThread,
        layout: &StateLayout,
        s: StateRef,
    ) -> Option<StateRef> {
        let table = Self::local(st);
        let mut i = table.index(s.hash(layout));
        let mut attempts = 0;
        while attempts < table.size() {
            let slot = table.slots[i].load(Ordering::SeqCst);
            debug_assert_ne!(slot, TOMBSTONE, "tombstone encountered during final phase");
            if slot == 0 {
                // end of the linear block this state could lie in
                return None;
            }
            let candidate = unsafe { StateRef::from_addr(slot) };
            if s.data_eq(candidate, layout) {
                return Some(candidate);
            }
            i = (i + 1) & (table.size() - 1);
            attempts += 1;
        }
        None
    }

    /// Iterates all states in the set. Only valid when no migration is in
    /// progress.
    pub fn for_each(&self, st: &SetThread, mut f: impl FnMut(StateRef)) {
        let table = Self::local(st);
        for slot in table.slots.iter() {
            let v = slot.load(Ordering::SeqCst);
            if v != 0 && v != TOMBSTONE {
                f(unsafe { StateRef::from_addr(v) });
            }
        }
    }

}

impl Drop for SeenSet {
    fn drop(&mut self) {
        let current = rp_peek(&self.current);
        if current != 0 {
            drop(unsafe { Box::from_raw(current as *mut Table) });
        }
        let next = rp_peek(&self.next);
        if next != 0 {
            drop(unsafe { Box::from_raw(next as *mut Table) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StateAllocator;
    use crate::config::Config;
    use std::sync::Arc;

    fn test_output() -> Output {
        Output::new(&Config {
            color: crate::config::Tristate::Off,
            ..Config::default()
        })
    }

    fn test_layout() -> StateLayout {
        StateLayout::new(&Config::default(), 64, 0, 1, &[])
    }

    fn state_with(arena: &mut StateAllocator, layout: &StateLayout, tag: u64) -> StateRef {
        let s = StateRef::from_block(arena.alloc());
        unsafe {
            s.data_mut(layout)[..8].copy_from_slice(&tag.to_le_bytes());
        }
        s
    }

    #[test]
    fn insert_is_idempotent() {
        let layout = test_layout();
        let mut arena = StateAllocator::new(layout.total_words);
        let set = SeenSet::new(1 << 16, 65, layout.data_bytes);
        let rendezvous = Rendezvous::new();
        let out = test_output();
        let mut st = set.thread_init();

        let a = state_with(&mut arena, &layout, 7);
        let twin = state_with(&mut arena, &layout, 7);
        let b = state_with(&mut arena, &layout, 8);

        assert_eq!(set.insert(&mut st, &rendezvous, &out, &layout, a), Some(1));
        assert_eq!(set.insert(&mut st, &rendezvous, &out, &layout, twin), None);
        assert_eq!(set.insert(&mut st, &rendezvous, &out, &layout, b), Some(2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn find_locates_the_inserted_twin() {
        let layout = test_layout();
        let mut arena = StateAllocator::new(layout.total_words);
        let set = SeenSet::new(1 << 16, 65, layout.data_bytes);
        let rendezvous = Rendezvous::new();
        let out = test_output();
        let mut st = set.thread_init();

        let a = state_with(&mut arena, &layout, 42);
        set.insert(&mut st, &rendezvous, &out, &layout, a);

        let probe = state_with(&mut arena, &layout, 42);
        let found = set.find(&st, &layout, probe).expect("state not found");
        assert_eq!(found, a);
        let missing = state_with(&mut arena, &layout, 99);
        assert!(set.find(&st, &layout, missing).is_none());
    }

    #[test]
    fn expansion_preserves_membership() {
        let layout = test_layout();
        let mut arena = StateAllocator::new(layout.total_words);
        // deliberately tiny so expansion happens early and often
        let set = SeenSet::new(1, 50, layout.data_bytes);
        let rendezvous = Rendezvous::new();
        let out = test_output();
        let mut st = set.thread_init();

        let states: Vec<_> = (0..400)
            .map(|i| state_with(&mut arena, &layout, i))
            .collect();
        for s in &states {
            assert!(set.insert(&mut st, &rendezvous, &out, &layout, *s).is_some());
        }
        assert_eq!(set.len(), 400);
        for s in &states {
            assert!(set.insert(&mut st, &rendezvous, &out, &layout, *s).is_none());
        }
        for s in &states {
            assert!(set.find(&st, &layout, *s).is_some());
        }
    }

    #[test]
    fn concurrent_duplicate_race_yields_one_success() {
        const THREADS: usize = 4;
        let layout = Arc::new(test_layout());
        let mut arena = StateAllocator::new(layout.total_words);
        let set = Arc::new(SeenSet::new(1 << 16, 65, layout.data_bytes));
        let rendezvous = Arc::new(Rendezvous::new());
        rendezvous.set_running(THREADS);
        let out = Arc::new(test_output());

        // all threads race to insert byte-identical states
        let candidates: Vec<_> = (0..THREADS)
            .map(|_| state_with(&mut arena, &layout, 1234))
            .collect();
        let _arena = arena;

        let handles: Vec<_> = candidates
            .into_iter()
            .map(|s| {
                let set = Arc::clone(&set);
                let rendezvous = Arc::clone(&rendezvous);
                let out = Arc::clone(&out);
                let layout = Arc::clone(&layout);
                std::thread::spawn(move || {
                    let mut st = set.thread_init();
                    let won = set
                        .insert(&mut st, &rendezvous, &out, &layout, s)
                        .is_some();
                    set.release(&st);
                    rendezvous.opt_out(|| {});
                    won
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(set.len(), 1);
    }
}
