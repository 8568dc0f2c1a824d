//! Pending-state queues.
//!
//! One MPMC FIFO per thread, shared by all threads: a thread enqueues new
//! work onto its own queue and steals round-robin from the others when its
//! own runs dry. Each queue is a linked list of 4 KiB blocks holding state
//! pointers followed by a chained next-block pointer, with the `(head,
//! tail)` pair held in a single double-word atomic so concurrent producers
//! and consumers can be disambiguated by one CAS.
//!
//! A *queue handle* is the address of either a state slot or the chained
//! next pointer inside a block. Blocks are 4 KiB-aligned, so the low 12
//! bits of a handle identify which member it refers to.
//!
//! Freed blocks are reclaimed with hazard pointers (Michael, TPDS 15(8)
//! 2004): each thread publishes the single block it is about to
//! dereference; a reclaimer defers freeing any block it finds published,
//! onto a per-thread deferred list whose size is bounded by the number of
//! other threads.

use crate::config::trace;
use crate::dword::DwordAtomic;
use crate::output::Output;
use crate::state::StateRef;
use std::sync::atomic::{AtomicUsize, Ordering};

const BLOCK_BYTES: usize = 4096;
const SLOT_COUNT: usize = (BLOCK_BYTES - std::mem::size_of::<usize>())
    / std::mem::size_of::<usize>();

#[repr(C, align(4096))]
struct Block {
    slots: [AtomicUsize; SLOT_COUNT],
    next: AtomicUsize,
}

const _: () = assert!(
    std::mem::size_of::<Block>() == BLOCK_BYTES,
    "incorrect queue block size calculation"
);

/// Byte offset of the `next` member; handles below this offset point at
/// state slots.
const NEXT_OFFSET: usize = SLOT_COUNT * std::mem::size_of::<usize>();

fn block_new() -> usize {
    let layout = std::alloc::Layout::new::<Block>();
    let p = unsafe { std::alloc::alloc_zeroed(layout) };
    if p.is_null() {
        std::alloc::handle_alloc_error(layout);
    }
    p as usize
}

fn block_free(base: usize) {
    debug_assert_eq!(base % BLOCK_BYTES, 0);
    unsafe { std::alloc::dealloc(base as *mut u8, std::alloc::Layout::new::<Block>()) }
}

/// The block a handle lies within.
fn handle_base(h: usize) -> usize {
    h - h % BLOCK_BYTES
}

/// Whether the handle points at a state slot (as opposed to the chained
/// next pointer).
fn handle_is_state_slot(h: usize) -> bool {
    h % BLOCK_BYTES < NEXT_OFFSET
}

fn handle_next(h: usize) -> usize {
    h + std::mem::size_of::<usize>()
}

/// The atomic cell a handle addresses (a state slot or the next pointer;
/// both are a single word).
fn handle_cell<'a>(h: usize) -> &'a AtomicUsize {
    unsafe { &*(h as *const AtomicUsize) }
}

struct PerQueue {
    /// `(head handle, tail handle)`, zero when empty.
    ends: DwordAtomic,
    count: AtomicUsize,
}

/// Per-thread queue state: the hazard slot index and the deferred
/// reclamation list.
pub struct QueueThread {
    pub thread_id: usize,
    deferred: Vec<usize>,
}

impl QueueThread {
    pub fn new(thread_id: usize, threads: usize) -> Self {
        Self {
            thread_id,
            deferred: Vec::with_capacity(threads.saturating_sub(1)),
        }
    }
}

/// The set of per-thread queues plus the hazard-pointer registry.
pub struct Queues {
    queues: Box<[PerQueue]>,
    hazarded: Box<[AtomicUsize]>,
}

unsafe impl Send for Queues {}
unsafe impl Sync for Queues {}

impl Queues {
    pub fn new(threads: usize) -> Self {
        let queues = (0..threads)
            .map(|_| PerQueue {
                ends: DwordAtomic::new(0, 0),
                count: AtomicUsize::new(0),
            })
            .collect();
        let hazarded = (0..threads).map(|_| AtomicUsize::new(0)).collect();
        Self { queues, hazarded }
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Total states currently enqueued across all queues.
    pub fn total_pending(&self) -> usize {
        self.queues
            .iter()
            .map(|q| q.count.load(Ordering::SeqCst))
            .sum()
    }

    // ------------------------------------------------------------------
    // Hazard pointers
    // ------------------------------------------------------------------

    /// Protects the block containing `h` from reclamation.
    fn hazard(&self, tc: &QueueThread, h: usize) {
        let base = handle_base(h);
        debug_assert_ne!(base, 0, "attempt to hazard an invalid pointer");
        debug_assert_eq!(
            self.hazarded[tc.thread_id].load(Ordering::SeqCst),
            0,
            "hazarding multiple pointers at once"
        );
        self.hazarded[tc.thread_id].store(base, Ordering::SeqCst);
    }

    /// Drops protection on the block containing `h`.
    fn unhazard(&self, tc: &QueueThread, h: usize) {
        let base = handle_base(h);
        debug_assert_ne!(base, 0, "attempt to unhazard an invalid pointer");
        debug_assert_eq!(
            self.hazarded[tc.thread_id].load(Ordering::SeqCst),
            base,
            "unhazarding a pointer that differs from the one hazarded"
        );
        self.hazarded[tc.thread_id].store(0, Ordering::SeqCst);
    }

    fn conflicts(&self, tc: &QueueThread, base: usize) -> bool {
        self.hazarded.iter().enumerate().any(|(i, slot)| {
            i != tc.thread_id && slot.load(Ordering::SeqCst) == base
        })
    }

    /// Frees the block containing `h`, or defers the free if another
    /// thread has it hazarded. The deferred list cannot exceed
    /// `threads - 1` entries: anything passed here is already unreachable,
    /// so the only outstanding references are the other threads' single
    /// hazard slots.
    fn reclaim(&self, tc: &mut QueueThread, h: usize) {
        let base = handle_base(h);
        debug_assert_eq!(
            self.hazarded[tc.thread_id].load(Ordering::SeqCst),
            0,
            "reclaiming a pointer while holding a hazarded pointer"
        );

        // first retry anything previously deferred
        let mut i = 0;
        while i < tc.deferred.len() {
            if self.conflicts(tc, tc.deferred[i]) {
                i += 1;
            } else {
                let freed = tc.deferred.swap_remove(i);
                block_free(freed);
            }
        }

        if !self.conflicts(tc, base) {
            block_free(base);
            return;
        }

        debug_assert!(
            tc.deferred.len() < tc.deferred.capacity().max(1),
            "deferred more reclamations than threads"
        );
        tc.deferred.push(base);
    }

    /// Frees all blocks still owned by the queues. Single-threaded, at
    /// shutdown.
    pub fn drain_blocks(&self) {
        for q in &self.queues {
            let (head, _) = q.ends.load();
            let mut base = if head == 0 { 0 } else { handle_base(head as usize) };
            while base != 0 {
                let next = handle_cell(base + NEXT_OFFSET).load(Ordering::SeqCst);
                block_free(base);
                base = if next == 0 { 0 } else { handle_base(next) };
            }
            q.ends.store((0, 0));
        }
    }

    // ------------------------------------------------------------------
    // Enqueue / dequeue
    // ------------------------------------------------------------------

    /// Appends `s` to the given queue and returns the queue's new length.
    pub fn enqueue(
        &self,
        tc: &mut QueueThread,
        out: &Output,
        s: StateRef,
        queue_id: usize,
    ) -> usize {
        let q = &self.queues[queue_id];
        let mut ends = q.ends.load();

        loop {
            let (head, tail) = ends;

            if tail == 0 {
                // the queue is empty: install a fresh block
                debug_assert_eq!(head, 0, "tail of queue 0 while head is non-0");
                let node = block_new();
                handle_cell(node).store(s.addr(), Ordering::SeqCst);

                let observed = q.ends.cas(ends, (node as u64, node as u64));
                if observed != ends {
                    block_free(node);
                    ends = observed;
                    continue;
                }
                break;
            }

            // protect the tail block before touching it
            self.hazard(tc, tail as usize);
            {
                let check = q.ends.load();
                if check != ends {
                    self.unhazard(tc, tail as usize);
                    ends = check;
                    continue;
                }
            }

            let mut new_node = 0usize;
            let mut next_tail = handle_next(tail as usize);

            if handle_is_state_slot(next_tail) {
                // a free slot remains in the current block
                if handle_cell(next_tail)
                    .compare_exchange(0, s.addr(), Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    // another producer beat us
                    self.unhazard(tc, tail as usize);
                    ends = q.ends.load();
                    continue;
                }
            } else {
                // the block is full; chain a new one
                new_node = block_new();
                handle_cell(new_node).store(s.addr(), Ordering::SeqCst);
                if handle_cell(next_tail)
                    .compare_exchange(0, new_node, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    block_free(new_node);
                    self.unhazard(tc, tail as usize);
                    ends = q.ends.load();
                    continue;
                }
                next_tail = new_node;
            }

            let observed = q.ends.cas(ends, (head, next_tail as u64));
            if observed != ends {
                /* A dequeue beat us (no other enqueue can have: our write
                 * to next_tail blocks them). Undo the slot write so the
                 * state is not observed twice, then retry.
                 */
                let undo_at = handle_next(tail as usize);
                if handle_is_state_slot(undo_at) {
                    let r = handle_cell(undo_at).compare_exchange(
                        s.addr(),
                        0,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    );
                    debug_assert!(r.is_ok(), "undo of write to next_tail failed");
                } else {
                    let r = handle_cell(undo_at).compare_exchange(
                        new_node,
                        0,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    );
                    debug_assert!(r.is_ok(), "undo of write to next_tail failed");
                    block_free(new_node);
                }
                self.unhazard(tc, tail as usize);
                ends = observed;
                continue;
            }

            self.unhazard(tc, tail as usize);
            break;
        }

        let count = q.count.fetch_add(1, Ordering::SeqCst) + 1;
        if out.tracing(trace::QUEUE) {
            out.trace(
                trace::QUEUE,
                &format!(
                    "enqueued state {:#x} into queue {}, queue length is now {}",
                    s.addr(),
                    queue_id,
                    count
                ),
            );
        }
        count
    }

    /// Removes the next pending state, rotating across queues when the
    /// preferred one is empty. Returns `None` when every queue is drained.
    pub fn dequeue(
        &self,
        tc: &mut QueueThread,
        out: &Output,
        queue_id: &mut usize,
    ) -> Option<StateRef> {
        let nqueues = self.queues.len();

        'queues: for _ in 0..nqueues {
            let q = &self.queues[*queue_id];
            let mut ends = q.ends.load();

            loop {
                let (head, tail) = ends;
                if head == 0 {
                    // this queue is empty; try the next one
                    *queue_id = (*queue_id + 1) % nqueues;
                    continue 'queues;
                }

                self.hazard(tc, head as usize);
                {
                    let check = q.ends.load();
                    if check != ends {
                        self.unhazard(tc, head as usize);
                        ends = check;
                        continue;
                    }
                }

                let new = if head == tail {
                    // single element: empty the queue entirely
                    (0, 0)
                } else if handle_is_state_slot(head as usize) {
                    (handle_next(head as usize) as u64, tail)
                } else {
                    /* the head is the end of a block: only its chained
                     * pointer remains, so advance to the chained block and
                     * free this one
                     */
                    let next_block = handle_cell(head as usize).load(Ordering::SeqCst);
                    let new = (next_block as u64, tail);
                    let observed = q.ends.cas(ends, new);
                    self.unhazard(tc, head as usize);
                    if observed == ends {
                        self.reclaim(tc, head as usize);
                    }
                    ends = observed;
                    continue;
                };

                let observed = q.ends.cas(ends, new);
                if observed != ends {
                    self.unhazard(tc, head as usize);
                    ends = observed;
                    continue;
                }

                let mut taken = None;
                if handle_is_state_slot(head as usize) {
                    let addr = handle_cell(head as usize).load(Ordering::SeqCst);
                    debug_assert_ne!(addr, 0, "dequeued a null state");
                    taken = Some(unsafe { StateRef::from_addr(addr) });
                }

                self.unhazard(tc, head as usize);

                if head == tail || !handle_is_state_slot(head as usize) {
                    self.reclaim(tc, head as usize);
                }

                let Some(s) = taken else {
                    *queue_id = (*queue_id + 1) % nqueues;
                    continue 'queues;
                };

                let count = q.count.fetch_sub(1, Ordering::SeqCst) - 1;
                if out.tracing(trace::QUEUE) {
                    out.trace(
                        trace::QUEUE,
                        &format!(
                            "dequeued state {:#x} from queue {}, queue length is now {}",
                            s.addr(),
                            *queue_id,
                            count
                        ),
                    );
                }
                return Some(s);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StateAllocator;
    use crate::config::Config;
    use crate::state::StateLayout;
    use std::sync::Arc;

    fn test_output() -> Output {
        Output::new(&Config {
            color: crate::config::Tristate::Off,
            ..Config::default()
        })
    }

    fn make_states(n: usize) -> (StateAllocator, Vec<StateRef>, StateLayout) {
        let layout = StateLayout::new(&Config::default(), 32, 0, 1, &[]);
        let mut arena = StateAllocator::new(layout.total_words);
        let states = (0..n)
            .map(|i| {
                let s = StateRef::from_block(arena.alloc());
                unsafe {
                    s.data_mut(&layout)[0] = i as u8;
                }
                s
            })
            .collect();
        (arena, states, layout)
    }

    #[test]
    fn fifo_within_one_queue() {
        let (_arena, states, layout) = make_states(3);
        let queues = Queues::new(1);
        let out = test_output();
        let mut tc = QueueThread::new(0, 1);

        for s in &states {
            queues.enqueue(&mut tc, &out, *s, 0);
        }
        let mut qid = 0;
        for expected in &states {
            let got = queues.dequeue(&mut tc, &out, &mut qid).unwrap();
            assert!(got.data_eq(*expected, &layout));
        }
        assert!(queues.dequeue(&mut tc, &out, &mut qid).is_none());
    }

    #[test]
    fn crosses_block_boundaries() {
        let (_arena, states, _) = make_states(1);
        let queues = Queues::new(1);
        let out = test_output();
        let mut tc = QueueThread::new(0, 1);

        // more entries than one block holds
        for _ in 0..(SLOT_COUNT * 2 + 5) {
            queues.enqueue(&mut tc, &out, states[0], 0);
        }
        assert_eq!(queues.total_pending(), SLOT_COUNT * 2 + 5);

        let mut qid = 0;
        let mut dequeued = 0;
        while queues.dequeue(&mut tc, &out, &mut qid).is_some() {
            dequeued += 1;
        }
        assert_eq!(dequeued, SLOT_COUNT * 2 + 5);
    }

    #[test]
    fn dequeue_rotates_to_nonempty_queues() {
        let (_arena, states, _) = make_states(1);
        let queues = Queues::new(3);
        let out = test_output();
        let mut tc = QueueThread::new(0, 3);

        queues.enqueue(&mut tc, &out, states[0], 2);
        let mut qid = 0;
        assert!(queues.dequeue(&mut tc, &out, &mut qid).is_some());
        assert_eq!(qid, 2);
        assert!(queues.dequeue(&mut tc, &out, &mut qid).is_none());
    }

    #[test]
    fn conservation_under_concurrency() {
        const PER_THREAD: usize = 2000;
        const THREADS: usize = 4;

        let (arena, states, _) = make_states(1);
        // keep the arena alive while threads run
        let _arena = arena;
        let queues = Arc::new(Queues::new(THREADS));
        let out = Arc::new(test_output());
        let target = states[0];

        let handles: Vec<_> = (0..THREADS)
            .map(|tid| {
                let queues = Arc::clone(&queues);
                let out = Arc::clone(&out);
                std::thread::spawn(move || {
                    let mut tc = QueueThread::new(tid, THREADS);
                    let mut qid = tid;
                    let mut dequeued = 0usize;
                    for i in 0..PER_THREAD {
                        queues.enqueue(&mut tc, &out, target, tid);
                        if i % 3 == 0 && queues.dequeue(&mut tc, &out, &mut qid).is_some() {
                            dequeued += 1;
                        }
                    }
                    dequeued
                })
            })
            .collect();

        let total_dequeued: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        let remaining = queues.total_pending();
        assert_eq!(total_dequeued + remaining, PER_THREAD * THREADS);

        // drain what's left single-threaded
        let mut tc = QueueThread::new(0, THREADS);
        let mut qid = 0;
        let mut drained = 0;
        while queues.dequeue(&mut tc, &out, &mut qid).is_some() {
            drained += 1;
        }
        assert_eq!(drained, remaining);
    }
}
