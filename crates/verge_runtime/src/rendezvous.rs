//! Thread rendezvous: a barrier with leader election.
//!
//! All participating threads block until the last arrival — the 'leader' —
//! runs a single-threaded action (such as shifting the seen-set pointer
//! after migration) and wakes the rest. Threads that are exiting leave the
//! protocol through [`Rendezvous::opt_out`], which takes care of the
//! awkward case where the departing thread is the one everyone else is
//! waiting on.

use std::sync::{Condvar, Mutex, MutexGuard};

struct Inner {
    /// Threads currently opted in to the protocol.
    running: usize,
    /// Opted-in threads that have not yet arrived at the current point.
    pending: usize,
    /// Bumped by each leader so waiters can detect their wake-up.
    generation: u64,
}

pub struct Rendezvous {
    lock: Mutex<Inner>,
    cond: Condvar,
}

impl Rendezvous {
    /// A rendezvous with a single participant (the initial thread).
    /// [`Rendezvous::set_running`] raises the count before secondary
    /// threads start.
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(Inner {
                running: 1,
                pending: 1,
                generation: 0,
            }),
            cond: Condvar::new(),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Inner> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Raises the participant count to `n`. Must be called while still
    /// single-threaded, before the extra participants exist.
    pub fn set_running(&self, n: usize) {
        let mut inner = self.guard();
        debug_assert_eq!(inner.running, 1);
        debug_assert_eq!(inner.pending, 1);
        inner.running = n;
        inner.pending = n;
    }

    /// Arrives at a rendezvous point. The last arrival runs `action`
    /// before everyone continues. Returns whether the caller was the
    /// leader.
    pub fn arrive(&self, action: impl FnOnce()) -> bool {
        let mut inner = self.guard();
        debug_assert!(inner.pending > 0);
        inner.pending -= 1;
        if inner.pending == 0 {
            // leader
            action();
            inner.pending = inner.running;
            inner.generation += 1;
            self.cond.notify_all();
            true
        } else {
            let generation = inner.generation;
            while inner.generation == generation {
                inner = self
                    .cond
                    .wait(inner)
                    .unwrap_or_else(|e| e.into_inner());
            }
            false
        }
    }

    /// Permanently removes the caller from the protocol. If the remaining
    /// threads are mid-rendezvous and the caller is the one they are
    /// waiting on, it acts as their leader (running `action`) before
    /// retrying its departure.
    pub fn opt_out(&self, mut action: impl FnMut()) {
        loop {
            let mut inner = self.guard();
            debug_assert!(inner.pending > 0);
            inner.pending -= 1;
            if inner.pending == 0 && inner.running > 1 {
                // everyone else is waiting on us: release them first
                action();
                inner.pending = inner.running;
                inner.generation += 1;
                self.cond.notify_all();
                drop(inner);
                continue;
            }
            debug_assert!(inner.running > 0);
            inner.running -= 1;
            return;
        }
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn single_thread_is_always_leader() {
        let r = Rendezvous::new();
        let mut ran = false;
        assert!(r.arrive(|| ran = true));
        assert!(ran);
    }

    #[test]
    fn exactly_one_leader_per_round() {
        const THREADS: usize = 4;
        let r = Arc::new(Rendezvous::new());
        r.set_running(THREADS);
        let actions = Arc::new(AtomicUsize::new(0));
        let leaders = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let r = Arc::clone(&r);
                let actions = Arc::clone(&actions);
                let leaders = Arc::clone(&leaders);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        let led = r.arrive(|| {
                            actions.fetch_add(1, Ordering::SeqCst);
                        });
                        if led {
                            leaders.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(actions.load(Ordering::SeqCst), 10);
        assert_eq!(leaders.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn opt_out_releases_waiters() {
        let r = Arc::new(Rendezvous::new());
        r.set_running(2);
        let r2 = Arc::clone(&r);
        let waiter = std::thread::spawn(move || {
            r2.arrive(|| {});
        });
        // give the waiter time to block, then leave the protocol
        std::thread::sleep(std::time::Duration::from_millis(20));
        r.opt_out(|| {});
        waiter.join().unwrap();
    }
}
