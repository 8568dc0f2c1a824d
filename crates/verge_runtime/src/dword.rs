//! Double-word atomic cells.
//!
//! The queue's `(head, tail)` pair and the seen set's reference-counted
//! `(pointer, count)` pair must each move atomically as one unit, which
//! needs a 128-bit compare-and-swap on 64-bit targets. Stable Rust exposes
//! no 128-bit atomic, so this cell is the sanctioned fallback: a
//! mutex-guarded pair behind the same load/store/CAS interface. Everything
//! above it is written against that interface only, so swapping in a
//! native double-word CAS is a local change.

use std::sync::Mutex;

/// An atomically updatable pair of 64-bit words.
#[derive(Debug, Default)]
pub struct DwordAtomic {
    cell: Mutex<(u64, u64)>,
}

impl DwordAtomic {
    pub fn new(a: u64, b: u64) -> Self {
        Self {
            cell: Mutex::new((a, b)),
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, (u64, u64)> {
        self.cell.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn load(&self) -> (u64, u64) {
        *self.guard()
    }

    pub fn store(&self, value: (u64, u64)) {
        *self.guard() = value;
    }

    /// Compare-and-swap returning the previously observed value; the swap
    /// succeeded iff the return value equals `expected`.
    pub fn cas(&self, expected: (u64, u64), new: (u64, u64)) -> (u64, u64) {
        let mut cell = self.guard();
        let observed = *cell;
        if observed == expected {
            *cell = new;
        }
        observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn cas_succeeds_on_match() {
        let d = DwordAtomic::new(1, 2);
        assert_eq!(d.cas((1, 2), (3, 4)), (1, 2));
        assert_eq!(d.load(), (3, 4));
    }

    #[test]
    fn cas_fails_on_mismatch_and_reports_observed() {
        let d = DwordAtomic::new(1, 2);
        assert_eq!(d.cas((9, 9), (3, 4)), (1, 2));
        assert_eq!(d.load(), (1, 2));
    }

    #[test]
    fn concurrent_cas_increments_never_lose_updates() {
        let d = Arc::new(DwordAtomic::new(0, 0));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let d = Arc::clone(&d);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        loop {
                            let old = d.load();
                            let new = (old.0 + 1, old.1 + 2);
                            if d.cas(old, new) == old {
                                break;
                            }
                        }
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(d.load(), (4000, 8000));
    }
}
