use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::thread;

use crate::backoff::Backoff;
use crate::invariants::debug_assert_next_was_null;
use crate::node::Node;

thread_local! {
    // Stable across calls so a thread tends to revisit the same slot and
    // re-collide with the same peers, amortizing miss costs across calls.
    static PROBE: Cell<usize> = Cell::new(init_probe());
}

fn init_probe() -> usize {
    let mut hasher = DefaultHasher::new();
    thread::current().id().hash(&mut hasher);
    hasher.finish() as usize
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Smallest power of two >= ceil((ncpu + 1) / 2).
fn arena_length(ncpu: usize) -> usize {
    let wanted = (ncpu + 2) / 2;
    wanted.max(1).next_power_of_two()
}

fn spin_budget(ncpu: usize) -> u32 {
    if ncpu <= 1 {
        0
    } else {
        2000
    }
}

/// Outcome of offering a chain to the arena.
pub(crate) enum Combine<T> {
    /// The chain was deposited and a peer took it; the caller's insert is
    /// done once it observes completion on its own nodes.
    HandedOff,
    /// Neither direction of combining succeeded; retry the tail CAS with the
    /// original chain.
    NoMatch,
    /// One or more peer chains were absorbed onto the caller's chain; this
    /// is the new tail to retry the CAS with.
    Absorbed(*mut Node<T>),
}

/// Array of single-slot rendezvous cells indexed by a per-thread probe — the
/// substrate for elimination-combining.
pub(crate) struct Arena<T> {
    slots: Box<[AtomicPtr<Node<T>>]>,
    mask: usize,
    spins: u32,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self::with_length(arena_length(available_parallelism()))
    }

    /// Used by tests that want to force collisions deterministically with a
    /// small, fixed arena regardless of the host's core count.
    #[cfg(test)]
    pub(crate) fn with_length(len: usize) -> Self {
        let len = len.max(1).next_power_of_two();
        let ncpu = available_parallelism();
        Self {
            slots: (0..len).map(|_| AtomicPtr::new(ptr::null_mut())).collect(),
            mask: len - 1,
            spins: spin_budget(ncpu),
        }
    }

    #[cfg(not(test))]
    fn with_length(len: usize) -> Self {
        let ncpu = available_parallelism();
        Self {
            slots: (0..len).map(|_| AtomicPtr::new(ptr::null_mut())).collect(),
            mask: len - 1,
            spins: spin_budget(ncpu),
        }
    }

    fn slot_index(&self) -> usize {
        PROBE.with(Cell::get) & self.mask
    }

    /// Frees any chain still parked in a slot. Only meaningful when the
    /// queue is torn down with no producers mid-`append`; see
    /// `Inner::drop`.
    pub(crate) fn drain_for_drop(&mut self) {
        for slot in self.slots.iter_mut() {
            let mut cur = *slot.get_mut();
            while !cur.is_null() {
                // SAFETY: exclusive access via `&mut self`.
                let next = unsafe { (*cur).next_relaxed() };
                unsafe { drop(Box::from_raw(cur)) };
                cur = next;
            }
        }
    }

    /// Finds the tail of a (possibly multi-node) chain by walking `next`.
    ///
    /// # Safety
    /// `first` must be a valid, exclusively-reachable chain whose `next`
    /// links have already been fully published (release-ordered) by the
    /// thread that is walking it.
    unsafe fn walk_to_tail(mut first: *mut Node<T>) -> *mut Node<T> {
        loop {
            let next = (*first).next_acquire();
            if next.is_null() {
                return first;
            }
            first = next;
        }
    }

    /// Implements `transferOrCombine`.
    pub(crate) fn transfer_or_combine(&self, first: *mut Node<T>, last: *mut Node<T>) -> Combine<T> {
        let idx = self.slot_index();
        let slot = &self.slots[idx];

        loop {
            let current = slot.load(Ordering::SeqCst);

            if current.is_null() {
                if slot
                    .compare_exchange(ptr::null_mut(), first, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    // A peer raced us for the empty slot; reread and retry.
                    continue;
                }

                let mut backoff = Backoff::new();
                for _ in 0..self.spins {
                    if slot.load(Ordering::SeqCst) != first {
                        // A peer absorbed our chain; it will complete() our
                        // nodes once it wins (or participates in) a tail CAS.
                        return Combine::HandedOff;
                    }
                    backoff.spin();
                }

                return if slot
                    .compare_exchange(first, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    Combine::NoMatch
                } else {
                    // A peer took it between our last poll and the reclaim.
                    Combine::HandedOff
                };
            }

            // Occupied: try to take the peer's chain and absorb it.
            if slot
                .compare_exchange(current, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                continue;
            }

            // SAFETY: we just took exclusive ownership of `current` via CAS.
            unsafe {
                debug_assert_next_was_null!((*last).next_relaxed());
                (*last).link(current);
                let mut tail = Self::walk_to_tail(current);

                // One bounded sweep of the remaining slots, starting just
                // past ours, to cap per-operation latency.
                for step in 1..self.slots.len() {
                    let j = (idx + step) & self.mask;
                    let other = &self.slots[j];
                    let found = other.load(Ordering::SeqCst);
                    if found.is_null() {
                        continue;
                    }
                    if other
                        .compare_exchange(found, ptr::null_mut(), Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        debug_assert_next_was_null!((*tail).next_relaxed());
                        (*tail).link(found);
                        tail = Self::walk_to_tail(found);
                    }
                }

                return Combine::Absorbed(tail);
            }
        }
    }
}
