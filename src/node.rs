use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use crate::backoff::Backoff;

/// A link cell in the chain.
///
/// `next` only ever transitions from null to a single non-null node (the
/// producer that wins the tail CAS is the sole writer); the consumer may
/// later relink it during structural removal.
///
/// `done` backs the linearizable/optimistic distinction described in 4.1.
/// It is unused (and never waited on) in optimistic mode, so the field
/// costs nothing beyond its footprint there.
pub(crate) struct Node<T> {
    value: UnsafeCell<Option<T>>,
    next: AtomicPtr<Node<T>>,
    done: AtomicBool,
}

// A node's `value` is written once by its owning producer before the node
// becomes reachable, and afterwards touched only by the single consumer
// (or, for interior removal, by that same consumer). No two threads ever
// read/write `value` concurrently, so `Sync` only needs `T: Send`.
unsafe impl<T: Send> Send for Node<T> {}
unsafe impl<T: Send> Sync for Node<T> {}

impl<T> Node<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(Some(value)),
            next: AtomicPtr::new(std::ptr::null_mut()),
            done: AtomicBool::new(false),
        }
    }

    /// The permanently-present dummy head node.
    pub(crate) fn sentinel() -> Self {
        Self {
            value: UnsafeCell::new(None),
            next: AtomicPtr::new(std::ptr::null_mut()),
            done: AtomicBool::new(true),
        }
    }

    #[inline]
    pub(crate) fn next_relaxed(&self) -> *mut Node<T> {
        self.next.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn next_acquire(&self) -> *mut Node<T> {
        self.next.load(Ordering::Acquire)
    }

    /// `lazySetNext`: an ordered store, not a CAS — only the thread that owns
    /// this node (the producer that just won the tail CAS, or the producer
    /// absorbing a peer chain) ever calls this, so no race is possible.
    #[inline]
    pub(crate) fn link(&self, next: *mut Node<T>) {
        self.next.store(next, Ordering::Release);
    }

    /// Takes the value out, leaving the node as a spent sentinel.
    ///
    /// # Safety
    /// Caller must be the single consumer thread and must hold the only
    /// reachable reference to this node's value (i.e. it is about to become,
    /// or already is, unreachable from any producer's perspective).
    #[inline]
    pub(crate) unsafe fn take_value(&self) -> Option<T> {
        (*self.value.get()).take()
    }

    /// Borrows the value without removing it (`peek`, traversal, `contains`).
    ///
    /// # Safety
    /// Caller must not race a concurrent `take_value`/drop of this node.
    /// For the single-consumer API this always holds: producers never touch
    /// `value` once it has been installed.
    #[inline]
    pub(crate) unsafe fn value_ref(&self) -> Option<&T> {
        (*self.value.get()).as_ref()
    }

    /// Signals that this node is visible to the consumer (linearizable mode
    /// only; no-op otherwise, depending on the queue's mode).
    #[inline]
    pub(crate) fn complete(&self, linearizable: bool) {
        if linearizable {
            self.done.store(true, Ordering::Release);
        }
    }

    /// Busy-waits until a peer's `complete()` has run (linearizable mode
    /// only). Bounded by the peer's `append` eventually completing.
    ///
    /// `on_spin` is invoked once per wait iteration, letting the caller
    /// account for the wait (e.g. a metrics counter) without this node
    /// needing to know what a `Metrics` is.
    #[inline]
    pub(crate) fn await_completion(&self, linearizable: bool, mut on_spin: impl FnMut()) {
        if !linearizable {
            return;
        }
        let mut backoff = Backoff::new();
        while !self.done.load(Ordering::Acquire) {
            on_spin();
            backoff.snooze();
        }
    }
}
