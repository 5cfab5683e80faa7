use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::arena::{Arena, Combine};
use crate::backoff::Backoff;
use crate::error::QueueError;
#[cfg(debug_assertions)]
use crate::invariants::debug_assert_size_bounded;
use crate::iter::Iter;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::node::Node;

#[cfg(debug_assertions)]
use std::sync::atomic::AtomicU64;

/// A lock-free, unbounded, multi-producer / single-consumer queue with
/// producer-side elimination-combining.
///
/// Any number of threads may call the producer-facing methods
/// (`offer`/`add`/`add_all`) concurrently. Exactly one thread at a time may
/// call the consumer-facing methods (`poll`, `peek`, `remove`, `clear`,
/// iteration, ...) — the queue trusts this contract and performs no
/// defensive check, matching the single-consumer contract documented above.
///
/// Cloning a `Queue` clones the handle, not the data — all clones share the
/// same underlying chain via one `Arc<Inner<T>>`.
pub struct Queue<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    // Independently cache-line-padded so producer tail CASes and the
    // consumer's head writes never share a line.
    head: CachePadded<AtomicPtr<Node<T>>>,
    tail: CachePadded<AtomicPtr<Node<T>>>,
    arena: Arena<T>,
    linearizable: bool,
    metrics: Metrics,
    enable_metrics: AtomicBool,
    #[cfg(debug_assertions)]
    inserted: AtomicU64,
    #[cfg(debug_assertions)]
    polled: AtomicU64,
}

// SAFETY: all shared mutation goes through atomics or the single-consumer
// contract; see `Node`'s own safety comment for the `value` cell.
unsafe impl<T: Send> Send for Queue<T> {}
unsafe impl<T: Send> Sync for Queue<T> {}

impl<T> Queue<T> {
    /// Creates a queue in optimistic mode: an insert may return before the
    /// element is globally visible, provided a peer has taken ownership of
    /// making it visible.
    pub fn optimistic() -> Self {
        Self::with_mode(false)
    }

    /// Creates a queue in linearizable mode: a successful insert happens-
    /// before the element becoming visible to any subsequent `poll`.
    pub fn linearizable() -> Self {
        Self::with_mode(true)
    }

    fn with_mode(linearizable: bool) -> Self {
        Self::with_mode_and_arena(linearizable, Arena::new())
    }

    #[cfg(test)]
    pub(crate) fn with_mode_and_arena_length(linearizable: bool, arena_len: usize) -> Self {
        Self::with_mode_and_arena(linearizable, Arena::with_length(arena_len))
    }

    fn with_mode_and_arena(linearizable: bool, arena: Arena<T>) -> Self {
        let sentinel = Box::into_raw(Box::new(Node::sentinel()));
        Self {
            inner: Arc::new(Inner {
                head: CachePadded::new(AtomicPtr::new(sentinel)),
                tail: CachePadded::new(AtomicPtr::new(sentinel)),
                arena,
                linearizable,
                metrics: Metrics::new(),
                enable_metrics: AtomicBool::new(false),
                #[cfg(debug_assertions)]
                inserted: AtomicU64::new(0),
                #[cfg(debug_assertions)]
                polled: AtomicU64::new(0),
            }),
        }
    }

    /// Returns true if this queue was constructed in linearizable mode.
    #[inline]
    pub fn is_linearizable(&self) -> bool {
        self.inner.linearizable
    }

    /// Enables metrics collection on this queue handle. Since all clones
    /// share one `Inner`, this affects every clone, not just `self`.
    pub fn with_metrics(self) -> Self {
        self.inner.enable_metrics.store(true, Ordering::Relaxed);
        self
    }

    /// Returns a metrics snapshot (all zero unless metrics collection was
    /// enabled via [`Queue::with_metrics`]).
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.inner.enable_metrics.load(Ordering::Relaxed) {
            self.inner.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ------------------------------------------------------------------
    // Producer protocol
    // ------------------------------------------------------------------

    /// Inserts a single element. Always succeeds — the queue is unbounded —
    /// so the `bool` result exists only to mirror `java.util.Queue::offer`.
    pub fn offer(&self, value: T) -> bool {
        let node = Box::into_raw(Box::new(Node::new(value)));
        self.append(node, node, 1);
        true
    }

    /// Alias for [`Queue::offer`].
    pub fn add(&self, value: T) -> bool {
        self.offer(value)
    }

    /// Inserts every element of `values`, preserving their relative order.
    /// Returns `false` without touching the queue if `values` is empty —
    /// there are no partial-success states.
    pub fn add_all<I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = T>,
    {
        let mut iter = values.into_iter();
        let Some(first_value) = iter.next() else {
            return false;
        };

        let first = Box::into_raw(Box::new(Node::new(first_value)));
        let mut last = first;
        let mut count = 1u64;
        for value in iter {
            let node = Box::into_raw(Box::new(Node::new(value)));
            // SAFETY: `last` was just allocated by us and is not yet linked
            // anywhere else, so no one else can observe or race this store.
            unsafe { (*last).link(node) };
            last = node;
            count += 1;
        }

        self.append(first, last, count);
        true
    }

    /// Implements `append(first, last)`. `count` is the
    /// number of nodes in the `first..=last` chain, tracked only to back
    /// the debug-only size-bound assertion.
    fn append(&self, first: *mut Node<T>, mut last: *mut Node<T>, count: u64) {
        #[cfg(debug_assertions)]
        self.inner.inserted.fetch_add(count, Ordering::Relaxed);
        #[cfg(not(debug_assertions))]
        let _ = count;

        let mut backoff = Backoff::new();
        loop {
            let t = self.inner.tail.load(Ordering::Acquire);
            if self
                .inner
                .tail
                .compare_exchange(t, last, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                if self.inner.enable_metrics.load(Ordering::Relaxed) {
                    self.inner.metrics.record_tail_cas_win();
                }
                // SAFETY: we won the CAS, so we are the sole writer of `t.next`.
                unsafe {
                    (*t).link(first);
                    let mut cur = first;
                    loop {
                        (*cur).complete(self.inner.linearizable);
                        if cur == last {
                            break;
                        }
                        cur = (*cur).next_relaxed();
                    }
                }
                return;
            }

            if self.inner.enable_metrics.load(Ordering::Relaxed) {
                self.inner.metrics.record_tail_cas_retry();
            }

            match self.inner.arena.transfer_or_combine(first, last) {
                Combine::HandedOff => {
                    if self.inner.enable_metrics.load(Ordering::Relaxed) {
                        self.inner.metrics.record_arena_handoff();
                    }
                    // SAFETY: `first` is our own node; await_completion only
                    // reads its `done` flag.
                    let metrics_enabled = self.inner.enable_metrics.load(Ordering::Relaxed);
                    unsafe {
                        (*first).await_completion(self.inner.linearizable, || {
                            if metrics_enabled {
                                self.inner.metrics.record_await_spin();
                            }
                        })
                    };
                    return;
                }
                Combine::NoMatch => {
                    backoff.spin();
                }
                Combine::Absorbed(new_last) => {
                    if self.inner.enable_metrics.load(Ordering::Relaxed) {
                        self.inner.metrics.record_arena_absorption();
                    }
                    last = new_last;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Consumer protocol — single-threaded contract, no check.
    // ------------------------------------------------------------------

    /// Returns a reference to the first element without removing it.
    pub fn peek(&self) -> Option<&T> {
        let head = self.inner.head.load(Ordering::Relaxed);
        // SAFETY: `head` is always a live node owned by this queue.
        let next = unsafe { (*head).next_acquire() };
        if next.is_null() {
            return None;
        }
        // SAFETY: single-consumer contract; `next`'s value was published by
        // the producer before it became reachable.
        unsafe { (*next).value_ref() }
    }

    /// Removes and returns the first element, or `None` if the queue is
    /// momentarily or genuinely empty.
    pub fn poll(&self) -> Option<T> {
        let head = self.inner.head.load(Ordering::Relaxed);
        // SAFETY: single-consumer contract.
        let next = unsafe { (*head).next_acquire() };
        if next.is_null() {
            return None;
        }

        self.inner.head.store(next, Ordering::Release);

        // SAFETY: `next` is now the sentinel; its value is ours to take.
        let value = unsafe { (*next).take_value() };

        // `head` (the old sentinel) is now unreachable from any producer:
        // producers only ever extend past the current tail, never touch the
        // consumed prefix. Safe for the sole consumer to free it.
        unsafe { drop(Box::from_raw(head)) };

        #[cfg(debug_assertions)]
        self.inner.polled.fetch_add(1, Ordering::Relaxed);

        value
    }

    /// `remove()`: like [`Queue::poll`], but fails instead of returning
    /// `None` on an empty queue.
    pub fn remove_front(&self) -> Result<T, QueueError> {
        self.poll().ok_or(QueueError::Empty)
    }

    /// `element()`: like [`Queue::peek`], but fails instead of returning
    /// `None` on an empty queue.
    pub fn element(&self) -> Result<&T, QueueError> {
        self.peek().ok_or(QueueError::Empty)
    }

    /// Drains up to `max` elements, invoking `handler` on each in order.
    /// Returns the number drained. A mechanical convenience built from
    /// repeated `poll()`.
    pub fn drain<F: FnMut(T)>(&self, max: usize, mut handler: F) -> usize {
        let mut drained = 0;
        while drained < max {
            match self.poll() {
                Some(value) => {
                    handler(value);
                    drained += 1;
                }
                None => break,
            }
        }
        drained
    }

    /// `clear()`: lazily advances head to the current tail. Does not
    /// quiesce in-flight producers — elements linked concurrently with a
    /// `clear()` may survive it.
    pub fn clear(&self) {
        let t = self.inner.tail.load(Ordering::Acquire);
        let old_head = self.inner.head.load(Ordering::Relaxed);
        if old_head == t {
            return;
        }
        self.inner.head.store(t, Ordering::Release);

        // The detached prefix [old_head, t) is unreachable; free it. `t`
        // is reachable from `old_head` by the chain invariant,
        // so this walk is guaranteed to terminate without hitting null.
        let mut cur = old_head;
        while cur != t {
            // SAFETY: `cur` is part of the now-detached prefix, exclusively
            // owned by the consumer.
            let next = unsafe { (*cur).next_acquire() };
            unsafe { drop(Box::from_raw(cur)) };
            cur = next;
        }
    }

    /// `isEmpty()`: `head == tail`.
    pub fn is_empty(&self) -> bool {
        self.inner.head.load(Ordering::Relaxed) == self.inner.tail.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Traversal and structural removal
    // ------------------------------------------------------------------

    /// `size()`: O(n) traversal from `head.next`. May lag concurrent
    /// producers by design.
    pub fn size(&self) -> usize {
        let mut count = 0;
        let head = self.inner.head.load(Ordering::Relaxed);
        let mut cur = unsafe { (*head).next_acquire() };
        while !cur.is_null() {
            count += 1;
            cur = unsafe { (*cur).next_acquire() };
        }

        #[cfg(debug_assertions)]
        debug_assert_size_bounded!(
            count as u64,
            self.inner.inserted.load(Ordering::Relaxed),
            self.inner.polled.load(Ordering::Relaxed)
        );

        count
    }

    /// `contains(o)`: traverse from `head.next`, comparing by value equality.
    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let head = self.inner.head.load(Ordering::Relaxed);
        let mut cur = unsafe { (*head).next_acquire() };
        while !cur.is_null() {
            if unsafe { (*cur).value_ref() } == Some(value) {
                return true;
            }
            cur = unsafe { (*cur).next_acquire() };
        }
        false
    }

    /// `containsAll(c)`.
    pub fn contains_all<'a, I>(&self, values: I) -> bool
    where
        T: PartialEq,
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        values.into_iter().all(|v| self.contains(v))
    }

    /// Implements tail-guarded excision:
    /// relinks `prev.next` past `cursor`, accounting for a concurrent
    /// producer tail swing, then frees `cursor`.
    pub(crate) fn excise(&self, prev: *mut Node<T>, cursor: *mut Node<T>) {
        // SAFETY: both pointers are live nodes owned by this queue, touched
        // only by the single consumer (structural removal is consumer-only).
        unsafe {
            let mut next = (*cursor).next_relaxed();
            if next.is_null() && cursor == self.inner.tail.load(Ordering::Relaxed) {
                let cas_failed = self
                    .inner
                    .tail
                    .compare_exchange(cursor, prev, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err();
                if cas_failed {
                    // A producer won the tail race and is about to link
                    // behind `cursor`; spin until that link lands so we
                    // don't drop the suffix it's attaching.
                    let mut backoff = Backoff::new();
                    loop {
                        next = (*cursor).next_acquire();
                        if !next.is_null() {
                            break;
                        }
                        backoff.spin();
                    }
                }
            }
            (*prev).link(next);
            drop(Box::from_raw(cursor));
        }
    }

    /// `remove(o)`: consumer-side only value-based removal of the first
    /// matching element.
    pub fn remove(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        let mut prev = self.inner.head.load(Ordering::Relaxed);
        let mut cursor = unsafe { (*prev).next_acquire() };
        while !cursor.is_null() {
            let next = unsafe { (*cursor).next_acquire() };
            if unsafe { (*cursor).value_ref() } == Some(value) {
                self.excise(prev, cursor);
                return true;
            }
            prev = cursor;
            cursor = next;
        }
        false
    }

    /// `removeAll(c)`: removes every element equal to some member of `values`.
    /// Returns `true` if the queue was modified.
    pub fn remove_all<'a, I>(&self, values: I) -> bool
    where
        T: PartialEq,
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let targets: Vec<&T> = values.into_iter().collect();
        self.retain_matching(|v| !targets.contains(&v))
    }

    /// `retainAll(c)`: removes every element *not* equal to some member of
    /// `values`. Returns `true` if the queue was modified.
    pub fn retain_all<'a, I>(&self, values: I) -> bool
    where
        T: PartialEq,
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let targets: Vec<&T> = values.into_iter().collect();
        self.retain_matching(|v| targets.contains(&v))
    }

    /// Shared walk for `removeAll`/`retainAll`: keeps elements for which
    /// `keep` returns true, excising the rest.
    fn retain_matching<F>(&self, keep: F) -> bool
    where
        F: Fn(&T) -> bool,
    {
        let mut modified = false;
        let mut prev = self.inner.head.load(Ordering::Relaxed);
        let mut cursor = unsafe { (*prev).next_acquire() };
        while !cursor.is_null() {
            let next = unsafe { (*cursor).next_acquire() };
            let keep_it = unsafe { (*cursor).value_ref() }.map_or(true, &keep);
            if keep_it {
                prev = cursor;
            } else {
                self.excise(prev, cursor);
                modified = true;
            }
            cursor = next;
        }
        modified
    }

    /// A weakly-consistent snapshot iterator.
    pub fn iter(&self) -> Iter<'_, T> {
        let head = self.inner.head.load(Ordering::Relaxed);
        let cursor = unsafe { (*head).next_relaxed() };
        Iter::new(self, head, cursor)
    }
}

impl<T> Default for Queue<T> {
    /// Defaults to optimistic mode, the cheaper of the two under contention.
    fn default() -> Self {
        Self::optimistic()
    }
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Free whatever remains in the chain, including the sentinel.
        let mut cur = *self.head.get_mut();
        while !cur.is_null() {
            let next = unsafe { (*cur).next_relaxed() };
            unsafe { drop(Box::from_raw(cur)) };
            cur = next;
        }

        // Defensive: free any chain still parked in an arena slot. This can
        // only happen if the queue is dropped with producers mid-`append`,
        // which the `Arc`-counted handle model prevents in practice.
        self.arena.drain_for_drop();
    }
}
