use crate::error::QueueError;
use crate::node::Node;
use crate::queue::Queue;

/// A weakly-consistent snapshot iterator.
///
/// Reflects the state of the queue at some point during the iterator's
/// construction and traversal; it will never throw, skip a live element
/// twice, or observe a torn value, but it may or may not reflect insertions
/// and removals that race it.
pub struct Iter<'a, T> {
    queue: &'a Queue<T>,
    // The node whose `next` currently points at `cursor` — i.e. the anchor
    // `remove()` would relink. Only advanced to `last_returned` *after* a
    // successful `next()`, so a `remove()` immediately following it excises
    // the right node even if a prior element in the chain was itself
    // removed without ever being advanced past (the deferred-advance rule).
    prev: *mut Node<T>,
    cursor: *mut Node<T>,
    last_returned: Option<*mut Node<T>>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(queue: &'a Queue<T>, prev: *mut Node<T>, cursor: *mut Node<T>) -> Self {
        Self {
            queue,
            prev,
            cursor,
            last_returned: None,
        }
    }

    /// Removes the element most recently returned by `next()`.
    ///
    /// Fails with [`QueueError::IllegalState`] if called before the first
    /// `next()`, or twice in a row without an intervening `next()` — the
    /// same contract as `java.util.Iterator::remove`.
    pub fn remove(&mut self) -> Result<(), QueueError> {
        let removed = self.last_returned.take().ok_or(QueueError::IllegalState)?;
        // `prev` was deliberately left pointing at the anchor *before*
        // `removed` (not advanced to `removed` itself) precisely so this
        // excision relinks past the right node even when earlier elements
        // in the chain were removed without the iterator ever stopping on
        // them.
        self.queue.excise(self.prev, removed);
        Ok(())
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            let cursor = self.cursor;
            if cursor.is_null() {
                return None;
            }

            // SAFETY: `cursor` is reachable from the chain anchored in
            // `self.queue`, which outlives `'a`; the single-consumer
            // contract means no one frees a node this iterator can still
            // reach.
            let value: Option<&'a T> = unsafe { (*cursor).value_ref() };
            let next = unsafe { (*cursor).next_acquire() };
            self.cursor = next;

            match value {
                Some(v) => {
                    // Only now, having successfully returned `cursor`, do we
                    // advance `prev` to the node that preceded it. If this
                    // element turns out to have been concurrently excised
                    // before a subsequent `remove()` call, `prev` still
                    // correctly denotes the last *live* predecessor.
                    if let Some(returned) = self.last_returned.replace(cursor) {
                        self.prev = returned;
                    }
                    return Some(v);
                }
                None => {
                    // `cursor` was concurrently removed (its value was taken
                    // by a structural removal) between being linked and our
                    // visit; skip it without moving `prev` past it, since
                    // `prev` already anchors before this dead node.
                }
            }
        }
    }
}
