//! Serialization proxy: a queue's internal chain of raw
//! node pointers has no meaningful serialized form, so `Queue<T>` itself
//! never implements `Serialize`/`Deserialize`. Instead, callers explicitly
//! snapshot to or rebuild from this plain, ordered representation.

use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::queue::Queue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Optimistic,
    Linearizable,
}

impl Mode {
    fn as_tag(self) -> &'static str {
        match self {
            Mode::Optimistic => "optimistic",
            Mode::Linearizable => "linearizable",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "optimistic" => Some(Mode::Optimistic),
            "linearizable" => Some(Mode::Linearizable),
            _ => None,
        }
    }
}

/// A serializable snapshot of a [`Queue`]'s mode and current contents, in
/// FIFO order.
///
/// `mode` is carried as a plain string rather than a derived enum tag so
/// that an envelope written by a future version with a mode this crate
/// doesn't recognize fails `into_queue` with [`QueueError::InvalidObject`]
/// instead of failing earlier, inside `serde`, with an opaque format error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueProxy<T> {
    mode: String,
    elements: Vec<T>,
}

impl<T> QueueProxy<T> {
    /// Snapshots `queue`'s mode and elements (via its weakly-consistent
    /// iterator) into a serializable form.
    pub fn from_queue(queue: &Queue<T>) -> Self
    where
        T: Clone,
    {
        let mode = if queue.is_linearizable() {
            Mode::Linearizable
        } else {
            Mode::Optimistic
        };
        let elements = queue.iter().cloned().collect();
        Self { mode: mode.as_tag().to_string(), elements }
    }

    /// Rebuilds a fresh [`Queue`] from this snapshot, preserving mode and
    /// element order.
    ///
    /// Fails with [`QueueError::InvalidObject`] if `mode` isn't one of the
    /// tags this version knows how to rehydrate — the only way that can
    /// happen today is a hand-edited or foreign-origin envelope, since
    /// `from_queue` only ever writes a recognized tag, but the check still
    /// runs on every call rather than trusting the source.
    pub fn into_queue(self) -> Result<Queue<T>, QueueError> {
        let mode = Mode::from_tag(&self.mode).ok_or(QueueError::InvalidObject)?;
        let queue = match mode {
            Mode::Optimistic => Queue::optimistic(),
            Mode::Linearizable => Queue::linearizable(),
        };
        queue.add_all(self.elements);
        Ok(queue)
    }
}
