use thiserror::Error;

/// Error taxonomy for queue operations.
///
/// `offer`/`add`/`addAll` rejecting a null element or null collection has no
/// Rust counterpart: a generic `T` cannot be null, and a collection can only
/// be empty, which `addAll` already reports through its `bool` result. Those
/// two branches of the source taxonomy are therefore type-system guarantees
/// here rather than runtime errors (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// `remove()` / `element()` called on an empty queue.
    #[error("queue is empty")]
    Empty,
    /// Iterator `remove()` called before `next()`, or twice in a row.
    #[error("iterator remove() called before next() or twice in a row")]
    IllegalState,
    /// A serialized envelope did not carry a recognized mode tag.
    #[error("not a valid queue serialization proxy")]
    InvalidObject,
}
