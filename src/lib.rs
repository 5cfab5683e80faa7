//! A lock-free, unbounded, multi-producer / single-consumer FIFO queue with
//! producer-side elimination-combining.
//!
//! Many producer threads may call [`Queue::offer`] concurrently; exactly one
//! thread at a time may drain it with [`Queue::poll`] and friends. Under
//! contention, producers that fail the head-of-line tail CAS don't simply
//! retry — they rendezvous through a small per-core arena and splice their
//! chains together off the hot path, so contention *reduces* the number of
//! CAS attempts on the shared tail instead of amplifying it.
//!
//! ```
//! use combine_queue::Queue;
//!
//! let q = Queue::<u32>::optimistic();
//! q.offer(1);
//! q.offer(2);
//! assert_eq!(q.poll(), Some(1));
//! assert_eq!(q.poll(), Some(2));
//! assert_eq!(q.poll(), None);
//! ```
//!
//! Two insertion modes trade latency for visibility guarantees (see
//! [`Queue::optimistic`] and [`Queue::linearizable`]).

mod arena;
mod backoff;
mod error;
mod invariants;
mod iter;
mod metrics;
mod node;
mod queue;

#[cfg(feature = "serde")]
mod proxy;

pub use error::QueueError;
pub use iter::Iter;
pub use metrics::MetricsSnapshot;
pub use queue::Queue;

#[cfg(feature = "serde")]
pub use proxy::QueueProxy;
