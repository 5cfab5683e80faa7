use std::sync::atomic::{AtomicU64, Ordering};

/// Optional counters for observing elimination-combining activity.
///
/// Mirrors the shape of a typical ring-buffer metrics struct: a snapshot
/// type for readers, and an internal atomic-backed accumulator that a queue
/// only touches when metrics are enabled (a single `bool` check on the hot
/// path otherwise).
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    /// Times a producer won the tail CAS on its first attempt.
    pub tail_cas_wins: u64,
    /// Times a producer lost the tail CAS and had to retry.
    pub tail_cas_retries: u64,
    /// Times a chain was deposited into the arena and later taken by a peer.
    pub arena_handoffs: u64,
    /// Times a producer absorbed one or more peer chains from the arena.
    pub arena_absorptions: u64,
    /// Times a linearizable producer had to busy-wait on `done`.
    pub await_spins: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Metrics {
    tail_cas_wins: AtomicU64,
    tail_cas_retries: AtomicU64,
    arena_handoffs: AtomicU64,
    arena_absorptions: AtomicU64,
    await_spins: AtomicU64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_tail_cas_win(&self) {
        self.tail_cas_wins.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_tail_cas_retry(&self) {
        self.tail_cas_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_arena_handoff(&self) {
        self.arena_handoffs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_arena_absorption(&self) {
        self.arena_absorptions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_await_spin(&self) {
        self.await_spins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tail_cas_wins: self.tail_cas_wins.load(Ordering::Relaxed),
            tail_cas_retries: self.tail_cas_retries.load(Ordering::Relaxed),
            arena_handoffs: self.arena_handoffs.load(Ordering::Relaxed),
            arena_absorptions: self.arena_absorptions.load(Ordering::Relaxed),
            await_spins: self.await_spins.load(Ordering::Relaxed),
        }
    }
}
