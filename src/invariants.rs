//! Debug assertion macros for the chain invariants documented for the chain.
//!
//! These are only active in debug builds (`#[cfg(debug_assertions)]`), so
//! there is zero overhead in release builds.

// =============================================================================
// INV-NODE-01: Next Only Grows
// =============================================================================

/// Assert that `next` never transitions from one non-null node to a
/// *different* non-null node — only null -> non-null (producer link) or
/// a single consumer-side relink during structural removal is legal.
///
/// Used in: `Arena::transfer_or_combine` before linking an absorbed chain.
macro_rules! debug_assert_next_was_null {
    ($next:expr) => {
        debug_assert!(
            $next.is_null(),
            "INV-NODE-01 violated: relinking a node whose `next` was already set"
        )
    };
}

// =============================================================================
// INV-SIZE-01: Bounded Size
// =============================================================================

/// Assert that the observed size does not exceed total inserts minus total
/// polls at a quiescent point.
///
/// Used in: property tests, not on the hot path.
macro_rules! debug_assert_size_bounded {
    ($size:expr, $inserted:expr, $polled:expr) => {
        debug_assert!(
            $size <= $inserted.saturating_sub($polled),
            "INV-SIZE-01 violated: size {} exceeds inserted({}) - polled({})",
            $size,
            $inserted,
            $polled
        )
    };
}

// =============================================================================
// Re-exports for crate-internal use
// =============================================================================

pub(crate) use debug_assert_next_was_null;
pub(crate) use debug_assert_size_bounded;
