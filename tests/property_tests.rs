//! Property-based tests for the invariants documented for the chain and its
//! structural operations.
//!
//! Coverage:
//! - `Queue<T>` in both optimistic and linearizable mode.
//!
//! These are single-threaded tests: they check that `Queue` behaves like an
//! ordinary FIFO collection when there's no concurrency to speak of, so any
//! divergence can't be blamed on a race. Multi-producer behavior is covered
//! separately in `integration_tests.rs` and `loom_tests.rs`.

use std::collections::VecDeque;

use combine_queue::Queue;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Offer(i32),
    Poll,
    Remove(i32),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<i32>()).prop_map(Op::Offer),
        Just(Op::Poll),
        (0i32..16).prop_map(Op::Remove),
        Just(Op::Clear),
    ]
}

// =============================================================================
// INV-FIFO-01: relative order is preserved
// "elements that are never removed come out in the order they went in"
// =============================================================================

proptest! {
    #[test]
    fn prop_fifo_order_matches_a_vecdeque_model(
        ops in prop::collection::vec(op_strategy(), 0..200),
    ) {
        let q = Queue::<i32>::optimistic();
        let mut model: VecDeque<i32> = VecDeque::new();

        for op in ops {
            match op {
                Op::Offer(v) => {
                    q.offer(v);
                    model.push_back(v);
                }
                Op::Poll => {
                    let expected = model.pop_front();
                    prop_assert_eq!(q.poll(), expected);
                }
                Op::Remove(v) => {
                    let removed_model = if let Some(pos) = model.iter().position(|&x| x == v) {
                        model.remove(pos);
                        true
                    } else {
                        false
                    };
                    let removed_queue = q.remove(&v);
                    prop_assert_eq!(removed_queue, removed_model);
                }
                Op::Clear => {
                    q.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(q.size(), model.len());
        }

        // Drain anything left and compare full order.
        let mut drained = vec![];
        q.drain(usize::MAX, |v| drained.push(v));
        prop_assert_eq!(drained, model.into_iter().collect::<Vec<_>>());
    }
}

// =============================================================================
// INV-SIZE-01: size is bounded by inserted - polled
// =============================================================================

proptest! {
    #[test]
    fn prop_size_never_exceeds_inserted_minus_polled(
        inserts in 0usize..200,
        polls in 0usize..200,
    ) {
        let q = Queue::<u32>::linearizable();
        for i in 0..inserts {
            q.offer(i as u32);
        }
        let mut polled = 0;
        for _ in 0..polls {
            if q.poll().is_some() {
                polled += 1;
            }
        }
        prop_assert!(q.size() <= inserts.saturating_sub(polled));
    }
}

// =============================================================================
// INV-CONTAINS-01: contains agrees with a linear scan via the iterator
// =============================================================================

proptest! {
    #[test]
    fn prop_contains_agrees_with_iteration(
        values in prop::collection::vec(0i32..50, 0..100),
        probe in 0i32..50,
    ) {
        let q = Queue::<i32>::optimistic();
        q.add_all(values.clone());

        let via_iter = q.iter().any(|&v| v == probe);
        let via_contains = q.contains(&probe);
        prop_assert_eq!(via_iter, via_contains);
    }
}

// =============================================================================
// INV-RETAIN-01: retainAll keeps exactly the intersection, removeAll the
// complement, and both report whether they changed anything.
// =============================================================================

proptest! {
    #[test]
    fn prop_retain_all_keeps_exactly_the_intersection(
        values in prop::collection::vec(0i32..20, 0..60),
        keep_set in prop::collection::vec(0i32..20, 0..10),
    ) {
        let q = Queue::<i32>::optimistic();
        if values.is_empty() {
            return Ok(());
        }
        q.add_all(values.clone());

        let expected: Vec<i32> = values.iter().copied().filter(|v| keep_set.contains(v)).collect();
        let changed = q.retain_all(&keep_set);

        let mut remaining = vec![];
        q.drain(usize::MAX, |v| remaining.push(v));

        prop_assert_eq!(&remaining, &expected);
        prop_assert_eq!(changed, remaining.len() != values.len());
    }
}

// =============================================================================
// INV-EMPTY-01: isEmpty agrees with size() == 0 and with poll() == None
// =============================================================================

proptest! {
    #[test]
    fn prop_is_empty_agrees_with_size_and_poll(
        values in prop::collection::vec(0i32..20, 0..30),
        drain_count in 0usize..40,
    ) {
        let q = Queue::<i32>::optimistic();
        q.add_all(values);
        for _ in 0..drain_count {
            q.poll();
        }

        prop_assert_eq!(q.is_empty(), q.size() == 0);
        if q.is_empty() {
            prop_assert_eq!(q.peek(), None);
        }
    }
}
