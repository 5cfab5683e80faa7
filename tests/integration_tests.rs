//! End-to-end scenarios exercising the public `Queue<T>` API across both
//! insertion modes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use combine_queue::Queue;

#[test]
fn single_threaded_fifo_drain() {
    let q = Queue::<i32>::optimistic();
    for i in 0..100 {
        q.offer(i);
    }
    for i in 0..100 {
        assert_eq!(q.poll(), Some(i));
    }
    assert_eq!(q.poll(), None);
    assert!(q.is_empty());
}

#[test]
fn two_producers_linearizable_join_preserves_each_producers_order() {
    let q = Arc::new(Queue::<(u8, u32)>::linearizable());
    let barrier = Arc::new(Barrier::new(2));
    const N: u32 = 5_000;

    let mut handles = vec![];
    for producer_id in 0..2u8 {
        let q = Arc::clone(&q);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            for seq in 0..N {
                q.offer((producer_id, seq));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let mut last_seen = [None::<u32>, None::<u32>];
    let mut total = 0u32;
    while let Some((producer, seq)) = q.poll() {
        total += 1;
        let slot = &mut last_seen[producer as usize];
        if let Some(prev) = *slot {
            assert!(seq > prev, "producer {producer} out of order: {prev} then {seq}");
        }
        *slot = Some(seq);
    }
    assert_eq!(total, 2 * N);
}

#[test]
fn optimistic_mode_same_thread_poll_may_observe_empty_under_combining() {
    // In optimistic mode a producer may return from `offer` before its node
    // is actually linked, if a peer absorbed it through the arena. A
    // same-thread `poll()` immediately after is therefore not guaranteed to
    // see the element — this test only asserts the queue never panics or
    // corrupts state under that race, and that the element surfaces
    // eventually.
    let q = Arc::new(Queue::<u32>::optimistic());
    let producers: Vec<_> = (0..8)
        .map(|i| {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                for v in 0..200u32 {
                    q.offer(i * 1000 + v);
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let mut drained = 0;
    while q.poll().is_some() {
        drained += 1;
    }
    assert_eq!(drained, 8 * 200);
}

#[test]
fn add_all_then_remove_then_drain() {
    let q = Queue::<i32>::optimistic();
    assert!(q.add_all(vec![1, 2, 3, 4, 5]));
    assert!(q.remove(&3));
    assert!(!q.contains(&3));

    let mut out = vec![];
    let drained = q.drain(usize::MAX, |v| out.push(v));
    assert_eq!(drained, 4);
    assert_eq!(out, vec![1, 2, 4, 5]);
}

#[test]
fn iterator_snapshot_is_unaffected_by_a_concurrent_insert() {
    let q = Queue::<i32>::optimistic();
    q.add_all(vec![1, 2, 3]);

    let seen: Vec<i32> = {
        let mut it = q.iter();
        let first = it.next().copied();
        q.offer(99);
        let rest: Vec<i32> = it.copied().collect();
        let mut all = vec![first.unwrap()];
        all.extend(rest);
        all
    };

    assert_eq!(seen, vec![1, 2, 3]);
    assert_eq!(q.size(), 4);
}

#[cfg(feature = "serde")]
#[test]
fn serialize_then_deserialize_round_trip() {
    use combine_queue::QueueProxy;

    let q = Queue::<String>::linearizable();
    q.add_all(vec!["a".to_string(), "b".to_string(), "c".to_string()]);

    let proxy = QueueProxy::from_queue(&q);
    let json = serde_json::to_string(&proxy).unwrap();
    let restored: QueueProxy<String> = serde_json::from_str(&json).unwrap();
    let q2 = restored.into_queue().unwrap();

    assert!(q2.is_linearizable());
    assert_eq!(q2.poll(), Some("a".to_string()));
    assert_eq!(q2.poll(), Some("b".to_string()));
    assert_eq!(q2.poll(), Some("c".to_string()));
}

#[test]
fn many_producers_high_contention_no_lost_or_duplicated_elements() {
    let q = Arc::new(Queue::<u64>::linearizable());
    let next_id = Arc::new(AtomicUsize::new(0));
    const PRODUCERS: usize = 16;
    const PER_PRODUCER: usize = 2_000;

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let q = Arc::clone(&q);
            let next_id = Arc::clone(&next_id);
            thread::spawn(move || {
                for _ in 0..PER_PRODUCER {
                    let id = next_id.fetch_add(1, Ordering::Relaxed) as u64;
                    q.offer(id);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut seen = vec![false; PRODUCERS * PER_PRODUCER];
    let mut total = 0;
    while let Some(id) = q.poll() {
        let idx = id as usize;
        assert!(!seen[idx], "duplicate element {id}");
        seen[idx] = true;
        total += 1;
    }
    assert_eq!(total, PRODUCERS * PER_PRODUCER);
    assert!(seen.iter().all(|&s| s), "some element was never delivered");
}
