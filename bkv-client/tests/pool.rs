use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bkv_client::ResourcePool;

struct Token;

#[derive(Default)]
struct Counters {
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

fn counting_pool(size: usize, timeout: Duration) -> (ResourcePool<Token>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let on_create = counters.clone();
    let on_destroy = counters.clone();
    let pool = ResourcePool::new(
        size,
        timeout,
        move || {
            on_create.created.fetch_add(1, Ordering::SeqCst);
            Some(Token)
        },
        move |_token: Token| {
            on_destroy.destroyed.fetch_add(1, Ordering::SeqCst);
        },
    );
    (pool, counters)
}

#[test]
fn consume_returns_closure_value() {
    let (pool, _counters) = counting_pool(1, Duration::from_secs(1));
    let value = pool.consume(|_token| 42);
    assert_eq!(value, Some(42));
}

#[test]
fn resources_recycled_across_leases() {
    let (pool, counters) = counting_pool(4, Duration::from_secs(1));
    pool.consume(|_token| ()).expect("first lease");
    pool.consume(|_token| ()).expect("second lease");
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 0);
}

#[test]
fn bounded_concurrency_under_stress() {
    let (pool, counters) = counting_pool(3, Duration::from_secs(5));
    let inflight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let pool = pool.clone();
        let inflight = inflight.clone();
        let peak = peak.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..10 {
                let leased = pool.consume(|_token| {
                    let now = inflight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    inflight.fetch_sub(1, Ordering::SeqCst);
                });
                assert!(leased.is_some());
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker");
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(counters.created.load(Ordering::SeqCst) <= 3);
}

#[test]
fn acquire_times_out_when_exhausted() {
    let (pool, _counters) = counting_pool(1, Duration::from_millis(200));
    let held = pool.acquire().expect("first lease");

    let start = Instant::now();
    assert!(pool.acquire().is_none());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "returned at {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned at {elapsed:?}");

    drop(held);
}

#[test]
fn no_double_lease_without_release() {
    let (pool, _counters) = counting_pool(1, Duration::from_millis(50));
    let held = pool.acquire().expect("first lease");
    assert!(pool.acquire().is_none());
    drop(held);
    assert!(pool.acquire().is_some());
}

#[test]
fn waiter_acquires_after_release() {
    let (pool, _counters) = counting_pool(1, Duration::from_secs(2));
    let held = pool.acquire().expect("first lease");

    let waiter_pool = pool.clone();
    let waiter = thread::spawn(move || {
        let start = Instant::now();
        let guard = waiter_pool.acquire();
        (guard.is_some(), start.elapsed())
    });

    thread::sleep(Duration::from_millis(100));
    drop(held);

    let (acquired, waited) = waiter.join().expect("waiter");
    assert!(acquired);
    assert!(waited >= Duration::from_millis(50), "woke at {waited:?}");
    assert!(waited < Duration::from_secs(2), "woke at {waited:?}");
}

#[test]
fn third_caller_times_out_while_two_leases_outstanding() {
    let (pool, _counters) = counting_pool(2, Duration::from_millis(200));

    let mut holders = Vec::new();
    for _ in 0..2 {
        let pool = pool.clone();
        holders.push(thread::spawn(move || {
            pool.consume(|_token| thread::sleep(Duration::from_millis(500)))
                .is_some()
        }));
    }

    // Let both holders take their leases, then race as the third caller.
    thread::sleep(Duration::from_millis(100));
    let start = Instant::now();
    assert!(pool.acquire().is_none());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200), "returned at {elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "returned at {elapsed:?}");

    for holder in holders {
        assert!(holder.join().expect("holder"));
    }
}

#[test]
fn invalidated_resource_destroyed_not_recycled() {
    let (pool, counters) = counting_pool(2, Duration::from_secs(1));
    pool.consume(|guard| guard.invalidate()).expect("lease");
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);

    pool.consume(|_token| ()).expect("fresh lease");
    assert_eq!(counters.created.load(Ordering::SeqCst), 2);
}

#[test]
fn dispose_destroys_idle_and_is_idempotent() {
    let (pool, counters) = counting_pool(2, Duration::from_secs(1));
    let first = pool.acquire().expect("first");
    let second = pool.acquire().expect("second");
    drop(first);
    drop(second);

    pool.dispose();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);

    pool.dispose();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 2);
}

#[test]
fn release_after_dispose_destroys() {
    let (pool, counters) = counting_pool(1, Duration::from_secs(1));
    let held = pool.acquire().expect("lease");

    pool.dispose();
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 0);

    drop(held);
    assert_eq!(counters.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn acquire_after_dispose_fails_fast() {
    let (pool, counters) = counting_pool(1, Duration::from_secs(5));
    pool.dispose();

    let start = Instant::now();
    assert!(pool.acquire().is_none());
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!(counters.created.load(Ordering::SeqCst), 0);
}

#[test]
fn factory_failure_frees_slot() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let factory_attempts = attempts.clone();
    let pool = ResourcePool::new(
        1,
        Duration::from_millis(200),
        move || {
            if factory_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                None
            } else {
                Some(Token)
            }
        },
        |_token: Token| {},
    );

    assert!(pool.acquire().is_none());
    assert!(pool.acquire().is_some());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn panicking_consumer_releases_lease() {
    let (pool, counters) = counting_pool(1, Duration::from_millis(200));

    let result = catch_unwind(AssertUnwindSafe(|| {
        pool.consume(|_token| panic!("operation exploded"));
    }));
    assert!(result.is_err());

    assert!(pool.acquire().is_some());
    assert_eq!(counters.created.load(Ordering::SeqCst), 1);
}
