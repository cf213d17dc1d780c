mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{resized, resizing, BusyLength};
use sigscope_core::{ResizeEvent, ResizeScheduler};

const THREADS: usize = 6;
const REQUESTS_PER_THREAD: usize = 40;

#[test]
fn test_concurrent_callers_never_overlap() {
    let handle = BusyLength::new(1, Duration::from_micros(300));
    let probe = handle.probe.clone();
    let sched = Arc::new(ResizeScheduler::new(handle).unwrap());
    let rx = sched.subscribe();

    let callers: Vec<_> = (0..THREADS)
        .map(|t| {
            let sched = Arc::clone(&sched);
            thread::spawn(move || {
                for i in 0..REQUESTS_PER_THREAD {
                    sched.resize((t + 1) * 1000 + i).unwrap();
                    if i % 7 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();
    for caller in callers {
        caller.join().unwrap();
    }
    sched.wait_until_idle();

    assert_eq!(probe.overlaps(), 0);
    assert!(probe.calls() <= THREADS * REQUESTS_PER_THREAD);

    let events = common::drain(&rx);
    assert!(!events.is_empty());

    // Whatever came last is what the transform ended up with.
    match events.last() {
        Some(ResizeEvent::Resized { current, .. }) => assert_eq!(*current, sched.current()),
        other => panic!("Expected a final Resized, got {:?}", other),
    }
    assert_eq!(probe.committed(), sched.current());

    // Each caller's hints arrive in the order it made its requests.
    for t in 0..THREADS {
        let base = (t + 1) * 1000;
        let mine: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ResizeEvent::Resizing { target, .. }
                    if (base..base + REQUESTS_PER_THREAD).contains(target) =>
                {
                    Some(*target)
                }
                _ => None,
            })
            .collect();
        assert!(
            mine.windows(2).all(|w| w[0] < w[1]),
            "caller {} hints out of order: {:?}",
            t,
            mine
        );
    }
}

#[test]
fn test_resized_count_matches_chains() {
    let handle = BusyLength::new(1, Duration::from_millis(2));
    let sched = ResizeScheduler::new(handle).unwrap();
    let rx = sched.subscribe();

    for n in 2..50 {
        sched.resize(n).unwrap();
    }
    sched.wait_until_idle();
    assert_eq!(sched.current(), 49);

    let events = common::drain(&rx);
    let completions = events
        .iter()
        .filter(|e| matches!(e, ResizeEvent::Resized { .. }))
        .count();
    // One completion per settled chain; the burst collapses into a few runs.
    let runs = sched.telemetry_summary().runs as usize;
    assert!(completions >= 1);
    assert!(completions <= runs);
    assert!(runs < 48);
}

#[test]
fn test_try_with_handle_refuses_while_busy() {
    let (handle, gate) = common::gated(512);
    let sched = ResizeScheduler::new(handle).unwrap();
    let rx = sched.subscribe();

    sched.resize(1024).unwrap();
    gate.wait_started();
    assert!(sched.try_with_handle(|h| h.probe.calls()).is_none());

    gate.commit();
    assert_eq!(
        common::collect_events(&rx, 2),
        vec![resizing(512, 1024), resized(512, 1024)]
    );
    assert_eq!(sched.try_with_handle(|h| h.probe.calls()), Some(1));
}

#[test]
fn test_resize_from_inside_borrow_runs_after_it() {
    let (handle, gate) = common::gated(512);
    let sched = ResizeScheduler::new(handle).unwrap();
    let rx = sched.subscribe();

    sched.with_handle(|_| {
        sched.resize(2048).unwrap();
        gate.assert_not_started();
    });

    assert_eq!(gate.wait_started(), 2048);
    gate.commit();
    assert_eq!(
        common::collect_events(&rx, 2),
        vec![resizing(512, 2048), resized(512, 2048)]
    );
}

#[test]
fn test_drop_waits_for_in_flight_work() {
    let handle = BusyLength::new(1, Duration::from_millis(30));
    let probe = handle.probe.clone();
    let sched = ResizeScheduler::new(handle).unwrap();

    sched.resize(10).unwrap();
    sched.resize(20).unwrap();
    drop(sched);

    assert_eq!(probe.committed(), 20);
    assert_eq!(probe.overlaps(), 0);
}

#[test]
fn test_many_waiters_all_return() {
    let handle = BusyLength::new(1, Duration::from_millis(5));
    let sched = Arc::new(ResizeScheduler::new(handle).unwrap());
    sched.resize(64).unwrap();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let sched = Arc::clone(&sched);
            thread::spawn(move || {
                sched.wait_until_idle();
                sched.current()
            })
        })
        .collect();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), 64);
    }
    assert!(!sched.is_busy());
}
