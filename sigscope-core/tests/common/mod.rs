#![allow(dead_code)]
//! Test harness utilities for sigscope-core integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use sigscope_core::resize::EventReceiver;
use sigscope_core::{Reconfigure, ReconfigureError, ResizeEvent};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// What the next gated reconfigure call should do once released.
#[derive(Debug)]
pub enum Step {
    Commit,
    Fail(String),
    Panic,
}

/// A length-like transform whose `reconfigure` blocks until the test
/// releases it, so tests decide exactly when a computation finishes.
pub struct GatedLength {
    len: usize,
    started: Sender<usize>,
    release: Receiver<Step>,
    pub probe: Probe,
}

/// Counters shared between a transform and the test body.
#[derive(Clone, Default)]
pub struct Probe {
    in_flight: Arc<AtomicBool>,
    pub overlaps: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
    pub committed: Arc<AtomicUsize>,
}

impl Probe {
    /// Mark a reconfigure call as started; counts any overlap with another.
    pub fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn exit(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }
}

/// Test-side controls for a [`GatedLength`].
pub struct Gate {
    started: Receiver<usize>,
    release: Sender<Step>,
}

impl Gate {
    /// Wait until the worker enters `reconfigure`; returns its target.
    pub fn wait_started(&self) -> usize {
        self.started
            .recv_timeout(TIMEOUT)
            .expect("Timed out waiting for reconfigure to start")
    }

    pub fn commit(&self) {
        self.release.send(Step::Commit).unwrap();
    }

    pub fn fail(&self, msg: &str) {
        self.release.send(Step::Fail(msg.to_string())).unwrap();
    }

    pub fn panic_next(&self) {
        self.release.send(Step::Panic).unwrap();
    }

    /// No further reconfigure call has started.
    pub fn assert_not_started(&self) {
        assert!(
            self.started.try_recv().is_err(),
            "unexpected reconfigure call"
        );
    }
}

pub fn gated(len: usize) -> (GatedLength, Gate) {
    let (started_tx, started_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();
    let handle = GatedLength {
        len,
        started: started_tx,
        release: release_rx,
        probe: Probe::default(),
    };
    handle.probe.committed.store(len, Ordering::SeqCst);
    (
        handle,
        Gate {
            started: started_rx,
            release: release_tx,
        },
    )
}

impl Reconfigure for GatedLength {
    type Target = usize;

    fn current(&self) -> usize {
        self.len
    }

    fn reconfigure(&mut self, target: &usize) -> Result<(), ReconfigureError> {
        self.probe.enter();
        let _ = self.started.send(*target);
        let step = self.release.recv_timeout(TIMEOUT);
        self.probe.exit();
        match step {
            Ok(Step::Commit) => {
                self.len = *target;
                self.probe.committed.store(*target, Ordering::SeqCst);
                Ok(())
            }
            Ok(Step::Fail(msg)) => Err(ReconfigureError::Failed(msg)),
            Ok(Step::Panic) => panic!("reconfigure exploded at {}", target),
            Err(_) => Err(ReconfigureError::Failed("gate never released".into())),
        }
    }
}

/// A transform that takes a little real time and records overlaps.
pub struct BusyLength {
    len: usize,
    work: Duration,
    pub probe: Probe,
}

impl BusyLength {
    pub fn new(len: usize, work: Duration) -> Self {
        Self {
            len,
            work,
            probe: Probe::default(),
        }
    }
}

impl Reconfigure for BusyLength {
    type Target = usize;

    fn current(&self) -> usize {
        self.len
    }

    fn reconfigure(&mut self, target: &usize) -> Result<(), ReconfigureError> {
        self.probe.enter();
        std::thread::sleep(self.work);
        self.len = *target;
        self.probe.committed.store(*target, Ordering::SeqCst);
        self.probe.exit();
        Ok(())
    }
}

/// Receive exactly `n` events, or panic after [`TIMEOUT`].
pub fn collect_events(rx: &EventReceiver<usize>, n: usize) -> Vec<ResizeEvent<usize>> {
    let deadline = Instant::now() + TIMEOUT;
    let mut events = Vec::with_capacity(n);
    while events.len() < n {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) => events.push(event),
            Err(_) => panic!(
                "Timed out waiting for {} events (have {:?})",
                n, events
            ),
        }
    }
    events
}

/// Everything queued right now.
pub fn drain(rx: &EventReceiver<usize>) -> Vec<ResizeEvent<usize>> {
    rx.try_iter().collect()
}

pub fn resizing(prev: usize, target: usize) -> ResizeEvent<usize> {
    ResizeEvent::Resizing { prev, target }
}

pub fn resized(prev: usize, current: usize) -> ResizeEvent<usize> {
    ResizeEvent::Resized { prev, current }
}
