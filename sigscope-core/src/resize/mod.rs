//! Request-coalescing resize scheduler.
//!
//! A [`ResizeScheduler`] owns one resizable transform (an FFT plan, an STFT
//! analysis, ...) and a dedicated worker thread. The UI calls
//! [`ResizeScheduler::resize`] as often as it likes; the call returns after a
//! short critical section and the expensive `reconfigure` runs on the worker.
//! Requests arriving while a computation is in flight collapse into a single
//! pending slot, so only the most recent one is ever applied.
//!
//! Two locks coordinate the work:
//! - the busy lock is held for as long as a computation (or a borrow through
//!   [`ResizeScheduler::with_handle`]) owns the transform;
//! - the target lock guards the active and pending targets.
//!
//! The target lock is only ever taken before a *non-blocking* probe of the
//! busy lock, never the other way around, so the two cannot deadlock.

mod busy;
mod notifier;
mod telemetry;
mod worker;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use sigscope_types::{ConfigurationError, ReconfigureError, ResizeError, ResizeEvent, StftParams};

use busy::BusyLock;
use telemetry::ReconfigureTelemetry;
use worker::WorkerSignal;

pub use notifier::{dispatch_event, dispatch_events, EventReceiver, ResizeObserver};
pub use telemetry::TelemetrySummary;

pub(crate) use notifier::Notifier;

/// A value a transform can be resized to.
pub trait ResizeTarget: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Reject targets that are not well formed (e.g. non-positive sizes).
    fn validate(&self) -> Result<(), ConfigurationError>;
}

impl ResizeTarget for usize {
    fn validate(&self) -> Result<(), ConfigurationError> {
        if *self == 0 {
            Err(ConfigurationError::NonPositiveSize)
        } else {
            Ok(())
        }
    }
}

impl ResizeTarget for StftParams {
    fn validate(&self) -> Result<(), ConfigurationError> {
        StftParams::validate(self)
    }
}

/// A transform whose configuration can be rebuilt for a new target.
///
/// `reconfigure` must be transactional: on error the transform keeps its
/// previous configuration and `current()` is unchanged. It is only ever
/// called from the scheduler's worker thread, one call at a time.
pub trait Reconfigure: Send + 'static {
    type Target: ResizeTarget;

    fn current(&self) -> Self::Target;

    fn reconfigure(&mut self, target: &Self::Target) -> Result<(), ReconfigureError>;
}

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Worker thread name; also used as the log label.
    pub worker_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_name: "sigscope-resize".to_string(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Targets<T> {
    /// Target the worker is computing toward.
    pub(crate) active: Option<T>,
    /// Next target to apply once `active` is done. Latest wins.
    pub(crate) pending: Option<T>,
}

pub(crate) struct Shared<H: Reconfigure> {
    pub(crate) handle: Mutex<H>,
    /// Snapshot of `handle.current()`, readable without the busy lock.
    pub(crate) current: Mutex<H::Target>,
    pub(crate) busy: BusyLock,
    pub(crate) targets: Mutex<Targets<H::Target>>,
    pub(crate) notifier: Notifier<H::Target>,
    pub(crate) telemetry: Mutex<ReconfigureTelemetry>,
    pub(crate) label: String,
}

impl<H: Reconfigure> Shared<H> {
    pub(crate) fn lock_handle(&self) -> MutexGuard<'_, H> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_targets(&self) -> MutexGuard<'_, Targets<H::Target>> {
        self.targets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_telemetry(&self) -> MutexGuard<'_, ReconfigureTelemetry> {
        self.telemetry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn current(&self) -> H::Target {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_current(&self, value: H::Target) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = value;
    }
}

/// Main-thread handle to a resizable transform and its worker thread.
pub struct ResizeScheduler<H: Reconfigure> {
    shared: Arc<Shared<H>>,
    worker_tx: Sender<WorkerSignal>,
    join_handle: Option<JoinHandle<()>>,
}

impl<H: Reconfigure> ResizeScheduler<H> {
    pub fn new(handle: H) -> std::io::Result<Self> {
        Self::with_config(handle, &SchedulerConfig::default())
    }

    pub fn with_config(handle: H, config: &SchedulerConfig) -> std::io::Result<Self> {
        let current = handle.current();
        let shared = Arc::new(Shared {
            handle: Mutex::new(handle),
            current: Mutex::new(current),
            busy: BusyLock::new(),
            targets: Mutex::new(Targets {
                active: None,
                pending: None,
            }),
            notifier: Notifier::new(&config.worker_name),
            telemetry: Mutex::new(ReconfigureTelemetry::new()),
            label: config.worker_name.clone(),
        });

        let (worker_tx, worker_rx) = crossbeam_channel::unbounded();
        let thread_shared = Arc::clone(&shared);
        let join_handle = thread::Builder::new()
            .name(config.worker_name.clone())
            .spawn(move || worker::run(thread_shared, worker_rx))?;

        log::debug!(target: "resize", "[{}] worker started", config.worker_name);

        Ok(Self {
            shared,
            worker_tx,
            join_handle: Some(join_handle),
        })
    }

    /// Request that the transform be reconfigured for `target`.
    ///
    /// Returns immediately. If the scheduler is idle a computation starts on
    /// the worker; if it is busy, `target` replaces any previously pending
    /// request and is applied once the in-flight computation completes.
    pub fn resize(&self, target: H::Target) -> Result<(), ResizeError> {
        target.validate()?;

        let mut targets = self.shared.lock_targets();

        if self.shared.busy.try_acquire() {
            let current = self.shared.current();
            if target == current {
                self.shared.busy.release();
                return Ok(());
            }

            targets.active = Some(target.clone());
            if self.worker_tx.send(WorkerSignal::Run).is_err() {
                targets.active = None;
                self.shared.busy.release();
                log::error!(target: "resize", "[{}] worker gone, dropping {:?}", self.shared.label, target);
                return Err(ResizeError::WorkerUnavailable);
            }
            self.shared.notifier.emit(ResizeEvent::Resizing {
                prev: current,
                target,
            });
            return Ok(());
        }

        // Busy: a computation is in flight, or the transform is borrowed.
        let in_flight = targets
            .active
            .clone()
            .unwrap_or_else(|| self.shared.current());

        if targets.pending.as_ref() == Some(&target) {
            return Ok(());
        }

        if target == in_flight {
            // The caller went back to what is already being computed; the
            // pending request it had queued is now stale. The Resizing sent
            // for the in-flight target still holds, so nothing is emitted.
            if targets.pending.take().is_some() {
                self.shared.lock_telemetry().record_coalesced();
            }
            return Ok(());
        }

        if targets.pending.replace(target.clone()).is_some() {
            self.shared.lock_telemetry().record_coalesced();
        }
        self.shared.notifier.emit(ResizeEvent::Resizing {
            prev: in_flight,
            target,
        });
        Ok(())
    }

    /// Last successfully committed target.
    pub fn current(&self) -> H::Target {
        self.shared.current()
    }

    /// Whether a computation is in flight (or the transform is borrowed).
    pub fn is_busy(&self) -> bool {
        self.shared.busy.is_held()
    }

    /// Register a new notification receiver. Events emitted before this call
    /// are not replayed.
    pub fn subscribe(&self) -> EventReceiver<H::Target> {
        self.shared.notifier.subscribe()
    }

    pub fn telemetry_summary(&self) -> TelemetrySummary {
        self.shared.lock_telemetry().summary()
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Block until no computation is in flight and nothing is pending.
    pub fn wait_until_idle(&self) {
        loop {
            self.shared.busy.acquire();
            if !self.release_or_hand_off() {
                break;
            }
        }
        drop(self.shared.lock_targets());
    }

    /// Run `f` on the transform if no computation is in flight. Returns
    /// `None` when busy; a `Resized` notification follows once it is free.
    pub fn try_with_handle<R>(&self, f: impl FnOnce(&mut H) -> R) -> Option<R> {
        if !self.shared.busy.try_acquire() {
            return None;
        }
        let _borrow = Borrow { scheduler: self };
        Some(self.borrow_handle(f))
    }

    /// Run `f` on the transform, waiting for any in-flight chain to drain.
    pub fn with_handle<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        self.shared.busy.acquire();
        let _borrow = Borrow { scheduler: self };
        self.borrow_handle(f)
    }

    /// Wait for idle, stop the worker and join its thread.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn borrow_handle<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut handle = self.shared.lock_handle();
        let result = f(&mut handle);
        let now = handle.current();
        drop(handle);

        if now != self.shared.current() {
            log::warn!(
                target: "resize",
                "[{}] transform changed to {:?} outside the scheduler",
                self.shared.label,
                now
            );
            self.shared.set_current(now);
        }
        result
    }

    /// Give up the busy lock held by the current thread. If a request was
    /// queued meanwhile, the lock passes to a new worker run instead.
    /// Returns true when it was handed off.
    fn release_or_hand_off(&self) -> bool {
        let mut targets = self.shared.lock_targets();
        if let Some(next) = targets.pending.take() {
            targets.active = Some(next);
            if self.worker_tx.send(WorkerSignal::Run).is_ok() {
                return true;
            }
            targets.active = None;
            log::error!(target: "resize", "[{}] worker gone, pending request dropped", self.shared.label);
        }
        self.shared.busy.release();
        false
    }

    fn close(&mut self) {
        let Some(join_handle) = self.join_handle.take() else {
            return;
        };
        self.wait_until_idle();
        let _ = self.worker_tx.send(WorkerSignal::Shutdown);
        if join_handle.join().is_err() {
            log::error!(target: "resize", "[{}] worker thread panicked", self.shared.label);
        }
        log::debug!(target: "resize", "[{}] worker stopped", self.shared.label);
    }
}

impl<H: Reconfigure> Drop for ResizeScheduler<H> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Releases (or hands off) the busy lock when a borrow ends, even if the
/// borrowing closure panics.
struct Borrow<'a, H: Reconfigure> {
    scheduler: &'a ResizeScheduler<H>,
}

impl<H: Reconfigure> Drop for Borrow<'_, H> {
    fn drop(&mut self) {
        self.scheduler.release_or_hand_off();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Length {
        len: usize,
        fail_on: Option<usize>,
    }

    impl Reconfigure for Length {
        type Target = usize;

        fn current(&self) -> usize {
            self.len
        }

        fn reconfigure(&mut self, target: &usize) -> Result<(), ReconfigureError> {
            if Some(*target) == self.fail_on {
                return Err(ReconfigureError::Failed(format!("cannot size {}", target)));
            }
            self.len = *target;
            Ok(())
        }
    }

    fn recv(rx: &EventReceiver<usize>) -> ResizeEvent<usize> {
        rx.recv_timeout(Duration::from_secs(5)).expect("event")
    }

    #[test]
    fn test_resize_rejects_zero_synchronously() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: None }).unwrap();
        let rx = sched.subscribe();
        assert_eq!(
            sched.resize(0),
            Err(ResizeError::Configuration(ConfigurationError::NonPositiveSize))
        );
        assert!(!sched.is_busy());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resize_then_wait() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: None }).unwrap();
        let rx = sched.subscribe();
        sched.resize(8).unwrap();
        sched.wait_until_idle();

        assert_eq!(sched.current(), 8);
        assert_eq!(recv(&rx), ResizeEvent::Resizing { prev: 4, target: 8 });
        assert_eq!(recv(&rx), ResizeEvent::Resized { prev: 4, current: 8 });
    }

    #[test]
    fn test_same_size_is_noop() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: None }).unwrap();
        let rx = sched.subscribe();
        sched.resize(4).unwrap();
        sched.wait_until_idle();
        assert!(rx.try_recv().is_err());
        assert_eq!(sched.telemetry_summary().runs, 0);
    }

    #[test]
    fn test_failure_ends_chain_with_settled_error() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: Some(16) }).unwrap();
        let rx = sched.subscribe();
        sched.resize(16).unwrap();
        sched.wait_until_idle();

        assert_eq!(sched.current(), 4);
        assert_eq!(recv(&rx), ResizeEvent::Resizing { prev: 4, target: 16 });
        match recv(&rx) {
            ResizeEvent::Failed { target, settled, .. } => {
                assert_eq!(target, 16);
                assert!(settled);
            }
            other => panic!("Expected Failed, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(sched.telemetry_summary().failures, 1);
    }

    #[test]
    fn test_with_handle_sees_committed_state() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: None }).unwrap();
        sched.resize(32).unwrap();
        let len = sched.with_handle(|h| h.len);
        assert_eq!(len, 32);
        assert_eq!(sched.try_with_handle(|h| h.len), Some(32));
    }

    #[test]
    fn test_resize_during_borrow_is_applied_after() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: None }).unwrap();
        let rx = sched.subscribe();
        sched.with_handle(|_| {
            // Busy while borrowed: queued rather than started.
            sched.resize(64).unwrap();
        });
        sched.wait_until_idle();
        assert_eq!(sched.current(), 64);
        assert_eq!(recv(&rx), ResizeEvent::Resizing { prev: 4, target: 64 });
        assert_eq!(recv(&rx), ResizeEvent::Resized { prev: 4, current: 64 });
    }

    #[test]
    fn test_shutdown_joins_worker() {
        let sched = ResizeScheduler::new(Length { len: 4, fail_on: None }).unwrap();
        sched.resize(5).unwrap();
        sched.shutdown();
    }
}
