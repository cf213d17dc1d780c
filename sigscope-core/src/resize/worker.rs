//! Worker thread: runs reconfigure chains handed over by the scheduler.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Receiver;
use sigscope_types::{ReconfigureError, ResizeEvent};

use super::{Reconfigure, Shared};

#[derive(Debug)]
pub(crate) enum WorkerSignal {
    /// The busy lock has been handed over and `active` is set.
    Run,
    Shutdown,
}

pub(crate) fn run<H: Reconfigure>(shared: Arc<Shared<H>>, rx: Receiver<WorkerSignal>) {
    for signal in rx.iter() {
        match signal {
            WorkerSignal::Run => run_chain(&shared),
            WorkerSignal::Shutdown => break,
        }
    }
}

/// Drive the transform toward the active target, absorbing pending targets
/// until none is left. Owns the busy lock on entry and releases it on exit.
fn run_chain<H: Reconfigure>(shared: &Shared<H>) {
    loop {
        let Some(target) = shared.lock_targets().active.clone() else {
            log::warn!(target: "resize", "[{}] run signalled without a target", shared.label);
            shared.busy.release();
            return;
        };

        let prev = shared.current();
        let started = Instant::now();
        let result = {
            let mut handle = shared.lock_handle();
            let result = panic::catch_unwind(AssertUnwindSafe(|| handle.reconfigure(&target)))
                .unwrap_or_else(|payload| Err(ReconfigureError::Panicked(panic_message(&*payload))));
            if result.is_ok() {
                shared.set_current(handle.current());
            }
            result
        };
        let elapsed = started.elapsed();
        shared.lock_telemetry().record(elapsed, result.is_ok());
        log::debug!(
            target: "resize",
            "[{}] reconfigure {:?} -> {:?} took {:?} ({})",
            shared.label,
            prev,
            target,
            elapsed,
            if result.is_ok() { "ok" } else { "failed" }
        );

        let mut targets = shared.lock_targets();
        let next = targets.pending.take();
        let settled = next.is_none();
        targets.active = next;
        if settled {
            shared.busy.release();
        }

        match result {
            Ok(()) => {
                if settled {
                    shared.notifier.emit(ResizeEvent::Resized {
                        prev,
                        current: shared.current(),
                    });
                }
            }
            Err(error) => {
                log::warn!(target: "resize", "[{}] {:?}: {}", shared.label, target, error);
                shared.notifier.emit(ResizeEvent::Failed {
                    target,
                    error,
                    settled,
                });
            }
        }
        drop(targets);

        if settled {
            let summary = shared.lock_telemetry().summary();
            log::debug!(target: "resize", "[{}] idle; {:?}", shared.label, summary);
            return;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
