//! Transferable busy flag.
//!
//! A `MutexGuard` cannot leave the thread that took it, but the busy state is
//! acquired by the caller of `resize` and released by the worker thread.
//! `BusyLock` is a binary semaphore built on `Mutex<bool>` + `Condvar` so that
//! ownership can move between threads.

use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Default)]
pub(crate) struct BusyLock {
    held: Mutex<bool>,
    freed: Condvar,
}

impl BusyLock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Take the lock if it is free. Never blocks beyond the inner mutex.
    pub(crate) fn try_acquire(&self) -> bool {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if *held {
            false
        } else {
            *held = true;
            true
        }
    }

    /// Block until the lock is free, then take it.
    pub(crate) fn acquire(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while *held {
            held = self
                .freed
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *held = true;
    }

    /// Release the lock. May be called from a different thread than the one
    /// that acquired it.
    pub(crate) fn release(&self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        debug_assert!(*held, "releasing a busy lock that is not held");
        *held = false;
        drop(held);
        self.freed.notify_all();
    }

    pub(crate) fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
