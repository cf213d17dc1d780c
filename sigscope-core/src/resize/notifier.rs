//! Resize notifications.
//!
//! The scheduler never calls observer code from its own locks. Events are
//! pushed into per-subscriber channels while the target lock is held, which
//! keeps their order identical to the order requests were accepted. The UI
//! thread then drains its receiver and routes the events to a
//! [`ResizeObserver`].

use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use sigscope_types::{ReconfigureError, ResizeEvent};

/// Receiver side of a scheduler's notifications.
pub type EventReceiver<T> = Receiver<ResizeEvent<T>>;

/// Callbacks for resize progress, typically implemented by a view that shows
/// a progress indicator and recomputes its data once a resize lands.
pub trait ResizeObserver<T> {
    fn on_resizing(&mut self, prev: &T, target: &T);
    fn on_resized(&mut self, prev: &T, current: &T);
    fn on_error(&mut self, target: &T, error: &ReconfigureError, settled: bool) {
        let _ = (target, error, settled);
    }
}

pub(crate) struct Notifier<T> {
    subscribers: Mutex<Vec<Sender<ResizeEvent<T>>>>,
    label: String,
}

impl<T: Clone + std::fmt::Debug> Notifier<T> {
    pub(crate) fn new(label: &str) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            label: label.to_string(),
        }
    }

    pub(crate) fn subscribe(&self) -> EventReceiver<T> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber. Subscribers whose receiver
    /// was dropped are pruned.
    pub(crate) fn emit(&self, event: ResizeEvent<T>) {
        log::debug!(target: "resize", "[{}] {:?}", self.label, event);
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Route one event to the matching observer callback.
pub fn dispatch_event<T, O>(event: &ResizeEvent<T>, observer: &mut O)
where
    O: ResizeObserver<T> + ?Sized,
{
    match event {
        ResizeEvent::Resizing { prev, target } => observer.on_resizing(prev, target),
        ResizeEvent::Resized { prev, current } => observer.on_resized(prev, current),
        ResizeEvent::Failed {
            target,
            error,
            settled,
        } => observer.on_error(target, error, *settled),
    }
}

/// Drain every event currently queued in `rx` into `observer`, without
/// blocking. Returns the number of events dispatched.
pub fn dispatch_events<T, O>(rx: &EventReceiver<T>, observer: &mut O) -> usize
where
    O: ResizeObserver<T> + ?Sized,
{
    let mut count = 0;
    loop {
        match rx.try_recv() {
            Ok(event) => {
                dispatch_event(&event, observer);
                count += 1;
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    count
}
