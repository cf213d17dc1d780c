use serde::{Deserialize, Serialize};

use crate::error::ReconfigureError;

/// Notification emitted by a resize scheduler.
///
/// Events are produced in the order requests were accepted. A chain of
/// coalesced requests ends with exactly one `Resized`, or with a `Failed`
/// whose `settled` flag is set when the last attempt of the chain failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResizeEvent<T> {
    /// A computation toward `target` was accepted. While busy, `prev` is the
    /// target currently in flight rather than the committed size.
    Resizing { prev: T, target: T },
    /// The chain finished; `current` is the committed size.
    Resized { prev: T, current: T },
    /// `reconfigure(target)` failed; the committed size is unchanged.
    Failed {
        target: T,
        error: ReconfigureError,
        settled: bool,
    },
}

impl<T> ResizeEvent<T> {
    /// True for the event that closes an idle->busy->idle chain.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Resizing { .. } => false,
            Self::Resized { .. } => true,
            Self::Failed { settled, .. } => *settled,
        }
    }
}
