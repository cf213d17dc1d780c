//! Error taxonomy shared by the scheduler and the transforms it drives.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resize target that is not well formed. Rejected synchronously by
/// `ResizeScheduler::resize` before any lock is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationError {
    NonPositiveSize,
    WindowTooShort { len: usize },
    NonPositiveStep,
    DftShorterThanWindow { dft_len: usize, window_len: usize },
    NonPositiveSampleRate,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveSize => write!(f, "size must be strictly positive"),
            Self::WindowTooShort { len } => {
                write!(f, "window length {} is too short (minimum 2)", len)
            }
            Self::NonPositiveStep => write!(f, "step size must be strictly positive"),
            Self::DftShorterThanWindow { dft_len, window_len } => write!(
                f,
                "DFT length {} is shorter than the window length {}",
                dft_len, window_len
            ),
            Self::NonPositiveSampleRate => write!(f, "sample rate must be strictly positive"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Failure of a transform's `reconfigure`. The transform keeps its previous
/// state when this is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconfigureError {
    ResourceExhaustion { requested: usize, limit: usize },
    Failed(String),
    Panicked(String),
}

impl fmt::Display for ReconfigureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceExhaustion { requested, limit } => write!(
                f,
                "cannot allocate transform of size {} (limit {})",
                requested, limit
            ),
            Self::Failed(msg) => write!(f, "reconfigure failed: {}", msg),
            Self::Panicked(msg) => write!(f, "reconfigure panicked: {}", msg),
        }
    }
}

impl std::error::Error for ReconfigureError {}

impl From<std::collections::TryReserveError> for ReconfigureError {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Error returned by `ResizeScheduler::resize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeError {
    Configuration(ConfigurationError),
    /// The worker thread is gone; the request was dropped.
    WorkerUnavailable,
}

impl fmt::Display for ResizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "invalid resize target: {}", e),
            Self::WorkerUnavailable => write!(f, "resize worker is not running"),
        }
    }
}

impl std::error::Error for ResizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::WorkerUnavailable => None,
        }
    }
}

impl From<ConfigurationError> for ResizeError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}
