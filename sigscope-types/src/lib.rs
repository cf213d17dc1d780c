//! # sigscope-types
//!
//! Shared type definitions for the sigscope signal inspector.
//! This crate contains the plain data passed between sigscope-core,
//! sigscope-dsp and the front-end: resize events, error taxonomy,
//! STFT parameters and the analysis context.

pub mod error;
mod event;
mod params;

pub use error::{ConfigurationError, ReconfigureError, ResizeError};
pub use event::ResizeEvent;
pub use params::{StftParams, WindowType};

/// Explicit analysis context, passed by reference to whatever needs the
/// sampling rate of the signals being inspected.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisContext {
    pub sample_rate: u32,
}

impl AnalysisContext {
    pub fn new(sample_rate: u32) -> Result<Self, ConfigurationError> {
        if sample_rate == 0 {
            return Err(ConfigurationError::NonPositiveSampleRate);
        }
        Ok(Self { sample_rate })
    }

    /// Number of samples covering `ms` milliseconds, rounded to nearest.
    pub fn samples_for_ms(&self, ms: f64) -> usize {
        (0.5 + ms * self.sample_rate as f64 / 1000.0).max(0.0) as usize
    }

    /// Frequency in Hz of DFT bin `bin` for a DFT of length `dft_len`.
    pub fn bin_frequency(&self, bin: usize, dft_len: usize) -> f64 {
        if dft_len == 0 {
            return 0.0;
        }
        bin as f64 * self.sample_rate as f64 / dft_len as f64
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }
}

impl Default for AnalysisContext {
    fn default() -> Self {
        Self { sample_rate: 44_100 }
    }
}
