use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Analysis window shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    Rectangular,
    #[default]
    Hann,
    Hamming,
    Blackman,
    Nuttall,
    BlackmanHarris,
    FlatTop,
}

impl WindowType {
    pub const ALL: [WindowType; 7] = [
        WindowType::Rectangular,
        WindowType::Hann,
        WindowType::Hamming,
        WindowType::Blackman,
        WindowType::Nuttall,
        WindowType::BlackmanHarris,
        WindowType::FlatTop,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Rectangular => "rectangular",
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Nuttall => "nuttall",
            WindowType::BlackmanHarris => "blackman_harris",
            WindowType::FlatTop => "flat_top",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.iter().copied().find(|w| w.name() == lower)
    }
}

/// Parameters of a short-time Fourier analysis. Two parameter sets are the
/// same resize target when every field matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StftParams {
    pub window: WindowType,
    pub window_len: usize,
    pub step: usize,
    pub dft_len: usize,
}

impl StftParams {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.window_len < 2 {
            return Err(ConfigurationError::WindowTooShort {
                len: self.window_len,
            });
        }
        if self.step == 0 {
            return Err(ConfigurationError::NonPositiveStep);
        }
        if self.dft_len < self.window_len {
            return Err(ConfigurationError::DftShorterThanWindow {
                dft_len: self.dft_len,
                window_len: self.window_len,
            });
        }
        Ok(())
    }

    /// Number of frequency bins per frame.
    pub fn num_bins(&self) -> usize {
        self.dft_len / 2 + 1
    }

    /// Number of analysis frames over a signal of `num_samples` samples.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        let half = (self.window_len.saturating_sub(1)) / 2;
        if self.step == 0 || num_samples <= half {
            return 0;
        }
        (num_samples - half) / self.step
    }
}

/// The empty parameter set an analysis starts from before its first
/// computation. It never validates.
impl Default for StftParams {
    fn default() -> Self {
        Self {
            window: WindowType::default(),
            window_len: 0,
            step: 0,
            dft_len: 0,
        }
    }
}
