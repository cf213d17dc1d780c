//! Resizable transforms driven by the sigscope resize scheduler: an FFT plan
//! for the amplitude/phase spectrum view and a whole-signal STFT for the
//! spectrogram view.

pub mod fft_plan;
pub mod spectrum;
pub mod stft;
pub mod window;

pub use fft_plan::FftPlan;
pub use spectrum::{compute_spectrum, Spectrum};
pub use stft::{StftAnalysis, StftImage};
