//! Short-time Fourier analysis of a whole signal.

use std::sync::Arc;

use sigscope_core::Reconfigure;
use sigscope_types::{ReconfigureError, StftParams};

use crate::fft_plan::FftPlan;
use crate::spectrum::amplitude_db;
use crate::window;

/// Default cap on frames x bins, about 256 MiB of f32.
pub const DEFAULT_MAX_CELLS: usize = 1 << 26;
/// Default cap on the DFT length, matching the `[fft] max_size` default.
pub const DEFAULT_MAX_DFT_LEN: usize = 1 << 20;

/// Log-amplitude image, one row of `num_bins` values per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StftImage {
    data: Vec<f32>,
    num_frames: usize,
    num_bins: usize,
    min_db: f32,
    max_db: f32,
}

impl StftImage {
    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        if index >= self.num_frames {
            return None;
        }
        let start = index * self.num_bins;
        Some(&self.data[start..start + self.num_bins])
    }

    /// Smallest value in the image; +inf when empty.
    pub fn min_db(&self) -> f32 {
        self.min_db
    }

    /// Largest value in the image; -inf when empty.
    pub fn max_db(&self) -> f32 {
        self.max_db
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }
}

/// A signal together with its spectrogram for the current [`StftParams`].
pub struct StftAnalysis {
    signal: Arc<[f32]>,
    params: StftParams,
    image: StftImage,
    max_cells: usize,
    max_dft_len: usize,
}

impl StftAnalysis {
    /// Starts with no image and the empty parameter set, so the first
    /// valid resize always computes.
    pub fn new(signal: Arc<[f32]>) -> Self {
        Self::with_limit(signal, DEFAULT_MAX_CELLS)
    }

    pub fn with_limit(signal: Arc<[f32]>, max_cells: usize) -> Self {
        Self {
            signal,
            params: StftParams::default(),
            image: StftImage {
                min_db: f32::INFINITY,
                max_db: f32::NEG_INFINITY,
                ..StftImage::default()
            },
            max_cells,
            max_dft_len: DEFAULT_MAX_DFT_LEN,
        }
    }

    /// Refuse DFT (and so window) lengths above `max_dft_len`.
    pub fn with_max_dft_len(mut self, max_dft_len: usize) -> Self {
        self.max_dft_len = max_dft_len;
        self
    }

    pub fn signal(&self) -> &Arc<[f32]> {
        &self.signal
    }

    pub fn params(&self) -> StftParams {
        self.params
    }

    pub fn image(&self) -> &StftImage {
        &self.image
    }

    fn compute(&self, params: &StftParams) -> Result<StftImage, ReconfigureError> {
        // Checked before anything is planned: the window and the FFT tables
        // are allocated even when the signal yields no frames.
        if params.dft_len > self.max_dft_len {
            return Err(ReconfigureError::ResourceExhaustion {
                requested: params.dft_len,
                limit: self.max_dft_len,
            });
        }

        let num_frames = params.num_frames(self.signal.len());
        let num_bins = params.num_bins();
        let cells = num_frames.saturating_mul(num_bins);
        if cells > self.max_cells {
            return Err(ReconfigureError::ResourceExhaustion {
                requested: cells,
                limit: self.max_cells,
            });
        }

        let mut plan = FftPlan::new(params.dft_len, self.max_dft_len)?;
        let win = window::normalized(params.window, params.window_len);
        let mut frame = Vec::new();
        frame.try_reserve_exact(params.window_len)?;
        let mut data = Vec::new();
        data.try_reserve_exact(cells)?;

        let mut min_db = f32::INFINITY;
        let mut max_db = f32::NEG_INFINITY;
        for f in 0..num_frames {
            let start = f * params.step;
            frame.clear();
            frame.extend(
                win.iter()
                    .enumerate()
                    .map(|(n, &w)| self.signal.get(start + n).map_or(0.0, |&s| s * w)),
            );
            for bin in plan.execute(&frame) {
                let db = amplitude_db(bin.norm());
                min_db = min_db.min(db);
                max_db = max_db.max(db);
                data.push(db);
            }
        }

        Ok(StftImage {
            data,
            num_frames,
            num_bins,
            min_db,
            max_db,
        })
    }
}

impl Reconfigure for StftAnalysis {
    type Target = StftParams;

    fn current(&self) -> StftParams {
        self.params
    }

    fn reconfigure(&mut self, target: &StftParams) -> Result<(), ReconfigureError> {
        target
            .validate()
            .map_err(|e| ReconfigureError::Failed(e.to_string()))?;
        let image = self.compute(target)?;
        log::debug!(
            target: "dsp",
            "stft {} frames x {} bins, {:.1}..{:.1} dB",
            image.num_frames,
            image.num_bins,
            image.min_db,
            image.max_db
        );
        self.params = *target;
        self.image = image;
        Ok(())
    }
}
