//! Amplitude and phase spectra of a windowed segment.

use sigscope_types::AnalysisContext;

use crate::fft_plan::FftPlan;

/// Floor applied to magnitudes before taking the log, so silent bins map to
/// a finite level instead of -inf.
pub const MAGNITUDE_FLOOR: f32 = 1e-10;

/// 20 / ln(10): converts a natural log of amplitude to dB.
const LOG2DB: f32 = 8.685_889_6;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// Log-amplitude per bin, in dB.
    pub amplitude_db: Vec<f32>,
    /// Phase per bin, in radians.
    pub phase: Vec<f32>,
    /// Center frequency of each bin, in Hz.
    pub frequencies: Vec<f64>,
}

impl Spectrum {
    pub fn num_bins(&self) -> usize {
        self.amplitude_db.len()
    }

    /// Bin with the largest amplitude, if any.
    pub fn peak_bin(&self) -> Option<usize> {
        self.amplitude_db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

pub fn amplitude_db(magnitude: f32) -> f32 {
    LOG2DB * magnitude.max(MAGNITUDE_FLOOR).ln()
}

/// Spectrum of `signal[start..start + window.len()]` multiplied by `window`.
/// Samples outside the signal count as zero; the segment is zero-padded or
/// truncated to the plan size.
pub fn compute_spectrum(
    plan: &mut FftPlan,
    signal: &[f32],
    window: &[f32],
    start: usize,
    ctx: &AnalysisContext,
) -> Spectrum {
    let segment: Vec<f32> = window
        .iter()
        .enumerate()
        .map(|(n, &w)| {
            start
                .checked_add(n)
                .and_then(|i| signal.get(i))
                .map_or(0.0, |&s| s * w)
        })
        .collect();

    let dft_len = plan.size();
    let bins = plan.execute(&segment);

    Spectrum {
        amplitude_db: bins.iter().map(|c| amplitude_db(c.norm())).collect(),
        phase: bins.iter().map(|c| c.arg()).collect(),
        frequencies: (0..bins.len())
            .map(|k| ctx.bin_frequency(k, dft_len))
            .collect(),
    }
}
