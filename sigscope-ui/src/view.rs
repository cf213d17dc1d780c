//! Console stand-ins for the spectrum and spectrogram views.
//!
//! Each view shows a busy marker while its scheduler works and refreshes its
//! data from the transform once a `Resized` arrives.

use std::sync::Arc;

use sigscope_core::{ReconfigureError, ResizeObserver, ResizeScheduler, StftParams};
use sigscope_dsp::{compute_spectrum, window, FftPlan, Spectrum, StftAnalysis};
use sigscope_types::{AnalysisContext, WindowType};

pub struct SpectrumView<'a> {
    scheduler: &'a ResizeScheduler<FftPlan>,
    signal: Arc<[f32]>,
    ctx: AnalysisContext,
    window: WindowType,
    /// Window length of the latest request; the DFT may still be catching up.
    pub window_len: usize,
    pub spectrum: Option<Spectrum>,
    pub refreshes: usize,
    pub failures: usize,
}

impl<'a> SpectrumView<'a> {
    pub fn new(
        scheduler: &'a ResizeScheduler<FftPlan>,
        signal: Arc<[f32]>,
        ctx: AnalysisContext,
        window: WindowType,
    ) -> Self {
        Self {
            scheduler,
            signal,
            ctx,
            window,
            window_len: 0,
            spectrum: None,
            refreshes: 0,
            failures: 0,
        }
    }

    /// Recompute the spectrum around the middle of the signal.
    pub fn refresh(&mut self, dft_len: usize) {
        let win_len = self.window_len.clamp(1, dft_len);
        let win = window::normalized(self.window, win_len);
        let start = (self.signal.len() / 2).saturating_sub(win_len / 2);

        let signal = &self.signal;
        let ctx = &self.ctx;
        match self
            .scheduler
            .try_with_handle(|plan| compute_spectrum(plan, signal, &win, start, ctx))
        {
            Some(spectrum) => {
                if let Some(peak) = spectrum.peak_bin() {
                    println!(
                        "  spectrum: {} bins, peak {:.1} Hz at {:.1} dB",
                        spectrum.num_bins(),
                        spectrum.frequencies[peak],
                        spectrum.amplitude_db[peak]
                    );
                }
                self.spectrum = Some(spectrum);
                self.refreshes += 1;
            }
            // Another resize started in between; its Resized will refresh.
            None => log::debug!(target: "view", "fft busy again, skipping refresh"),
        }
    }
}

impl ResizeObserver<usize> for SpectrumView<'_> {
    fn on_resizing(&mut self, prev: &usize, target: &usize) {
        println!("[fft ] resizing {} -> {} ...", prev, target);
    }

    fn on_resized(&mut self, prev: &usize, current: &usize) {
        println!("[fft ] resized {} -> {}", prev, current);
        self.refresh(*current);
    }

    fn on_error(&mut self, target: &usize, error: &ReconfigureError, settled: bool) {
        self.failures += 1;
        println!(
            "[fft ] size {} failed: {}{}",
            target,
            error,
            if settled { "" } else { " (continuing)" }
        );
    }
}

pub struct SpectrogramView<'a> {
    scheduler: &'a ResizeScheduler<StftAnalysis>,
    sample_rate: u32,
    pub refreshes: usize,
    pub failures: usize,
}

impl<'a> SpectrogramView<'a> {
    pub fn new(scheduler: &'a ResizeScheduler<StftAnalysis>, ctx: &AnalysisContext) -> Self {
        Self {
            scheduler,
            sample_rate: ctx.sample_rate,
            refreshes: 0,
            failures: 0,
        }
    }

    fn describe(&self, params: &StftParams) -> String {
        let ms = |samples: usize| samples as f64 * 1000.0 / self.sample_rate as f64;
        format!(
            "{} {:.1}ms/{:.2}ms dft {}",
            params.window.name(),
            ms(params.window_len),
            ms(params.step),
            params.dft_len
        )
    }
}

impl ResizeObserver<StftParams> for SpectrogramView<'_> {
    fn on_resizing(&mut self, _prev: &StftParams, target: &StftParams) {
        println!("[stft] computing {} ...", self.describe(target));
    }

    fn on_resized(&mut self, _prev: &StftParams, current: &StftParams) {
        let summary = self.scheduler.try_with_handle(|analysis| {
            let image = analysis.image();
            (image.num_frames(), image.num_bins(), image.min_db(), image.max_db())
        });
        match summary {
            Some((frames, bins, min_db, max_db)) => {
                println!(
                    "[stft] ready {}: {} x {}, {:.1}..{:.1} dB",
                    self.describe(current),
                    frames,
                    bins,
                    min_db,
                    max_db
                );
                self.refreshes += 1;
            }
            None => log::debug!(target: "view", "stft busy again, skipping refresh"),
        }
    }

    fn on_error(&mut self, target: &StftParams, error: &ReconfigureError, _settled: bool) {
        self.failures += 1;
        println!("[stft] {} failed: {}", self.describe(target), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigscope_core::resize::dispatch_events;

    use crate::signal::{sum_of_sines, Partial};

    #[test]
    fn test_spectrum_view_refreshes_after_resized() {
        let ctx = AnalysisContext::new(8000).unwrap();
        let signal = sum_of_sines(&ctx, 1.0, &[Partial { freq_hz: 1000.0, amplitude: 1.0 }]);
        let sched = ResizeScheduler::new(FftPlan::new(256, 1 << 14).unwrap()).unwrap();
        let rx = sched.subscribe();
        let mut view = SpectrumView::new(&sched, signal, ctx, WindowType::Hann);

        view.window_len = 801;
        sched.resize(1024).unwrap();
        sched.wait_until_idle();
        assert_eq!(dispatch_events(&rx, &mut view), 2);

        assert_eq!(view.refreshes, 1);
        let spectrum = view.spectrum.as_ref().unwrap();
        assert_eq!(spectrum.num_bins(), 513);
        let peak = spectrum.peak_bin().unwrap();
        assert!((spectrum.frequencies[peak] - 1000.0).abs() < 8.0);
    }

    #[test]
    fn test_spectrum_view_counts_failures() {
        let ctx = AnalysisContext::default();
        let signal = sum_of_sines(&ctx, 0.1, &[]);
        let sched = ResizeScheduler::new(FftPlan::new(256, 512).unwrap()).unwrap();
        let rx = sched.subscribe();
        let mut view = SpectrumView::new(&sched, signal, ctx, WindowType::Hann);

        sched.resize(4096).unwrap();
        sched.wait_until_idle();
        dispatch_events(&rx, &mut view);

        assert_eq!(view.failures, 1);
        assert_eq!(view.refreshes, 0);
        assert!(view.spectrum.is_none());
    }
}
