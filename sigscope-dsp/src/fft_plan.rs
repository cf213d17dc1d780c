//! Resizable real-input forward DFT.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use sigscope_core::Reconfigure;
use sigscope_types::ReconfigureError;

/// Forward DFT of a fixed length `n` over real input, keeping the
/// `n/2 + 1` non-negative frequency bins.
///
/// Re-planning is transactional: the new plan and its buffers are built
/// off to the side and swapped in only once everything is allocated.
pub struct FftPlan {
    size: usize,
    max_size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

struct Built {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftPlan {
    /// Plan a DFT of `size` points. Sizes above `max_size` are refused.
    pub fn new(size: usize, max_size: usize) -> Result<Self, ReconfigureError> {
        let built = build(size, max_size)?;
        Ok(Self {
            size,
            max_size,
            fft: built.fft,
            buffer: built.buffer,
            scratch: built.scratch,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Transform `input`, zero-padded or truncated to the plan size, and
    /// return the non-negative frequency bins.
    pub fn execute(&mut self, input: &[f32]) -> &[Complex<f32>] {
        let n = input.len().min(self.size);
        for (dst, &src) in self.buffer.iter_mut().zip(&input[..n]) {
            *dst = Complex::new(src, 0.0);
        }
        for dst in &mut self.buffer[n..] {
            *dst = Complex::default();
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);
        &self.buffer[..self.size / 2 + 1]
    }
}

fn build(size: usize, max_size: usize) -> Result<Built, ReconfigureError> {
    if size == 0 {
        return Err(ReconfigureError::Failed("DFT size must be positive".into()));
    }
    if size > max_size {
        return Err(ReconfigureError::ResourceExhaustion {
            requested: size,
            limit: max_size,
        });
    }

    let fft = FftPlanner::<f32>::new().plan_fft_forward(size);
    let buffer = zeroed(size)?;
    let scratch = zeroed(fft.get_inplace_scratch_len())?;
    Ok(Built {
        fft,
        buffer,
        scratch,
    })
}

fn zeroed(len: usize) -> Result<Vec<Complex<f32>>, ReconfigureError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, Complex::default());
    Ok(v)
}

impl Reconfigure for FftPlan {
    type Target = usize;

    fn current(&self) -> usize {
        self.size
    }

    fn reconfigure(&mut self, target: &usize) -> Result<(), ReconfigureError> {
        let built = build(*target, self.max_size)?;
        log::debug!(target: "dsp", "fft plan {} -> {}", self.size, target);
        self.size = *target;
        self.fft = built.fft;
        self.buffer = built.buffer;
        self.scratch = built.scratch;
        Ok(())
    }
}
