//! Analysis windows and DFT length helpers.

use std::f64::consts::PI;

use sigscope_types::WindowType;

/// Cosine-sum coefficients, `w[n] = sum_k c[k] * cos(2*pi*k*n / (N-1))`.
fn coefficients(kind: WindowType) -> &'static [f64] {
    match kind {
        WindowType::Rectangular => &[1.0],
        WindowType::Hann => &[0.5, -0.5],
        WindowType::Hamming => &[0.54, -0.46],
        WindowType::Blackman => &[0.42, -0.5, 0.08],
        WindowType::Nuttall => &[0.355768, -0.487396, 0.144232, -0.012604],
        WindowType::BlackmanHarris => &[0.35875, -0.48829, 0.14128, -0.01168],
        WindowType::FlatTop => &[1.0, -1.93, 1.29, -0.388, 0.028],
    }
}

/// Symmetric window of `len` samples.
pub fn generate(kind: WindowType, len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let c = coefficients(kind);
            let denom = (len - 1) as f64;
            (0..len)
                .map(|n| {
                    c.iter()
                        .enumerate()
                        .map(|(k, ck)| ck * (2.0 * PI * k as f64 * n as f64 / denom).cos())
                        .sum::<f64>() as f32
                })
                .collect()
        }
    }
}

/// Window scaled so its samples sum to 1. A sinusoid of amplitude `a`
/// then peaks at `a/2` in the spectrum regardless of window shape.
pub fn normalized(kind: WindowType, len: usize) -> Vec<f32> {
    let mut win = generate(kind, len);
    let sum: f64 = win.iter().map(|&w| w as f64).sum();
    if sum.abs() > f64::EPSILON {
        for w in &mut win {
            *w = (*w as f64 / sum) as f32;
        }
    }
    win
}

/// `next_pow2(window_len) << oversampling`, or `None` when that does not
/// fit in a `usize`.
pub fn dft_length(window_len: usize, oversampling: u32) -> Option<usize> {
    let base = window_len.max(1).checked_next_power_of_two()?;
    base.checked_mul(1usize.checked_shl(oversampling)?)
}

/// Even lengths become the next odd length so the window has a center sample.
pub fn forced_odd(len: usize) -> usize {
    if len % 2 == 0 {
        len + 1
    } else {
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_endpoints_and_peak() {
        let w = generate(WindowType::Hann, 9);
        assert!(w[0].abs() < 1e-6);
        assert!(w[8].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_windows_are_symmetric() {
        for kind in WindowType::ALL {
            let w = generate(kind, 33);
            for n in 0..w.len() {
                assert!(
                    (w[n] - w[w.len() - 1 - n]).abs() < 1e-5,
                    "{} not symmetric at {}",
                    kind.name(),
                    n
                );
            }
        }
    }

    #[test]
    fn test_normalized_sums_to_one() {
        for kind in WindowType::ALL {
            let w = normalized(kind, 101);
            let sum: f32 = w.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "{}: {}", kind.name(), sum);
        }
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(generate(WindowType::Hann, 0).is_empty());
        assert_eq!(generate(WindowType::Blackman, 1), vec![1.0]);
    }

    #[test]
    fn test_dft_length() {
        assert_eq!(dft_length(1000, 0), Some(1024));
        assert_eq!(dft_length(1024, 1), Some(2048));
        assert_eq!(dft_length(1025, 2), Some(8192));
        assert_eq!(dft_length(0, 0), Some(1));
    }

    #[test]
    fn test_dft_length_overflow_is_none() {
        let top = 1usize << (usize::BITS - 1);
        assert_eq!(dft_length(usize::MAX, 0), None);
        assert_eq!(dft_length(top + 1, 0), None);
        assert_eq!(dft_length(top / 2, 1), Some(top));
        assert_eq!(dft_length(top / 2, 2), None);
        assert_eq!(dft_length(1, usize::BITS), None);
    }

    #[test]
    fn test_forced_odd() {
        assert_eq!(forced_odd(100), 101);
        assert_eq!(forced_odd(101), 101);
    }
}
