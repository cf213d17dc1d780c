//! Synthetic test signal.

use std::f64::consts::PI;
use std::sync::Arc;

use sigscope_types::AnalysisContext;

#[derive(Debug, Clone, Copy)]
pub struct Partial {
    pub freq_hz: f64,
    pub amplitude: f32,
}

/// A low note with a couple of overtones and one high component.
pub const DEFAULT_PARTIALS: [Partial; 4] = [
    Partial { freq_hz: 220.0, amplitude: 0.5 },
    Partial { freq_hz: 440.0, amplitude: 0.25 },
    Partial { freq_hz: 660.0, amplitude: 0.125 },
    Partial { freq_hz: 3_000.0, amplitude: 0.1 },
];

/// `duration_s` seconds of the sum of `partials`. Partials above Nyquist
/// are skipped.
pub fn sum_of_sines(ctx: &AnalysisContext, duration_s: f64, partials: &[Partial]) -> Arc<[f32]> {
    let len = (duration_s.max(0.0) * ctx.sample_rate as f64).round() as usize;
    let audible: Vec<&Partial> = partials
        .iter()
        .filter(|p| p.freq_hz < ctx.nyquist())
        .collect();
    let rate = ctx.sample_rate as f64;

    (0..len)
        .map(|n| {
            let t = n as f64 / rate;
            audible
                .iter()
                .map(|p| p.amplitude * (2.0 * PI * p.freq_hz * t).sin() as f32)
                .sum::<f32>()
        })
        .collect()
}
