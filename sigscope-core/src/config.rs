use std::path::{Path, PathBuf};

use serde::Deserialize;
use sigscope_types::{AnalysisContext, WindowType};

use crate::resize::SchedulerConfig;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Smallest DFT length the front-end will ask for.
pub const MIN_FFT_SIZE: usize = 2;
/// Largest oversampling exponent (dft_len = next_pow2(winlen) << oversampling).
pub const MAX_OVERSAMPLING: u32 = 4;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    analysis: AnalysisConfig,
    #[serde(default)]
    fft: FftConfig,
    #[serde(default)]
    stft: StftConfig,
    #[serde(default)]
    scheduler: SchedulerSection,
}

#[derive(Deserialize, Default)]
struct AnalysisConfig {
    sample_rate: Option<u32>,
}

#[derive(Deserialize, Default)]
struct FftConfig {
    default_size: Option<usize>,
    max_size: Option<usize>,
    oversampling: Option<u32>,
}

#[derive(Deserialize, Default)]
struct StftConfig {
    window: Option<String>,
    window_duration_ms: Option<f64>,
    step_duration_ms: Option<f64>,
}

#[derive(Deserialize, Default)]
struct SchedulerSection {
    worker_name: Option<String>,
}

pub struct Config {
    analysis: AnalysisConfig,
    fft: FftConfig,
    stft: StftConfig,
    scheduler: SchedulerSection,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if any.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::defaults_only(),
        }
    }

    /// Embedded defaults merged with the file at `path`. A missing, unreadable
    /// or malformed file leaves the defaults in place.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::defaults_only();

        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                    Ok(user) => config.merge(user),
                    Err(e) => {
                        log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                    }
                },
                Err(e) => {
                    log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                }
            }
        }

        config
    }

    fn defaults_only() -> Self {
        let base = match toml::from_str::<ConfigFile>(DEFAULT_CONFIG) {
            Ok(base) => base,
            Err(e) => {
                log::error!(target: "config", "embedded config.toml is invalid: {}", e);
                ConfigFile::default()
            }
        };
        Config {
            analysis: base.analysis,
            fft: base.fft,
            stft: base.stft,
            scheduler: base.scheduler,
        }
    }

    fn merge(&mut self, user: ConfigFile) {
        if user.analysis.sample_rate.is_some() {
            self.analysis.sample_rate = user.analysis.sample_rate;
        }
        if user.fft.default_size.is_some() {
            self.fft.default_size = user.fft.default_size;
        }
        if user.fft.max_size.is_some() {
            self.fft.max_size = user.fft.max_size;
        }
        if user.fft.oversampling.is_some() {
            self.fft.oversampling = user.fft.oversampling;
        }
        if user.stft.window.is_some() {
            self.stft.window = user.stft.window;
        }
        if user.stft.window_duration_ms.is_some() {
            self.stft.window_duration_ms = user.stft.window_duration_ms;
        }
        if user.stft.step_duration_ms.is_some() {
            self.stft.step_duration_ms = user.stft.step_duration_ms;
        }
        if user.scheduler.worker_name.is_some() {
            self.scheduler.worker_name = user.scheduler.worker_name;
        }
    }

    pub fn analysis_context(&self) -> AnalysisContext {
        let rate = self.analysis.sample_rate.filter(|&r| r > 0).unwrap_or(44_100);
        AnalysisContext { sample_rate: rate }
    }

    /// Upper bound on FFT lengths; requests above it fail with resource
    /// exhaustion instead of attempting the allocation.
    pub fn fft_max_size(&self) -> usize {
        self.fft
            .max_size
            .unwrap_or(1 << 20)
            .clamp(MIN_FFT_SIZE, 1 << 26)
    }

    pub fn fft_default_size(&self) -> usize {
        self.fft
            .default_size
            .unwrap_or(512)
            .clamp(MIN_FFT_SIZE, self.fft_max_size())
    }

    pub fn fft_oversampling(&self) -> u32 {
        self.fft.oversampling.unwrap_or(1).min(MAX_OVERSAMPLING)
    }

    pub fn stft_window(&self) -> WindowType {
        self.stft
            .window
            .as_deref()
            .and_then(WindowType::from_name)
            .unwrap_or_default()
    }

    pub fn stft_window_duration_ms(&self) -> f64 {
        self.stft
            .window_duration_ms
            .filter(|d| d.is_finite())
            .unwrap_or(25.0)
            .clamp(1.0, 1_000.0)
    }

    pub fn stft_step_duration_ms(&self) -> f64 {
        self.stft
            .step_duration_ms
            .filter(|d| d.is_finite())
            .unwrap_or(5.0)
            .clamp(0.1, 1_000.0)
    }

    /// Settings for a scheduler. `suffix` distinguishes several schedulers
    /// in log output and thread names.
    pub fn scheduler(&self, suffix: &str) -> SchedulerConfig {
        let base = self
            .scheduler
            .worker_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| SchedulerConfig::default().worker_name);
        SchedulerConfig {
            worker_name: if suffix.is_empty() {
                base
            } else {
                format!("{}-{}", base, suffix)
            },
        }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sigscope").join("config.toml"))
}
