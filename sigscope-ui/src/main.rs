mod cli;
mod signal;
mod view;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sigscope_core::config::{Config, MAX_OVERSAMPLING};
use sigscope_core::event_log::EventLog;
use sigscope_core::resize::{dispatch_event, EventReceiver, ResizeObserver};
use sigscope_core::{ResizeScheduler, StftParams};
use sigscope_dsp::{window, FftPlan, StftAnalysis};
use sigscope_types::AnalysisContext;

use cli::{Options, USAGE};
use view::{SpectrogramView, SpectrumView};

/// Time between two simulated slider positions.
const FRAME: Duration = Duration::from_millis(4);
/// Length of the synthesized test signal.
const SIGNAL_SECONDS: f64 = 3.0;

fn init_logging(verbose: bool) {
    use simplelog::{LevelFilter, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sigscope")
        .join("sigscope.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(file) => file,
        Err(_) => match File::create(std::env::temp_dir().join("sigscope.log")) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("sigscope: cannot create log file: {}", e);
                return;
            }
        },
    };

    if let Err(e) = WriteLogger::init(log_level, simplelog::Config::default(), log_file) {
        eprintln!("sigscope: failed to initialize logger: {}", e);
        return;
    }

    log::info!("sigscope starting (log level: {:?})", log_level);
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let options = match Options::parse(args.get(1..).unwrap_or_default()) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("sigscope: {}\n\n{}", msg, USAGE);
            std::process::exit(2);
        }
    };
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    init_logging(options.verbose);
    let config = Config::load();
    run(&config, &options)
}

/// Window lengths to replay, in samples: the command line list, or a sweep
/// around the configured window duration.
fn window_sweep(options: &Options, config: &Config, ctx: &AnalysisContext) -> Vec<usize> {
    if !options.windows.is_empty() {
        return options.windows.clone();
    }
    let base = ctx.samples_for_ms(config.stft_window_duration_ms()).max(2);
    vec![base / 2, base * 3 / 4, base, base * 2, base * 4, base]
}

/// STFT step for the `i`th window; the last given step repeats.
fn step_for(i: usize, options: &Options, config: &Config, ctx: &AnalysisContext) -> usize {
    let ms = options
        .steps_ms
        .get(i)
        .or_else(|| options.steps_ms.last())
        .copied()
        .unwrap_or_else(|| config.stft_step_duration_ms());
    ctx.samples_for_ms(ms).max(1)
}

fn run(config: &Config, options: &Options) -> io::Result<()> {
    let ctx = config.analysis_context();
    let oversampling = options
        .oversampling
        .map(|o| o.min(MAX_OVERSAMPLING))
        .unwrap_or_else(|| config.fft_oversampling());
    let window_kind = config.stft_window();

    let signal = signal::sum_of_sines(&ctx, SIGNAL_SECONDS, &signal::DEFAULT_PARTIALS);
    log::info!(
        "signal: {} samples at {} Hz, oversampling {}",
        signal.len(),
        ctx.sample_rate,
        oversampling
    );

    let plan = FftPlan::new(config.fft_default_size(), config.fft_max_size())
        .map_err(io::Error::other)?;
    let fft = ResizeScheduler::with_config(plan, &config.scheduler("fft"))?;
    let stft = ResizeScheduler::with_config(
        StftAnalysis::new(Arc::clone(&signal)).with_max_dft_len(config.fft_max_size()),
        &config.scheduler("stft"),
    )?;
    let fft_events = fft.subscribe();
    let stft_events = stft.subscribe();

    let mut event_log = match &options.log_events {
        Some(path) => Some(EventLog::create(path)?),
        None => None,
    };

    let mut spectrum_view = SpectrumView::new(&fft, Arc::clone(&signal), ctx, window_kind);
    let mut spectrogram_view = SpectrogramView::new(&stft, &ctx);

    for (i, &requested) in window_sweep(options, config, &ctx).iter().enumerate() {
        let window_len = window::forced_odd(requested);
        let Some(dft_len) = window::dft_length(window_len, oversampling) else {
            log::warn!("window of {} samples is too long, skipped", requested);
            eprintln!("window of {} samples is too long, skipped", requested);
            continue;
        };

        spectrum_view.window_len = window_len;
        if let Err(e) = fft.resize(dft_len) {
            log::warn!("fft resize to {} rejected: {}", dft_len, e);
            eprintln!("fft resize to {} rejected: {}", dft_len, e);
        }

        let params = StftParams {
            window: window_kind,
            window_len,
            step: step_for(i, options, config, &ctx),
            dft_len,
        };
        if let Err(e) = stft.resize(params) {
            log::warn!("stft resize to {:?} rejected: {}", params, e);
            eprintln!("stft resize rejected: {}", e);
        }

        pump(&fft_events, "fft", &mut spectrum_view, event_log.as_mut());
        pump(&stft_events, "stft", &mut spectrogram_view, event_log.as_mut());
        thread::sleep(FRAME);
    }

    fft.wait_until_idle();
    stft.wait_until_idle();
    pump(&fft_events, "fft", &mut spectrum_view, event_log.as_mut());
    pump(&stft_events, "stft", &mut spectrogram_view, event_log.as_mut());

    let fft_stats = fft.telemetry_summary();
    let stft_stats = stft.telemetry_summary();
    println!(
        "fft:  size {} after {} runs ({} coalesced, {} failed), avg {}us max {}us",
        fft.current(),
        fft_stats.runs,
        fft_stats.coalesced,
        fft_stats.failures,
        fft_stats.avg_us,
        fft_stats.max_us
    );
    println!(
        "stft: {} frames/{} refreshes after {} runs ({} coalesced, {} failed), avg {}us max {}us",
        stft.with_handle(|a| a.image().num_frames()),
        spectrogram_view.refreshes,
        stft_stats.runs,
        stft_stats.coalesced,
        stft_stats.failures,
        stft_stats.avg_us,
        stft_stats.max_us
    );
    log::info!(
        "done: {} spectrum refreshes, {} fft failures, {} stft failures",
        spectrum_view.refreshes,
        spectrum_view.failures,
        spectrogram_view.failures
    );

    drop(spectrum_view);
    drop(spectrogram_view);
    fft.shutdown();
    stft.shutdown();
    Ok(())
}

/// Route every queued event to `view`, recording it first when an event log
/// is open.
fn pump<T, V>(
    rx: &EventReceiver<T>,
    source: &str,
    view: &mut V,
    mut event_log: Option<&mut EventLog>,
)
where
    T: serde::Serialize,
    V: ResizeObserver<T>,
{
    for event in rx.try_iter() {
        if let Some(event_log) = event_log.as_deref_mut() {
            event_log.record(source, &event);
        }
        dispatch_event(&event, view);
    }
}
