use std::path::PathBuf;

use sigscope_core::config::MAX_OVERSAMPLING;
use sigscope_dsp::window;

pub const USAGE: &str = "\
Usage: sigscope [OPTIONS]

Replays a slider drag over the analysis window length and shows how the
spectrum and spectrogram views keep up.

Options:
  -v, --verbose            Debug-level logging
      --windows <list>     Window lengths in samples, e.g. 256,300,1000
      --step-ms <list>     STFT step sizes in ms, one per window (last repeats)
      --oversampling <n>   DFT oversampling exponent
      --log-events <path>  Write every resize event to a JSONL file
  -h, --help               Show this help";

#[derive(Debug, Default, PartialEq)]
pub struct Options {
    pub verbose: bool,
    pub help: bool,
    pub windows: Vec<usize>,
    pub steps_ms: Vec<f64>,
    pub oversampling: Option<u32>,
    pub log_events: Option<PathBuf>,
}

impl Options {
    /// Parse everything after the program name.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut options = Options::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-v" | "--verbose" => options.verbose = true,
                "-h" | "--help" => options.help = true,
                "--windows" => {
                    options.windows = parse_list(value(&mut iter, arg)?, arg)?;
                    if options.windows.contains(&0) {
                        return Err("--windows: lengths must be positive".to_string());
                    }
                    if let Some(&len) = options.windows.iter().find(|&&len| {
                        window::dft_length(window::forced_odd(len), MAX_OVERSAMPLING).is_none()
                    }) {
                        return Err(format!("--windows: length {} is too long", len));
                    }
                }
                "--step-ms" => {
                    options.steps_ms = parse_list(value(&mut iter, arg)?, arg)?;
                    if options.steps_ms.iter().any(|s: &f64| !s.is_finite() || *s <= 0.0) {
                        return Err("--step-ms: steps must be positive".to_string());
                    }
                }
                "--oversampling" => {
                    let v = value(&mut iter, arg)?;
                    options.oversampling =
                        Some(v.parse().map_err(|_| format!("{}: invalid number '{}'", arg, v))?);
                }
                "--log-events" => {
                    options.log_events = Some(PathBuf::from(value(&mut iter, arg)?));
                }
                other => return Err(format!("unknown argument '{}'", other)),
            }
        }

        Ok(options)
    }
}

fn value<'a>(iter: &mut std::slice::Iter<'a, String>, flag: &str) -> Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{} expects a value", flag))
}

fn parse_list<T: std::str::FromStr>(s: &str, flag: &str) -> Result<Vec<T>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse()
                .map_err(|_| format!("{}: invalid value '{}'", flag, item))
        })
        .collect()
}
