//! # sigscope-core
//!
//! Keeps expensive, resizable signal transforms in sync with parameter
//! changes coming from a UI, without ever blocking the UI on a recompute.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sigscope_core::config::Config;
//! use sigscope_core::resize::{dispatch_events, ResizeScheduler};
//!
//! let config = Config::load();
//! let scheduler = ResizeScheduler::with_config(plan, &config.scheduler("fft"))?;
//! let events = scheduler.subscribe();
//!
//! // From the UI thread, as often as the user drags a slider:
//! scheduler.resize(2048)?;
//!
//! // Each frame, route notifications to the view:
//! dispatch_events(&events, &mut view);
//!
//! // Before tearing the view down:
//! scheduler.shutdown();
//! ```
//!
//! ## Module Overview
//!
//! - [`resize`]: `ResizeScheduler`, the `Reconfigure` / `ResizeTarget` traits,
//!   observer plumbing and reconfigure telemetry
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`event_log`]: JSONL recording of resize events

pub mod config;
pub mod event_log;
pub mod resize;

pub use resize::{Reconfigure, ResizeObserver, ResizeScheduler, ResizeTarget};
pub use sigscope_types::{
    AnalysisContext, ConfigurationError, ReconfigureError, ResizeError, ResizeEvent, StftParams,
    WindowType,
};
