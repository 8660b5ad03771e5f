//! tonetrim - remove operator marker tones from WAV recordings
//!
//! Detects marker tones by their pitch signature and writes a copy of the
//! recording without them.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod pipeline;

// Core traits (source → estimate → sink)
pub use audio::pitch::PitchEstimator;
pub use audio::source::FrameSource;
pub use pipeline::sink::FrameSink;

// Pipeline
pub use pipeline::dispatcher::{CancelToken, FrameDispatcher, RunSummary};

// Error handling
pub use error::{Result, TonetrimError};

// Config
pub use config::{FrameConfig, RunConfig, ToneThresholds};

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
