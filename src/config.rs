use crate::defaults;
use crate::error::{Result, TonetrimError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Root configuration for a trimming run.
///
/// Immutable for the lifetime of a run; the dispatcher and detector only ever
/// borrow it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RunConfig {
    pub tone: ToneThresholds,
    pub frame: FrameConfig,
}

/// Tone signature thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToneThresholds {
    /// Onset pitch in Hz.
    pub start_hz: f64,
    /// Sustained pitch in Hz.
    pub stop_hz: f64,
    /// Tolerance around both pitches in Hz.
    pub hz_range: f64,
    /// Confidence a reading must exceed to start a tone.
    pub start_probability: f64,
    /// Confidence below which a sustained tone ends.
    pub stop_probability: f64,
    /// Debounce window in seconds.
    pub min_tone_secs: f64,
    /// Hard cutoff in seconds.
    pub max_tone_secs: f64,
    /// Close a tone still active at end-of-stream and count it.
    pub close_trailing_tone: bool,
}

/// Framing of the input stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameConfig {
    /// Samples per channel in one frame.
    pub buffer_size: usize,
    /// Samples shared between consecutive frames.
    pub overlap: usize,
}

impl Default for ToneThresholds {
    fn default() -> Self {
        Self {
            start_hz: defaults::START_HZ,
            stop_hz: defaults::STOP_HZ,
            hz_range: defaults::HZ_RANGE,
            start_probability: defaults::START_PROB,
            stop_probability: defaults::STOP_PROB,
            min_tone_secs: defaults::MIN_TONE_SECS,
            max_tone_secs: defaults::MAX_TONE_SECS,
            close_trailing_tone: true,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            buffer_size: defaults::BUFFER_SIZE,
            overlap: defaults::OVERLAP,
        }
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    ///
    /// Missing fields use default values. The result is validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let tone = &self.tone;
        let frame = &self.frame;

        if frame.buffer_size == 0 {
            return Err(invalid("frame.buffer_size", "must be positive"));
        }
        if frame.buffer_size > defaults::MAX_BUFFER_SIZE {
            return Err(invalid(
                "frame.buffer_size",
                &format!("must be at most {}", defaults::MAX_BUFFER_SIZE),
            ));
        }
        if frame.overlap != 0 {
            return Err(invalid(
                "frame.overlap",
                "only zero overlap is supported",
            ));
        }
        for (key, value) in [
            ("tone.start_probability", tone.start_probability),
            ("tone.stop_probability", tone.stop_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(key, "must be between 0 and 1"));
            }
        }
        for (key, value) in [
            ("tone.start_hz", tone.start_hz),
            ("tone.stop_hz", tone.stop_hz),
            ("tone.hz_range", tone.hz_range),
            ("tone.max_tone_secs", tone.max_tone_secs),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(invalid(key, "must be positive"));
            }
        }
        if tone.min_tone_secs.is_nan() || tone.min_tone_secs < 0.0 {
            return Err(invalid("tone.min_tone_secs", "must not be negative"));
        }
        if tone.max_tone_secs <= tone.min_tone_secs {
            return Err(invalid(
                "tone.max_tone_secs",
                "must be greater than tone.min_tone_secs",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> TonetrimError {
    TonetrimError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
