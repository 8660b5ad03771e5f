//! Default configuration constants for tonetrim.
//!
//! Every threshold of the tone signature lives here so that `RunConfig`
//! defaults, tests and documentation agree on one value.

/// Pitch (Hz) that marks the onset of a marker tone.
pub const START_HZ: f64 = 500.0;

/// Pitch (Hz) the tone settles to while it is sustained.
///
/// Once inside a tone, leaving this band (or losing confidence) ends it.
pub const STOP_HZ: f64 = 220.0;

/// Allowed deviation (Hz) around `START_HZ` and `STOP_HZ`.
pub const HZ_RANGE: f64 = 2.0;

/// Confidence a reading must exceed to start a tone.
pub const START_PROB: f64 = 0.99;

/// Confidence below which a sustained tone is considered ended.
pub const STOP_PROB: f64 = 0.95;

/// Debounce window in seconds: a tone cannot end before this much time has passed.
pub const MIN_TONE_SECS: f64 = 0.6;

/// Hard cutoff in seconds: a tone is force-closed once it runs longer than this.
pub const MAX_TONE_SECS: f64 = 1.7;

/// Samples per channel in one analysis frame.
pub const BUFFER_SIZE: usize = 1024;

/// Largest accepted frame size in samples per channel.
pub const MAX_BUFFER_SIZE: usize = 1 << 20;

/// Samples shared between consecutive frames.
pub const OVERLAP: usize = 0;

/// YIN absolute threshold on the cumulative mean normalized difference.
pub const YIN_THRESHOLD: f64 = 0.20;

/// Extension of the input file that gets replaced when deriving the output path.
pub const INPUT_EXTENSION: &str = ".wav";

/// Extension appended to derive the trimmed output path.
pub const OUTPUT_EXTENSION: &str = ".trim.wav";

/// Suffix of the in-progress output file before it is renamed into place.
pub const PARTIAL_SUFFIX: &str = ".part";
