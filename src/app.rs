//! Composition root: wires a WAV file through the trimming pipeline.

use crate::audio::pitch::YinEstimator;
use crate::audio::source::FrameSource;
use crate::audio::wav::{WavFileSink, WavFrameSource};
use crate::config::RunConfig;
use crate::defaults::{INPUT_EXTENSION, OUTPUT_EXTENSION};
use crate::error::{Result, TonetrimError};
use crate::output::{ConsoleReporter, Reporter};
use crate::pipeline::dispatcher::{CancelToken, FrameDispatcher, RunSummary};
use crate::pipeline::sink::FrameSink;
use std::path::{Path, PathBuf};

/// Options for one trimming run.
#[derive(Debug, Clone, Default)]
pub struct TrimOptions {
    pub input: PathBuf,
    /// Explicit output path; derived from `input` when absent.
    pub output: Option<PathBuf>,
    /// TOML file overriding the default thresholds.
    pub config: Option<PathBuf>,
    /// Also play the trimmed stream.
    pub play: bool,
    pub quiet: bool,
    pub verbosity: u8,
}

/// Output path for `input`.
///
/// A trailing `.wav` (any case) becomes `.trim.wav`; any other name gets
/// `.trim.wav` appended.
pub fn output_path_for(input: &Path) -> PathBuf {
    let Some(name) = input.file_name() else {
        let mut path = input.as_os_str().to_owned();
        path.push(OUTPUT_EXTENSION);
        return PathBuf::from(path);
    };

    let new_name = match name.to_str() {
        Some(name) if has_input_extension(name) => {
            let stem = &name[..name.len() - INPUT_EXTENSION.len()];
            format!("{}{}", stem, OUTPUT_EXTENSION).into()
        }
        _ => {
            let mut name = name.to_owned();
            name.push(OUTPUT_EXTENSION);
            name
        }
    };
    input.with_file_name(new_name)
}

fn has_input_extension(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= INPUT_EXTENSION.len()
        && bytes[bytes.len() - INPUT_EXTENSION.len()..]
            .eq_ignore_ascii_case(INPUT_EXTENSION.as_bytes())
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let config = match path {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(feature = "playback")]
fn playback_sink(sample_rate: u32) -> Result<Box<dyn FrameSink>> {
    Ok(Box::new(crate::audio::playback::PlaybackSink::open(
        sample_rate,
    )?))
}

#[cfg(not(feature = "playback"))]
fn playback_sink(_sample_rate: u32) -> Result<Box<dyn FrameSink>> {
    Err(TonetrimError::Playback {
        message: "tonetrim was built without the `playback` feature".to_string(),
    })
}

/// Trim marker tones from `options.input`.
///
/// Blocking. Stops early when `cancel` is triggered, still producing a
/// complete output file from the frames processed so far.
pub fn run_trim(options: TrimOptions, cancel: CancelToken) -> Result<RunSummary> {
    let config = load_config(options.config.as_deref())?;

    // Open the input first so a bad file fails before any output exists.
    let source = WavFrameSource::open(&options.input, config.frame.buffer_size)?;
    let format = source.format();

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(&options.input));
    if same_file(&options.input, &output) {
        return Err(TonetrimError::Other(format!(
            "Output path {} is the input file",
            output.display()
        )));
    }

    let mut reporter = ConsoleReporter::new(options.quiet, options.verbosity);
    reporter.diagnostic(&format!(
        "Input: {} ({}Hz, {}ch, {}-bit {:?}, {} frames of {} samples)",
        options.input.display(),
        format.sample_rate,
        format.channels,
        format.bits_per_sample,
        format.sample_kind,
        u64::from(source.duration_frames()).div_ceil(config.frame.buffer_size as u64),
        config.frame.buffer_size,
    ));
    reporter.diagnostic(&format!("Output: {}", output.display()));

    let playback = if options.play {
        Some(playback_sink(format.sample_rate)?)
    } else {
        None
    };
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![Box::new(WavFileSink::create(&output, format)?)];
    sinks.extend(playback);

    let estimator = YinEstimator::new(format.sample_rate, config.frame.buffer_size);
    let mut dispatcher = FrameDispatcher::new(config, Box::new(source), Box::new(estimator), sinks)
        .with_reporter(Box::new(reporter))
        .with_cancel_token(cancel);

    dispatcher.run()
}
