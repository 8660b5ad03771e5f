//! WAV file frame source and output sink.

use crate::audio::frame::{AudioFormat, AudioFrame, SampleBuffer, SampleKind};
use crate::audio::source::FrameSource;
use crate::defaults::{MAX_BUFFER_SIZE, PARTIAL_SUFFIX};
use crate::error::{Result, TonetrimError};
use crate::pipeline::sink::FrameSink;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

/// Frame source that reads fixed-size frames from WAV data.
///
/// Supports integer PCM up to 32 bits and 32-bit float, any rate and channel count.
pub struct WavFrameSource<R: Read = BufReader<File>> {
    reader: hound::WavReader<R>,
    format: AudioFormat,
    buffer_size: usize,
    next_index: u64,
    frames_consumed: u64,
}

impl WavFrameSource<BufReader<File>> {
    /// Open a WAV file.
    ///
    /// Fails before any frame is read if the file is not a WAV hound can decode.
    pub fn open(path: &Path, buffer_size: usize) -> Result<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| TonetrimError::UnsupportedFormat {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_wav_reader(reader, buffer_size, &path.display().to_string())
    }
}

impl<R: Read> WavFrameSource<R> {
    /// Create from any reader (for testing/flexibility).
    pub fn from_reader(reader: R, buffer_size: usize) -> Result<Self> {
        let reader = hound::WavReader::new(reader).map_err(|e| TonetrimError::UnsupportedFormat {
            path: "<reader>".to_string(),
            message: e.to_string(),
        })?;
        Self::from_wav_reader(reader, buffer_size, "<reader>")
    }

    fn from_wav_reader(reader: hound::WavReader<R>, buffer_size: usize, label: &str) -> Result<Self> {
        let format = AudioFormat::from(reader.spec());
        let unsupported = |message: String| TonetrimError::UnsupportedFormat {
            path: label.to_string(),
            message,
        };

        if buffer_size == 0 || buffer_size > MAX_BUFFER_SIZE {
            return Err(TonetrimError::ConfigInvalidValue {
                key: "frame.buffer_size".to_string(),
                message: format!("must be between 1 and {}", MAX_BUFFER_SIZE),
            });
        }
        if format.sample_rate == 0 {
            return Err(unsupported("sample rate is zero".to_string()));
        }
        if format.channels == 0 {
            return Err(unsupported("channel count is zero".to_string()));
        }
        if format.sample_kind == SampleKind::Float && format.bits_per_sample != 32 {
            return Err(unsupported(format!(
                "{}-bit float samples are not supported",
                format.bits_per_sample
            )));
        }

        Ok(Self {
            reader,
            format,
            buffer_size,
            next_index: 0,
            frames_consumed: 0,
        })
    }

    /// Total number of sample frames declared by the WAV header.
    pub fn duration_frames(&self) -> u32 {
        self.reader.duration()
    }
}

impl<R: Read + Send> FrameSource for WavFrameSource<R> {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_frame(&mut self) -> Result<Option<AudioFrame>> {
        let channels = self.format.channels as usize;
        let wanted = self.buffer_size.saturating_mul(channels);

        let samples = match self.format.sample_kind {
            SampleKind::Int => {
                SampleBuffer::Int(read_block::<R, i32>(&mut self.reader, wanted, channels)?)
            }
            SampleKind::Float => {
                SampleBuffer::Float(read_block::<R, f32>(&mut self.reader, wanted, channels)?)
            }
        };
        if samples.is_empty() {
            return Ok(None);
        }

        let timestamp = self.frames_consumed as f64 / self.format.sample_rate as f64;
        let frame = AudioFrame::new(
            self.next_index,
            timestamp,
            &self.format,
            samples,
            self.buffer_size,
        );
        self.frames_consumed += frame.sample_frames() as u64;
        self.next_index += 1;

        Ok(Some(frame))
    }
}

/// Read up to `wanted` samples, keeping only whole sample frames.
fn read_block<R: Read, S: hound::Sample>(
    reader: &mut hound::WavReader<R>,
    wanted: usize,
    channels: usize,
) -> Result<Vec<S>> {
    let mut block: Vec<S> = reader
        .samples::<S>()
        .take(wanted)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TonetrimError::AudioRead {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    let whole = block.len() - block.len() % channels;
    block.truncate(whole);
    Ok(block)
}

/// Path of the in-progress file for `path`.
pub fn partial_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Sink that writes forwarded frames to a WAV file in the input's format.
///
/// Samples go to `<path>.part`; the file is renamed to `path` only when
/// `finalize` succeeds, so a failed run never publishes a truncated file.
pub struct WavFileSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    partial_path: PathBuf,
    final_path: PathBuf,
    frames_written: u64,
}

impl WavFileSink {
    pub fn create(path: &Path, format: AudioFormat) -> Result<Self> {
        let partial_path = partial_path_for(path);
        let writer = hound::WavWriter::create(&partial_path, format.into()).map_err(|e| {
            TonetrimError::AudioWrite {
                message: format!("Failed to create {}: {}", partial_path.display(), e),
            }
        })?;

        Ok(Self {
            writer: Some(writer),
            partial_path,
            final_path: path.to_path_buf(),
            frames_written: 0,
        })
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn path(&self) -> &Path {
        &self.final_path
    }
}

impl FrameSink for WavFileSink {
    fn forward(&mut self, frame: &AudioFrame) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| TonetrimError::AudioWrite {
            message: format!("{} is already finalized", self.final_path.display()),
        })?;
        let write_err = |e: hound::Error| TonetrimError::AudioWrite {
            message: format!("Failed to write WAV samples: {}", e),
        };

        match &frame.samples {
            SampleBuffer::Int(samples) => {
                for &sample in samples {
                    writer.write_sample(sample).map_err(write_err)?;
                }
            }
            SampleBuffer::Float(samples) => {
                for &sample in samples {
                    writer.write_sample(sample).map_err(write_err)?;
                }
            }
        }
        self.frames_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        writer.finalize().map_err(|e| TonetrimError::AudioWrite {
            message: format!("Failed to finalize {}: {}", self.partial_path.display(), e),
        })?;
        fs::rename(&self.partial_path, &self.final_path)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "wav-file"
    }
}
