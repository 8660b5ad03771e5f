//! Live playback of forwarded frames through cpal.
//!
//! Opens the default output device in its native format and converts in
//! software: mono mixdown, duplicated to every output channel, resampled
//! to the device rate.

use crate::audio::frame::AudioFrame;
use crate::error::{Result, TonetrimError};
use crate::pipeline::sink::FrameSink;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Seconds of audio allowed in the queue before `forward` blocks.
const MAX_QUEUED_SECS: f64 = 0.5;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Give up if the device stops consuming for this long.
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

type SampleQueue = Arc<Mutex<VecDeque<f32>>>;

/// Plays the filtered stream on the default output device.
///
/// Not `Send`: cpal streams must stay on the thread that built them.
pub struct PlaybackSink {
    stream: Option<cpal::Stream>,
    queue: SampleQueue,
    source_rate: u32,
    device_rate: u32,
    max_queued: usize,
}

impl PlaybackSink {
    /// Open the default output device for audio at `source_rate`.
    pub fn open(source_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| TonetrimError::Playback {
                message: "No default output device".to_string(),
            })?;
        let default_config =
            device
                .default_output_config()
                .map_err(|e| TonetrimError::Playback {
                    message: format!("Failed to query default output config: {}", e),
                })?;

        let device_rate = default_config.sample_rate().0;
        let channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();
        let queue: SampleQueue = Arc::new(Mutex::new(VecDeque::new()));

        let err_callback = |err| {
            eprintln!("Playback stream error: {}", err);
        };

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                let queue = Arc::clone(&queue);
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill_output(data, channels, &queue, |s| s);
                    },
                    err_callback,
                    None,
                )
            }
            cpal::SampleFormat::I16 => {
                let queue = Arc::clone(&queue);
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        fill_output(data, channels, &queue, |s| {
                            (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                        });
                    },
                    err_callback,
                    None,
                )
            }
            fmt => {
                return Err(TonetrimError::Playback {
                    message: format!("Unsupported output sample format: {:?}", fmt),
                });
            }
        }
        .map_err(|e| TonetrimError::Playback {
            message: format!("Failed to build output stream: {}", e),
        })?;

        stream.play().map_err(|e| TonetrimError::Playback {
            message: format!("Failed to start output stream: {}", e),
        })?;

        Ok(Self {
            stream: Some(stream),
            queue,
            source_rate,
            device_rate,
            max_queued: (device_rate as f64 * MAX_QUEUED_SECS) as usize,
        })
    }

    fn queued(&self) -> Result<usize> {
        self.queue
            .lock()
            .map(|q| q.len())
            .map_err(|_| TonetrimError::Playback {
                message: "playback queue lock poisoned".to_string(),
            })
    }

    /// Block until the queue is at most `limit` samples long.
    fn wait_for_queue(&self, limit: usize) -> Result<()> {
        let mut last_len = self.queued()?;
        let mut last_progress = Instant::now();
        while last_len > limit {
            std::thread::sleep(POLL_INTERVAL);
            let len = self.queued()?;
            if len < last_len {
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(TonetrimError::Playback {
                    message: "output device stopped consuming audio".to_string(),
                });
            }
            last_len = len;
        }
        Ok(())
    }
}

impl FrameSink for PlaybackSink {
    fn forward(&mut self, frame: &AudioFrame) -> Result<()> {
        if self.stream.is_none() {
            return Err(TonetrimError::Playback {
                message: "playback already finalized".to_string(),
            });
        }
        let len = frame.sample_frames().min(frame.analysis.len());
        let converted = resample(&frame.analysis[..len], self.source_rate, self.device_rate);

        self.wait_for_queue(self.max_queued)?;
        let mut queue = self.queue.lock().map_err(|_| TonetrimError::Playback {
            message: "playback queue lock poisoned".to_string(),
        })?;
        queue.extend(converted);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.stream.is_none() {
            return Ok(());
        }
        let drained = self.wait_for_queue(0);
        // Dropping the stream stops playback.
        self.stream = None;
        drained
    }

    fn name(&self) -> &'static str {
        "playback"
    }
}

/// Write queued mono samples to every channel of `data`; silence on underrun.
fn fill_output<T: Copy>(
    data: &mut [T],
    channels: usize,
    queue: &Mutex<VecDeque<f32>>,
    convert: impl Fn(f32) -> T,
) {
    let Ok(mut queue) = queue.lock() else {
        return;
    };
    for frame in data.chunks_mut(channels.max(1)) {
        let value = convert(queue.pop_front().unwrap_or(0.0));
        frame.fill(value);
    }
}

/// Linear-interpolation resampler.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let position = i as f64 * ratio;
        let index = position as usize;
        let fraction = (position - index as f64) as f32;

        let sample = if index + 1 < samples.len() {
            samples[index] * (1.0 - fraction) + samples[index + 1] * fraction
        } else {
            samples[samples.len() - 1]
        };
        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_same_rate_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];

        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn resample_upsamples_by_ratio() {
        let samples = vec![0.0, 1.0, 0.0, -1.0];

        let out = resample(&samples, 8000, 16000);

        assert_eq!(out.len(), 8);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[2], 1.0);
    }

    #[test]
    fn resample_downsamples_by_ratio() {
        let samples = vec![0.5; 480];

        let out = resample(&samples, 48000, 16000);

        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn fill_output_duplicates_mono_to_channels() {
        let queue = Mutex::new(VecDeque::from(vec![0.25, -0.5]));
        let mut data = [9.0f32; 6];

        fill_output(&mut data[..], 2, &queue, |s| s);

        assert_eq!(data, [0.25, 0.25, -0.5, -0.5, 0.0, 0.0]);
        assert!(queue.lock().unwrap().is_empty());
    }

    #[test]
    fn fill_output_converts_to_i16() {
        let queue = Mutex::new(VecDeque::from(vec![1.0, -2.0]));
        let mut data = [0i16; 2];

        fill_output(&mut data[..], 1, &queue, |s| {
            (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
        });

        assert_eq!(data, [i16::MAX, -i16::MAX]);
    }

    #[test]
    #[ignore] // Requires an audio output device
    fn playback_sink_plays_and_finalizes() {
        let mut sink = PlaybackSink::open(16000).unwrap();
        let frame = AudioFrame::from_mono(0, 0.0, vec![0.0; 1024]);

        sink.forward(&frame).unwrap();
        sink.finalize().unwrap();
        sink.finalize().unwrap();
        assert!(sink.forward(&frame).is_err());
    }
}
