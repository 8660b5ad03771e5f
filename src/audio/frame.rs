//! Frame types flowing through the trimming pipeline.

/// Sample encoding of the input (and therefore the output) stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// Signed integer PCM (8, 16, 24 or 32 bits).
    Int,
    /// 32-bit IEEE float PCM.
    Float,
}

/// Stream format shared by the source and every sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub sample_kind: SampleKind,
}

impl AudioFormat {
    /// Mono 32-bit float at the given rate.
    pub fn mono_float(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 32,
            sample_kind: SampleKind::Float,
        }
    }

    /// Full-scale value used to normalize integer samples to [-1, 1].
    pub fn full_scale(&self) -> f32 {
        match self.sample_kind {
            SampleKind::Int => (1u64 << (self.bits_per_sample.saturating_sub(1))) as f32,
            SampleKind::Float => 1.0,
        }
    }
}

impl From<hound::WavSpec> for AudioFormat {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
            sample_kind: match spec.sample_format {
                hound::SampleFormat::Int => SampleKind::Int,
                hound::SampleFormat::Float => SampleKind::Float,
            },
        }
    }
}

impl From<AudioFormat> for hound::WavSpec {
    fn from(format: AudioFormat) -> Self {
        Self {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: match format.sample_kind {
                SampleKind::Int => hound::SampleFormat::Int,
                SampleKind::Float => hound::SampleFormat::Float,
            },
        }
    }
}

/// Raw interleaved samples exactly as read from the input.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl SampleBuffer {
    /// Number of interleaved samples.
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::Int(s) => s.len(),
            SampleBuffer::Float(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` normalized to [-1, 1].
    fn normalized(&self, index: usize, full_scale: f32) -> f32 {
        match self {
            SampleBuffer::Int(s) => s[index] as f32 / full_scale,
            SampleBuffer::Float(s) => s[index],
        }
    }
}

/// A fixed-size block of audio with its position in the stream.
///
/// Built once by a frame source and only borrowed afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Zero-based frame number.
    pub index: u64,
    /// Seconds since the start of the stream, at the first sample of the frame.
    pub timestamp: f64,
    /// Channel count of `samples`.
    pub channels: u16,
    /// Raw interleaved samples, never padded.
    pub samples: SampleBuffer,
    /// Mono mixdown in [-1, 1], zero-padded to the configured frame size.
    pub analysis: Vec<f32>,
    /// Root-mean-square level of `analysis`.
    pub rms: f64,
}

impl AudioFrame {
    /// Build a frame, deriving the mono analysis buffer and RMS.
    ///
    /// `analysis_len` is the configured frame size; a short final frame is
    /// zero-padded up to it.
    pub fn new(
        index: u64,
        timestamp: f64,
        format: &AudioFormat,
        samples: SampleBuffer,
        analysis_len: usize,
    ) -> Self {
        let channels = format.channels.max(1) as usize;
        let full_scale = format.full_scale();
        let sample_frames = samples.len() / channels;

        let mut analysis = Vec::with_capacity(analysis_len.max(sample_frames));
        for frame in 0..sample_frames {
            let sum: f32 = (0..channels)
                .map(|ch| samples.normalized(frame * channels + ch, full_scale))
                .sum();
            analysis.push(sum / channels as f32);
        }
        if analysis.len() < analysis_len {
            analysis.resize(analysis_len, 0.0);
        }

        let rms = calculate_rms(&analysis);
        Self {
            index,
            timestamp,
            channels: format.channels,
            samples,
            analysis,
            rms,
        }
    }

    /// Mono float frame, mostly useful for scripted pipelines.
    pub fn from_mono(index: u64, timestamp: f64, samples: Vec<f32>) -> Self {
        let len = samples.len();
        Self::new(
            index,
            timestamp,
            &AudioFormat::mono_float(1),
            SampleBuffer::Float(samples),
            len,
        )
    }

    /// Number of sample frames (samples per channel) actually present.
    pub fn sample_frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration of the frame in seconds.
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.sample_frames() as f64 / sample_rate as f64
    }
}

/// Root mean square of normalized samples.
pub fn calculate_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}
