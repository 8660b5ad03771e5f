use crate::audio::frame::{AudioFormat, AudioFrame};
use crate::error::{Result, TonetrimError};
use std::collections::VecDeque;

/// Trait for anything that yields fixed-size frames in stream order.
///
/// This trait allows swapping implementations (WAV file vs scripted frames).
pub trait FrameSource: Send {
    /// Format of every frame this source produces.
    fn format(&self) -> AudioFormat;

    /// Read the next frame.
    ///
    /// # Returns
    /// `Ok(None)` at end-of-stream, or an error if the read failed
    fn read_frame(&mut self) -> Result<Option<AudioFrame>>;
}

/// Scripted frame source for testing
#[derive(Debug, Clone)]
pub struct VecFrameSource {
    format: AudioFormat,
    frames: VecDeque<AudioFrame>,
    reads: usize,
    fail_at: Option<usize>,
}

impl VecFrameSource {
    /// Create a source that yields `frames` in order, then end-of-stream.
    pub fn new(format: AudioFormat, frames: Vec<AudioFrame>) -> Self {
        Self {
            format,
            frames: frames.into(),
            reads: 0,
            fail_at: None,
        }
    }

    /// Configure the source to fail on the read with this zero-based index.
    pub fn with_read_failure_at(mut self, read_index: usize) -> Self {
        self.fail_at = Some(read_index);
        self
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for VecFrameSource {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_frame(&mut self) -> Result<Option<AudioFrame>> {
        let read_index = self.reads;
        self.reads += 1;
        if self.fail_at == Some(read_index) {
            return Err(TonetrimError::AudioRead {
                message: format!("scripted failure at read {}", read_index),
            });
        }
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(count: u64) -> Vec<AudioFrame> {
        (0..count)
            .map(|i| AudioFrame::from_mono(i, i as f64 * 0.1, vec![0.0; 4]))
            .collect()
    }

    #[test]
    fn yields_frames_in_order_then_none() {
        let mut source = VecFrameSource::new(AudioFormat::mono_float(10), frames(3));

        for expected in 0..3 {
            let frame = source.read_frame().unwrap().unwrap();
            assert_eq!(frame.index, expected);
        }
        assert!(source.read_frame().unwrap().is_none());
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn scripted_failure_happens_at_requested_read() {
        let mut source =
            VecFrameSource::new(AudioFormat::mono_float(10), frames(3)).with_read_failure_at(1);

        assert!(source.read_frame().is_ok());
        match source.read_frame() {
            Err(TonetrimError::AudioRead { message }) => assert!(message.contains("read 1")),
            other => panic!("Expected AudioRead error, got {:?}", other),
        }
        assert_eq!(source.remaining(), 2);
    }
}
