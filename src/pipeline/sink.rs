use crate::audio::frame::AudioFrame;
use crate::error::{Result, TonetrimError};
use std::sync::{Arc, Mutex};

/// Pluggable destination for forwarded frames.
/// Pairs with FrameSource for input - this handles the trimmed output.
pub trait FrameSink {
    /// Accept one forwarded frame. Called in stream order.
    fn forward(&mut self, frame: &AudioFrame) -> Result<()>;

    /// Flush and close. Called once on run shutdown.
    fn finalize(&mut self) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// What a `CollectorSink` has seen, shared with the test that created it.
#[derive(Debug, Default)]
pub struct Collected {
    pub frames: Vec<AudioFrame>,
    pub finalize_calls: usize,
}

/// Sink that records forwarded frames in memory.
///
/// Clones share the same record, so a test can keep one handle while the
/// dispatcher owns the other.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    collected: Arc<Mutex<Collected>>,
    fail_after: Option<usize>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `forward` once this many frames have been accepted.
    pub fn with_write_failure_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Indices of the frames forwarded so far.
    pub fn indices(&self) -> Vec<u64> {
        self.collected
            .lock()
            .map(|c| c.frames.iter().map(|f| f.index).collect())
            .unwrap_or_default()
    }

    /// Number of times `finalize` was called.
    pub fn finalize_calls(&self) -> usize {
        self.collected.lock().map(|c| c.finalize_calls).unwrap_or(0)
    }

    /// Copy of every forwarded frame.
    pub fn frames(&self) -> Vec<AudioFrame> {
        self.collected
            .lock()
            .map(|c| c.frames.clone())
            .unwrap_or_default()
    }
}

impl FrameSink for CollectorSink {
    fn forward(&mut self, frame: &AudioFrame) -> Result<()> {
        let mut collected = self
            .collected
            .lock()
            .map_err(|_| TonetrimError::Other("collector lock poisoned".to_string()))?;
        if self.fail_after.is_some_and(|n| collected.frames.len() >= n) {
            return Err(TonetrimError::AudioWrite {
                message: "collector refused frame".to_string(),
            });
        }
        collected.frames.push(frame.clone());
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let mut collected = self
            .collected
            .lock()
            .map_err(|_| TonetrimError::Other("collector lock poisoned".to_string()))?;
        collected.finalize_calls += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}
