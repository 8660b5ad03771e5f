//! Single-pass run driver.
//!
//! Pulls frames from the source and, per frame: estimate pitch, update the
//! tone detector, route. One frame is fully processed before the next read.

use crate::audio::frame::AudioFrame;
use crate::audio::pitch::{PitchEstimate, PitchEstimator};
use crate::audio::source::FrameSource;
use crate::audio::tone::{CloseReason, ToneDetector, ToneRecord, ToneState};
use crate::config::RunConfig;
use crate::error::Result;
use crate::output::{ConsoleReporter, Reporter};
use crate::pipeline::router::{FrameRouter, Route};
use crate::pipeline::sink::FrameSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation flag shared with another thread (e.g. a signal handler).
///
/// Checked only between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Mutable run bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Completed tones, incremented once per tone close.
    pub tone_count: u64,
    pub frames_read: u64,
    pub frames_forwarded: u64,
    /// Set by the first `finalize` call.
    pub finalized: bool,
}

/// Outcome of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub tone_count: u64,
    pub frames_read: u64,
    pub frames_forwarded: u64,
    /// The run stopped on a cancellation request rather than end-of-stream.
    pub cancelled: bool,
    pub tones: Vec<ToneRecord>,
}

/// Drives source → estimator → detector → router → sinks.
pub struct FrameDispatcher {
    config: RunConfig,
    source: Box<dyn FrameSource>,
    estimator: Box<dyn PitchEstimator>,
    detector: ToneDetector,
    router: FrameRouter,
    reporter: Box<dyn Reporter>,
    cancel: CancelToken,
    counters: RunCounters,
    tones: Vec<ToneRecord>,
    cancelled: bool,
    stream_end: f64,
}

impl FrameDispatcher {
    /// Creates a dispatcher reporting to the console.
    pub fn new(
        config: RunConfig,
        source: Box<dyn FrameSource>,
        estimator: Box<dyn PitchEstimator>,
        sinks: Vec<Box<dyn FrameSink>>,
    ) -> Self {
        let detector = ToneDetector::new(config.tone);
        let router = FrameRouter::new(config.tone.max_tone_secs, sinks);
        Self {
            config,
            source,
            estimator,
            detector,
            router,
            reporter: Box::new(ConsoleReporter::default()),
            cancel: CancelToken::new(),
            counters: RunCounters::default(),
            tones: Vec::new(),
            cancelled: false,
            stream_end: 0.0,
        }
    }

    /// Sets a custom reporter.
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the cancellation token checked between frames.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Process the whole stream, then finalize.
    ///
    /// Stops early at a frame boundary if cancelled; finalization runs the
    /// same way in both cases. A read or write error aborts immediately
    /// without finalizing.
    pub fn run(&mut self) -> Result<RunSummary> {
        loop {
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                self.reporter
                    .diagnostic("Cancelled, finishing with frames processed so far");
                break;
            }
            let Some(frame) = self.source.read_frame()? else {
                break;
            };
            self.process_frame(&frame)?;
        }

        self.finalize()?;
        Ok(self.summary())
    }

    /// Run one frame through the pipeline and return its route.
    pub fn process_frame(&mut self, frame: &AudioFrame) -> Result<Route> {
        self.counters.frames_read += 1;
        let sample_rate = self.source.format().sample_rate;
        self.stream_end = frame.timestamp + frame.duration_secs(sample_rate);

        let estimate = self.estimator.estimate(frame);
        if let PitchEstimate::Pitched {
            frequency,
            confidence,
        } = estimate
        {
            self.reporter
                .pitch(frame.timestamp, frequency, confidence, frame.rms);
        }

        if let Some(record) = self.detector.observe(frame.timestamp, estimate) {
            self.record_tone(record);
        }

        let routing = self.router.route(&mut self.detector, frame)?;
        if let Some(record) = routing.closed {
            self.record_tone(record);
        }
        if routing.route == Route::Forward {
            self.counters.frames_forwarded += 1;
        }

        Ok(routing.route)
    }

    /// Close out the run: trailing tone, sinks, summary line.
    ///
    /// Only the first call does anything.
    pub fn finalize(&mut self) -> Result<()> {
        if self.counters.finalized {
            return Ok(());
        }
        self.counters.finalized = true;

        if self.config.tone.close_trailing_tone {
            if let Some(record) = self
                .detector
                .force_close(self.stream_end, CloseReason::EndOfStream)
            {
                self.record_tone(record);
            }
        } else if !self.detector.state().is_idle() {
            self.reporter
                .diagnostic("Stream ended inside a tone; it is not counted");
        }

        self.router.finalize_sinks()?;
        self.reporter.finished(self.counters.tone_count);
        self.reporter.diagnostic(&format!(
            "{} of {} frames forwarded",
            self.counters.frames_forwarded, self.counters.frames_read
        ));
        Ok(())
    }

    fn record_tone(&mut self, record: ToneRecord) {
        self.counters.tone_count += 1;
        self.reporter.tone_removed(&record);
        self.tones.push(record);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            tone_count: self.counters.tone_count,
            frames_read: self.counters.frames_read,
            frames_forwarded: self.counters.frames_forwarded,
            cancelled: self.cancelled,
            tones: self.tones.clone(),
        }
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    pub fn tone_state(&self) -> ToneState {
        self.detector.state()
    }
}
