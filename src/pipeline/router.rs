//! Per-frame forwarding decision and the hard duration cutoff.

use crate::audio::frame::AudioFrame;
use crate::audio::tone::{CloseReason, ToneDetector, ToneRecord, ToneState};
use crate::error::{Result, TonetrimError};
use crate::pipeline::sink::FrameSink;

/// What happens to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Written to every sink.
    Forward,
    /// Trimmed from the output.
    Drop,
}

/// Decision for a frame given the detector state at routing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Forward,
    Drop,
    /// The tone outlived the cutoff: close it, then forward.
    CloseAndForward,
}

/// Pure routing rule.
pub fn decide(state: ToneState, timestamp: f64, max_tone_secs: f64) -> Decision {
    match state.elapsed(timestamp) {
        None => Decision::Forward,
        Some(elapsed) if elapsed > max_tone_secs => Decision::CloseAndForward,
        Some(_) => Decision::Drop,
    }
}

/// Result of routing one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Routing {
    pub route: Route,
    /// Tone force-closed by the cutoff while routing this frame.
    pub closed: Option<ToneRecord>,
}

/// Routes frames to an ordered list of sinks.
pub struct FrameRouter {
    max_tone_secs: f64,
    sinks: Vec<Box<dyn FrameSink>>,
}

impl FrameRouter {
    pub fn new(max_tone_secs: f64, sinks: Vec<Box<dyn FrameSink>>) -> Self {
        Self {
            max_tone_secs,
            sinks,
        }
    }

    /// Decide and, when forwarding, hand the frame to every sink in order.
    ///
    /// A forced close happens before the forwarding decision takes effect, so
    /// the frame that crosses the cutoff is the first one forwarded again.
    pub fn route(&mut self, detector: &mut ToneDetector, frame: &AudioFrame) -> Result<Routing> {
        let mut closed = None;
        let route = match decide(detector.state(), frame.timestamp, self.max_tone_secs) {
            Decision::Drop => Route::Drop,
            Decision::Forward => Route::Forward,
            Decision::CloseAndForward => {
                closed = detector.force_close(frame.timestamp, CloseReason::MaxDuration);
                Route::Forward
            }
        };

        if route == Route::Forward {
            for sink in &mut self.sinks {
                sink.forward(frame)?;
            }
        }

        Ok(Routing { route, closed })
    }

    /// Finalize every sink.
    ///
    /// All sinks are attempted even if one fails; the first error is returned.
    pub fn finalize_sinks(&mut self) -> Result<()> {
        let mut first_error: Option<TonetrimError> = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finalize() {
                if first_error.is_some() {
                    eprintln!("tonetrim: {} sink failed to finalize: {}", sink.name(), e);
                } else {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pitch::PitchEstimate;
    use crate::config::ToneThresholds;
    use crate::pipeline::sink::CollectorSink;

    fn frame(index: u64, timestamp: f64) -> AudioFrame {
        AudioFrame::from_mono(index, timestamp, vec![0.0; 4])
    }

    fn in_tone_detector(start: f64) -> ToneDetector {
        let mut detector = ToneDetector::new(ToneThresholds::default());
        detector.observe(start, PitchEstimate::pitched(500.0, 1.0));
        detector
    }

    #[test]
    fn decide_forwards_when_idle() {
        assert_eq!(decide(ToneState::Idle, 10.0, 1.7), Decision::Forward);
    }

    #[test]
    fn decide_drops_inside_tone() {
        let state = ToneState::InTone { start_time: 1.0 };

        assert_eq!(decide(state, 1.0, 1.7), Decision::Drop);
        assert_eq!(decide(state, 2.7, 1.7), Decision::Drop);
    }

    #[test]
    fn decide_closes_past_cutoff() {
        let state = ToneState::InTone { start_time: 1.0 };

        assert_eq!(decide(state, 2.75, 1.7), Decision::CloseAndForward);
    }

    #[test]
    fn idle_frames_reach_every_sink_in_order() {
        let first = CollectorSink::new();
        let second = CollectorSink::new();
        let mut router = FrameRouter::new(
            1.7,
            vec![Box::new(first.clone()), Box::new(second.clone())],
        );
        let mut detector = ToneDetector::new(ToneThresholds::default());

        for i in 0..3 {
            let routing = router.route(&mut detector, &frame(i, i as f64)).unwrap();
            assert_eq!(routing.route, Route::Forward);
            assert_eq!(routing.closed, None);
        }

        assert_eq!(first.indices(), vec![0, 1, 2]);
        assert_eq!(second.indices(), vec![0, 1, 2]);
        assert_eq!(router.sink_count(), 2);
    }

    #[test]
    fn tone_frames_are_dropped() {
        let sink = CollectorSink::new();
        let mut router = FrameRouter::new(1.7, vec![Box::new(sink.clone())]);
        let mut detector = in_tone_detector(1.0);

        let routing = router.route(&mut detector, &frame(0, 1.5)).unwrap();

        assert_eq!(routing.route, Route::Drop);
        assert!(sink.indices().is_empty());
        assert!(!detector.state().is_idle());
    }

    #[test]
    fn cutoff_closes_tone_and_forwards_same_frame() {
        let sink = CollectorSink::new();
        let mut router = FrameRouter::new(1.7, vec![Box::new(sink.clone())]);
        let mut detector = in_tone_detector(0.5);

        let routing = router.route(&mut detector, &frame(7, 2.3)).unwrap();

        assert_eq!(routing.route, Route::Forward);
        let record = routing.closed.unwrap();
        assert_eq!(record.start_time, 0.5);
        assert_eq!(record.end_time, 2.3);
        assert_eq!(record.reason, CloseReason::MaxDuration);
        assert!(detector.state().is_idle());
        assert_eq!(sink.indices(), vec![7]);
    }

    #[test]
    fn sink_error_aborts_routing() {
        let sink = CollectorSink::new().with_write_failure_after(0);
        let mut router = FrameRouter::new(1.7, vec![Box::new(sink)]);
        let mut detector = ToneDetector::new(ToneThresholds::default());

        assert!(router.route(&mut detector, &frame(0, 0.0)).is_err());
    }

    #[test]
    fn finalize_reaches_every_sink() {
        let first = CollectorSink::new();
        let second = CollectorSink::new();
        let mut router = FrameRouter::new(
            1.7,
            vec![Box::new(first.clone()), Box::new(second.clone())],
        );

        router.finalize_sinks().unwrap();

        assert_eq!(first.finalize_calls(), 1);
        assert_eq!(second.finalize_calls(), 1);
    }
}
