//! Marker tone detection.
//!
//! A tone starts on a confident reading near the onset pitch and is held
//! while readings stay near the sustain pitch. Two timers shape it: a
//! debounce window during which it cannot end, and a hard cutoff applied by
//! the router.

use crate::audio::pitch::PitchEstimate;
use crate::config::ToneThresholds;

/// Whether the stream is currently inside a tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneState {
    /// Normal audio.
    Idle,
    /// Inside a tone that began at `start_time` seconds.
    InTone { start_time: f64 },
}

impl ToneState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ToneState::Idle)
    }

    /// Seconds since the tone started, if one is active.
    pub fn elapsed(&self, timestamp: f64) -> Option<f64> {
        match self {
            ToneState::Idle => None,
            ToneState::InTone { start_time } => Some(timestamp - start_time),
        }
    }
}

/// Why a tone ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The sustain signature was lost after the debounce window.
    SignatureLost,
    /// The tone ran past the hard cutoff.
    MaxDuration,
    /// The stream ended while the tone was still active.
    EndOfStream,
}

/// One removed tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneRecord {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub reason: CloseReason,
}

impl ToneRecord {
    pub fn new(start_time: f64, end_time: f64, reason: CloseReason) -> Self {
        Self {
            start_time,
            end_time,
            duration: end_time - start_time,
            reason,
        }
    }
}

/// Does `estimate` carry the onset signature?
pub fn matches_start(estimate: PitchEstimate, thresholds: &ToneThresholds) -> bool {
    match estimate {
        PitchEstimate::Pitched {
            frequency,
            confidence,
        } => {
            confidence > thresholds.start_probability
                && (frequency - thresholds.start_hz).abs() < thresholds.hz_range
        }
        PitchEstimate::Unpitched => false,
    }
}

/// Has a pitched `estimate` lost the sustain signature?
pub fn breaks_sustain(estimate: PitchEstimate, thresholds: &ToneThresholds) -> bool {
    match estimate {
        PitchEstimate::Pitched {
            frequency,
            confidence,
        } => {
            confidence < thresholds.stop_probability
                || (frequency - thresholds.stop_hz).abs() > thresholds.hz_range
        }
        PitchEstimate::Unpitched => false,
    }
}

/// Next state for one reading.
///
/// Pure: the same `(state, timestamp, estimate)` always gives the same
/// result. Returns the record of the tone this reading closed, if any.
pub fn transition(
    state: ToneState,
    timestamp: f64,
    estimate: PitchEstimate,
    thresholds: &ToneThresholds,
) -> (ToneState, Option<ToneRecord>) {
    match state {
        ToneState::Idle => {
            if matches_start(estimate, thresholds) {
                (
                    ToneState::InTone {
                        start_time: timestamp,
                    },
                    None,
                )
            } else {
                (state, None)
            }
        }
        ToneState::InTone { start_time } => {
            // A missing reading never ends a tone.
            if !estimate.is_pitched() {
                return (state, None);
            }
            if timestamp - start_time < thresholds.min_tone_secs {
                return (state, None);
            }
            if breaks_sustain(estimate, thresholds) {
                let record = ToneRecord::new(start_time, timestamp, CloseReason::SignatureLost);
                (ToneState::Idle, Some(record))
            } else {
                (state, None)
            }
        }
    }
}

/// Tone detector state machine.
///
/// Owns the only mutable tone state of a run.
#[derive(Debug, Clone)]
pub struct ToneDetector {
    thresholds: ToneThresholds,
    state: ToneState,
}

impl ToneDetector {
    pub fn new(thresholds: ToneThresholds) -> Self {
        Self {
            thresholds,
            state: ToneState::Idle,
        }
    }

    /// Feed one reading. Returns the closed tone, if this reading ended one.
    pub fn observe(&mut self, timestamp: f64, estimate: PitchEstimate) -> Option<ToneRecord> {
        let (next, closed) = transition(self.state, timestamp, estimate, &self.thresholds);
        self.state = next;
        closed
    }

    /// End the active tone at `timestamp` regardless of the signal.
    ///
    /// No-op while idle.
    pub fn force_close(&mut self, timestamp: f64, reason: CloseReason) -> Option<ToneRecord> {
        match self.state {
            ToneState::Idle => None,
            ToneState::InTone { start_time } => {
                self.state = ToneState::Idle;
                Some(ToneRecord::new(start_time, timestamp, reason))
            }
        }
    }

    /// Returns the current tone state.
    pub fn state(&self) -> ToneState {
        self.state
    }

    pub fn thresholds(&self) -> &ToneThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ToneDetector {
        ToneDetector::new(ToneThresholds::default())
    }

    fn onset() -> PitchEstimate {
        PitchEstimate::pitched(500.5, 0.995)
    }

    fn sustain() -> PitchEstimate {
        PitchEstimate::pitched(220.3, 0.97)
    }

    #[test]
    fn starts_idle() {
        assert_eq!(detector().state(), ToneState::Idle);
    }

    #[test]
    fn onset_signature_starts_tone() {
        let mut d = detector();

        assert_eq!(d.observe(1.0, onset()), None);
        assert_eq!(d.state(), ToneState::InTone { start_time: 1.0 });
    }

    #[test]
    fn tone_can_start_at_time_zero() {
        let mut d = detector();

        d.observe(0.0, onset());

        assert_eq!(d.state(), ToneState::InTone { start_time: 0.0 });
        assert_eq!(d.state().elapsed(0.5), Some(0.5));
    }

    #[test]
    fn onset_requires_confidence_strictly_above_threshold() {
        let mut d = detector();

        d.observe(1.0, PitchEstimate::pitched(500.0, 0.99));

        assert!(d.state().is_idle());
    }

    #[test]
    fn onset_requires_frequency_strictly_inside_band() {
        let mut d = detector();

        d.observe(1.0, PitchEstimate::pitched(502.0, 1.0));
        assert!(d.state().is_idle());

        d.observe(1.1, PitchEstimate::pitched(498.1, 1.0));
        assert!(!d.state().is_idle());
    }

    #[test]
    fn sustain_pitch_does_not_start_tone() {
        let mut d = detector();

        d.observe(1.0, PitchEstimate::pitched(220.0, 1.0));

        assert!(d.state().is_idle());
    }

    #[test]
    fn unpitched_never_starts_or_ends_tone() {
        let mut d = detector();
        assert_eq!(d.observe(0.5, PitchEstimate::Unpitched), None);
        assert!(d.state().is_idle());

        d.observe(1.0, onset());
        assert_eq!(d.observe(5.0, PitchEstimate::Unpitched), None);
        assert_eq!(d.state(), ToneState::InTone { start_time: 1.0 });
    }

    #[test]
    fn debounce_holds_tone_regardless_of_reading() {
        let mut d = detector();
        d.observe(0.5, onset());

        assert_eq!(d.observe(0.9, PitchEstimate::pitched(220.0, 0.1)), None);
        assert_eq!(d.observe(1.0, PitchEstimate::pitched(1000.0, 1.0)), None);
        assert_eq!(d.state(), ToneState::InTone { start_time: 0.5 });
    }

    #[test]
    fn low_confidence_after_debounce_ends_tone() {
        let mut d = detector();
        d.observe(0.5, onset());
        d.observe(0.9, PitchEstimate::pitched(220.0, 0.1));

        let record = d.observe(1.1, PitchEstimate::pitched(220.0, 0.1)).unwrap();

        assert_eq!(record.start_time, 0.5);
        assert_eq!(record.end_time, 1.1);
        assert!((record.duration - 0.6).abs() < 1e-9);
        assert_eq!(record.reason, CloseReason::SignatureLost);
        assert!(d.state().is_idle());
    }

    #[test]
    fn sustain_signature_keeps_tone_after_debounce() {
        let mut d = detector();
        d.observe(1.0, onset());

        for i in 0..10 {
            let t = 1.0 + 0.1 * i as f64;
            assert_eq!(d.observe(t, sustain()), None);
        }
        assert!(!d.state().is_idle());
    }

    #[test]
    fn leaving_sustain_band_ends_tone() {
        let mut d = detector();
        d.observe(1.0, onset());

        let record = d.observe(1.7, PitchEstimate::pitched(225.0, 0.99));

        assert!(record.is_some());
        assert!(d.state().is_idle());
    }

    #[test]
    fn onset_pitch_inside_tone_ends_it_after_debounce() {
        let mut d = detector();
        d.observe(1.0, onset());

        let record = d.observe(1.7, onset());

        assert!(record.is_some());
    }

    #[test]
    fn stop_thresholds_are_boundary_inclusive() {
        let thresholds = ToneThresholds::default();

        // Exactly at the stop confidence or band edge is still sustained
        assert!(!breaks_sustain(PitchEstimate::pitched(220.0, 0.95), &thresholds));
        assert!(!breaks_sustain(PitchEstimate::pitched(222.0, 0.99), &thresholds));
        assert!(breaks_sustain(PitchEstimate::pitched(222.5, 0.99), &thresholds));
        assert!(breaks_sustain(PitchEstimate::pitched(220.0, 0.949), &thresholds));
    }

    #[test]
    fn transition_is_pure() {
        let thresholds = ToneThresholds::default();
        let state = ToneState::InTone { start_time: 1.0 };
        let estimate = PitchEstimate::pitched(220.0, 0.5);

        let first = transition(state, 2.0, estimate, &thresholds);
        let second = transition(state, 2.0, estimate, &thresholds);

        assert_eq!(first, second);
        assert_eq!(first.0, ToneState::Idle);
    }

    #[test]
    fn force_close_ends_active_tone() {
        let mut d = detector();
        d.observe(0.5, onset());

        let record = d.force_close(2.3, CloseReason::MaxDuration).unwrap();

        assert_eq!(record.start_time, 0.5);
        assert_eq!(record.end_time, 2.3);
        assert_eq!(record.reason, CloseReason::MaxDuration);
        assert!(d.state().is_idle());
    }

    #[test]
    fn force_close_while_idle_is_noop() {
        let mut d = detector();

        assert_eq!(d.force_close(1.0, CloseReason::EndOfStream), None);
        assert!(d.state().is_idle());
    }

    #[test]
    fn custom_thresholds_are_respected() {
        let thresholds = ToneThresholds {
            start_hz: 1000.0,
            stop_hz: 440.0,
            ..Default::default()
        };
        let mut d = ToneDetector::new(thresholds);

        d.observe(0.0, onset());
        assert!(d.state().is_idle());

        d.observe(0.1, PitchEstimate::pitched(1000.0, 1.0));
        assert!(!d.state().is_idle());
        assert_eq!(d.thresholds().stop_hz, 440.0);
    }
}
