//! Console reporting for a trimming run.
//!
//! Tone records and the summary are the program's output and go to stdout.
//! Diagnostics go to stderr and depend on verbosity.

use crate::audio::tone::ToneRecord;
use std::sync::{Arc, Mutex};

/// Receives run events from the dispatcher.
pub trait Reporter {
    /// A tone was removed.
    fn tone_removed(&mut self, record: &ToneRecord);

    /// The run finished with this many tones removed.
    fn finished(&mut self, tone_count: u64);

    /// A frame produced a pitch reading.
    fn pitch(&mut self, _timestamp: f64, _frequency: f64, _confidence: f64, _rms: f64) {}

    /// Free-form diagnostic line.
    fn diagnostic(&mut self, _message: &str) {}
}

/// `(start=1.00s end=2.00s durr=1.00s)`
pub fn format_tone_record(record: &ToneRecord) -> String {
    format!(
        "(start={:.2}s end={:.2}s durr={:.2}s)",
        record.start_time, record.end_time, record.duration
    )
}

/// `removed 2 tones`
pub fn format_summary(tone_count: u64) -> String {
    format!("removed {} tones", tone_count)
}

/// Per-frame pitch line. RMS is shown scaled by 100.
pub fn format_pitch(timestamp: f64, frequency: f64, confidence: f64, rms: f64) -> String {
    format!(
        "Pitch detected at {:.2}s: {:.2}Hz ( {:.2} probability, RMS: {:.5} )",
        timestamp,
        frequency,
        confidence,
        rms * 100.0
    )
}

/// Terminal reporter.
///
/// Verbosity 1 adds diagnostics, 2 adds one line per pitched frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    verbosity: u8,
}

impl ConsoleReporter {
    pub fn new(quiet: bool, verbosity: u8) -> Self {
        Self { quiet, verbosity }
    }
}

impl Reporter for ConsoleReporter {
    fn tone_removed(&mut self, record: &ToneRecord) {
        if !self.quiet {
            println!("{}", format_tone_record(record));
        }
    }

    fn finished(&mut self, tone_count: u64) {
        if !self.quiet {
            println!("{}", format_summary(tone_count));
        }
    }

    fn pitch(&mut self, timestamp: f64, frequency: f64, confidence: f64, rms: f64) {
        if !self.quiet && self.verbosity >= 2 {
            eprintln!("{}", format_pitch(timestamp, frequency, confidence, rms));
        }
    }

    fn diagnostic(&mut self, message: &str) {
        if !self.quiet && self.verbosity >= 1 {
            eprintln!("{}", message);
        }
    }
}

/// Reporter that keeps every stdout line it would have printed.
///
/// Clones share the same lines.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl Reporter for CollectingReporter {
    fn tone_removed(&mut self, record: &ToneRecord) {
        self.push(format_tone_record(record));
    }

    fn finished(&mut self, tone_count: u64) {
        self.push(format_summary(tone_count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tone::CloseReason;

    #[test]
    fn tone_line_uses_two_decimals() {
        let record = ToneRecord::new(1.0, 2.004, CloseReason::SignatureLost);

        assert_eq!(
            format_tone_record(&record),
            "(start=1.00s end=2.00s durr=1.00s)"
        );
    }

    #[test]
    fn summary_line() {
        assert_eq!(format_summary(0), "removed 0 tones");
        assert_eq!(format_summary(3), "removed 3 tones");
    }

    #[test]
    fn pitch_line_scales_rms() {
        assert_eq!(
            format_pitch(1.024, 500.3125, 0.9912, 0.1234567),
            "Pitch detected at 1.02s: 500.31Hz ( 0.99 probability, RMS: 12.34567 )"
        );
    }

    #[test]
    fn collecting_reporter_keeps_lines_in_order() {
        let handle = CollectingReporter::new();
        let mut reporter = handle.clone();
        reporter.tone_removed(&ToneRecord::new(0.5, 2.3, CloseReason::MaxDuration));
        reporter.finished(1);

        assert_eq!(
            handle.lines(),
            vec![
                "(start=0.50s end=2.30s durr=1.80s)".to_string(),
                "removed 1 tones".to_string()
            ]
        );
    }

    #[test]
    fn quiet_console_reporter_does_not_panic() {
        let mut reporter = ConsoleReporter::new(true, 2);
        reporter.tone_removed(&ToneRecord::new(0.0, 1.0, CloseReason::EndOfStream));
        reporter.pitch(0.0, 500.0, 1.0, 0.1);
        reporter.diagnostic("hidden");
        reporter.finished(1);
    }
}
