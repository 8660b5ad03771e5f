//! Pitch estimation.
//!
//! The trimming core only needs "one estimate per frame, in frame order";
//! `PitchEstimator` is the seam, `YinEstimator` the implementation used for
//! real files.

use crate::audio::frame::AudioFrame;
use crate::defaults;
use std::collections::VecDeque;

/// Pitch reading for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// No periodicity found.
    Unpitched,
    /// Fundamental frequency in Hz with a confidence in [0, 1].
    Pitched { frequency: f64, confidence: f64 },
}

impl PitchEstimate {
    pub fn pitched(frequency: f64, confidence: f64) -> Self {
        PitchEstimate::Pitched {
            frequency,
            confidence,
        }
    }

    pub fn is_pitched(&self) -> bool {
        matches!(self, PitchEstimate::Pitched { .. })
    }
}

/// Trait for per-frame pitch estimation, allowing scripted estimates in tests.
pub trait PitchEstimator: Send {
    /// Estimate the pitch of `frame`. Called once per frame, in order.
    fn estimate(&mut self, frame: &AudioFrame) -> PitchEstimate;
}

/// YIN pitch estimator (de Cheveigné & Kawahara, 2002).
///
/// Works on the frame's mono analysis buffer. Confidence is
/// `1 - d'(tau)` at the selected lag.
pub struct YinEstimator {
    sample_rate: f64,
    threshold: f64,
    yin_buffer: Vec<f64>,
}

impl YinEstimator {
    /// Estimator for frames of `buffer_size` samples at `sample_rate`.
    pub fn new(sample_rate: u32, buffer_size: usize) -> Self {
        Self::with_threshold(sample_rate, buffer_size, defaults::YIN_THRESHOLD)
    }

    pub fn with_threshold(sample_rate: u32, buffer_size: usize, threshold: f64) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            threshold,
            yin_buffer: vec![0.0; buffer_size / 2],
        }
    }

    /// Estimate the pitch of raw normalized samples.
    pub fn estimate_samples(&mut self, samples: &[f32]) -> PitchEstimate {
        let half = samples.len() / 2;
        if self.yin_buffer.len() != half {
            self.yin_buffer.resize(half, 0.0);
        }
        if half < 3 {
            return PitchEstimate::Unpitched;
        }

        self.difference(samples);
        self.cumulative_mean_normalized_difference();

        let Some(tau) = self.absolute_threshold() else {
            return PitchEstimate::Unpitched;
        };
        let confidence = 1.0 - self.yin_buffer[tau];
        let better_tau = self.parabolic_interpolation(tau);
        if better_tau <= 0.0 || !better_tau.is_finite() {
            return PitchEstimate::Unpitched;
        }

        PitchEstimate::pitched(self.sample_rate / better_tau, confidence)
    }

    /// Squared difference function d(tau).
    fn difference(&mut self, samples: &[f32]) {
        let half = self.yin_buffer.len();
        self.yin_buffer[0] = 0.0;
        for tau in 1..half {
            let mut sum = 0.0;
            for i in 0..half {
                let delta = samples[i] as f64 - samples[i + tau] as f64;
                sum += delta * delta;
            }
            self.yin_buffer[tau] = sum;
        }
    }

    /// d'(tau): each lag divided by the running mean of the lags before it.
    fn cumulative_mean_normalized_difference(&mut self) {
        self.yin_buffer[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..self.yin_buffer.len() {
            running_sum += self.yin_buffer[tau];
            if running_sum > 0.0 {
                self.yin_buffer[tau] *= tau as f64 / running_sum;
            } else {
                self.yin_buffer[tau] = 1.0;
            }
        }
    }

    /// First dip below the threshold, followed down to its local minimum.
    fn absolute_threshold(&self) -> Option<usize> {
        let len = self.yin_buffer.len();
        let mut tau = 2;
        while tau < len {
            if self.yin_buffer[tau] < self.threshold {
                while tau + 1 < len && self.yin_buffer[tau + 1] < self.yin_buffer[tau] {
                    tau += 1;
                }
                return Some(tau);
            }
            tau += 1;
        }
        None
    }

    /// Refine the lag with a parabola through its neighbours.
    fn parabolic_interpolation(&self, tau: usize) -> f64 {
        let len = self.yin_buffer.len();
        let x0 = if tau < 1 { tau } else { tau - 1 };
        let x2 = if tau + 1 < len { tau + 1 } else { tau };

        if x0 == tau {
            return if self.yin_buffer[tau] <= self.yin_buffer[x2] {
                tau as f64
            } else {
                x2 as f64
            };
        }
        if x2 == tau {
            return if self.yin_buffer[tau] <= self.yin_buffer[x0] {
                tau as f64
            } else {
                x0 as f64
            };
        }

        let s0 = self.yin_buffer[x0];
        let s1 = self.yin_buffer[tau];
        let s2 = self.yin_buffer[x2];
        let denominator = 2.0 * (2.0 * s1 - s2 - s0);
        if denominator == 0.0 {
            return tau as f64;
        }
        tau as f64 + (s2 - s0) / denominator
    }
}

impl PitchEstimator for YinEstimator {
    fn estimate(&mut self, frame: &AudioFrame) -> PitchEstimate {
        self.estimate_samples(&frame.analysis)
    }
}

/// Estimator that replays a fixed list of estimates, for testing.
///
/// Yields `Unpitched` once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEstimator {
    script: VecDeque<PitchEstimate>,
}

impl ScriptedEstimator {
    pub fn new(script: Vec<PitchEstimate>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl PitchEstimator for ScriptedEstimator {
    fn estimate(&mut self, _frame: &AudioFrame) -> PitchEstimate {
        self.script.pop_front().unwrap_or(PitchEstimate::Unpitched)
    }
}
