//! Audio input, output and analysis.

pub mod frame;
#[cfg(feature = "playback")]
pub mod playback;
pub mod pitch;
pub mod source;
pub mod tone;
pub mod wav;

pub use frame::{AudioFormat, AudioFrame, SampleBuffer, SampleKind};
pub use pitch::{PitchEstimate, PitchEstimator, ScriptedEstimator, YinEstimator};
pub use source::{FrameSource, VecFrameSource};
pub use tone::{CloseReason, ToneDetector, ToneRecord, ToneState};
pub use wav::{WavFileSink, WavFrameSource};
