//! Frame pipeline for tone trimming.
//!
//! Single-pass and synchronous: each frame is estimated, run through the tone
//! detector and routed to the sinks before the next one is read.

pub mod dispatcher;
pub mod router;
pub mod sink;

pub use dispatcher::{CancelToken, FrameDispatcher, RunCounters, RunSummary};
pub use router::{Decision, FrameRouter, Route, Routing};
pub use sink::{CollectorSink, FrameSink};
