//! Burst capture
//!
//! - [`parameters`]: picks capture parameters from a device's supported sizes
//! - [`session`]: the burst state machine, a pure transition function over events
//! - [`sequencer`]: drives the state machine against a real (or mock) device
//! - [`cues`]: audible start/stop cues bracketing a burst

pub mod cues;
pub mod parameters;
pub mod sequencer;
pub mod session;

pub use cues::NotificationCues;
pub use parameters::{select_parameters, CaptureParameters};
pub use sequencer::{BurstObserver, BurstSequencer};
pub use session::{BurstSession, BurstState};
