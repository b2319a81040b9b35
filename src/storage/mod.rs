//! Frame persistence.
//!
//! Captured frames are written verbatim to a pictures directory, one file per
//! frame, and announced to a [`MediaIndex`] so galleries pick them up.

pub mod frame_store;

pub use frame_store::{FrameStore, LoggingMediaIndex, MediaIndex, PersistedFrame};
