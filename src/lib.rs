//! # geoburst
//!
//! Burst capture with GPS geotagging. A burst takes a fixed number of stills
//! in strict sequence, writes each frame to disk under a deterministic name
//! and, once the burst completes, writes the newest location fix into every
//! frame's EXIF block.
//!
//! ## Crate Structure
//!
//! - **`capture`**: parameter selection, the burst state machine and its async
//!   driver, and the audible start/stop cues.
//! - **`storage`**: the `FrameStore` that persists frames verbatim.
//! - **`geotag`**: decimal degrees to EXIF GPS rationals, and the JPEG writer.
//! - **`location`**: validated coordinates and the `LocationTracker` cache.
//! - **`controller`**: the host-facing `CaptureController` tying it together.
//! - **`hardware`**: capability traits for cameras and location sources, plus mocks.
//! - **`config`**: layered figment configuration.
//! - **`logging`**: tracing subscriber setup.
//! - **`error`**: the crate-wide `BurstError`.

pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod geotag;
pub mod hardware;
pub mod location;
pub mod logging;
pub mod storage;

pub use controller::{BurstSummary, CaptureController};
pub use error::{BurstError, BurstResult};
