//! Capability Traits
//!
//! The capture pipeline never talks to a platform API directly. Everything it needs from the
//! outside world is expressed as a narrow capability trait that the host shell implements:
//!
//! - [`CaptureDeviceProvider`] opens a camera by facing
//! - [`CaptureDevice`] reports supported sizes and captures one still at a time
//! - [`LocationSource`] hands out best-effort coordinates, on demand or pushed
//!
//! Swapping any of them for the simulated versions in [`crate::hardware::mock`] is how the
//! sequencer and controller are tested without hardware.
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is async (uses #[async_trait])
//! - Is thread-safe (requires Send + Sync)
//! - Uses anyhow::Result for errors
//! - Focuses on ONE thing
//!
//! # Example
//!
//! ```rust,ignore
//! async fn single_still(device: &dyn CaptureDevice) -> Result<Vec<u8>> {
//!     let params = select_parameters(
//!         &device.supported_preview_sizes(),
//!         &device.supported_picture_sizes(),
//!     );
//!     device.apply_parameters(&params).await?;
//!     let jpeg = device.capture_once().await?;
//!     device.resume_preview().await?;
//!     Ok(jpeg)
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::capture::parameters::CaptureParameters;
use crate::hardware::{Facing, Resolution};
use crate::location::{GeoCoordinate, LocationRequest};

/// Capability: Opening Cameras
///
/// Hands out an exclusive handle to a camera. The host owns the handle; the
/// pipeline only borrows it for the duration of a burst.
#[async_trait]
pub trait CaptureDeviceProvider: Send + Sync {
    /// Open the camera with the given facing
    ///
    /// # Returns
    /// - Some(device) if a camera was opened
    /// - None if the camera is in use or does not exist
    async fn open(&self, facing: Facing) -> Option<Arc<dyn CaptureDevice>>;
}

/// Capability: Still Capture
///
/// # Contract
/// - `capture_once()` delivers exactly one encoded (JPEG) frame or an error
/// - Callers never issue a second `capture_once()` before the first resolves
/// - Live preview stops while a still is taken; `resume_preview()` restarts it
/// - After `release()` the handle must not be used again
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Which way this camera faces
    fn facing(&self) -> Facing;

    /// Mounting angle of the sensor in degrees (0, 90, 180, 270)
    fn sensor_orientation(&self) -> u32;

    /// Preview sizes the device can stream
    fn supported_preview_sizes(&self) -> Vec<Resolution>;

    /// Still picture sizes the device can capture
    fn supported_picture_sizes(&self) -> Vec<Resolution>;

    /// Apply a complete parameter set
    async fn apply_parameters(&self, parameters: &CaptureParameters) -> Result<()>;

    /// Rotate the live preview by `degrees` clockwise
    ///
    /// # Default Implementation
    /// Does nothing; devices without a preview surface can ignore orientation.
    async fn set_display_orientation(&self, _degrees: u32) -> Result<()> {
        Ok(())
    }

    /// Capture one still frame
    ///
    /// # Returns
    /// - Ok(bytes) with the encoded image exactly as the device produced it
    /// - Err if the device reported a capture error
    async fn capture_once(&self) -> Result<Vec<u8>>;

    /// Restart live preview after a still capture
    async fn resume_preview(&self) -> Result<()>;

    /// Release the device for other users
    async fn release(&self) -> Result<()>;
}

/// Capability: Location Fixes
///
/// # Contract
/// - Fixes are best effort; a source may never produce one
/// - `start_updates()` asks for periodic fixes at roughly the requested interval
/// - Pushed fixes arrive on the receiver from `take_location_receiver()`
#[async_trait]
pub trait LocationSource: Send + Sync {
    /// Most recent fix the source knows about, if any
    async fn last_known_location(&self) -> Option<GeoCoordinate>;

    /// Begin delivering periodic fixes
    async fn start_updates(&self, request: &LocationRequest) -> Result<()>;

    /// Stop delivering periodic fixes
    async fn stop_updates(&self) -> Result<()>;

    /// Take the receiver for pushed fixes
    ///
    /// This can only be called once - subsequent calls return None.
    ///
    /// # Default Implementation
    /// Returns None (source only answers `last_known_location`).
    async fn take_location_receiver(
        &self,
    ) -> Option<tokio::sync::mpsc::Receiver<GeoCoordinate>> {
        None
    }
}
