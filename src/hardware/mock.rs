//! Mock Hardware Implementations
//!
//! Provides simulated devices for exercising the capture pipeline without a
//! camera or GPS receiver. All mocks use async-safe operations
//! (tokio::time::sleep, not std::thread::sleep).
//!
//! # Available Mocks
//!
//! - `MockCamera` - Simulated still camera with scripted frames and failures
//! - `MockCameraProvider` - Hands out a `MockCamera` (or nothing)
//! - `MockLocationSource` - Location source with a last-known fix and a push channel
//!
//! Every mock records what was asked of it so tests can assert on ordering and
//! concurrency, not just on results.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{sleep, Duration};

use crate::capture::parameters::CaptureParameters;
use crate::hardware::capabilities::{CaptureDevice, CaptureDeviceProvider, LocationSource};
use crate::hardware::{Facing, Resolution};
use crate::location::{GeoCoordinate, LocationRequest};

// =============================================================================
// MockCamera - Simulated Still Camera
// =============================================================================

/// Operation performed on a [`MockCamera`], in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    /// `apply_parameters`
    ApplyParameters,
    /// `set_display_orientation(degrees)`
    DisplayOrientation(u32),
    /// `capture_once` (0-based call number)
    Capture(u32),
    /// `resume_preview`
    ResumePreview,
    /// `release`
    Release,
}

/// Mock still camera
///
/// Each `capture_once()` returns the next scripted frame (cycling), optionally
/// after a delay. A capture number can be scripted to fail.
///
/// # Example
///
/// ```rust,ignore
/// let camera = MockCamera::new().fail_on_capture(2);
/// assert!(camera.capture_once().await.is_ok());
/// assert!(camera.capture_once().await.is_ok());
/// assert!(camera.capture_once().await.is_err());
/// ```
pub struct MockCamera {
    facing: Facing,
    sensor_orientation: u32,
    preview_sizes: Vec<Resolution>,
    picture_sizes: Vec<Resolution>,
    frames: Vec<Vec<u8>>,
    capture_delay: Duration,
    fail_on_capture: Option<u32>,
    fail_resume_preview: bool,
    captures: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    released: AtomicBool,
    applied: RwLock<Option<CaptureParameters>>,
    calls: Mutex<Vec<DeviceCall>>,
}

impl MockCamera {
    /// Back-facing camera with a handful of typical sizes
    pub fn new() -> Self {
        Self {
            facing: Facing::Back,
            sensor_orientation: 90,
            preview_sizes: vec![
                Resolution::new(640, 480),
                Resolution::new(1920, 1080),
                Resolution::new(1280, 720),
            ],
            picture_sizes: vec![
                Resolution::new(2048, 1536),
                Resolution::new(4032, 3024),
                Resolution::new(3264, 2448),
            ],
            frames: Vec::new(),
            capture_delay: Duration::ZERO,
            fail_on_capture: None,
            fail_resume_preview: false,
            captures: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            max_in_flight: AtomicU32::new(0),
            released: AtomicBool::new(false),
            applied: RwLock::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set facing and sensor mounting angle
    pub fn with_facing(mut self, facing: Facing, sensor_orientation: u32) -> Self {
        self.facing = facing;
        self.sensor_orientation = sensor_orientation;
        self
    }

    /// Replace the supported size lists
    pub fn with_sizes(mut self, preview: Vec<Resolution>, picture: Vec<Resolution>) -> Self {
        self.preview_sizes = preview;
        self.picture_sizes = picture;
        self
    }

    /// Frames returned by successive captures (cycled)
    pub fn with_frames(mut self, frames: Vec<Vec<u8>>) -> Self {
        self.frames = frames;
        self
    }

    /// Delay every capture by `delay`
    pub fn with_capture_delay(mut self, delay: Duration) -> Self {
        self.capture_delay = delay;
        self
    }

    /// Make the capture with 0-based number `n` fail
    pub fn fail_on_capture(mut self, n: u32) -> Self {
        self.fail_on_capture = Some(n);
        self
    }

    /// Make every `resume_preview()` fail
    pub fn fail_resume_preview(mut self) -> Self {
        self.fail_resume_preview = true;
        self
    }

    /// Bytes produced by capture number `n` when no frames are scripted
    pub fn default_frame(n: u32) -> Vec<u8> {
        let mut frame = vec![0xFF, 0xD8];
        frame.extend_from_slice(format!("mock-frame-{n}").as_bytes());
        frame.extend_from_slice(&[0xFF, 0xD9]);
        frame
    }

    /// Number of `capture_once()` calls so far
    pub fn capture_count(&self) -> u32 {
        self.captures.load(Ordering::SeqCst)
    }

    /// Highest number of captures that were outstanding at once
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Whether `release()` was called
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Parameters from the last `apply_parameters()`
    pub async fn applied_parameters(&self) -> Option<CaptureParameters> {
        self.applied.read().await.clone()
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn log(&self, call: DeviceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn frame(&self, n: u32) -> Vec<u8> {
        if self.frames.is_empty() {
            Self::default_frame(n)
        } else {
            self.frames[n as usize % self.frames.len()].clone()
        }
    }
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for MockCamera {
    fn facing(&self) -> Facing {
        self.facing
    }

    fn sensor_orientation(&self) -> u32 {
        self.sensor_orientation
    }

    fn supported_preview_sizes(&self) -> Vec<Resolution> {
        self.preview_sizes.clone()
    }

    fn supported_picture_sizes(&self) -> Vec<Resolution> {
        self.picture_sizes.clone()
    }

    async fn apply_parameters(&self, parameters: &CaptureParameters) -> Result<()> {
        self.log(DeviceCall::ApplyParameters);
        *self.applied.write().await = Some(parameters.clone());
        Ok(())
    }

    async fn set_display_orientation(&self, degrees: u32) -> Result<()> {
        self.log(DeviceCall::DisplayOrientation(degrees));
        Ok(())
    }

    async fn capture_once(&self) -> Result<Vec<u8>> {
        if self.is_released() {
            anyhow::bail!("MockCamera: capture after release");
        }

        let n = self.captures.fetch_add(1, Ordering::SeqCst);
        self.log(DeviceCall::Capture(n));
        let outstanding = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(outstanding, Ordering::SeqCst);

        if !self.capture_delay.is_zero() {
            sleep(self.capture_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on_capture == Some(n) {
            return Err(anyhow!("MockCamera: capture #{n} failed"));
        }
        Ok(self.frame(n))
    }

    async fn resume_preview(&self) -> Result<()> {
        self.log(DeviceCall::ResumePreview);
        if self.fail_resume_preview {
            anyhow::bail!("MockCamera: preview surface lost");
        }
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.log(DeviceCall::Release);
        self.released.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// MockCameraProvider
// =============================================================================

/// Provider that hands out one shared [`MockCamera`]
pub struct MockCameraProvider {
    camera: Option<Arc<MockCamera>>,
    opens: AtomicU32,
}

impl MockCameraProvider {
    /// Provider that always opens `camera`
    pub fn new(camera: Arc<MockCamera>) -> Self {
        Self {
            camera: Some(camera),
            opens: AtomicU32::new(0),
        }
    }

    /// Provider with no camera (in use or absent)
    pub fn unavailable() -> Self {
        Self {
            camera: None,
            opens: AtomicU32::new(0),
        }
    }

    /// Number of `open()` calls so far
    pub fn open_count(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDeviceProvider for MockCameraProvider {
    async fn open(&self, facing: Facing) -> Option<Arc<dyn CaptureDevice>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let camera = self.camera.as_ref()?;
        if camera.facing() != facing {
            return None;
        }
        camera.released.store(false, Ordering::SeqCst);
        Some(Arc::clone(camera) as Arc<dyn CaptureDevice>)
    }
}

// =============================================================================
// MockLocationSource
// =============================================================================

/// Location source driven by the test
///
/// `push()` delivers a fix through the receiver handed out by
/// `take_location_receiver()`.
pub struct MockLocationSource {
    last_known: Option<GeoCoordinate>,
    updating: AtomicBool,
    fail_start: bool,
    start_calls: AtomicU32,
    stop_calls: AtomicU32,
    sender: mpsc::Sender<GeoCoordinate>,
    receiver: tokio::sync::Mutex<Option<mpsc::Receiver<GeoCoordinate>>>,
}

impl MockLocationSource {
    /// Source with no last known fix
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel(16);
        Self {
            last_known: None,
            updating: AtomicBool::new(false),
            fail_start: false,
            start_calls: AtomicU32::new(0),
            stop_calls: AtomicU32::new(0),
            sender,
            receiver: tokio::sync::Mutex::new(Some(receiver)),
        }
    }

    /// Source whose last known fix is `coordinate`
    pub fn with_last_known(coordinate: GeoCoordinate) -> Self {
        Self {
            last_known: Some(coordinate),
            ..Self::new()
        }
    }

    /// Make `start_updates()` fail
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Deliver a fix to the listener
    pub async fn push(&self, coordinate: GeoCoordinate) {
        // no listener means nobody cares about the fix
        let _ = self.sender.send(coordinate).await;
    }

    /// Whether periodic updates are currently requested
    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst)
    }

    /// Number of `start_updates()` calls
    pub fn start_calls(&self) -> u32 {
        self.start_calls.load(Ordering::SeqCst)
    }

    /// Number of `stop_updates()` calls
    pub fn stop_calls(&self) -> u32 {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockLocationSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationSource for MockLocationSource {
    async fn last_known_location(&self) -> Option<GeoCoordinate> {
        self.last_known
    }

    async fn start_updates(&self, _request: &LocationRequest) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            anyhow::bail!("MockLocationSource: provider disabled");
        }
        self.updating.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop_updates(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.updating.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn take_location_receiver(&self) -> Option<mpsc::Receiver<GeoCoordinate>> {
        self.receiver.lock().await.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_camera_cycles_scripted_frames() {
        let camera = MockCamera::new().with_frames(vec![vec![1], vec![2]]);

        assert_eq!(camera.capture_once().await.unwrap(), vec![1]);
        assert_eq!(camera.capture_once().await.unwrap(), vec![2]);
        assert_eq!(camera.capture_once().await.unwrap(), vec![1]);
        assert_eq!(camera.capture_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_camera_scripted_failure() {
        let camera = MockCamera::new().fail_on_capture(1);

        assert!(camera.capture_once().await.is_ok());
        assert!(camera.capture_once().await.is_err());
        assert!(camera.capture_once().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_camera_refuses_after_release() {
        let camera = MockCamera::new();
        camera.release().await.unwrap();

        assert!(camera.is_released());
        assert!(camera.capture_once().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_camera_records_calls() {
        let camera = MockCamera::new();
        camera.set_display_orientation(90).await.unwrap();
        camera.capture_once().await.unwrap();
        camera.resume_preview().await.unwrap();

        assert_eq!(
            camera.calls(),
            vec![
                DeviceCall::DisplayOrientation(90),
                DeviceCall::Capture(0),
                DeviceCall::ResumePreview,
            ]
        );
    }

    #[tokio::test]
    async fn test_provider_checks_facing() {
        let provider = MockCameraProvider::new(Arc::new(MockCamera::new()));

        assert!(provider.open(Facing::Back).await.is_some());
        assert!(provider.open(Facing::Front).await.is_none());
        assert!(MockCameraProvider::unavailable().open(Facing::Back).await.is_none());
        assert_eq!(provider.open_count(), 2);
    }

    #[tokio::test]
    async fn test_location_receiver_taken_once() {
        let source = MockLocationSource::new();

        assert!(source.take_location_receiver().await.is_some());
        assert!(source.take_location_receiver().await.is_none());
    }
}
