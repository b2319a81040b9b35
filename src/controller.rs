//! Host-facing capture controller.
//!
//! Ties the pieces together the way a camera screen uses them: open the
//! device with the best parameters, run a burst, then geotag every frame with
//! the newest location fix. Geotagging is best effort; a frame that cannot be
//! tagged is reported in the summary and otherwise left alone.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::capture::cues::{NotificationCues, SilentCues, TerminalCues};
use crate::capture::parameters::{display_orientation, select_parameters};
use crate::capture::{BurstSequencer, BurstSession};
use crate::config::AppConfig;
use crate::error::{BurstError, BurstResult};
use crate::geotag::{ExifGpsRecord, GeoTagger};
use crate::hardware::{CaptureDevice, CaptureDeviceProvider, LocationSource};
use crate::location::{LocationFix, LocationRequest, LocationTracker};
use crate::storage::{FrameStore, PersistedFrame};

/// A frame and the GPS values written into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFrame {
    /// The frame on disk
    pub frame: PersistedFrame,
    /// What was written
    pub record: ExifGpsRecord,
}

/// Outcome of [`CaptureController::capture_burst`].
#[derive(Debug, Clone)]
pub struct BurstSummary {
    /// The finished session
    pub session: BurstSession,
    /// Frames that were geotagged
    pub tagged: Vec<TaggedFrame>,
    /// Frames that could not be geotagged
    pub tag_failures: usize,
    /// Fix used for tagging, if one was available
    pub location: Option<LocationFix>,
}

/// Owns the device handle and runs geotagged bursts.
pub struct CaptureController {
    config: AppConfig,
    provider: Arc<dyn CaptureDeviceProvider>,
    tracker: Arc<LocationTracker>,
    sequencer: BurstSequencer,
    tagger: GeoTagger,
    device: Mutex<Option<Arc<dyn CaptureDevice>>>,
}

impl CaptureController {
    /// Assemble a controller from explicit parts.
    ///
    /// `sequencer` should already be wired to `tracker` if location updates
    /// are to be paused during bursts.
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn CaptureDeviceProvider>,
        tracker: Arc<LocationTracker>,
        sequencer: BurstSequencer,
    ) -> Self {
        Self {
            config,
            provider,
            tracker,
            sequencer,
            tagger: GeoTagger::new(),
            device: Mutex::new(None),
        }
    }

    /// Build everything from configuration.
    pub fn from_config(
        config: AppConfig,
        provider: Arc<dyn CaptureDeviceProvider>,
        location: Arc<dyn LocationSource>,
    ) -> Self {
        let tracker = Arc::new(LocationTracker::new(
            location,
            LocationRequest::from(&config.location),
        ));
        let cues: Arc<dyn NotificationCues> = if config.cues.enabled {
            Arc::new(TerminalCues)
        } else {
            Arc::new(SilentCues)
        };
        let sequencer = BurstSequencer::new(FrameStore::new(config.output_dir()), cues)
            .with_location(Arc::clone(&tracker))
            .with_capture_timeout(config.burst.capture_timeout());

        Self::new(config, provider, tracker, sequencer)
    }

    /// Start location tracking
    pub async fn connect_location(&self) {
        self.tracker.connect().await;
    }

    /// Open and configure the device, reusing an open one.
    #[instrument(skip(self))]
    pub async fn open_device(&self) -> BurstResult<Arc<dyn CaptureDevice>> {
        let mut slot = self.device.lock().await;
        if let Some(device) = slot.as_ref() {
            return Ok(Arc::clone(device));
        }

        let facing = self.config.burst.facing;
        let device = self.provider.open(facing).await.ok_or_else(|| {
            BurstError::DeviceUnavailable(format!("no {facing} camera available"))
        })?;

        let parameters = select_parameters(
            &device.supported_preview_sizes(),
            &device.supported_picture_sizes(),
        );
        device
            .apply_parameters(&parameters)
            .await
            .map_err(|e| BurstError::DeviceUnavailable(format!("parameters rejected: {e}")))?;

        let orientation = display_orientation(
            facing,
            device.sensor_orientation(),
            self.config.burst.display_rotation,
        );
        if let Err(e) = device.set_display_orientation(orientation).await {
            warn!(error = %e, orientation, "Failed to set display orientation");
        }

        info!(
            preview = %parameters.preview_resolution,
            picture = %parameters.picture_resolution,
            orientation,
            "Capture device opened"
        );
        *slot = Some(Arc::clone(&device));
        Ok(device)
    }

    /// Release the device, if open
    pub async fn release_device(&self) {
        if let Some(device) = self.device.lock().await.take() {
            if let Err(e) = device.release().await {
                warn!(error = %e, "Failed to release capture device");
            }
            info!("Capture device released");
        }
    }

    /// Whether a device handle is currently held
    pub async fn is_device_open(&self) -> bool {
        self.device.lock().await.is_some()
    }

    /// Run one configured burst and geotag its frames.
    #[instrument(skip(self))]
    pub async fn capture_burst(&self) -> BurstResult<BurstSummary> {
        let device = self.open_device().await?;
        let session = self
            .sequencer
            .start(device.as_ref(), self.config.burst.target_count)
            .await?;

        let location = self.tracker.latest().await;
        let mut tagged = Vec::with_capacity(session.frames().len());
        let mut tag_failures = 0;

        match location {
            Some(fix) => {
                for frame in session.frames() {
                    match self.tagger.tag(frame, fix.coordinate).await {
                        Ok(record) => tagged.push(TaggedFrame {
                            frame: frame.clone(),
                            record,
                        }),
                        Err(e) => {
                            warn!(path = %frame.path.display(), error = %e, "Geotag failed");
                            tag_failures += 1;
                        }
                    }
                }
            }
            None => warn!(
                frames = session.frames().len(),
                "No location fix available; frames left untagged"
            ),
        }

        Ok(BurstSummary {
            session,
            tagged,
            tag_failures,
            location,
        })
    }

    /// Release the device and stop location updates
    pub async fn shutdown(&self) {
        self.release_device().await;
        self.tracker.stop_updates().await;
    }
}
