//! Async driver for [`BurstSession`].
//!
//! The sequencer owns the session, feeds it events from the device and the
//! frame store, and performs the effects it returns. Captures are issued one
//! at a time; the next one is only requested after the previous frame has
//! been persisted.
//!
//! If the future returned by [`BurstSequencer::start`] is dropped mid-burst
//! the session is marked failed on the spot and the location tracker is
//! resumed on the current runtime, so the next `start` is accepted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::cues::NotificationCues;
use super::session::{BurstSession, Effect, Event};
use crate::error::{BurstError, BurstResult};
use crate::hardware::CaptureDevice;
use crate::location::LocationTracker;
use crate::storage::FrameStore;

/// Host-side notifications about a burst.
///
/// All methods default to doing nothing.
pub trait BurstObserver: Send + Sync {
    /// The capture control should be enabled or disabled
    fn on_capture_control(&self, _enabled: bool) {}

    /// Every frame of the burst was persisted
    fn on_burst_complete(&self, _session: &BurstSession) {}

    /// The burst ended early; `completed` frames were persisted before the error
    fn on_burst_failed(&self, _error: &BurstError, _completed: u32) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl BurstObserver for NoopObserver {}

/// Notification received by a [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Capture control toggled
    CaptureControl(bool),
    /// Burst completed with this many frames
    Complete(u32),
    /// Burst failed with this message after this many frames
    Failed(String, u32),
}

/// Observer that keeps every notification, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications so far, in order
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    fn push(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}

impl BurstObserver for RecordingObserver {
    fn on_capture_control(&self, enabled: bool) {
        self.push(Notification::CaptureControl(enabled));
    }

    fn on_burst_complete(&self, session: &BurstSession) {
        self.push(Notification::Complete(session.completed_count()));
    }

    fn on_burst_failed(&self, error: &BurstError, completed: u32) {
        self.push(Notification::Failed(error.to_string(), completed));
    }
}

/// Runs bursts against a borrowed [`CaptureDevice`].
pub struct BurstSequencer {
    store: FrameStore,
    cues: Arc<dyn NotificationCues>,
    observer: Arc<dyn BurstObserver>,
    location: Option<Arc<LocationTracker>>,
    capture_timeout: Option<Duration>,
    session: Mutex<BurstSession>,
}

impl BurstSequencer {
    /// Create a sequencer persisting into `store`
    pub fn new(store: FrameStore, cues: Arc<dyn NotificationCues>) -> Self {
        Self {
            store,
            cues,
            observer: Arc::new(NoopObserver),
            location: None,
            capture_timeout: None,
            session: Mutex::new(BurstSession::idle()),
        }
    }

    /// Send host notifications to `observer`
    pub fn with_observer(mut self, observer: Arc<dyn BurstObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Suspend `tracker` during bursts and resume it afterwards
    pub fn with_location(mut self, tracker: Arc<LocationTracker>) -> Self {
        self.location = Some(tracker);
        self
    }

    /// Fail a capture that takes longer than `timeout`
    pub fn with_capture_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.capture_timeout = timeout;
        self
    }

    /// Snapshot of the current (or last) session
    pub fn session(&self) -> BurstSession {
        self.lock_session().clone()
    }

    /// Run a burst of `target` frames to completion.
    ///
    /// Returns the finished session on success. A capture or persist failure
    /// is reported to the observer and then returned; frames already written
    /// stay on disk. Starting while another burst is capturing returns
    /// [`BurstError::AlreadyRunning`] without disturbing it.
    #[instrument(skip(self, device), fields(facing = %device.facing()))]
    pub async fn start(&self, device: &dyn CaptureDevice, target: u32) -> BurstResult<BurstSession> {
        let effects = self.lock_session().begin(target)?;
        let _in_flight = InFlight(self);
        info!(frames = target, "Burst started");

        let mut pending: VecDeque<Effect> = effects.into();
        let mut failure = None;

        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::SuspendLocationUpdates => {
                    if let Some(tracker) = &self.location {
                        tracker.stop_updates().await;
                    }
                }
                Effect::SetCaptureControl { enabled } => {
                    self.observer.on_capture_control(enabled);
                }
                Effect::PlayStartCue => self.cues.play_start(),
                Effect::PlayStopCue => self.cues.play_stop(),
                Effect::IssueCapture => {
                    let event = self.capture(device).await;
                    pending.extend(self.apply(event));
                }
                Effect::PersistFrame {
                    bytes,
                    sequence_index,
                } => {
                    let event = match self.store.persist(&bytes, sequence_index).await {
                        Ok(frame) => Event::FramePersisted(frame),
                        Err(e) => Event::PersistFailed(e),
                    };
                    pending.extend(self.apply(event));
                }
                Effect::ResumePreview => {
                    if let Err(e) = device.resume_preview().await {
                        warn!(error = %e, "Failed to resume preview");
                    }
                }
                Effect::RequestLocationFix => {
                    if let Some(tracker) = &self.location {
                        tracker.start_updates().await;
                    }
                }
                Effect::ReportComplete => {
                    let session = self.session();
                    info!(frames = session.completed_count(), "Burst complete");
                    self.observer.on_burst_complete(&session);
                }
                Effect::ReportFailure(error) => {
                    self.report_failure(&error);
                    failure = Some(error);
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(self.session()),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, BurstSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, event: Event) -> Vec<Effect> {
        self.lock_session().on_event(event)
    }

    fn report_failure(&self, error: &BurstError) {
        let completed = self.lock_session().completed_count();
        warn!(error = %error, completed, "Burst failed");
        self.observer.on_burst_failed(error, completed);
    }

    /// Fail a burst whose driver went away. No-op unless still capturing.
    fn abandon(&self) {
        let effects = self.lock_session().on_event(Event::Abandoned);

        for effect in effects {
            match effect {
                Effect::ReportFailure(error) => self.report_failure(&error),
                Effect::SetCaptureControl { enabled } => {
                    self.observer.on_capture_control(enabled);
                }
                Effect::RequestLocationFix => {
                    let Some(tracker) = &self.location else {
                        continue;
                    };
                    match tokio::runtime::Handle::try_current() {
                        Ok(handle) => {
                            let tracker = Arc::clone(tracker);
                            handle.spawn(async move { tracker.start_updates().await });
                        }
                        Err(_) => warn!("No runtime left to resume location updates"),
                    }
                }
                other => debug!(effect = ?other, "Dropping effect of abandoned burst"),
            }
        }
    }

    async fn capture(&self, device: &dyn CaptureDevice) -> Event {
        let completed = self.lock_session().completed_count();
        debug!(sequence_index = completed, "Issuing capture");

        let result = match self.capture_timeout {
            Some(limit) => match tokio::time::timeout(limit, device.capture_once()).await {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("no frame within {} ms", limit.as_millis())),
            },
            None => device.capture_once().await,
        };

        match result {
            Ok(bytes) => {
                debug!(sequence_index = completed, bytes = bytes.len(), "Frame captured");
                Event::CaptureSucceeded(bytes)
            }
            Err(e) => Event::CaptureFailed(e.to_string()),
        }
    }
}

/// Fails the session if `start` is dropped before the effect loop drains.
struct InFlight<'a>(&'a BurstSequencer);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.abandon();
    }
}
