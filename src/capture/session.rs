//! Burst session state machine.
//!
//! A [`BurstSession`] is a plain value. Everything that happens during a burst
//! is an [`Event`] fed to [`BurstSession::on_event`], which updates the session
//! and returns the [`Effect`]s the driver must perform next. Nothing here
//! touches a device or the filesystem, so every transition can be exercised
//! with synthetic events.
//!
//! # State Machine
//!
//! ```text
//! Idle ──begin──> Capturing ──last frame persisted──> Complete
//!                    │
//!                    └──capture/persist failure, abandoned──> Failed
//!
//! Complete / Failed ──begin──> Capturing   (previous session discarded)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BurstError, BurstResult};
use crate::storage::PersistedFrame;

/// Lifecycle state of a burst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstState {
    /// No burst has been requested yet
    #[default]
    Idle,
    /// Captures are being issued
    Capturing,
    /// Every frame was persisted
    Complete,
    /// A capture or persist failed; the burst ended early
    Failed,
}

impl fmt::Display for BurstState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BurstState::Idle => write!(f, "Idle"),
            BurstState::Capturing => write!(f, "Capturing"),
            BurstState::Complete => write!(f, "Complete"),
            BurstState::Failed => write!(f, "Failed"),
        }
    }
}

impl BurstState {
    /// Check if the state allows starting a new burst.
    pub fn can_begin(&self) -> bool {
        !matches!(self, BurstState::Capturing)
    }
}

/// Something that happened at the device or storage boundary.
#[derive(Debug)]
pub enum Event {
    /// The device delivered a frame
    CaptureSucceeded(Vec<u8>),
    /// The device reported an error (or timed out)
    CaptureFailed(String),
    /// The store wrote the frame
    FramePersisted(PersistedFrame),
    /// The store could not write the frame
    PersistFailed(BurstError),
    /// The driver stopped before the burst finished
    Abandoned,
}

/// Work the driver must perform, in order.
#[derive(Debug)]
pub enum Effect {
    /// Pause location updates for the duration of the burst
    SuspendLocationUpdates,
    /// Enable or disable the host's capture control
    SetCaptureControl {
        /// New enabled state
        enabled: bool,
    },
    /// Play the burst start cue
    PlayStartCue,
    /// Ask the device for one frame
    IssueCapture,
    /// Write captured bytes to storage
    PersistFrame {
        /// Encoded frame
        bytes: Vec<u8>,
        /// 0-based position within the burst
        sequence_index: u32,
    },
    /// Restart live preview after a still
    ResumePreview,
    /// Play the burst stop cue
    PlayStopCue,
    /// Resume location updates so a fresh fix is available for tagging
    RequestLocationFix,
    /// Tell the host the burst completed
    ReportComplete,
    /// Tell the host the burst failed
    ReportFailure(BurstError),
}

/// Progress of one burst.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BurstSession {
    target_count: u32,
    completed_count: u32,
    state: BurstState,
    frames: Vec<PersistedFrame>,
}

impl BurstSession {
    /// A session that has not started
    pub fn idle() -> Self {
        Self::default()
    }

    /// Frames requested for this burst
    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    /// Frames persisted so far
    pub fn completed_count(&self) -> u32 {
        self.completed_count
    }

    /// Current lifecycle state
    pub fn state(&self) -> BurstState {
        self.state
    }

    /// Frames persisted so far, in capture order
    pub fn frames(&self) -> &[PersistedFrame] {
        &self.frames
    }

    /// Start a burst of `target` frames.
    ///
    /// Rejected with [`BurstError::AlreadyRunning`] while capturing, in which
    /// case the session is left exactly as it was. A terminal session is
    /// discarded and replaced.
    pub fn begin(&mut self, target: u32) -> BurstResult<Vec<Effect>> {
        if !self.state.can_begin() {
            return Err(BurstError::AlreadyRunning);
        }
        if target == 0 {
            return Err(BurstError::Configuration(
                "burst target must be at least 1".to_string(),
            ));
        }

        *self = BurstSession {
            target_count: target,
            completed_count: 0,
            state: BurstState::Capturing,
            frames: Vec::with_capacity(target as usize),
        };

        Ok(vec![
            Effect::SuspendLocationUpdates,
            Effect::SetCaptureControl { enabled: false },
            Effect::PlayStartCue,
            Effect::IssueCapture,
        ])
    }

    /// Apply an event and return the effects it causes.
    ///
    /// Events arriving outside `Capturing` are stale and produce nothing.
    pub fn on_event(&mut self, event: Event) -> Vec<Effect> {
        if self.state != BurstState::Capturing {
            return Vec::new();
        }

        match event {
            Event::CaptureSucceeded(bytes) => vec![Effect::PersistFrame {
                bytes,
                sequence_index: self.completed_count,
            }],
            Event::CaptureFailed(reason) => self.fail(BurstError::CaptureFailed(reason)),
            Event::PersistFailed(error) => self.fail(error),
            Event::Abandoned => self.fail(BurstError::CaptureFailed(
                "burst abandoned before completion".to_string(),
            )),
            Event::FramePersisted(frame) => {
                self.completed_count += 1;
                self.frames.push(frame);

                if self.completed_count < self.target_count {
                    vec![Effect::ResumePreview, Effect::IssueCapture]
                } else {
                    self.state = BurstState::Complete;
                    vec![
                        Effect::ResumePreview,
                        Effect::PlayStopCue,
                        Effect::SetCaptureControl { enabled: true },
                        Effect::RequestLocationFix,
                        Effect::ReportComplete,
                    ]
                }
            }
        }
    }

    fn fail(&mut self, error: BurstError) -> Vec<Effect> {
        self.state = BurstState::Failed;
        vec![
            Effect::ReportFailure(error),
            Effect::SetCaptureControl { enabled: true },
            Effect::RequestLocationFix,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn frame(index: u32) -> PersistedFrame {
        PersistedFrame {
            path: PathBuf::from(format!("IMG_20240101_120000_{index}.jpg")),
            sequence_index: index,
        }
    }

    fn captures(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::IssueCapture))
            .count()
    }

    #[test]
    fn begin_orders_start_cue_before_first_capture() {
        let mut session = BurstSession::idle();
        let effects = session.begin(5).unwrap();

        assert_eq!(session.state(), BurstState::Capturing);
        assert_eq!(session.completed_count(), 0);
        let cue = effects
            .iter()
            .position(|e| matches!(e, Effect::PlayStartCue))
            .unwrap();
        let capture = effects
            .iter()
            .position(|e| matches!(e, Effect::IssueCapture))
            .unwrap();
        assert!(cue < capture);
        assert!(matches!(
            effects[1],
            Effect::SetCaptureControl { enabled: false }
        ));
    }

    #[test]
    fn five_frames_complete_exactly_once() {
        let mut session = BurstSession::idle();
        session.begin(5).unwrap();
        let mut stop_cues = 0;
        let mut completions = 0;

        for index in 0..5 {
            assert_eq!(session.completed_count(), index);

            let effects = session.on_event(Event::CaptureSucceeded(vec![0xFF, 0xD8]));
            match effects.as_slice() {
                [Effect::PersistFrame { sequence_index, .. }] => {
                    assert_eq!(*sequence_index, index)
                }
                other => panic!("unexpected effects: {other:?}"),
            }

            let effects = session.on_event(Event::FramePersisted(frame(index)));
            stop_cues += effects
                .iter()
                .filter(|e| matches!(e, Effect::PlayStopCue))
                .count();
            completions += effects
                .iter()
                .filter(|e| matches!(e, Effect::ReportComplete))
                .count();

            if index < 4 {
                assert_eq!(captures(&effects), 1);
                assert_eq!(stop_cues, 0);
            } else {
                assert_eq!(captures(&effects), 0);
            }
        }

        assert_eq!(session.completed_count(), 5);
        assert_eq!(session.state(), BurstState::Complete);
        assert_eq!(stop_cues, 1);
        assert_eq!(completions, 1);
        assert_eq!(session.frames().len(), 5);
    }

    #[test]
    fn begin_while_capturing_is_rejected_without_change() {
        let mut session = BurstSession::idle();
        session.begin(5).unwrap();
        session.on_event(Event::CaptureSucceeded(vec![1]));
        session.on_event(Event::FramePersisted(frame(0)));
        let before = session.clone();

        let result = session.begin(5);

        assert!(matches!(result, Err(BurstError::AlreadyRunning)));
        assert_eq!(session, before);
        assert_eq!(session.completed_count(), 1);
        assert_eq!(session.state(), BurstState::Capturing);
    }

    #[test]
    fn capture_failure_at_each_position() {
        for k in 0..5 {
            let mut session = BurstSession::idle();
            session.begin(5).unwrap();
            for index in 0..k {
                session.on_event(Event::CaptureSucceeded(vec![1]));
                session.on_event(Event::FramePersisted(frame(index)));
            }

            let effects = session.on_event(Event::CaptureFailed("shutter jammed".into()));

            assert_eq!(session.state(), BurstState::Failed);
            assert_eq!(session.completed_count(), k);
            assert_eq!(captures(&effects), 0);
            assert!(!effects.iter().any(|e| matches!(e, Effect::PlayStopCue)));
            assert!(matches!(
                effects[0],
                Effect::ReportFailure(BurstError::CaptureFailed(_))
            ));
            assert!(effects
                .iter()
                .any(|e| matches!(e, Effect::SetCaptureControl { enabled: true })));

            // later completions are stale
            assert!(session
                .on_event(Event::CaptureSucceeded(vec![1]))
                .is_empty());
            assert_eq!(session.completed_count(), k);
        }
    }

    #[test]
    fn persist_failure_fails_the_burst() {
        let mut session = BurstSession::idle();
        session.begin(5).unwrap();
        session.on_event(Event::CaptureSucceeded(vec![1]));

        let error = BurstError::from(crate::error::IoFailure::new(
            crate::error::IoFailureKind::WriteFailed,
            "IMG.jpg",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        ));
        let effects = session.on_event(Event::PersistFailed(error));

        assert_eq!(session.state(), BurstState::Failed);
        assert_eq!(session.completed_count(), 0);
        assert!(matches!(effects[0], Effect::ReportFailure(BurstError::Io(_))));
    }

    #[test]
    fn abandoned_burst_fails_and_restores_controls() {
        let mut session = BurstSession::idle();
        session.begin(3).unwrap();
        session.on_event(Event::CaptureSucceeded(vec![1]));
        session.on_event(Event::FramePersisted(frame(0)));

        let effects = session.on_event(Event::Abandoned);

        assert_eq!(session.state(), BurstState::Failed);
        assert_eq!(session.completed_count(), 1);
        assert!(matches!(
            effects.as_slice(),
            [
                Effect::ReportFailure(BurstError::CaptureFailed(_)),
                Effect::SetCaptureControl { enabled: true },
                Effect::RequestLocationFix,
            ]
        ));
        assert!(session.on_event(Event::Abandoned).is_empty());
        assert!(session.begin(1).is_ok());
    }

    #[test]
    fn terminal_sessions_can_begin_again() {
        let mut session = BurstSession::idle();
        session.begin(1).unwrap();
        session.on_event(Event::CaptureSucceeded(vec![1]));
        session.on_event(Event::FramePersisted(frame(0)));
        assert_eq!(session.state(), BurstState::Complete);

        session.begin(2).unwrap();
        assert_eq!(session.state(), BurstState::Capturing);
        assert_eq!(session.completed_count(), 0);
        assert_eq!(session.target_count(), 2);
        assert!(session.frames().is_empty());
    }

    #[test]
    fn zero_target_is_rejected() {
        let mut session = BurstSession::idle();
        assert!(matches!(
            session.begin(0),
            Err(BurstError::Configuration(_))
        ));
        assert_eq!(session.state(), BurstState::Idle);
    }

    #[test]
    fn idle_session_ignores_events() {
        let mut session = BurstSession::idle();
        assert!(session.on_event(Event::FramePersisted(frame(0))).is_empty());
        assert_eq!(session.completed_count(), 0);
    }
}
