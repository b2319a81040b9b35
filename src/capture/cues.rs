//! Audible cues bracketing a burst.
//!
//! Cues are fire-and-forget. An implementation that cannot reach an audio
//! device simply stays quiet; nothing here can fail a burst.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Start/stop cues for a burst.
pub trait NotificationCues: Send + Sync {
    /// Played before the first capture request of a burst
    fn play_start(&self);

    /// Played after the last frame of a successful burst is persisted
    fn play_stop(&self);
}

/// Rings the terminal bell: once to start, twice to stop.
#[derive(Debug, Default)]
pub struct TerminalCues;

impl TerminalCues {
    fn ring(times: usize) {
        let mut stderr = std::io::stderr();
        let bells = "\x07".repeat(times);
        // no terminal is not an error
        let _ = stderr.write_all(bells.as_bytes());
        let _ = stderr.flush();
    }
}

impl NotificationCues for TerminalCues {
    fn play_start(&self) {
        debug!("Playing burst start cue");
        Self::ring(1);
    }

    fn play_stop(&self) {
        debug!("Playing burst stop cue");
        Self::ring(2);
    }
}

/// Cues disabled by configuration.
#[derive(Debug, Default)]
pub struct SilentCues;

impl NotificationCues for SilentCues {
    fn play_start(&self) {}

    fn play_stop(&self) {}
}

/// Which cue was played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    /// Burst start
    Start,
    /// Burst stop
    Stop,
}

/// Records cues in the order they were played.
///
/// Used by tests to check cue ordering against captures.
#[derive(Debug, Default)]
pub struct RecordingCues {
    played: Mutex<Vec<Cue>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingCues {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every cue played so far
    pub fn played(&self) -> Vec<Cue> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }

    /// Number of start cues
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of stop cues
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn push(&self, cue: Cue) {
        if let Ok(mut played) = self.played.lock() {
            played.push(cue);
        }
    }
}

impl NotificationCues for RecordingCues {
    fn play_start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.push(Cue::Start);
    }

    fn play_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.push(Cue::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_cues_keep_order() {
        let cues = RecordingCues::new();
        cues.play_start();
        cues.play_stop();
        cues.play_start();

        assert_eq!(cues.played(), vec![Cue::Start, Cue::Stop, Cue::Start]);
        assert_eq!(cues.start_count(), 2);
        assert_eq!(cues.stop_count(), 1);
    }

    #[test]
    fn terminal_cues_never_panic() {
        let cues = TerminalCues;
        cues.play_start();
        cues.play_stop();
    }
}
