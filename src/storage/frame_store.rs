//! Writes captured frames to disk with deterministic names.
//!
//! File names follow `IMG_<yyyyMMdd_HHmmss>_<index>.jpg`. The timestamp is taken
//! when each frame is written, so frames of one burst can share a timestamp;
//! the sequence index keeps their names distinct.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{BurstResult, IoFailure, IoFailureKind};

/// Timestamp format used in frame file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of the wall-clock time used in file names.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// A frame that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersistedFrame {
    /// Location of the image file
    pub path: PathBuf,
    /// 0-based position within its burst
    pub sequence_index: u32,
}

/// Receives best-effort notifications about newly written files.
pub trait MediaIndex: Send + Sync {
    /// A new image file exists at `path`
    fn notify_new_file(&self, path: &Path);
}

/// Media index that only logs.
#[derive(Debug, Default)]
pub struct LoggingMediaIndex;

impl MediaIndex for LoggingMediaIndex {
    fn notify_new_file(&self, path: &Path) {
        debug!(path = %path.display(), "Media index refresh requested");
    }
}

/// Persists raw frame bytes under a single directory.
#[derive(Clone)]
pub struct FrameStore {
    directory: PathBuf,
    clock: Clock,
    media_index: Arc<dyn MediaIndex>,
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("directory", &self.directory)
            .finish()
    }
}

impl FrameStore {
    /// Create a store writing into `directory`, using local time for names
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            clock: Arc::new(|| Local::now().naive_local()),
            media_index: Arc::new(LoggingMediaIndex),
        }
    }

    /// Replace the clock used for file name timestamps
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the media index notified after each write
    pub fn with_media_index(mut self, media_index: Arc<dyn MediaIndex>) -> Self {
        self.media_index = media_index;
        self
    }

    /// File name for a frame written at `timestamp`
    pub fn file_name(timestamp: NaiveDateTime, sequence_index: u32) -> String {
        format!(
            "IMG_{}_{}.jpg",
            timestamp.format(TIMESTAMP_FORMAT),
            sequence_index
        )
    }

    /// Write `bytes` verbatim as frame `sequence_index`.
    ///
    /// The directory (and its parents) is created if missing. A failed write
    /// may leave an empty or partial file behind.
    pub async fn persist(&self, bytes: &[u8], sequence_index: u32) -> BurstResult<PersistedFrame> {
        if !tokio::fs::try_exists(&self.directory).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&self.directory)
                .await
                .map_err(|e| {
                    IoFailure::new(IoFailureKind::DirectoryCreateFailed, &self.directory, e)
                })?;
            debug!(directory = %self.directory.display(), "Created frame directory");
        }

        let path = self
            .directory
            .join(Self::file_name((self.clock)(), sequence_index));

        write_verbatim(&path, bytes)
            .await
            .map_err(|e| IoFailure::new(IoFailureKind::WriteFailed, &path, e))?;

        info!(
            path = %path.display(),
            sequence_index,
            bytes = bytes.len(),
            "Frame persisted"
        );
        self.media_index.notify_new_file(&path);

        Ok(PersistedFrame {
            path,
            sequence_index,
        })
    }
}

async fn write_verbatim(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
