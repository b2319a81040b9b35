//! Location fixes and the tracker that caches them.
//!
//! The tracker mirrors how the capture screen consumes location: seed from the
//! last known fix when connecting, keep the newest pushed fix, and pause updates
//! while a burst is running so the location provider does not compete with the
//! camera.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::LocationConfig;
use crate::error::{BurstError, BurstResult};
use crate::hardware::LocationSource;

/// A WGS84 position in decimal degrees.
///
/// Deserializing goes through [`GeoCoordinate::new`], so out-of-range input is
/// rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for GeoCoordinate {
    type Error = BurstError;

    fn try_from(raw: RawCoordinate) -> BurstResult<Self> {
        GeoCoordinate::new(raw.latitude, raw.longitude)
    }
}

impl GeoCoordinate {
    /// Create a coordinate, rejecting values outside [-90, 90] x [-180, 180]
    pub fn new(latitude: f64, longitude: f64) -> BurstResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(BurstError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees, north positive
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees, east positive
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A coordinate plus the local time it was received.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    /// Reported position
    pub coordinate: GeoCoordinate,
    /// When the tracker recorded it
    pub received_at: DateTime<Local>,
}

/// Requested cadence for periodic location updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    /// Desired interval (inexact, updates may come faster or slower)
    pub interval: Duration,
    /// Updates never arrive faster than this
    pub fastest_interval: Duration,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self::from(&LocationConfig::default())
    }
}

impl From<&LocationConfig> for LocationRequest {
    fn from(config: &LocationConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.update_interval_ms),
            fastest_interval: Duration::from_millis(config.fastest_update_interval_ms),
        }
    }
}

/// Caches the newest fix from a [`LocationSource`].
///
/// Source errors are logged and swallowed: location is an enrichment, never a
/// reason to fail a capture.
pub struct LocationTracker {
    source: Arc<dyn LocationSource>,
    request: LocationRequest,
    latest: Arc<RwLock<Option<LocationFix>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl LocationTracker {
    /// Create a tracker over `source` using `request` for periodic updates
    pub fn new(source: Arc<dyn LocationSource>, request: LocationRequest) -> Self {
        Self {
            source,
            request,
            latest: Arc::new(RwLock::new(None)),
            listener: Mutex::new(None),
        }
    }

    /// Seed from the last known location (only if nothing is cached) and start updates
    pub async fn connect(&self) {
        if self.latest.read().await.is_none() {
            match self.source.last_known_location().await {
                Some(coordinate) => self.record(coordinate).await,
                None => debug!("No last known location available"),
            }
        }
        self.start_updates().await;
    }

    /// Ask the source for periodic fixes
    pub async fn start_updates(&self) {
        self.ensure_listener().await;
        if let Err(e) = self.source.start_updates(&self.request).await {
            warn!(error = %e, "Failed to start location updates");
        }
    }

    /// Stop periodic fixes; the cached fix is kept
    pub async fn stop_updates(&self) {
        if let Err(e) = self.source.stop_updates().await {
            warn!(error = %e, "Failed to stop location updates");
        }
    }

    /// Record a pushed fix as the newest one
    pub async fn record(&self, coordinate: GeoCoordinate) {
        record_into(&self.latest, coordinate).await;
    }

    /// Newest fix, if any has been seen
    pub async fn latest(&self) -> Option<LocationFix> {
        *self.latest.read().await
    }

    async fn ensure_listener(&self) {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return;
        }
        let Some(mut receiver) = self.source.take_location_receiver().await else {
            return;
        };

        let latest = Arc::clone(&self.latest);
        *listener = Some(tokio::spawn(async move {
            while let Some(coordinate) = receiver.recv().await {
                record_into(&latest, coordinate).await;
            }
            debug!("Location stream closed");
        }));
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        if let Ok(mut listener) = self.listener.try_lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

async fn record_into(latest: &RwLock<Option<LocationFix>>, coordinate: GeoCoordinate) {
    let fix = LocationFix {
        coordinate,
        received_at: Local::now(),
    };
    info!(
        latitude = coordinate.latitude(),
        longitude = coordinate.longitude(),
        time = %fix.received_at.format("%H:%M:%S"),
        "Location updated"
    );
    *latest.write().await = Some(fix);
}
