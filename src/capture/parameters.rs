//! Capture parameter selection.
//!
//! Parameters are computed once each time a device is opened and never mutated
//! afterwards. Size selection is the only device-dependent part; the rest is a
//! fixed profile tuned for close-up assay imaging.

use serde::{Deserialize, Serialize};

use crate::hardware::{Facing, Resolution};

/// JPEG quality applied to every capture
pub const JPEG_QUALITY: u8 = 100;

/// ISO applied to every capture
pub const ISO: &str = "100";

/// Lens focus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FocusMode {
    /// Close-up focus
    Macro,
    /// Continuous autofocus
    ContinuousPicture,
    /// Single-shot autofocus
    Auto,
    /// Fixed at infinity
    Infinity,
}

/// White balance preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhiteBalance {
    /// Fluorescent lighting
    Fluorescent,
    /// Device decides
    Auto,
    /// Tungsten lighting
    Incandescent,
    /// Direct sunlight
    Daylight,
}

/// The full parameter set applied to a device on open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureParameters {
    /// Live preview size
    pub preview_resolution: Resolution,
    /// Still picture size
    pub picture_resolution: Resolution,
    /// JPEG quality, 0..=100
    pub jpeg_quality: u8,
    /// Focus mode
    pub focus_mode: FocusMode,
    /// Exposure compensation steps
    pub exposure_compensation: i32,
    /// White balance preset
    pub white_balance: WhiteBalance,
    /// ISO as the device expects it
    pub iso: String,
}

/// Choose capture parameters from the sizes a device supports.
///
/// Each list is scanned independently for the largest area. Ties keep the
/// first candidate seen. An empty list selects [`Resolution::ZERO`] so the
/// device can still be opened with degraded parameters.
pub fn select_parameters(
    supported_preview_sizes: &[Resolution],
    supported_picture_sizes: &[Resolution],
) -> CaptureParameters {
    CaptureParameters {
        preview_resolution: largest_area(supported_preview_sizes),
        picture_resolution: largest_area(supported_picture_sizes),
        jpeg_quality: JPEG_QUALITY,
        focus_mode: FocusMode::Macro,
        exposure_compensation: 0,
        white_balance: WhiteBalance::Fluorescent,
        iso: ISO.to_string(),
    }
}

fn largest_area(sizes: &[Resolution]) -> Resolution {
    let mut best = Resolution::ZERO;
    for size in sizes {
        // strict: equal areas keep the earlier size
        if size.area() > best.area() {
            best = *size;
        }
    }
    best
}

/// Clockwise preview rotation for a camera given the current display rotation.
///
/// Front cameras are mirrored, so their rotation is compensated in the
/// opposite direction. `display_rotation` is one of 0, 90, 180, 270.
pub fn display_orientation(facing: Facing, sensor_orientation: u32, display_rotation: u32) -> u32 {
    let sensor = sensor_orientation % 360;
    let display = display_rotation % 360;
    match facing {
        Facing::Front => (360 - (sensor + display) % 360) % 360,
        Facing::Back => (sensor + 360 - display) % 360,
    }
}
