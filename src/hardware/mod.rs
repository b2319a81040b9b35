//! Hardware abstractions
//!
//! Capability traits for the collaborators the capture pipeline drives
//! ([`capabilities`]) and simulated implementations of each ([`mock`]).

pub mod capabilities;
pub mod mock;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use capabilities::{CaptureDevice, CaptureDeviceProvider, LocationSource};

/// Which way a camera faces relative to the display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Faces away from the user
    #[default]
    Back,
    /// Faces the user, preview is mirrored
    Front,
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::Back => write!(f, "back"),
            Facing::Front => write!(f, "front"),
        }
    }
}

/// A frame size in pixels.
///
/// `Resolution::ZERO` stands for "no size was assigned", which is what an
/// empty capability list selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// The unassigned resolution `{0, 0}`
    pub const ZERO: Resolution = Resolution {
        width: 0,
        height: 0,
    };

    /// Create a resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count, the ordering key for size selection
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// True for the unassigned resolution
    pub fn is_zero(&self) -> bool {
        self.area() == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
