//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults (`AppConfig::default()`)
//! 2. `config/geoburst.toml` (or an explicit path)
//! 3. Environment variables prefixed with `GEOBURST_`, nested keys separated by `__`
//!
//! # Example
//! ```no_run
//! use geoburst::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("Application: {}", config.application.name);
//! # Ok::<(), geoburst::error::BurstError>(())
//! ```

use crate::error::{BurstError, BurstResult};
use crate::hardware::Facing;
use crate::logging::OutputFormat;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of frames per burst
pub const DEFAULT_BURST_SIZE: u32 = 5;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/geoburst.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Burst sequencing settings
    #[serde(default)]
    pub burst: BurstConfig,
    /// Frame storage settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Location update settings
    #[serde(default)]
    pub location: LocationConfig,
    /// Audible cue settings
    #[serde(default)]
    pub cues: CueConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name, also the pictures subdirectory
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: OutputFormat,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "geoburst".to_string(),
            log_level: "info".to_string(),
            log_format: OutputFormat::default(),
        }
    }
}

/// Burst sequencing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurstConfig {
    /// Frames captured per burst
    #[serde(default = "default_target_count")]
    pub target_count: u32,
    /// Per-capture deadline in milliseconds (0 = wait indefinitely)
    #[serde(default)]
    pub capture_timeout_ms: u64,
    /// Which camera to open
    #[serde(default)]
    pub facing: Facing,
    /// Current display rotation in degrees (0, 90, 180, 270)
    #[serde(default)]
    pub display_rotation: u32,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            target_count: DEFAULT_BURST_SIZE,
            capture_timeout_ms: 0,
            facing: Facing::Back,
            display_rotation: 0,
        }
    }
}

impl BurstConfig {
    /// Per-capture timeout, if one is configured
    pub fn capture_timeout(&self) -> Option<Duration> {
        (self.capture_timeout_ms > 0).then(|| Duration::from_millis(self.capture_timeout_ms))
    }
}

/// Frame storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Output directory for frames. Defaults to `<pictures>/<application name>`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Location update configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Desired interval between location updates (inexact)
    #[serde(default = "default_update_interval")]
    pub update_interval_ms: u64,
    /// Fastest accepted interval between location updates
    #[serde(default = "default_fastest_update_interval")]
    pub fastest_update_interval_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval(),
            fastest_update_interval_ms: default_fastest_update_interval(),
        }
    }
}

/// Audible cue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueConfig {
    /// Whether start/stop cues are played at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for CueConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Default value functions
fn default_target_count() -> u32 {
    DEFAULT_BURST_SIZE
}

fn default_update_interval() -> u64 {
    20_000
}

fn default_fastest_update_interval() -> u64 {
    default_update_interval() / 2
}

fn default_enabled() -> bool {
    true
}

impl AppConfig {
    /// Load configuration from `config/geoburst.toml` and environment variables
    ///
    /// Environment variables override the file with prefix `GEOBURST_`.
    /// Example: `GEOBURST_APPLICATION__LOG_LEVEL=debug`
    pub fn load() -> BurstResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> BurstResult<Self> {
        let config: AppConfig = Self::figment(path.as_ref()).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GEOBURST_").split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> BurstResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(BurstError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.burst.target_count == 0 {
            return Err(BurstError::Configuration(
                "burst.target_count must be at least 1".to_string(),
            ));
        }

        if ![0, 90, 180, 270].contains(&self.burst.display_rotation) {
            return Err(BurstError::Configuration(format!(
                "Invalid display_rotation {}. Must be 0, 90, 180 or 270",
                self.burst.display_rotation
            )));
        }

        if self.location.fastest_update_interval_ms > self.location.update_interval_ms {
            return Err(BurstError::Configuration(format!(
                "location.fastest_update_interval_ms ({}) exceeds update_interval_ms ({})",
                self.location.fastest_update_interval_ms, self.location.update_interval_ms
            )));
        }

        Ok(())
    }

    /// Directory frames are written to
    ///
    /// Falls back to the current directory when the platform has no pictures directory.
    pub fn output_dir(&self) -> PathBuf {
        self.storage.output_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(&self.application.name)
        })
    }
}
