//! Subscriber setup for the `geoburst` binary.
//!
//! Events go to stderr so stdout stays free for the burst summary. `RUST_LOG`
//! wins over `application.log_level` when it parses.
//!
//! ```no_run
//! use geoburst::{config::AppConfig, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! logging::init_from_config(&AppConfig::load()?)?;
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

use crate::config::AppConfig;
use crate::error::{BurstError, BurstResult};
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// How events are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-line, colored
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Level and format the subscriber is built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: Level,
    /// Event rendering
    pub format: OutputFormat,
}

impl TracingConfig {
    /// Read `application.log_level` and `application.log_format`
    pub fn from_app_config(config: &AppConfig) -> BurstResult<Self> {
        Ok(Self {
            level: parse_log_level(&config.application.log_level)?,
            format: config.application.log_format,
        })
    }
}

/// Install the global subscriber described by `config`.
pub fn init_from_config(config: &AppConfig) -> BurstResult<()> {
    init(TracingConfig::from_app_config(config)?)
}

/// Install a global subscriber.
///
/// Returns `Ok(())` if one is already installed.
pub fn init(config: TracingConfig) -> BurstResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_lowercase()));

    let base = fmt::layer().with_writer(std::io::stderr);
    let layer = match config.format {
        OutputFormat::Pretty => base.pretty().with_filter(filter).boxed(),
        OutputFormat::Compact => base.compact().with_ansi(false).with_filter(filter).boxed(),
        OutputFormat::Json => base.json().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .or_else(|e| {
            if e.to_string().contains("global default trace dispatcher has already been set") {
                Ok(())
            } else {
                Err(BurstError::Configuration(format!(
                    "cannot install tracing subscriber: {e}"
                )))
            }
        })
}

fn parse_log_level(level: &str) -> BurstResult<Level> {
    level.parse::<Level>().map_err(|_| {
        BurstError::Configuration(format!(
            "unknown log level '{level}' (expected trace, debug, info, warn or error)"
        ))
    })
}
