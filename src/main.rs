//! CLI Entry Point for geoburst
//!
//! Commands:
//! - `capture`: run one geotagged burst against the simulated camera
//! - `tag`: write GPS tags into an existing JPEG
//!
//! # Usage
//!
//! ```bash
//! geoburst capture --count 3 --frame sample.jpg --lat 40.1106 --lon -88.2073
//! geoburst tag IMG_20150630_140509_0.jpg --lat 40.1106 --lon -88.2073
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use geoburst::config::{AppConfig, DEFAULT_CONFIG_PATH};
use geoburst::geotag::GeoTagger;
use geoburst::hardware::mock::{MockCamera, MockCameraProvider, MockLocationSource};
use geoburst::location::GeoCoordinate;
use geoburst::logging::{self, OutputFormat};
use geoburst::CaptureController;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "geoburst")]
#[command(about = "Burst capture with GPS geotagging", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log output format (overrides application.log_format)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for OutputFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => OutputFormat::Pretty,
            LogFormatArg::Compact => OutputFormat::Compact,
            LogFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run one burst on the simulated camera and geotag the frames
    Capture {
        /// Frames to capture (overrides burst.target_count)
        #[arg(long)]
        count: Option<u32>,

        /// Output directory (overrides storage.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// JPEG replayed by the simulated camera for every frame
        #[arg(long)]
        frame: Option<PathBuf>,

        /// Simulated fix latitude
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Simulated fix longitude
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
    },

    /// Geotag an existing JPEG
    Tag {
        /// JPEG file to tag in place
        file: PathBuf,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.application.log_format = format.into();
    }
    logging::init_from_config(&config)?;

    match cli.command {
        Commands::Capture {
            count,
            output_dir,
            frame,
            lat,
            lon,
        } => {
            let options = CaptureOptions {
                count,
                output_dir,
                frame,
                fix: coordinate_from_args(lat, lon)?,
            };
            run_capture(config, options).await
        }
        Commands::Tag { file, lat, lon } => run_tag(file, GeoCoordinate::new(lat, lon)?).await,
    }
}

fn coordinate_from_args(lat: Option<f64>, lon: Option<f64>) -> Result<Option<GeoCoordinate>> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Some(GeoCoordinate::new(lat, lon)?)),
        (None, None) => Ok(None),
        _ => anyhow::bail!("--lat and --lon must be given together"),
    }
}

struct CaptureOptions {
    count: Option<u32>,
    output_dir: Option<PathBuf>,
    frame: Option<PathBuf>,
    fix: Option<GeoCoordinate>,
}

async fn run_capture(mut config: AppConfig, options: CaptureOptions) -> Result<()> {
    if let Some(count) = options.count {
        config.burst.target_count = count;
    }
    if options.output_dir.is_some() {
        config.storage.output_dir = options.output_dir;
    }
    config.validate()?;

    let mut camera = MockCamera::new().with_facing(config.burst.facing, 90);
    if let Some(frame) = &options.frame {
        let bytes = tokio::fs::read(frame)
            .await
            .with_context(|| format!("reading {}", frame.display()))?;
        camera = camera.with_frames(vec![bytes]);
    }
    let provider = Arc::new(MockCameraProvider::new(Arc::new(camera)));
    let source = Arc::new(match options.fix {
        Some(coordinate) => MockLocationSource::with_last_known(coordinate),
        None => MockLocationSource::new(),
    });

    let controller = CaptureController::from_config(config, provider, source);
    controller.connect_location().await;

    let result = controller.capture_burst().await;
    controller.shutdown().await;
    let summary = result?;

    for frame in summary.session.frames() {
        println!("{}", frame.path.display());
    }
    info!(
        frames = summary.session.completed_count(),
        tagged = summary.tagged.len(),
        tag_failures = summary.tag_failures,
        "Burst finished"
    );
    Ok(())
}

async fn run_tag(file: PathBuf, coordinate: GeoCoordinate) -> Result<()> {
    let record = GeoTagger::new().tag_path(&file, coordinate).await?;
    println!(
        "{} {}{} {}{}",
        file.display(),
        record.latitude_attribute(),
        record.latitude_ref,
        record.longitude_attribute(),
        record.longitude_ref
    );
    Ok(())
}
