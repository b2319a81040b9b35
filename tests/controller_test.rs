//! End-to-end tests for the capture controller with mock hardware
//!
//! A burst runs against `MockCamera`, frames land in a temp directory, and
//! geotags are read back from disk.

use exif::{In, Reader, Tag, Value};
use geoburst::capture::cues::SilentCues;
use geoburst::capture::parameters::{FocusMode, WhiteBalance};
use geoburst::capture::BurstSequencer;
use geoburst::config::AppConfig;
use geoburst::error::BurstError;
use geoburst::hardware::mock::{DeviceCall, MockCamera, MockCameraProvider, MockLocationSource};
use geoburst::hardware::{Facing, Resolution};
use geoburst::location::{GeoCoordinate, LocationRequest, LocationTracker};
use geoburst::storage::FrameStore;
use geoburst::CaptureController;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

fn jpeg_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(8, 8, Rgb([10, 120, 220]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

fn config_for(dir: &Path, frames: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.burst.target_count = frames;
    config.storage.output_dir = Some(dir.to_path_buf());
    config.cues.enabled = false;
    config
}

fn controller(
    config: AppConfig,
    camera: Arc<MockCamera>,
    source: Arc<MockLocationSource>,
) -> CaptureController {
    let tracker = Arc::new(LocationTracker::new(source, LocationRequest::default()));
    let sequencer = BurstSequencer::new(FrameStore::new(config.output_dir()), Arc::new(SilentCues))
        .with_location(Arc::clone(&tracker));
    CaptureController::new(
        config,
        Arc::new(MockCameraProvider::new(camera)),
        tracker,
        sequencer,
    )
}

#[tokio::test]
async fn test_burst_is_geotagged_with_latest_fix() {
    let dir = tempfile::tempdir().unwrap();
    let here = GeoCoordinate::new(40.1106, -88.2073).unwrap();
    let camera = Arc::new(MockCamera::new().with_frames(vec![jpeg_bytes()]));
    let controller = controller(
        config_for(dir.path(), 3),
        camera,
        Arc::new(MockLocationSource::with_last_known(here)),
    );
    controller.connect_location().await;

    let summary = controller.capture_burst().await.unwrap();

    assert_eq!(summary.session.completed_count(), 3);
    assert_eq!(summary.tagged.len(), 3);
    assert_eq!(summary.tag_failures, 0);
    assert_eq!(summary.location.map(|fix| fix.coordinate), Some(here));

    for tagged in &summary.tagged {
        let bytes = std::fs::read(&tagged.frame.path).unwrap();
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .unwrap();
        let field = exif.get_field(Tag::GPSLongitudeRef, In::PRIMARY).unwrap();
        assert!(matches!(&field.value, Value::Ascii(v) if v[0] == b"W"));
    }
}

#[tokio::test]
async fn test_without_fix_frames_stay_untagged() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller(
        config_for(dir.path(), 2),
        Arc::new(MockCamera::new()),
        Arc::new(MockLocationSource::new()),
    );
    controller.connect_location().await;

    let summary = controller.capture_burst().await.unwrap();

    assert_eq!(summary.session.completed_count(), 2);
    assert!(summary.tagged.is_empty());
    assert_eq!(summary.tag_failures, 0);
    assert!(summary.location.is_none());
}

#[tokio::test]
async fn test_geotag_failures_do_not_fail_burst() {
    let dir = tempfile::tempdir().unwrap();
    let here = GeoCoordinate::new(1.0, 1.0).unwrap();
    // default mock frames are not decodable JPEGs
    let camera = Arc::new(MockCamera::new());
    let controller = controller(
        config_for(dir.path(), 2),
        camera,
        Arc::new(MockLocationSource::with_last_known(here)),
    );
    controller.connect_location().await;

    let summary = controller.capture_burst().await.unwrap();

    assert_eq!(summary.tag_failures, 2);
    for (i, frame) in summary.session.frames().iter().enumerate() {
        assert_eq!(
            std::fs::read(&frame.path).unwrap(),
            MockCamera::default_frame(i as u32)
        );
    }
}

#[tokio::test]
async fn test_open_device_applies_best_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let camera = Arc::new(
        MockCamera::new()
            .with_facing(Facing::Back, 90)
            .with_sizes(
                vec![Resolution::new(1280, 720), Resolution::new(1920, 1080)],
                vec![Resolution::new(4000, 3000), Resolution::new(3000, 4000)],
            ),
    );
    let mut config = config_for(dir.path(), 1);
    config.burst.display_rotation = 90;
    let controller = controller(config, camera.clone(), Arc::new(MockLocationSource::new()));

    controller.open_device().await.unwrap();

    let params = camera.applied_parameters().await.unwrap();
    assert_eq!(params.preview_resolution, Resolution::new(1920, 1080));
    assert_eq!(params.picture_resolution, Resolution::new(4000, 3000));
    assert_eq!(params.jpeg_quality, 100);
    assert_eq!(params.focus_mode, FocusMode::Macro);
    assert_eq!(params.white_balance, WhiteBalance::Fluorescent);
    assert_eq!(params.iso, "100");
    assert!(camera.calls().contains(&DeviceCall::DisplayOrientation(0)));
}

#[tokio::test]
async fn test_open_device_is_reused_until_released() {
    let dir = tempfile::tempdir().unwrap();
    let camera = Arc::new(MockCamera::new());
    let provider = Arc::new(MockCameraProvider::new(camera.clone()));
    let config = config_for(dir.path(), 1);
    let tracker = Arc::new(LocationTracker::new(
        Arc::new(MockLocationSource::new()),
        LocationRequest::default(),
    ));
    let sequencer = BurstSequencer::new(FrameStore::new(dir.path()), Arc::new(SilentCues));
    let controller = CaptureController::new(config, provider.clone(), tracker, sequencer);

    controller.open_device().await.unwrap();
    controller.open_device().await.unwrap();
    assert_eq!(provider.open_count(), 1);

    controller.release_device().await;
    assert!(camera.is_released());
    assert!(!controller.is_device_open().await);

    controller.capture_burst().await.unwrap();
    assert_eq!(provider.open_count(), 2);
}

#[tokio::test]
async fn test_unavailable_device() {
    let dir = tempfile::tempdir().unwrap();
    let controller = CaptureController::from_config(
        config_for(dir.path(), 1),
        Arc::new(MockCameraProvider::unavailable()),
        Arc::new(MockLocationSource::new()),
    );

    let err = controller.capture_burst().await.unwrap_err();

    assert!(matches!(err, BurstError::DeviceUnavailable(_)));
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}
