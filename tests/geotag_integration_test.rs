//! Integration tests for writing GPS tags into real JPEG files
//!
//! Frames are encoded with the `image` crate and read back with the `exif`
//! reader, so these tests check the bytes on disk rather than our own view of
//! them.

use bytes::Bytes;
use exif::{Field, In, Reader, Tag, Value};
use geoburst::error::IoFailureKind;
use geoburst::geotag::GeoTagger;
use geoburst::location::GeoCoordinate;
use geoburst::storage::PersistedFrame;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::ImageEXIF;
use std::io::Cursor;
use std::path::Path;

fn jpeg_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Jpeg)
        .unwrap();
    out.into_inner()
}

fn read_exif(path: &Path) -> exif::Exif {
    let bytes = std::fs::read(path).unwrap();
    Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .unwrap()
}

fn rationals(exif: &exif::Exif, tag: Tag) -> Vec<(u32, u32)> {
    match &exif.get_field(tag, In::PRIMARY).unwrap().value {
        Value::Rational(v) => v.iter().map(|r| (r.num, r.denom)).collect(),
        other => panic!("unexpected value for {tag}: {other:?}"),
    }
}

fn ascii(exif: &exif::Exif, tag: Tag) -> String {
    match &exif.get_field(tag, In::PRIMARY).unwrap().value {
        Value::Ascii(v) => String::from_utf8(v[0].clone()).unwrap(),
        other => panic!("unexpected value for {tag}: {other:?}"),
    }
}

fn frame_at(path: &Path) -> PersistedFrame {
    PersistedFrame {
        path: path.to_path_buf(),
        sequence_index: 0,
    }
}

#[tokio::test]
async fn test_tag_writes_gps_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("IMG_20150630_140509_0.jpg");
    std::fs::write(&path, jpeg_bytes()).unwrap();

    let here = GeoCoordinate::new(40.1106, -88.2073).unwrap();
    let record = GeoTagger::new().tag(&frame_at(&path), here).await.unwrap();

    let exif = read_exif(&path);
    assert_eq!(
        rationals(&exif, Tag::GPSLatitude),
        vec![(40, 1), (6, 1), (381_600, 10_000)]
    );
    assert_eq!(
        rationals(&exif, Tag::GPSLongitude),
        vec![(88, 1), (12, 1), (262_800, 10_000)]
    );
    assert_eq!(ascii(&exif, Tag::GPSLatitudeRef), "N");
    assert_eq!(ascii(&exif, Tag::GPSLongitudeRef), "W");
    assert_eq!(record.latitude_attribute(), "40/1,6/1,381600/10000");
}

#[tokio::test]
async fn test_tag_keeps_image_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.jpg");
    let original = jpeg_bytes();
    std::fs::write(&path, &original).unwrap();

    GeoTagger::new()
        .tag_path(&path, GeoCoordinate::new(-33.8688, 151.2093).unwrap())
        .await
        .unwrap();

    let before = image::load_from_memory(&original).unwrap().to_rgb8();
    let after = image::open(&path).unwrap().to_rgb8();
    assert_eq!(before, after);

    let exif = read_exif(&path);
    assert_eq!(ascii(&exif, Tag::GPSLatitudeRef), "S");
    assert_eq!(ascii(&exif, Tag::GPSLongitudeRef), "E");
}

#[tokio::test]
async fn test_retag_replaces_previous_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.jpg");
    std::fs::write(&path, jpeg_bytes()).unwrap();
    let tagger = GeoTagger::new();

    tagger
        .tag_path(&path, GeoCoordinate::new(10.0, 20.0).unwrap())
        .await
        .unwrap();
    tagger
        .tag_path(&path, GeoCoordinate::new(0.0, 0.0).unwrap())
        .await
        .unwrap();

    let exif = read_exif(&path);
    assert_eq!(
        rationals(&exif, Tag::GPSLatitude),
        vec![(0, 1), (0, 1), (0, 10_000)]
    );
    assert_eq!(ascii(&exif, Tag::GPSLatitudeRef), "S");
    assert_eq!(ascii(&exif, Tag::GPSLongitudeRef), "W");
    let latitude_fields = exif
        .fields()
        .filter(|f| f.tag == Tag::GPSLatitude)
        .count();
    assert_eq!(latitude_fields, 1);
}

#[tokio::test]
async fn test_existing_exif_fields_survive() {
    let description = Field {
        tag: Tag::ImageDescription,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"kitchen scale".to_vec()]),
    };
    let mut writer = exif::experimental::Writer::new();
    writer.push_field(&description);
    let mut raw = Cursor::new(Vec::new());
    writer.write(&mut raw, false).unwrap();

    let mut jpeg = Jpeg::from_bytes(Bytes::from(jpeg_bytes())).unwrap();
    jpeg.set_exif(Some(Bytes::from(raw.into_inner())));
    let mut with_exif = Vec::new();
    jpeg.encoder().write_to(&mut with_exif).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("described.jpg");
    std::fs::write(&path, with_exif).unwrap();

    GeoTagger::new()
        .tag_path(&path, GeoCoordinate::new(51.5, -0.12).unwrap())
        .await
        .unwrap();

    let exif = read_exif(&path);
    assert_eq!(ascii(&exif, Tag::ImageDescription), "kitchen scale");
    assert_eq!(ascii(&exif, Tag::GPSLatitudeRef), "N");
    assert_eq!(ascii(&exif, Tag::GPSLongitudeRef), "W");
}

#[tokio::test]
async fn test_non_jpeg_fails_and_is_left_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.jpg");
    std::fs::write(&path, b"definitely not a jpeg").unwrap();

    let err = GeoTagger::new()
        .tag_path(&path, GeoCoordinate::new(1.0, 1.0).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.io_kind(), Some(IoFailureKind::MetadataWriteFailed));
    assert_eq!(std::fs::read(&path).unwrap(), b"definitely not a jpeg");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_jpeg_without_image_data_fails_and_is_left_intact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.jpg");
    let bare = [0xFF, 0xD8, 0xFF, 0xD9];
    std::fs::write(&path, bare).unwrap();

    let err = GeoTagger::new()
        .tag_path(&path, GeoCoordinate::new(1.0, 1.0).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.io_kind(), Some(IoFailureKind::MetadataWriteFailed));
    assert_eq!(std::fs::read(&path).unwrap(), bare);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_missing_file_is_metadata_failure() {
    let dir = tempfile::tempdir().unwrap();

    let err = GeoTagger::new()
        .tag_path(&dir.path().join("gone.jpg"), GeoCoordinate::new(1.0, 1.0).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.io_kind(), Some(IoFailureKind::MetadataWriteFailed));
}
