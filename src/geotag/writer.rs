//! Writes GPS tags into a persisted JPEG.

use bytes::Bytes;
use exif::{Field, In, Tag, Value};
use img_parts::jpeg::{markers, Jpeg, JpegSegment};
use img_parts::ImageEXIF;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use super::dms::{ExifGpsRecord, Rational};
use crate::error::{BoxedSource, BurstResult, IoFailure, IoFailureKind};
use crate::location::GeoCoordinate;
use crate::storage::PersistedFrame;

const EXIF_PREFIX: &[u8] = b"Exif\0\0";

const REPLACED_TAGS: [Tag; 4] = [
    Tag::GPSLatitude,
    Tag::GPSLatitudeRef,
    Tag::GPSLongitude,
    Tag::GPSLongitudeRef,
];

/// Tags persisted frames with a coordinate.
///
/// Existing primary-image EXIF fields survive the rewrite; thumbnail fields do
/// not. The file on disk is only replaced once the new content is fully
/// written next to it.
#[derive(Debug, Default, Clone)]
pub struct GeoTagger;

impl GeoTagger {
    /// Create a tagger
    pub fn new() -> Self {
        Self
    }

    /// Tag one persisted frame
    pub async fn tag(
        &self,
        frame: &PersistedFrame,
        coordinate: GeoCoordinate,
    ) -> BurstResult<ExifGpsRecord> {
        self.tag_path(&frame.path, coordinate).await
    }

    /// Tag the JPEG at `path`
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn tag_path(
        &self,
        path: &Path,
        coordinate: GeoCoordinate,
    ) -> BurstResult<ExifGpsRecord> {
        let failed = |e: BoxedSource| IoFailure::new(IoFailureKind::MetadataWriteFailed, path, e);
        let record = ExifGpsRecord::from_coordinate(coordinate).map_err(|e| failed(e.into()))?;

        let original = tokio::fs::read(path).await.map_err(|e| failed(e.into()))?;
        let tagged = embed_gps(Bytes::from(original), &record).map_err(failed)?;

        let staging = staging_path(path);
        if let Err(e) = tokio::fs::write(&staging, &tagged).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(failed(e.into()).into());
        }
        if let Err(e) = tokio::fs::rename(&staging, path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(failed(e.into()).into());
        }

        info!(
            latitude = %record.latitude_attribute(),
            latitude_ref = %record.latitude_ref,
            longitude = %record.longitude_attribute(),
            longitude_ref = %record.longitude_ref,
            "Geotag written"
        );
        Ok(record)
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.geotag.tmp"))
}

/// Rebuild the EXIF block of `jpeg` with `record` merged in.
fn embed_gps(jpeg: Bytes, record: &ExifGpsRecord) -> Result<Vec<u8>, BoxedSource> {
    let mut jpeg = Jpeg::from_bytes(jpeg)?;
    if !jpeg.segments().iter().any(|s| s.marker() == markers::SOS) {
        return Err("JPEG contains no image scan".into());
    }

    let (existing, little_endian) = match jpeg.exif() {
        Some(raw) => {
            let parsed = exif::Reader::new().read_raw(raw.to_vec())?;
            let little_endian = parsed.little_endian();
            let kept: Vec<Field> = parsed
                .fields()
                .filter(|f| f.ifd_num == In::PRIMARY)
                .filter(|f| !REPLACED_TAGS.contains(&f.tag))
                .filter(|f| !matches!(f.value, Value::Unknown(..)))
                .cloned()
                .collect();
            (kept, little_endian)
        }
        None => (Vec::new(), false),
    };
    debug!(preserved = existing.len(), "Merging GPS fields into EXIF");

    let gps = gps_fields(record);
    let mut writer = exif::experimental::Writer::new();
    for field in existing.iter().chain(gps.iter()) {
        writer.push_field(field);
    }
    let mut encoded = Cursor::new(Vec::new());
    writer.write(&mut encoded, little_endian)?;

    replace_exif_segment(&mut jpeg, &encoded.into_inner());
    let mut out = Vec::new();
    jpeg.encoder().write_to(&mut out)?;
    Ok(out)
}

/// Drop any EXIF APP1 segment and insert `tiff` right after the JFIF header.
fn replace_exif_segment(jpeg: &mut Jpeg, tiff: &[u8]) {
    jpeg.set_exif(None);

    let mut contents = Vec::with_capacity(EXIF_PREFIX.len() + tiff.len());
    contents.extend_from_slice(EXIF_PREFIX);
    contents.extend_from_slice(tiff);
    let segment = JpegSegment::new_with_contents(markers::APP1, Bytes::from(contents));

    let segments = jpeg.segments_mut();
    let at = segments
        .iter()
        .take_while(|s| s.marker() == markers::APP0)
        .count();
    segments.insert(at, segment);
}

fn gps_fields(record: &ExifGpsRecord) -> [Field; 4] {
    [
        Field {
            tag: Tag::GPSLatitude,
            ifd_num: In::PRIMARY,
            value: rational_value(&record.latitude),
        },
        Field {
            tag: Tag::GPSLatitudeRef,
            ifd_num: In::PRIMARY,
            value: ascii_value(record.latitude_ref),
        },
        Field {
            tag: Tag::GPSLongitude,
            ifd_num: In::PRIMARY,
            value: rational_value(&record.longitude),
        },
        Field {
            tag: Tag::GPSLongitudeRef,
            ifd_num: In::PRIMARY,
            value: ascii_value(record.longitude_ref),
        },
    ]
}

fn rational_value(values: &[Rational; 3]) -> Value {
    Value::Rational(
        values
            .iter()
            .map(|r| exif::Rational {
                num: r.numerator,
                denom: r.denominator,
            })
            .collect(),
    )
}

fn ascii_value(reference: char) -> Value {
    Value::Ascii(vec![reference.to_string().into_bytes()])
}
