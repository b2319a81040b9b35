//! GPS geotagging of persisted frames.
//!
//! A decimal-degree [`GeoCoordinate`](crate::location::GeoCoordinate) is turned
//! into the sexagesimal text form, parsed back into degree/minute/second
//! rationals and written into the JPEG's EXIF block as the four GPS
//! latitude/longitude tags.

pub mod dms;
pub mod writer;

pub use dms::{parse_sexagesimal, to_sexagesimal, Dms, ExifGpsRecord, Rational};
pub use writer::GeoTagger;
