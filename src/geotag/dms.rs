//! Decimal degrees to EXIF degree/minute/second rationals.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BurstError, BurstResult};
use crate::location::GeoCoordinate;

/// Denominator used for the seconds component
pub const SECONDS_DENOMINATOR: u32 = 10_000;

/// Maximum fractional digits kept in the seconds text
const SECONDS_PRECISION: usize = 5;

/// Unsigned EXIF rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    /// Numerator
    pub numerator: u32,
    /// Denominator
    pub denominator: u32,
}

impl Rational {
    /// Create a rational
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Value as a float. A zero denominator yields NaN.
    pub fn to_f64(self) -> f64 {
        if self.denominator == 0 {
            return f64::NAN;
        }
        f64::from(self.numerator) / f64::from(self.denominator)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Parsed sexagesimal angle. Degrees are stored without sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    /// Whole degrees (absolute value)
    pub degrees: u32,
    /// Whole minutes
    pub minutes: u32,
    /// Seconds with fraction
    pub seconds: f64,
}

impl Dms {
    /// `[deg/1, min/1, round(sec * 10000)/10000]`
    pub fn to_rationals(&self) -> [Rational; 3] {
        let seconds = (self.seconds * f64::from(SECONDS_DENOMINATOR)).round();
        [
            Rational::new(self.degrees, 1),
            Rational::new(self.minutes, 1),
            Rational::new(seconds as u32, SECONDS_DENOMINATOR),
        ]
    }
}

/// Format `value` as `D:M:S`.
///
/// Negative values carry a leading `-` on the degrees. Seconds keep at most
/// five fractional digits with trailing zeros removed, so `40.1106` becomes
/// `40:6:38.16`.
pub fn to_sexagesimal(value: f64) -> String {
    let mut out = String::new();
    let mut remaining = value;
    if remaining < 0.0 {
        out.push('-');
        remaining = -remaining;
    }

    let degrees = remaining.floor();
    remaining = (remaining - degrees) * 60.0;
    let minutes = remaining.floor();
    remaining = (remaining - minutes) * 60.0;

    let mut seconds = format!("{:.*}", SECONDS_PRECISION, remaining);
    if seconds.contains('.') {
        let trimmed = seconds.trim_end_matches('0').trim_end_matches('.').len();
        seconds.truncate(trimmed);
    }

    out.push_str(&format!("{}:{}:{}", degrees as u64, minutes as u64, seconds));
    out
}

/// Parse `D:M:S` text produced by [`to_sexagesimal`].
///
/// The sign of the degrees is dropped. `None` for anything else.
pub fn parse_sexagesimal(text: &str) -> Option<Dms> {
    let mut parts = text.split(':');
    let (Some(deg), Some(min), Some(sec), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let degrees = u32::try_from(deg.parse::<i64>().ok()?.unsigned_abs()).ok()?;
    let minutes = min.parse::<u32>().ok()?;
    let seconds = sec.parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    Some(Dms {
        degrees,
        minutes,
        seconds,
    })
}

/// The four EXIF GPS values written for one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExifGpsRecord {
    /// GPSLatitude
    pub latitude: [Rational; 3],
    /// GPSLatitudeRef, `N` or `S`
    pub latitude_ref: char,
    /// GPSLongitude
    pub longitude: [Rational; 3],
    /// GPSLongitudeRef, `E` or `W`
    pub longitude_ref: char,
}

impl ExifGpsRecord {
    /// Encode a coordinate.
    ///
    /// Zero latitude maps to `S` and zero longitude to `W`: only strictly
    /// positive values get `N`/`E`.
    pub fn from_coordinate(coordinate: GeoCoordinate) -> BurstResult<Self> {
        let unencodable = || BurstError::InvalidCoordinate {
            latitude: coordinate.latitude(),
            longitude: coordinate.longitude(),
        };
        let latitude = parse_sexagesimal(&to_sexagesimal(coordinate.latitude()))
            .ok_or_else(unencodable)?;
        let longitude = parse_sexagesimal(&to_sexagesimal(coordinate.longitude()))
            .ok_or_else(unencodable)?;

        Ok(Self {
            latitude: latitude.to_rationals(),
            latitude_ref: if coordinate.latitude() > 0.0 { 'N' } else { 'S' },
            longitude: longitude.to_rationals(),
            longitude_ref: if coordinate.longitude() > 0.0 { 'E' } else { 'W' },
        })
    }

    /// GPSLatitude in attribute form, e.g. `40/1,6/1,381600/10000`
    pub fn latitude_attribute(&self) -> String {
        join_rationals(&self.latitude)
    }

    /// GPSLongitude in attribute form
    pub fn longitude_attribute(&self) -> String {
        join_rationals(&self.longitude)
    }

    /// Signed decimal `(latitude, longitude)` this record encodes
    pub fn to_decimal(&self) -> (f64, f64) {
        let lat = dms_to_decimal(&self.latitude);
        let lon = dms_to_decimal(&self.longitude);
        (
            if self.latitude_ref == 'S' { -lat } else { lat },
            if self.longitude_ref == 'W' { -lon } else { lon },
        )
    }
}

fn join_rationals(values: &[Rational; 3]) -> String {
    values
        .iter()
        .map(Rational::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// `deg + min/60 + sec/3600`
pub fn dms_to_decimal(values: &[Rational; 3]) -> f64 {
    values[0].to_f64() + values[1].to_f64() / 60.0 + values[2].to_f64() / 3600.0
}
