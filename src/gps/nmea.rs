// src/gps/nmea.rs
//! NMEA sentence validation, parsing and encoding
//!
//! Only the sentences the badge asks the module for are decoded: GGA (fix
//! data), RMC (recommended minimum) and the PMTK001 command acknowledgement.
//! Everything else is reported as [`SentenceError::Unsupported`] so the
//! caller can drop it and read the next line.

use chrono::{Datelike, NaiveDate, NaiveTime};
use std::{fmt, str::FromStr};

use super::data::Fix;

/// Talker prefixes accepted in front of GGA/RMC
pub const TALKERS: &[&str] = &["GP", "GN", "GL", "GA", "GB", "BD", "QZ"];

/// Why a sentence was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentenceError {
    /// Line does not start with `$`
    MissingStart,
    /// No `*XX` trailer, or the trailer is not two hex digits
    MissingChecksum,
    /// Trailer does not match the XOR of the payload
    BadChecksum { expected: u8, found: u8 },
    /// Valid sentence of a type we do not decode
    Unsupported(String),
    /// A field could not be decoded
    Malformed(&'static str),
}

impl fmt::Display for SentenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentenceError::MissingStart => write!(f, "sentence does not start with '$'"),
            SentenceError::MissingChecksum => write!(f, "sentence has no checksum trailer"),
            SentenceError::BadChecksum { expected, found } => {
                write!(f, "checksum mismatch: computed {:02X}, trailer {:02X}", expected, found)
            }
            SentenceError::Unsupported(kind) => write!(f, "unsupported sentence type {}", kind),
            SentenceError::Malformed(field) => write!(f, "malformed {} field", field),
        }
    }
}

impl std::error::Error for SentenceError {}

/// GGA: time, position and fix quality
#[derive(Debug, Clone, PartialEq)]
pub struct Gga {
    pub time: Option<NaiveTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub quality: u8,
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub altitude: Option<f64>,
}

/// RMC: time, date, position, status and motion
#[derive(Debug, Clone, PartialEq)]
pub struct Rmc {
    pub time: Option<NaiveTime>,
    pub active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed_knots: Option<f64>,
    pub heading: Option<f64>,
    pub date: Option<NaiveDate>,
}

/// `$PMTK001,<command>,<flag>` acknowledgement from the module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub command: u16,
    pub flag: u8,
}

impl Ack {
    /// Flag 3 means the command was accepted and applied
    pub fn is_success(&self) -> bool {
        self.flag == 3
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sentence {
    Gga(Gga),
    Rmc(Rmc),
    Ack(Ack),
}

/// XOR of every byte of the payload (the text between `$` and `*`)
pub fn checksum(payload: &str) -> u8 {
    payload.bytes().fold(0, |acc, b| acc ^ b)
}

/// Wrap a payload as `$<payload>*<XX>` without a line ending
pub fn frame(payload: &str) -> String {
    format!("${}*{:02X}", payload, checksum(payload))
}

/// Check the `$...*XX` envelope and return the payload between the markers
pub fn verify_checksum(line: &str) -> Result<&str, SentenceError> {
    let body = line.strip_prefix('$').ok_or(SentenceError::MissingStart)?;
    let (payload, trailer) = body.rsplit_once('*').ok_or(SentenceError::MissingChecksum)?;

    if trailer.len() != 2 || !trailer.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SentenceError::MissingChecksum);
    }
    let found = u8::from_str_radix(trailer, 16).map_err(|_| SentenceError::MissingChecksum)?;
    let expected = checksum(payload);

    if expected != found {
        return Err(SentenceError::BadChecksum { expected, found });
    }
    if !payload.is_ascii() {
        return Err(SentenceError::Malformed("payload"));
    }
    Ok(payload)
}

/// Validate and decode a single sentence
pub fn parse_sentence(line: &str) -> Result<Sentence, SentenceError> {
    let payload = verify_checksum(line.trim())?;
    let mut parts = payload.split(',');
    let kind = parts.next().unwrap_or_default();
    let fields: Vec<&str> = parts.collect();

    if kind == "PMTK001" {
        return parse_ack(&fields).map(Sentence::Ack);
    }

    if kind.len() != 5 || !TALKERS.contains(&&kind[..2]) {
        return Err(SentenceError::Unsupported(kind.to_string()));
    }

    match &kind[2..] {
        "GGA" => parse_gga(&fields).map(Sentence::Gga),
        "RMC" => parse_rmc(&fields).map(Sentence::Rmc),
        _ => Err(SentenceError::Unsupported(kind.to_string())),
    }
}

/// Parse GGA (Global Positioning System Fix Data) fields
fn parse_gga(fields: &[&str]) -> Result<Gga, SentenceError> {
    if fields.len() < 9 {
        return Err(SentenceError::Malformed("field count"));
    }

    let time = parse_time(fields[0])?;
    let latitude = parse_coordinate(fields[1], fields[2], ('N', 'S'), "latitude")?;
    let longitude = parse_coordinate(fields[3], fields[4], ('E', 'W'), "longitude")?;
    let quality = parse_optional::<u8>(fields[5], "quality")?.unwrap_or(0);

    Ok(Gga {
        time,
        latitude,
        longitude,
        quality,
        satellites: parse_optional(fields[6], "satellites")?,
        hdop: parse_optional(fields[7], "hdop")?,
        altitude: parse_optional(fields[8], "altitude")?,
    })
}

/// Parse RMC (Recommended Minimum Course) fields
fn parse_rmc(fields: &[&str]) -> Result<Rmc, SentenceError> {
    if fields.len() < 9 {
        return Err(SentenceError::Malformed("field count"));
    }

    let active = match fields[1] {
        "A" => true,
        "V" | "" => false,
        _ => return Err(SentenceError::Malformed("status")),
    };

    Ok(Rmc {
        time: parse_time(fields[0])?,
        active,
        latitude: parse_coordinate(fields[2], fields[3], ('N', 'S'), "latitude")?,
        longitude: parse_coordinate(fields[4], fields[5], ('E', 'W'), "longitude")?,
        speed_knots: parse_optional(fields[6], "speed")?,
        heading: parse_optional(fields[7], "heading")?,
        date: parse_date(fields[8])?,
    })
}

fn parse_ack(fields: &[&str]) -> Result<Ack, SentenceError> {
    if fields.len() < 2 {
        return Err(SentenceError::Malformed("field count"));
    }
    let command = fields[0].parse().map_err(|_| SentenceError::Malformed("ack command"))?;
    let flag = fields[1].parse().map_err(|_| SentenceError::Malformed("ack flag"))?;
    Ok(Ack { command, flag })
}

fn parse_optional<T: FromStr>(value: &str, field: &'static str) -> Result<Option<T>, SentenceError> {
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| SentenceError::Malformed(field))
}

/// `ddmm.mmmm` / `dddmm.mmmm` plus hemisphere into signed decimal degrees
fn parse_coordinate(
    value: &str,
    hemisphere: &str,
    (positive, negative): (char, char),
    field: &'static str,
) -> Result<Option<f64>, SentenceError> {
    if value.is_empty() || hemisphere.is_empty() {
        return Ok(None);
    }
    if !value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return Err(SentenceError::Malformed(field));
    }

    let raw: f64 = value.parse().map_err(|_| SentenceError::Malformed(field))?;
    let degrees = (raw / 100.0).trunc();
    let minutes = raw - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(SentenceError::Malformed(field));
    }
    let decimal = degrees + minutes / 60.0;

    let mut chars = hemisphere.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c == positive => Ok(Some(decimal)),
        (Some(c), None) if c == negative => Ok(Some(-decimal)),
        _ => Err(SentenceError::Malformed(field)),
    }
}

/// `hhmmss` with an optional fractional second
fn parse_time(value: &str) -> Result<Option<NaiveTime>, SentenceError> {
    if value.is_empty() {
        return Ok(None);
    }
    let malformed = SentenceError::Malformed("time");

    if value.len() < 6 || !value[..6].bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed);
    }
    let hour: u32 = value[0..2].parse().map_err(|_| malformed.clone())?;
    let minute: u32 = value[2..4].parse().map_err(|_| malformed.clone())?;
    let second: u32 = value[4..6].parse().map_err(|_| malformed.clone())?;

    let milli = match &value[6..] {
        "" => 0,
        rest => {
            let digits = rest.strip_prefix('.').ok_or_else(|| malformed.clone())?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed);
            }
            // Keep millisecond precision, pad ".5" to 500
            let mut padded: String = digits.chars().take(3).collect();
            while padded.len() < 3 {
                padded.push('0');
            }
            padded.parse().map_err(|_| malformed.clone())?
        }
    };

    NaiveTime::from_hms_milli_opt(hour, minute, second, milli)
        .map(Some)
        .ok_or(malformed)
}

/// `ddmmyy`, years are taken as 20yy
fn parse_date(value: &str) -> Result<Option<NaiveDate>, SentenceError> {
    if value.is_empty() {
        return Ok(None);
    }
    let malformed = SentenceError::Malformed("date");

    if value.len() != 6 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed);
    }
    let day: u32 = value[0..2].parse().map_err(|_| malformed.clone())?;
    let month: u32 = value[2..4].parse().map_err(|_| malformed.clone())?;
    let year: i32 = value[4..6].parse().map_err(|_| malformed.clone())?;

    NaiveDate::from_ymd_opt(2000 + year, month, day)
        .map(Some)
        .ok_or(malformed)
}

/// Format signed degrees back to `(d)ddmm.mmmm` and a hemisphere letter
fn format_coordinate(value: Option<f64>, degree_digits: usize, (positive, negative): (char, char)) -> (String, String) {
    let Some(value) = value else {
        return (String::new(), String::new());
    };
    let hemisphere = if value < 0.0 { negative } else { positive };

    // Work in units of 1/10000 minute so rounding carries into the degrees
    let units = (value.abs() * 60.0 * 10_000.0).round() as u64;
    let degrees = units / 600_000;
    let minutes = units % 600_000;

    (
        format!(
            "{:0width$}{:02}.{:04}",
            degrees,
            minutes / 10_000,
            minutes % 10_000,
            width = degree_digits
        ),
        hemisphere.to_string(),
    )
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H%M%S%.3f").to_string()).unwrap_or_default()
}

fn format_optional(value: Option<f64>, decimals: usize) -> String {
    value.map(|v| format!("{:.*}", decimals, v)).unwrap_or_default()
}

impl Gga {
    /// Build a GGA from the fields of a fix
    pub fn from_fix(fix: &Fix) -> Self {
        Self {
            time: fix.time,
            latitude: fix.latitude,
            longitude: fix.longitude,
            quality: u8::from(fix.valid),
            satellites: fix.satellites,
            hdop: fix.hdop,
            altitude: fix.altitude,
        }
    }

    /// Encode as a checksummed sentence, e.g. `to_sentence("GN")`
    pub fn to_sentence(&self, talker: &str) -> String {
        let (lat, ns) = format_coordinate(self.latitude, 2, ('N', 'S'));
        let (lon, ew) = format_coordinate(self.longitude, 3, ('E', 'W'));
        let satellites = self.satellites.map(|s| format!("{:02}", s)).unwrap_or_default();

        frame(&format!(
            "{}GGA,{},{},{},{},{},{},{},{},{},M,,M,,",
            talker,
            format_time(self.time),
            lat,
            ns,
            lon,
            ew,
            self.quality,
            satellites,
            format_optional(self.hdop, 2),
            format_optional(self.altitude, 1),
        ))
    }
}

impl Rmc {
    /// Build an RMC from the fields of a fix
    pub fn from_fix(fix: &Fix) -> Self {
        Self {
            time: fix.time,
            active: fix.valid,
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed_knots: fix.speed_knots,
            heading: fix.heading,
            date: fix.date,
        }
    }

    /// Encode as a checksummed sentence, e.g. `to_sentence("GN")`
    pub fn to_sentence(&self, talker: &str) -> String {
        let (lat, ns) = format_coordinate(self.latitude, 2, ('N', 'S'));
        let (lon, ew) = format_coordinate(self.longitude, 3, ('E', 'W'));
        let date = self
            .date
            .map(|d| format!("{:02}{:02}{:02}", d.day(), d.month(), d.year() % 100))
            .unwrap_or_default();

        frame(&format!(
            "{}RMC,{},{},{},{},{},{},{},{},{},,",
            talker,
            format_time(self.time),
            if self.active { "A" } else { "V" },
            lat,
            ns,
            lon,
            ew,
            format_optional(self.speed_knots, 2),
            format_optional(self.heading, 2),
            date,
        ))
    }
}
