// src/display/layout.rs
//! Text shown on the badge, shared by every renderer

use crate::gps::Fix;

pub const INVALID_TEXT: &str = "GPS invalid";

/// Lines of a screen with a usable fix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixText {
    pub datetime: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub satellites: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Invalid,
    Fix(FixText),
}

impl Screen {
    pub fn for_fix(fix: &Fix) -> Self {
        match (fix.valid, fix.latitude, fix.longitude) {
            (true, Some(lat), Some(lon)) => Screen::Fix(FixText {
                datetime: format_datetime(fix),
                latitude: format_latitude(lat),
                longitude: format_longitude(lon),
                altitude: match fix.altitude {
                    Some(alt) => format!("Alt {:.1}m", alt),
                    None => "Alt ---".to_string(),
                },
                satellites: format!("Tracking {} sats", fix.satellites.unwrap_or(0)),
            }),
            _ => Screen::Invalid,
        }
    }

    /// Plain lines, top to bottom
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Screen::Invalid => vec![INVALID_TEXT],
            Screen::Fix(text) => vec![
                text.datetime.as_str(),
                text.latitude.as_str(),
                text.longitude.as_str(),
                text.altitude.as_str(),
                text.satellites.as_str(),
            ],
        }
    }
}

/// `DD/MM/YYYY HH:MM:SS`, dashes for parts not yet received
pub fn format_datetime(fix: &Fix) -> String {
    let date = fix
        .date
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| "--/--/----".to_string());
    let time = fix
        .time
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!("{} {}", date, time)
}

/// `N  56° 6.173`
pub fn format_latitude(latitude: f64) -> String {
    let hemisphere = if latitude < 0.0 { 'S' } else { 'N' };
    let (degrees, minutes) = degrees_minutes(latitude);
    format!("{}  {:02}° {}", hemisphere, degrees, minutes)
}

/// `E 014° 4.062`
pub fn format_longitude(longitude: f64) -> String {
    let hemisphere = if longitude < 0.0 { 'W' } else { 'E' };
    let (degrees, minutes) = degrees_minutes(longitude);
    format!("{} {:03}° {}", hemisphere, degrees, minutes)
}

/// Whole degrees and minutes to three decimals, rounding carried over
fn degrees_minutes(value: f64) -> (u64, String) {
    let thousandths = (value.abs() * 60_000.0).round() as u64;
    let minutes = thousandths % 60_000;
    (
        thousandths / 60_000,
        format!("{}.{:03}", minutes / 1000, minutes % 1000),
    )
}
