// src/gps/data.rs
//! The current GPS fix

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use super::nmea::{self, Gga, Rmc, Sentence, SentenceError};

/// Knots to km/h
const KNOTS_TO_KMH: f64 = 1.852;

/// Latest reading from the receiver. Each accepted sentence overwrites the
/// fields it carries; nothing is kept from earlier readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fix {
    pub time: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub valid: bool,
    pub altitude: Option<f64>,    // meters
    pub satellites: Option<u8>,
    pub hdop: Option<f64>,
    pub speed_knots: Option<f64>,
    pub heading: Option<f64>,     // degrees from true north
}

impl Fix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both coordinates are known
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// UTC second of the last timestamp, used to pace display refreshes
    pub fn second(&self) -> Option<u32> {
        self.time.map(|t| t.second())
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed_knots.map(|knots| knots * KNOTS_TO_KMH)
    }

    /// Validate and apply one raw sentence. On error the fix is left as it was.
    pub fn update_from_line(&mut self, line: &str) -> Result<Sentence, SentenceError> {
        let sentence = nmea::parse_sentence(line)?;
        self.apply(&sentence);
        Ok(sentence)
    }

    /// Apply a decoded sentence
    pub fn apply(&mut self, sentence: &Sentence) {
        match sentence {
            Sentence::Gga(gga) => self.apply_gga(gga),
            Sentence::Rmc(rmc) => self.apply_rmc(rmc),
            Sentence::Ack(_) => {}
        }
    }

    fn apply_gga(&mut self, gga: &Gga) {
        self.time = gga.time;
        self.set_position(gga.latitude, gga.longitude);
        self.valid = gga.quality > 0 && self.has_position();
        self.satellites = gga.satellites;
        self.hdop = gga.hdop;
        self.altitude = gga.altitude;
    }

    fn apply_rmc(&mut self, rmc: &Rmc) {
        self.time = rmc.time;
        self.date = rmc.date;
        self.set_position(rmc.latitude, rmc.longitude);
        self.valid = rmc.active && self.has_position();
        self.speed_knots = rmc.speed_knots;
        self.heading = rmc.heading;
    }

    /// A position is only kept when both halves are present
    fn set_position(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                self.latitude = Some(lat);
                self.longitude = Some(lon);
            }
            _ => {
                self.latitude = None;
                self.longitude = None;
            }
        }
    }
}
