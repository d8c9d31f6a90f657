// src/gps/mod.rs
//! GPS receiver protocol: sentences, commands and serial framing

pub mod command;
pub mod data;
pub mod nmea;
pub mod reader;

pub use command::PmtkCommand;
pub use data::Fix;
pub use nmea::{Sentence, SentenceError};
pub use reader::{ReadEvent, SentenceReader};
