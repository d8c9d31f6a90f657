// src/display/json.rs
//! One JSON object per redraw, for piping into other tools

use crate::{error::Result, gps::Fix};
use std::io::{self, Write};

use super::FixDisplay;

pub struct JsonDisplay<W: Write> {
    out: W,
}

impl JsonDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> JsonDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FixDisplay for JsonDisplay<W> {
    fn show(&mut self, fix: &Fix) -> Result<()> {
        serde_json::to_writer(&mut self.out, fix)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
