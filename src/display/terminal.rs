// src/display/terminal.rs
//! Terminal preview of the badge

use crate::{
    error::{GpsError, Result},
    gps::Fix,
};
use crossterm::{
    cursor::MoveTo,
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};

use super::{layout::Screen, FixDisplay};

/// Draws the badge text in place of the panel
pub struct TerminalDisplay<W: Write> {
    out: W,
    clear: bool,
}

impl TerminalDisplay<io::Stdout> {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            clear: true,
        }
    }
}

impl<W: Write> TerminalDisplay<W> {
    /// Render into any writer without clearing the screen first
    pub fn with_writer(out: W) -> Self {
        Self { out, clear: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render the fix to the terminal
    fn render(&mut self, fix: &Fix) -> io::Result<()> {
        if self.clear {
            execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        }

        execute!(
            self.out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(32)),
            Print("\n"),
            ResetColor
        )?;

        match Screen::for_fix(fix) {
            Screen::Fix(text) => {
                execute!(
                    self.out,
                    SetForegroundColor(Color::Yellow),
                    Print(format!("{}\n", text.datetime)),
                    ResetColor,
                    Print(format!("  {}\n", text.latitude)),
                    Print(format!("  {}\n", text.longitude)),
                    Print(format!("  {}\n", text.altitude)),
                    Print(format!("{}\n", text.satellites)),
                )?;
                if let Some(speed) = fix.speed_kmh() {
                    execute!(self.out, Print(format!("  Speed {:.1} km/h\n", speed)))?;
                }
            }
            Screen::Invalid => {
                execute!(
                    self.out,
                    SetForegroundColor(Color::Red),
                    Print(format!("{}\n", super::layout::INVALID_TEXT)),
                    ResetColor
                )?;
            }
        }

        execute!(
            self.out,
            SetForegroundColor(Color::Green),
            Print("=".repeat(32)),
            Print("\n"),
            ResetColor
        )?;

        self.out.flush()
    }
}

impl Default for TerminalDisplay<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> FixDisplay for TerminalDisplay<W> {
    fn show(&mut self, fix: &Fix) -> Result<()> {
        self.render(fix).map_err(GpsError::Io)
    }
}
