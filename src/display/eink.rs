// src/display/eink.rs
//! 296x128 e-ink frame
//!
//! The frame is a plain 1bpp buffer with an embedded-graphics `DrawTarget`,
//! so the same `render_fix` can paint it or any panel driver that speaks
//! `BinaryColor`. `BinaryColor::On` is black ink.

use crate::{
    error::{GpsError, Result},
    gps::Fix,
};
use embedded_graphics::{
    image::Image,
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_9X15},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use std::{convert::Infallible, path::PathBuf};

use super::{
    image::BadgeImage,
    layout::{Screen, INVALID_TEXT},
    FixDisplay,
};

pub const WIDTH: u32 = 296;
pub const HEIGHT: u32 = 128;

/// Width of the white text area; the rest is the dark badge panel
pub const TEXT_AREA_WIDTH: u32 = 192;

/// Where the badge bitmap sits inside the dark panel
pub const BADGE_ORIGIN: Point = Point::new(200, 10);

const ROW_BYTES: usize = (WIDTH as usize + 7) / 8;

/// Top-left corners of the five fix lines
const LINE_ORIGINS: [Point; 5] = [
    Point::new(5, 5),
    Point::new(20, 30),
    Point::new(20, 50),
    Point::new(20, 70),
    Point::new(5, 95),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EinkFrame {
    buffer: Vec<u8>,
}

impl EinkFrame {
    /// Blank (white) frame
    pub fn new() -> Self {
        Self {
            buffer: vec![0; ROW_BYTES * HEIGHT as usize],
        }
    }

    /// Packed rows, MSB first, set bit = black
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        let (index, mask) = Self::locate(x, y);
        Some(BinaryColor::from(self.buffer[index] & mask != 0))
    }

    /// Binary PBM (P4); its bit convention matches the buffer
    pub fn to_pbm(&self) -> Vec<u8> {
        let mut out = format!("P4\n{} {}\n", WIDTH, HEIGHT).into_bytes();
        out.extend_from_slice(&self.buffer);
        out
    }

    fn locate(x: u32, y: u32) -> (usize, u8) {
        let index = y as usize * ROW_BYTES + x as usize / 8;
        (index, 0x80 >> (x % 8))
    }
}

impl Default for EinkFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for EinkFrame {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for EinkFrame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> std::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x >= WIDTH as i32 || point.y >= HEIGHT as i32 {
                continue;
            }
            let (index, mask) = Self::locate(point.x as u32, point.y as u32);
            match color {
                BinaryColor::On => self.buffer[index] |= mask,
                BinaryColor::Off => self.buffer[index] &= !mask,
            }
        }
        Ok(())
    }
}

/// Paint the badge layout for `fix` onto any 1bpp target
pub fn render_fix<D>(target: &mut D, fix: &Fix, badge: Option<&BadgeImage>) -> std::result::Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(Point::zero(), Size::new(TEXT_AREA_WIDTH, HEIGHT))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
        .draw(target)?;
    Rectangle::new(
        Point::new(TEXT_AREA_WIDTH as i32, 0),
        Size::new(WIDTH - TEXT_AREA_WIDTH, HEIGHT),
    )
    .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
    .draw(target)?;

    if let Some(badge) = badge {
        Image::new(&badge.raw(), BADGE_ORIGIN).draw(target)?;
    }

    let screen = Screen::for_fix(fix);
    match &screen {
        Screen::Fix(_) => {
            let style = MonoTextStyle::new(&FONT_9X15, BinaryColor::On);
            for (line, origin) in screen.lines().into_iter().zip(LINE_ORIGINS) {
                Text::with_baseline(line, origin, style, Baseline::Top).draw(target)?;
            }
        }
        Screen::Invalid => {
            let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
            Text::with_baseline(INVALID_TEXT, Point::new(5, 60), style, Baseline::Middle)
                .draw(target)?;
        }
    }

    Ok(())
}

/// Renders each fix into a frame and writes it as a PBM snapshot
pub struct EinkSnapshot {
    path: PathBuf,
    badge: Option<BadgeImage>,
    frame: EinkFrame,
}

impl EinkSnapshot {
    pub fn new(path: PathBuf, badge: Option<BadgeImage>) -> Self {
        Self {
            path,
            badge,
            frame: EinkFrame::new(),
        }
    }

    pub fn frame(&self) -> &EinkFrame {
        &self.frame
    }
}

impl FixDisplay for EinkSnapshot {
    fn show(&mut self, fix: &Fix) -> Result<()> {
        render_fix(&mut self.frame, fix, self.badge.as_ref()).unwrap_or_else(|never| match never {});

        // Write beside the target and rename so readers never see half a frame
        let tmp = self.path.with_extension("pbm.tmp");
        std::fs::write(&tmp, self.frame.to_pbm())
            .map_err(|e| GpsError::Display(format!("Failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            GpsError::Display(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        log::info!("Badge frame written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::image::{BADGE_BYTES, BADGE_HEIGHT, BADGE_WIDTH};
    use chrono::{NaiveDate, NaiveTime};

    fn valid_fix() -> Fix {
        Fix {
            time: NaiveTime::from_hms_opt(9, 45, 30),
            date: NaiveDate::from_ymd_opt(2021, 7, 12),
            latitude: Some(56.102875),
            longitude: Some(14.067703),
            valid: true,
            altitude: Some(58.3),
            satellites: Some(7),
            ..Fix::default()
        }
    }

    fn black_pixels(frame: &EinkFrame, area: Rectangle) -> usize {
        area.points()
            .filter(|p| frame.pixel(p.x as u32, p.y as u32) == Some(BinaryColor::On))
            .count()
    }

    #[test]
    fn test_pixel_packing() {
        let mut frame = EinkFrame::new();
        Pixel(Point::new(9, 1), BinaryColor::On).draw(&mut frame).unwrap();
        Pixel(Point::new(-1, 300), BinaryColor::On).draw(&mut frame).unwrap();

        assert_eq!(frame.buffer()[ROW_BYTES + 1], 0b0100_0000);
        assert_eq!(frame.pixel(9, 1), Some(BinaryColor::On));
        assert_eq!(frame.pixel(8, 1), Some(BinaryColor::Off));
        assert_eq!(frame.pixel(WIDTH, 0), None);
        assert_eq!(frame.buffer().iter().map(|b| b.count_ones()).sum::<u32>(), 1);
    }

    #[test]
    fn test_layout_without_badge() {
        let mut frame = EinkFrame::new();
        render_fix(&mut frame, &valid_fix(), None).unwrap();

        let panel = Rectangle::new(
            Point::new(TEXT_AREA_WIDTH as i32, 0),
            Size::new(WIDTH - TEXT_AREA_WIDTH, HEIGHT),
        );
        assert_eq!(black_pixels(&frame, panel), panel.points().count());

        // Text lands in the white area
        let text_area = Rectangle::new(Point::zero(), Size::new(TEXT_AREA_WIDTH, HEIGHT));
        assert!(black_pixels(&frame, text_area) > 0);
    }

    #[test]
    fn test_badge_drawn_in_panel() {
        let badge = BadgeImage::from_bytes(vec![0; BADGE_BYTES]).unwrap();
        let mut frame = EinkFrame::new();
        render_fix(&mut frame, &Fix::new(), Some(&badge)).unwrap();

        // An all-white bitmap punches a white hole in the dark panel
        let badge_area = Rectangle::new(BADGE_ORIGIN, Size::new(BADGE_WIDTH, BADGE_HEIGHT));
        assert_eq!(black_pixels(&frame, badge_area), 0);
        assert_eq!(frame.pixel(195, 5), Some(BinaryColor::On));
    }

    #[test]
    fn test_redraw_replaces_previous_text() {
        let mut frame = EinkFrame::new();
        render_fix(&mut frame, &valid_fix(), None).unwrap();
        let with_fix = frame.clone();

        render_fix(&mut frame, &Fix::new(), None).unwrap();
        assert_ne!(frame, with_fix);

        let mut fresh = EinkFrame::new();
        render_fix(&mut fresh, &Fix::new(), None).unwrap();
        assert_eq!(frame, fresh);
    }

    #[test]
    fn test_pbm_snapshot() {
        let path = std::env::temp_dir().join(format!("badger-gps-{}.pbm", std::process::id()));
        let mut display = EinkSnapshot::new(path.clone(), None);
        display.show(&valid_fix()).unwrap();

        let written = std::fs::read(&path).unwrap();
        let header = b"P4\n296 128\n";
        assert!(written.starts_with(header));
        assert_eq!(written.len(), header.len() + ROW_BYTES * HEIGHT as usize);
        assert_eq!(&written[header.len()..], display.frame().buffer());

        std::fs::remove_file(&path).unwrap();
    }
}
