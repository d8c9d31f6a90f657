// src/display/image.rs
//! The static badge bitmap drawn next to the fix

use crate::error::{GpsError, Result};
use embedded_graphics::{image::ImageRaw, pixelcolor::BinaryColor, prelude::*};
use std::path::Path;

pub const BADGE_WIDTH: u32 = 88;
pub const BADGE_HEIGHT: u32 = 108;

/// Raw 1bpp, MSB first, rows packed without padding (88 is a multiple of 8)
pub const BADGE_BYTES: usize = (BADGE_WIDTH * BADGE_HEIGHT / 8) as usize;

#[derive(Debug, Clone)]
pub struct BadgeImage {
    data: Vec<u8>,
}

impl BadgeImage {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != BADGE_BYTES {
            return Err(GpsError::Display(format!(
                "badge bitmap must be {} bytes ({}x{} at 1bpp), got {}",
                BADGE_BYTES,
                BADGE_WIDTH,
                BADGE_HEIGHT,
                data.len()
            )));
        }
        Ok(Self { data })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| {
            GpsError::Display(format!("Failed to read badge bitmap {}: {}", path.display(), e))
        })?;
        Self::from_bytes(data)
    }

    pub fn size(&self) -> Size {
        Size::new(BADGE_WIDTH, BADGE_HEIGHT)
    }

    pub fn raw(&self) -> ImageRaw<'_, BinaryColor> {
        ImageRaw::new(&self.data, BADGE_WIDTH)
    }
}
