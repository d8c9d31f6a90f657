// src/display/mod.rs
//! Renderers for the current fix

pub mod eink;
pub mod image;
pub mod json;
pub mod layout;
pub mod terminal;

use crate::{
    config::{GpsConfig, OutputKind},
    error::Result,
    gps::Fix,
};

pub use eink::{EinkFrame, EinkSnapshot};
pub use image::BadgeImage;
pub use json::JsonDisplay;
pub use terminal::TerminalDisplay;

/// Something that can show a fix
pub trait FixDisplay {
    fn show(&mut self, fix: &Fix) -> Result<()>;
}

/// Build the renderer selected in the configuration
pub fn from_config(config: &GpsConfig) -> Result<Box<dyn FixDisplay>> {
    let display: Box<dyn FixDisplay> = match config.output {
        OutputKind::Eink => {
            let badge = match &config.image_path {
                Some(path) => Some(BadgeImage::load(path)?),
                None => None,
            };
            Box::new(EinkSnapshot::new(config.snapshot_path.clone(), badge))
        }
        OutputKind::Terminal => Box::new(TerminalDisplay::new()),
        OutputKind::Json => Box::new(JsonDisplay::stdout()),
    };
    Ok(display)
}
