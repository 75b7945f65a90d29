//! Recording background: a flat colour or a static image

use std::path::{Path, PathBuf};

use eframe::egui::{Color32, ColorImage};
use image::{imageops::FilterType, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a background image
#[derive(Error, Debug)]
pub enum BackgroundError {
    #[error("Failed to open image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Which background is in use; exactly one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackgroundMode {
    #[default]
    Color,
    Image,
}

impl BackgroundMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Image => "Image",
        }
    }
}

/// User-facing background selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    pub mode: BackgroundMode,
    pub color: [u8; 3],
    pub image_path: Option<PathBuf>,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            mode: BackgroundMode::Color,
            color: [10, 10, 15],
            image_path: None,
        }
    }
}

impl Background {
    /// Build the immutable background for a `width`x`height` display.
    ///
    /// Image mode without a chosen image falls back to the flat colour.
    pub fn resolve(&self, width: u32, height: u32) -> Result<ResolvedBackground, BackgroundError> {
        match (self.mode, &self.image_path) {
            (BackgroundMode::Image, Some(path)) => {
                let image = load_scaled(path, width, height)?;
                Ok(ResolvedBackground::Image(image))
            }
            _ => Ok(ResolvedBackground::Color(Rgb(self.color))),
        }
    }

    /// Display name of the chosen image, shortened for the side panel
    pub fn image_label(&self) -> Option<String> {
        let name = self.image_path.as_ref()?.file_name()?.to_string_lossy();
        if name.chars().count() > 25 {
            Some(format!("{}...", name.chars().take(25).collect::<String>()))
        } else {
            Some(name.into_owned())
        }
    }
}

/// Decode an image file and stretch it to exactly `width`x`height`
pub fn load_scaled(path: &Path, width: u32, height: u32) -> Result<RgbImage, BackgroundError> {
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let decoded = reader.decode()?.to_rgb8();
    log::info!(
        "Loaded background {} ({}x{})",
        path.display(),
        decoded.width(),
        decoded.height()
    );

    if decoded.dimensions() == (width, height) {
        return Ok(decoded);
    }
    Ok(image::imageops::resize(
        &decoded,
        width.max(1),
        height.max(1),
        FilterType::Lanczos3,
    ))
}

/// Background fixed for the duration of one recording
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBackground {
    Color(Rgb<u8>),
    Image(RgbImage),
}

impl Default for ResolvedBackground {
    fn default() -> Self {
        Self::Color(Rgb(Background::default().color))
    }
}

impl ResolvedBackground {
    /// The first export frame: the background with nothing drawn on it
    pub fn base_frame(&self, width: u32, height: u32) -> RgbImage {
        match self {
            Self::Color(color) => RgbImage::from_pixel(width, height, *color),
            Self::Image(image) if image.dimensions() == (width, height) => image.clone(),
            Self::Image(image) => {
                image::imageops::resize(image, width, height, FilterType::Lanczos3)
            }
        }
    }

    /// Fill colour for the preview (black behind an image)
    pub fn fill_color(&self) -> Color32 {
        match self {
            Self::Color(Rgb([r, g, b])) => Color32::from_rgb(*r, *g, *b),
            Self::Image(_) => Color32::BLACK,
        }
    }

    /// Pixels for uploading as a preview texture, if this is an image
    pub fn color_image(&self) -> Option<ColorImage> {
        match self {
            Self::Color(_) => None,
            Self::Image(image) => Some(ColorImage::from_rgb(
                [image.width() as usize, image.height() as usize],
                image.as_raw(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("path-trace-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_color_mode_resolves_to_color() {
        let bg = Background {
            mode: BackgroundMode::Color,
            color: [1, 2, 3],
            image_path: Some(PathBuf::from("/does/not/matter.png")),
        };

        let resolved = bg.resolve(4, 4).unwrap();
        assert_eq!(resolved, ResolvedBackground::Color(Rgb([1, 2, 3])));

        let frame = resolved.base_frame(4, 3);
        assert_eq!(frame.dimensions(), (4, 3));
        assert!(frame.pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    #[test]
    fn test_image_mode_without_image_falls_back() {
        let bg = Background {
            mode: BackgroundMode::Image,
            color: [9, 9, 9],
            image_path: None,
        };

        assert_eq!(
            bg.resolve(2, 2).unwrap(),
            ResolvedBackground::Color(Rgb([9, 9, 9]))
        );
    }

    #[test]
    fn test_image_is_scaled_to_monitor() {
        let path = temp_path("bg.png");
        RgbImage::from_pixel(8, 4, Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();

        let bg = Background {
            mode: BackgroundMode::Image,
            color: [0, 0, 0],
            image_path: Some(path.clone()),
        };
        let resolved = bg.resolve(16, 8);
        std::fs::remove_file(&path).ok();

        let resolved = resolved.unwrap();
        let frame = resolved.base_frame(16, 8);
        assert_eq!(frame.dimensions(), (16, 8));
        let Rgb([r, g, b]) = *frame.get_pixel(8, 4);
        assert!(r.abs_diff(200) <= 1 && g.abs_diff(10) <= 1 && b.abs_diff(10) <= 1);
        assert!(resolved.color_image().is_some());
    }

    #[test]
    fn test_unreadable_image_is_an_error() {
        let path = temp_path("not-an-image.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let bg = Background {
            mode: BackgroundMode::Image,
            color: [0, 0, 0],
            image_path: Some(path.clone()),
        };
        let result = bg.resolve(4, 4);
        std::fs::remove_file(&path).ok();

        assert!(result.is_err());

        let missing = Background {
            image_path: Some(temp_path("missing.png")),
            ..bg
        };
        assert!(matches!(missing.resolve(4, 4), Err(BackgroundError::Io(_))));
    }

    #[test]
    fn test_image_label_truncates() {
        let bg = Background {
            image_path: Some(PathBuf::from("/tmp/a-very-long-background-image-name.png")),
            ..Background::default()
        };
        assert_eq!(bg.image_label().unwrap(), "a-very-long-background-im...");

        let bg = Background {
            image_path: Some(PathBuf::from("/tmp/sky.jpg")),
            ..Background::default()
        };
        assert_eq!(bg.image_label().unwrap(), "sky.jpg");
        assert_eq!(Background::default().image_label(), None);
    }
}
