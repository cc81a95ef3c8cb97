//! ALFA Slideshow - Preview Engine
//!
//! Decodes image items into display-sized frames for the precache.

use std::path::Path;
use std::sync::Arc;
use image::{imageops::FilterType, DynamicImage, GenericImageView};

use crate::error::{SessionError, SessionResult};
use crate::media::{MediaItem, MediaKind};

/// Default longest edge of a prepared frame
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// Decoded image ready for display
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub image: Arc<DynamicImage>,
}

/// Materializes media for display
pub trait MediaLoader: Send + Sync {
    /// Decode an image item
    fn load_image(&self, item: &MediaItem) -> SessionResult<PreparedImage>;
}

/// Preview engine bounded to a display size
pub struct PreviewEngine {
    /// Longest edge after resizing
    max_dimension: u32,
}

impl Default for PreviewEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DIMENSION)
    }
}

impl PreviewEngine {
    /// Create new preview engine
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Decode a file and shrink it to fit the display bound
    pub fn prepare(&self, path: &Path) -> SessionResult<PreparedImage> {
        if !path.exists() {
            return Err(SessionError::MediaUnavailable(path.display().to_string()));
        }

        let img = image::open(path)?;
        let img = self.fit(img);
        let (width, height) = img.dimensions();

        Ok(PreparedImage {
            width,
            height,
            image: Arc::new(img),
        })
    }

    /// Resize keeping aspect ratio; smaller images are left alone
    fn fit(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        if width <= self.max_dimension && height <= self.max_dimension {
            return img;
        }

        let (new_width, new_height) = if width > height {
            let ratio = self.max_dimension as f32 / width as f32;
            (self.max_dimension, ((height as f32 * ratio) as u32).max(1))
        } else {
            let ratio = self.max_dimension as f32 / height as f32;
            (((width as f32 * ratio) as u32).max(1), self.max_dimension)
        };

        img.resize_exact(new_width, new_height, FilterType::Triangle)
    }
}

impl MediaLoader for PreviewEngine {
    fn load_image(&self, item: &MediaItem) -> SessionResult<PreparedImage> {
        if item.kind != MediaKind::Image {
            return Err(SessionError::UnsupportedMedia(item.display_name()));
        }
        self.prepare(&item.source_path)
    }
}
