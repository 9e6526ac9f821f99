use crate::loader::ThumbnailDecoder;
use image::imageops::FilterType;
use image::RgbaImage;
use std::path::Path;
use tracing::debug;

/// A decoded, scaled thumbnail ready to blit.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub pixels: RgbaImage,
}

impl Thumbnail {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Decodes thumbnail files with the `image` crate and shrinks them to fit.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    pub filter: FilterType,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl ThumbnailDecoder for ImageDecoder {
    type Image = Thumbnail;

    fn load_and_scale(&self, path: &Path, max_width: u32, max_height: u32) -> Option<Thumbnail> {
        let decoded = match image::open(path) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "thumb: decode failed");
                return None;
            }
        };
        let scaled = scale_to_fit(decoded, max_width, max_height, self.filter)?;
        Some(Thumbnail {
            pixels: scaled.into_rgba8(),
        })
    }
}

/// Shrinks `image` to fit within the bounds, keeping its aspect ratio.
/// Images that already fit are left alone; zero bounds or an empty image
/// yield nothing.
pub fn scale_to_fit(
    image: image::DynamicImage,
    max_width: u32,
    max_height: u32,
    filter: FilterType,
) -> Option<image::DynamicImage> {
    if max_width == 0 || max_height == 0 || image.width() == 0 || image.height() == 0 {
        return None;
    }
    if image.width() <= max_width && image.height() <= max_height {
        return Some(image);
    }
    Some(image.resize(max_width, max_height, filter))
}
