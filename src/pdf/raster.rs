//! Photo decoding for image XObjects.

use super::PdfError;
use image::imageops::FilterType;

/// A decoded, downscaled RGB raster ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
}

impl RasterImage {
    /// Decodes `bytes` in any format the `image` crate recognizes and
    /// shrinks the result so neither edge exceeds `max_edge` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Image`] when the bytes cannot be decoded, and
    /// [`PdfError::Malformed`] for zero-sized images.
    pub fn decode(bytes: &[u8], max_edge: u32) -> Result<Self, PdfError> {
        let decoded = image::load_from_memory(bytes)?;
        let bounded = if decoded.width() > max_edge || decoded.height() > max_edge {
            decoded.resize(max_edge, max_edge, FilterType::Triangle)
        } else {
            decoded
        };
        let rgb = bounded.to_rgb8();
        if rgb.width() == 0 || rgb.height() == 0 {
            return Err(PdfError::malformed("image has no pixels"));
        }
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
        })
    }

    /// Pixel width.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub(crate) fn into_samples(self) -> Vec<u8> {
        self.rgb
    }
}
