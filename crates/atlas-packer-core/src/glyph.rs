//! Font rasterizer seam used by character sets.
//!
//! The generator asks a [`GlyphRasterizer`] for one bitmap + metrics per requested
//! codepoint. With the `fontdue` feature, [`FontdueRasterizer`] implements it on top of a
//! TrueType/OpenType font.

use crate::model::Bearing;
use crate::pixel::PixelBuffer;

/// Bitmap and metrics of one glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    /// May be empty (0x0) for glyphs without ink, such as a space.
    pub bitmap: PixelBuffer,
    pub advance_x: i32,
    pub advance_y: i32,
    pub bearing: Bearing,
}

/// Produces glyph bitmaps for a font at a given pixel size.
pub trait GlyphRasterizer {
    /// Name under which the character set is stored in the atlas.
    fn font_name(&self) -> &str;
    /// Distance between two baselines at `pixel_size`.
    fn line_height(&self, pixel_size: f32) -> f32;
    /// Returns `None` when the font cannot produce `codepoint`.
    fn rasterize(&self, codepoint: u32, pixel_size: f32) -> Option<RasterizedGlyph>;
}

#[cfg(feature = "fontdue")]
pub use fontdue_backend::FontdueRasterizer;

#[cfg(feature = "fontdue")]
mod fontdue_backend {
    use super::{GlyphRasterizer, RasterizedGlyph};
    use crate::error::{AtlasError, Result};
    use crate::model::Bearing;
    use crate::pixel::{PixelBuffer, PixelFormat};

    /// [`GlyphRasterizer`] backed by `fontdue`. Glyphs come out as 8-bit coverage (gray).
    pub struct FontdueRasterizer {
        name: String,
        font: fontdue::Font,
    }

    impl FontdueRasterizer {
        pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
            let name = name.into();
            let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
                .map_err(|e| AtlasError::invalid_input(name.clone(), e.to_string()))?;
            Ok(Self { name, font })
        }
    }

    impl GlyphRasterizer for FontdueRasterizer {
        fn font_name(&self) -> &str {
            &self.name
        }

        fn line_height(&self, pixel_size: f32) -> f32 {
            self.font
                .horizontal_line_metrics(pixel_size)
                .map(|m| m.new_line_size)
                .unwrap_or(pixel_size)
        }

        fn rasterize(&self, codepoint: u32, pixel_size: f32) -> Option<RasterizedGlyph> {
            let ch = char::from_u32(codepoint)?;
            if self.font.lookup_glyph_index(ch) == 0 && !ch.is_whitespace() {
                return None;
            }
            let (metrics, coverage) = self.font.rasterize(ch, pixel_size);
            let bitmap = PixelBuffer::from_u8(
                metrics.width as u32,
                metrics.height as u32,
                PixelFormat::GRAY,
                coverage,
            )
            .ok()?;
            Some(RasterizedGlyph {
                bitmap,
                advance_x: metrics.advance_width.round() as i32,
                advance_y: metrics.advance_height.round() as i32,
                bearing: Bearing {
                    x: metrics.xmin,
                    y: metrics.ymin + metrics.height as i32,
                },
            })
        }
    }
}
