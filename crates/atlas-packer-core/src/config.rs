use crate::merger::PixelFormatMergeParams;
use crate::pixel::PixelFormat;
use serde::{Deserialize, Serialize};

/// Parameters of one atlas generation.
/// Key notes:
///   - every page is exactly `atlas_width` x `atlas_height`
///   - `padding` is kept between packed entries and between entries and page edges
///   - `merge_params` decides the single pixel format shared by all pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasGeneratorParams {
    /// Page width in pixels.
    pub atlas_width: u32,
    /// Page height in pixels.
    pub atlas_height: u32,
    /// Minimum margin (pixels) around every packed entry.
    #[serde(default)]
    pub padding: u32,
    /// Pixel format policy.
    #[serde(default)]
    pub merge_params: PixelFormatMergeParams,
}

impl Default for AtlasGeneratorParams {
    fn default() -> Self {
        Self {
            atlas_width: 1024,
            atlas_height: 1024,
            padding: 0,
            merge_params: PixelFormatMergeParams::default(),
        }
    }
}

impl AtlasGeneratorParams {
    /// Validates the parameters.
    ///
    /// Returns an error if:
    /// - Dimensions are zero
    /// - Padding on both sides would leave no usable space on a page
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.atlas_width == 0 || self.atlas_height == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.atlas_width,
                height: self.atlas_height,
            });
        }

        let total_padding = self.padding.saturating_mul(2);
        if total_padding >= self.atlas_width || total_padding >= self.atlas_height {
            return Err(AtlasError::InvalidConfig(format!(
                "padding ({}) * 2 leaves no usable space in a {}x{} page",
                self.padding, self.atlas_width, self.atlas_height
            )));
        }

        Ok(())
    }

    /// Create a fluent builder for `AtlasGeneratorParams`.
    pub fn builder() -> AtlasGeneratorParamsBuilder {
        AtlasGeneratorParamsBuilder::new()
    }
}

/// Builder for `AtlasGeneratorParams` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasGeneratorParamsBuilder {
    params: AtlasGeneratorParams,
}

impl AtlasGeneratorParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: AtlasGeneratorParams::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.params.atlas_width = w;
        self.params.atlas_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.params.padding = v;
        self
    }
    pub fn merge_params(mut self, v: PixelFormatMergeParams) -> Self {
        self.params.merge_params = v;
        self
    }
    pub fn forced_pixel_format(mut self, v: Option<PixelFormat>) -> Self {
        self.params.merge_params.forced_pixel_format = v;
        self
    }
    pub fn upgrade_pixel_format(mut self, v: bool) -> Self {
        self.params.merge_params.upgrade_pixel_format = v;
        self
    }
    pub fn accept_luminance(mut self, v: bool) -> Self {
        self.params.merge_params.accept_luminance = v;
        self
    }
    pub fn accept_float(mut self, v: bool) -> Self {
        self.params.merge_params.accept_float = v;
        self
    }
    pub fn build(self) -> AtlasGeneratorParams {
        self.params
    }
}
