use crate::error::{AtlasError, Result};
use crate::pixel::{PixelComponentType, PixelFormat};
use serde::{Deserialize, Serialize};

/// Policy used to find one pixel format for a set of heterogeneous sources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PixelFormatMergeParams {
    /// When valid, the result is this format whatever the sources are.
    #[serde(default)]
    pub forced_pixel_format: Option<PixelFormat>,
    /// Allows a forced format that conflicts with the policy to be relaxed instead of rejected.
    #[serde(default = "default_true")]
    pub upgrade_pixel_format: bool,
    /// When false, luminance sources are widened to RGB.
    #[serde(default = "default_true")]
    pub accept_luminance: bool,
    /// When false, float sources are narrowed to unsigned bytes.
    #[serde(default = "default_true")]
    pub accept_float: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PixelFormatMergeParams {
    fn default() -> Self {
        Self {
            forced_pixel_format: None,
            upgrade_pixel_format: true,
            accept_luminance: true,
            accept_float: true,
        }
    }
}

impl PixelFormatMergeParams {
    /// The forced format, if one is set and valid.
    pub fn forced(&self) -> Option<PixelFormat> {
        self.forced_pixel_format.filter(|f| f.is_valid())
    }

    /// Applies the luminance/float policy to `format`.
    pub fn apply_policy(&self, mut format: PixelFormat) -> PixelFormat {
        if !self.accept_luminance && format.component_count == 1 {
            format.component_count = 3;
        }
        if !self.accept_float && format.component_type == PixelComponentType::Float {
            format.component_type = PixelComponentType::UnsignedChar;
        }
        format
    }
}

/// Accumulates incoming formats and yields the common one.
///
/// One merger is shared by a whole generation: every source calls `merge` once, then
/// `get_result` (or the policy-checked `resolve`) gives the format of all pages.
#[derive(Debug, Clone)]
pub struct PixelFormatMerger {
    params: PixelFormatMergeParams,
    result: Option<PixelFormat>,
    first_incoming: Option<PixelFormat>,
    identical_incoming_format: bool,
}

impl Default for PixelFormatMerger {
    fn default() -> Self {
        Self::new(PixelFormatMergeParams::default())
    }
}

impl PixelFormatMerger {
    pub fn new(params: PixelFormatMergeParams) -> Self {
        Self {
            params,
            result: None,
            first_incoming: None,
            identical_incoming_format: true,
        }
    }

    pub fn reset(&mut self, params: PixelFormatMergeParams) {
        *self = Self::new(params);
    }

    pub fn params(&self) -> &PixelFormatMergeParams {
        &self.params
    }

    /// Feeds one source format. Non-color formats are ignored.
    pub fn merge(&mut self, src: PixelFormat) {
        if !src.is_color_pixel() {
            return;
        }
        match self.first_incoming {
            None => self.first_incoming = Some(src),
            Some(first) if first != src => self.identical_incoming_format = false,
            Some(_) => {}
        }

        let src = self.params.apply_policy(src);
        self.result = Some(match self.result {
            None => src,
            Some(current) => {
                let component_type = if current.is_float() || src.is_float() {
                    PixelComponentType::Float
                } else {
                    PixelComponentType::UnsignedChar
                };
                // gray < RGB < RGBA
                PixelFormat::new(
                    component_type,
                    current.component_count.max(src.component_count),
                )
            }
        });
    }

    /// The merged format. Forced formats win unconditionally; before any `merge` the
    /// returned format is invalid (`PixelFormat::default()`).
    pub fn get_result(&self) -> PixelFormat {
        if let Some(forced) = self.params.forced() {
            return forced;
        }
        self.result.unwrap_or_default()
    }

    /// Returns true while every incoming format seen so far is the same.
    pub fn are_incoming_formats_identical(&self) -> bool {
        self.identical_incoming_format
    }

    /// Like `get_result`, but checks a forced format against the policy and relaxes it
    /// when `upgrade_pixel_format` allows. Fails when nothing has been merged.
    pub fn resolve(&self) -> Result<PixelFormat> {
        let merged = self.result;
        let Some(forced) = self.params.forced() else {
            return merged.ok_or(AtlasError::Empty);
        };

        let policy_ok = forced.is_color_pixel() && self.params.apply_policy(forced) == forced;
        if policy_ok {
            return Ok(forced);
        }
        if !self.params.upgrade_pixel_format {
            return Err(AtlasError::Format(format!(
                "forced format {} conflicts with the merge policy (luminance: {}, float: {})",
                forced, self.params.accept_luminance, self.params.accept_float
            )));
        }
        if forced.is_color_pixel() {
            Ok(self.params.apply_policy(forced))
        } else {
            merged.ok_or(AtlasError::Empty)
        }
    }
}
