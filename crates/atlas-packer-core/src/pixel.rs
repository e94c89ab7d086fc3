use crate::error::{AtlasError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, Rgb32FImage, RgbImage, Rgba32FImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of every component of a pixel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PixelComponentType {
    #[default]
    Unknown,
    UnsignedChar,
    Float,
    DepthStencil,
}

/// Component type + component count. Color formats use 1 (gray), 3 (RGB) or 4 (RGBA) components.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct PixelFormat {
    pub component_type: PixelComponentType,
    pub component_count: u32,
}

impl PixelFormat {
    pub const GRAY: PixelFormat = PixelFormat::new(PixelComponentType::UnsignedChar, 1);
    pub const RGB: PixelFormat = PixelFormat::new(PixelComponentType::UnsignedChar, 3);
    pub const RGBA: PixelFormat = PixelFormat::new(PixelComponentType::UnsignedChar, 4);
    pub const GRAY_FLOAT: PixelFormat = PixelFormat::new(PixelComponentType::Float, 1);
    pub const RGB_FLOAT: PixelFormat = PixelFormat::new(PixelComponentType::Float, 3);
    pub const RGBA_FLOAT: PixelFormat = PixelFormat::new(PixelComponentType::Float, 4);
    pub const DEPTH_STENCIL: PixelFormat = PixelFormat::new(PixelComponentType::DepthStencil, 1);

    pub const fn new(component_type: PixelComponentType, component_count: u32) -> Self {
        Self {
            component_type,
            component_count,
        }
    }

    /// Returns true for formats the atlas can handle at all (color or depth-stencil).
    pub fn is_valid(&self) -> bool {
        self.is_color_pixel() || self.is_depth_stencil_pixel()
    }

    pub fn is_color_pixel(&self) -> bool {
        matches!(
            self.component_type,
            PixelComponentType::UnsignedChar | PixelComponentType::Float
        ) && matches!(self.component_count, 1 | 3 | 4)
    }

    pub fn is_depth_stencil_pixel(&self) -> bool {
        self.component_type == PixelComponentType::DepthStencil && self.component_count == 1
    }

    pub fn is_float(&self) -> bool {
        self.component_type == PixelComponentType::Float
    }

    pub fn is_luminance(&self) -> bool {
        self.is_color_pixel() && self.component_count == 1
    }

    /// Size in bytes of one pixel (0 for unknown formats).
    pub fn pixel_size(&self) -> usize {
        let count = self.component_count as usize;
        match self.component_type {
            PixelComponentType::Unknown => 0,
            PixelComponentType::UnsignedChar => count,
            PixelComponentType::Float => count * std::mem::size_of::<f32>(),
            PixelComponentType::DepthStencil => 4,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match (self.component_type, self.component_count) {
            (PixelComponentType::UnsignedChar, 1) => "Gray",
            (PixelComponentType::UnsignedChar, 3) => "RGB",
            (PixelComponentType::UnsignedChar, 4) => "RGBA",
            (PixelComponentType::Float, 1) => "GrayFloat",
            (PixelComponentType::Float, 3) => "RGBFloat",
            (PixelComponentType::Float, 4) => "RGBAFloat",
            (PixelComponentType::DepthStencil, 1) => "DepthStencil",
            _ => return write!(f, "{:?}x{}", self.component_type, self.component_count),
        };
        f.write_str(name)
    }
}

/// Owned samples, row-major and tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

impl PixelData {
    /// Zero-filled storage for `samples` components of `format`.
    pub fn zeroed(format: PixelFormat, samples: usize) -> Self {
        if format.is_float() {
            PixelData::F32(vec![0.0; samples])
        } else {
            PixelData::U8(vec![0; samples])
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelData::U8(v) => v.len(),
            PixelData::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> PixelSlice<'_> {
        match self {
            PixelData::U8(v) => PixelSlice::U8(v),
            PixelData::F32(v) => PixelSlice::F32(v),
        }
    }
}

/// Borrowed samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelSlice<'a> {
    U8(&'a [u8]),
    F32(&'a [f32]),
}

impl<'a> PixelSlice<'a> {
    pub fn len(&self) -> usize {
        match self {
            PixelSlice::U8(v) => v.len(),
            PixelSlice::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_owned_data(&self) -> PixelData {
        match self {
            PixelSlice::U8(v) => PixelData::U8(v.to_vec()),
            PixelSlice::F32(v) => PixelData::F32(v.to_vec()),
        }
    }

    fn sample(&self, index: usize) -> f32 {
        match self {
            PixelSlice::U8(v) => v[index] as f32 / 255.0,
            PixelSlice::F32(v) => v[index],
        }
    }
}

/// Read-only view on one image (a source bitmap or one atlas page).
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: PixelSlice<'a>,
}

impl<'a> PixelView<'a> {
    pub fn to_buffer(&self) -> PixelBuffer {
        PixelBuffer {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.to_owned_data(),
        }
    }

    /// Encodes the view as an `image` crate image (gray float is widened to RGB float).
    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let bad = || AtlasError::Corrupt(format!("{}x{} {} buffer has wrong size", w, h, self.format));
        let img = match (self.data, self.format.component_count) {
            (PixelSlice::U8(v), 1) => {
                DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, v.to_vec()).ok_or_else(bad)?)
            }
            (PixelSlice::U8(v), 3) => {
                DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, v.to_vec()).ok_or_else(bad)?)
            }
            (PixelSlice::U8(v), 4) => {
                DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, v.to_vec()).ok_or_else(bad)?)
            }
            (PixelSlice::F32(v), 1) => {
                let rgb: Vec<f32> = v.iter().flat_map(|&g| [g, g, g]).collect();
                DynamicImage::ImageRgb32F(Rgb32FImage::from_raw(w, h, rgb).ok_or_else(bad)?)
            }
            (PixelSlice::F32(v), 3) => {
                DynamicImage::ImageRgb32F(Rgb32FImage::from_raw(w, h, v.to_vec()).ok_or_else(bad)?)
            }
            (PixelSlice::F32(v), 4) => DynamicImage::ImageRgba32F(
                Rgba32FImage::from_raw(w, h, v.to_vec()).ok_or_else(bad)?,
            ),
            _ => {
                return Err(AtlasError::Format(format!(
                    "cannot encode {} pixels",
                    self.format
                )));
            }
        };
        Ok(img)
    }
}

/// Owned image with an explicit pixel format. Channels are stored R, G, B, A.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: PixelData,
}

impl PixelBuffer {
    /// Zero-initialized buffer (transparent black).
    pub fn zeroed(width: u32, height: u32, format: PixelFormat) -> Self {
        let samples = width as usize * height as usize * format.component_count as usize;
        Self {
            width,
            height,
            format,
            data: PixelData::zeroed(format, samples),
        }
    }

    /// Wraps 8-bit samples; fails when the length or the format does not match.
    pub fn from_u8(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        Self::checked(width, height, format, PixelData::U8(data))
    }

    /// Wraps float samples; fails when the length or the format does not match.
    pub fn from_f32(width: u32, height: u32, format: PixelFormat, data: Vec<f32>) -> Result<Self> {
        Self::checked(width, height, format, PixelData::F32(data))
    }

    fn checked(width: u32, height: u32, format: PixelFormat, data: PixelData) -> Result<Self> {
        let buffer = Self {
            width,
            height,
            format,
            data,
        };
        buffer.check()?;
        Ok(buffer)
    }

    /// Verifies that format, storage type and sample count agree.
    pub fn check(&self) -> Result<()> {
        if !self.format.is_color_pixel() {
            return Err(AtlasError::Format(format!(
                "{} is not a color pixel format",
                self.format
            )));
        }
        let float_data = matches!(self.data, PixelData::F32(_));
        if float_data != self.format.is_float() {
            return Err(AtlasError::Format(format!(
                "sample storage does not match {}",
                self.format
            )));
        }
        let expected =
            self.width as usize * self.height as usize * self.format.component_count as usize;
        if self.data.len() != expected {
            return Err(AtlasError::Corrupt(format!(
                "expected {} samples for {}x{} {}, found {}",
                expected,
                self.width,
                self.height,
                self.format,
                self.data.len()
            )));
        }
        Ok(())
    }

    /// Lossless import of a decoded image. 16-bit and float images become float formats.
    pub fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        let (format, data) = match image {
            DynamicImage::ImageLuma8(img) => (PixelFormat::GRAY, PixelData::U8(img.as_raw().clone())),
            DynamicImage::ImageRgb8(img) => (PixelFormat::RGB, PixelData::U8(img.as_raw().clone())),
            DynamicImage::ImageRgba8(img) => (PixelFormat::RGBA, PixelData::U8(img.as_raw().clone())),
            DynamicImage::ImageLumaA8(_) => {
                (PixelFormat::RGBA, PixelData::U8(image.to_rgba8().into_raw()))
            }
            DynamicImage::ImageLuma16(img) => (
                PixelFormat::GRAY_FLOAT,
                PixelData::F32(img.as_raw().iter().map(|&v| v as f32 / 65535.0).collect()),
            ),
            DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
                (PixelFormat::RGB_FLOAT, PixelData::F32(image.to_rgb32f().into_raw()))
            }
            _ => (PixelFormat::RGBA_FLOAT, PixelData::F32(image.to_rgba32f().into_raw())),
        };
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Decodes `image` into exactly `format` (used when reloading page files).
    pub fn from_image_as(image: DynamicImage, format: PixelFormat) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        let data = match (format.component_type, format.component_count) {
            (PixelComponentType::UnsignedChar, 1) => PixelData::U8(image.into_luma8().into_raw()),
            (PixelComponentType::UnsignedChar, 3) => PixelData::U8(image.into_rgb8().into_raw()),
            (PixelComponentType::UnsignedChar, 4) => PixelData::U8(image.into_rgba8().into_raw()),
            (PixelComponentType::Float, 1) => {
                let rgb: ImageBuffer<image::Rgb<f32>, Vec<f32>> = image.into_rgb32f();
                PixelData::F32(rgb.into_raw().into_iter().step_by(3).collect())
            }
            (PixelComponentType::Float, 3) => PixelData::F32(image.into_rgb32f().into_raw()),
            (PixelComponentType::Float, 4) => PixelData::F32(image.into_rgba32f().into_raw()),
            _ => {
                return Err(AtlasError::Format(format!(
                    "cannot decode pages as {}",
                    format
                )));
            }
        };
        Self::checked(width, height, format, data)
    }

    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            format: self.format,
            data: self.data.as_slice(),
        }
    }

    /// Returns a copy of this buffer in `format`.
    pub fn converted(&self, format: PixelFormat) -> PixelBuffer {
        if format == self.format {
            return self.clone();
        }
        let mut out = PixelBuffer::zeroed(self.width, self.height, format);
        blit_converted(&self.view(), 0, 0, self.width, self.height, &mut out, 0, 0);
        out
    }
}

/// Rec.601 luma, used only when a forced format narrows color to gray.
fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Maps the channels of one source pixel onto the destination channel layout.
fn remap_channels(src: &[f32; 4], src_count: usize, dst_count: usize) -> [f32; 4] {
    match (src_count, dst_count) {
        (1, 1) => [src[0], 0.0, 0.0, 0.0],
        (1, 3) => [src[0], src[0], src[0], 0.0],
        (1, _) => [src[0], src[0], src[0], 1.0],
        (_, 1) => [luminance(src[0], src[1], src[2]), 0.0, 0.0, 0.0],
        (3, 4) => [src[0], src[1], src[2], 1.0],
        _ => *src,
    }
}

/// Copies the `sw x sh` block at (sx, sy) of `src` into `dst` at (dx, dy), converting
/// samples to the destination format. Pixels falling outside `dst` are dropped.
#[allow(clippy::too_many_arguments)]
pub fn blit_converted(
    src: &PixelView<'_>,
    sx: u32,
    sy: u32,
    sw: u32,
    sh: u32,
    dst: &mut PixelBuffer,
    dx: u32,
    dy: u32,
) {
    let rw = sw.min(dst.width.saturating_sub(dx)).min(src.width.saturating_sub(sx)) as usize;
    let rh = sh.min(dst.height.saturating_sub(dy)).min(src.height.saturating_sub(sy)) as usize;
    if rw == 0 || rh == 0 {
        return;
    }
    let sc = src.format.component_count as usize;
    let dc = dst.format.component_count as usize;
    let src_stride = src.width as usize * sc;
    let dst_stride = dst.width as usize * dc;
    let (sx, sy, dx, dy) = (sx as usize, sy as usize, dx as usize, dy as usize);

    // same format: plain row copies
    if src.format == dst.format {
        for row in 0..rh {
            let s = (sy + row) * src_stride + sx * sc;
            let d = (dy + row) * dst_stride + dx * dc;
            match (src.data, &mut dst.data) {
                (PixelSlice::U8(s_data), PixelData::U8(d_data)) => {
                    d_data[d..d + rw * dc].copy_from_slice(&s_data[s..s + rw * sc]);
                }
                (PixelSlice::F32(s_data), PixelData::F32(d_data)) => {
                    d_data[d..d + rw * dc].copy_from_slice(&s_data[s..s + rw * sc]);
                }
                _ => return,
            }
        }
        return;
    }

    for row in 0..rh {
        for col in 0..rw {
            let s = (sy + row) * src_stride + (sx + col) * sc;
            let d = (dy + row) * dst_stride + (dx + col) * dc;
            let mut px = [0.0f32, 0.0, 0.0, 1.0];
            for (c, slot) in px.iter_mut().enumerate().take(sc) {
                *slot = src.data.sample(s + c);
            }
            let out = remap_channels(&px, sc, dc);
            match &mut dst.data {
                PixelData::U8(d_data) => {
                    for c in 0..dc {
                        d_data[d + c] = (out[c].clamp(0.0, 1.0) * 255.0).round() as u8;
                    }
                }
                PixelData::F32(d_data) => {
                    d_data[d..d + dc].copy_from_slice(&out[..dc]);
                }
            }
        }
    }
}
