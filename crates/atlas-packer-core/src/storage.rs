//! Page storage strategies.
//!
//! An [`Atlas`](crate::atlas::Atlas) is generic over how it keeps its pages:
//! [`PageImages`] holds one buffer per page, [`TextureArray`] one contiguous
//! `width x height x depth` buffer whose slices are the pages. Lookups only ever go
//! through [`PixelView`]s, so the strategy is invisible to render-time code.

use crate::error::{AtlasError, Result};
use crate::pixel::{PixelBuffer, PixelData, PixelFormat, PixelSlice, PixelView};

pub trait PageStorage: Sized {
    /// Builds the storage from pages that all measure `width x height` in `format`.
    fn from_pages(
        width: u32,
        height: u32,
        format: PixelFormat,
        pages: Vec<PixelBuffer>,
    ) -> Result<Self>;

    fn page_count(&self) -> usize;

    fn page_size(&self) -> (u32, u32);

    fn pixel_format(&self) -> PixelFormat;

    fn page(&self, index: usize) -> Option<PixelView<'_>>;

    /// Drops every page.
    fn clear(&mut self);

    /// Owned copies of every page, in order.
    fn to_pages(&self) -> Vec<PixelBuffer> {
        (0..self.page_count())
            .filter_map(|i| self.page(i))
            .map(|v| v.to_buffer())
            .collect()
    }
}

fn check_pages(width: u32, height: u32, format: PixelFormat, pages: &[PixelBuffer]) -> Result<()> {
    for (i, page) in pages.iter().enumerate() {
        if page.width != width || page.height != height || page.format != format {
            return Err(AtlasError::Corrupt(format!(
                "page {} is {}x{} {}, expected {}x{} {}",
                i, page.width, page.height, page.format, width, height, format
            )));
        }
        page.check()?;
    }
    Ok(())
}

/// One pixel buffer per page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImages {
    width: u32,
    height: u32,
    format: PixelFormat,
    pages: Vec<PixelBuffer>,
}

impl PageImages {
    pub fn pages(&self) -> &[PixelBuffer] {
        &self.pages
    }
}

impl PageStorage for PageImages {
    fn from_pages(
        width: u32,
        height: u32,
        format: PixelFormat,
        pages: Vec<PixelBuffer>,
    ) -> Result<Self> {
        check_pages(width, height, format, &pages)?;
        Ok(Self {
            width,
            height,
            format,
            pages,
        })
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn page(&self, index: usize) -> Option<PixelView<'_>> {
        self.pages.get(index).map(PixelBuffer::view)
    }

    fn clear(&mut self) {
        self.pages.clear();
    }

    fn to_pages(&self) -> Vec<PixelBuffer> {
        self.pages.clone()
    }
}

/// All pages in one 3D array; page `i` is layer `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureArray {
    width: u32,
    height: u32,
    depth: usize,
    format: PixelFormat,
    data: PixelData,
}

impl TextureArray {
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Samples of every layer back to back, ready for a 3D texture upload.
    pub fn data(&self) -> &PixelData {
        &self.data
    }

    fn layer_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.component_count as usize
    }
}

impl PageStorage for TextureArray {
    fn from_pages(
        width: u32,
        height: u32,
        format: PixelFormat,
        pages: Vec<PixelBuffer>,
    ) -> Result<Self> {
        check_pages(width, height, format, &pages)?;
        let depth = pages.len();
        let data = if format.is_float() {
            let mut all = Vec::new();
            for page in pages {
                if let PixelData::F32(v) = page.data {
                    all.extend(v);
                }
            }
            PixelData::F32(all)
        } else {
            let mut all = Vec::new();
            for page in pages {
                if let PixelData::U8(v) = page.data {
                    all.extend(v);
                }
            }
            PixelData::U8(all)
        };
        Ok(Self {
            width,
            height,
            depth,
            format,
            data,
        })
    }

    fn page_count(&self) -> usize {
        self.depth
    }

    fn page_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn page(&self, index: usize) -> Option<PixelView<'_>> {
        if index >= self.depth {
            return None;
        }
        let len = self.layer_len();
        let range = index * len..(index + 1) * len;
        let data = match &self.data {
            PixelData::U8(v) => PixelSlice::U8(v.get(range)?),
            PixelData::F32(v) => PixelSlice::F32(v.get(range)?),
        };
        Some(PixelView {
            width: self.width,
            height: self.height,
            format: self.format,
            data,
        })
    }

    fn clear(&mut self) {
        self.depth = 0;
        self.data = PixelData::zeroed(self.format, 0);
    }
}
