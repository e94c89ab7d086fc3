use crate::model::Rect;
use crate::pixel::{PixelBuffer, PixelFormat, PixelView, blit_converted};

/// One copy from a source image into a page.
#[derive(Debug, Clone, Copy)]
pub struct Blit<'a> {
    pub src: PixelView<'a>,
    /// Top-left of the copied block inside `src` (non-zero for animation frames).
    pub src_x: u32,
    pub src_y: u32,
    pub page_index: usize,
    /// Destination rectangle; its size is the size of the copied block.
    pub dst: Rect,
}

/// Allocates `page_count` zeroed `width x height` pages in `format` and applies `blits`,
/// converting source samples to `format` on the way.
pub fn compose_pages(
    width: u32,
    height: u32,
    format: PixelFormat,
    page_count: usize,
    blits: &[Blit<'_>],
) -> Vec<PixelBuffer> {
    let mut pages: Vec<PixelBuffer> = (0..page_count)
        .map(|_| PixelBuffer::zeroed(width, height, format))
        .collect();
    for b in blits {
        let Some(page) = pages.get_mut(b.page_index) else {
            continue;
        };
        blit_converted(
            &b.src, b.src_x, b.src_y, b.dst.w, b.dst.h, page, b.dst.x, b.dst.y,
        );
    }
    pages
}
