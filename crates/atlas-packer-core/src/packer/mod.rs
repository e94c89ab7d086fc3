use crate::model::Rect;

pub mod maxrects;

use maxrects::MaxRectsPacker;

/// A packer places rectangles into one page.
///
/// Implementations must ensure no overlaps and keep the configured padding around every
/// placed rectangle. `pack` returns `None` if the rectangle does not fit in what is left.
pub trait Packer {
    /// Whether a `w x h` entry fits on an empty page at all.
    fn fits_empty(&self, w: u32, h: u32) -> bool;
    fn can_pack(&self, w: u32, h: u32) -> bool;
    /// Places a `w x h` entry and returns its content rectangle (padding excluded).
    fn pack(&mut self, w: u32, h: u32) -> Option<Rect>;
}

/// Where a rectangle landed in a [`PageSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub page_index: usize,
    pub rect: Rect,
}

/// Grows pages on demand: existing pages are tried in creation order, then a new page
/// is opened.
#[derive(Debug, Clone)]
pub struct PageSet {
    width: u32,
    height: u32,
    padding: u32,
    pages: Vec<MaxRectsPacker>,
}

impl PageSet {
    pub fn new(width: u32, height: u32, padding: u32) -> Self {
        Self {
            width,
            height,
            padding,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether a `w x h` entry can be placed on some page, new or existing.
    pub fn fits(&self, w: u32, h: u32) -> bool {
        MaxRectsPacker::new(self.width, self.height, self.padding).fits_empty(w, h)
    }

    /// Places a `w x h` entry; `None` only when it exceeds an empty page.
    pub fn place(&mut self, w: u32, h: u32) -> Option<Placement> {
        for (page_index, page) in self.pages.iter_mut().enumerate() {
            if let Some(rect) = page.pack(w, h) {
                return Some(Placement { page_index, rect });
            }
        }
        let mut page = MaxRectsPacker::new(self.width, self.height, self.padding);
        if !page.fits_empty(w, h) {
            return None;
        }
        let rect = page.pack(w, h)?;
        self.pages.push(page);
        Some(Placement {
            page_index: self.pages.len() - 1,
            rect,
        })
    }
}
