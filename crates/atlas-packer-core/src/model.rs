use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if both rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.right() || r.x >= self.right() || self.y >= r.bottom() || r.y >= self.bottom())
    }
    /// Grows the rectangle by `pad` on every side (saturating at 0 on the top-left).
    pub fn expanded(&self, pad: u32) -> Rect {
        let x = self.x.saturating_sub(pad);
        let y = self.y.saturating_sub(pad);
        Rect::new(x, y, self.right() + pad - x, self.bottom() + pad - y)
    }
}

/// Timing of a grid animation. Every frame of the animation carries a copy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnimationGridInfo {
    pub frame_count: u32,
    pub frames_per_line: u32,
    /// Seconds per frame.
    pub frame_duration: f32,
}

impl AnimationGridInfo {
    pub fn new(frame_count: u32, frames_per_line: u32, frame_duration: f32) -> Self {
        Self {
            frame_count,
            frames_per_line,
            frame_duration,
        }
    }

    /// Number of grid rows needed for `frame_count` frames.
    pub fn line_count(&self) -> u32 {
        if self.frames_per_line == 0 {
            return 0;
        }
        self.frame_count.div_ceil(self.frames_per_line)
    }

    /// Unwrapped frame index for an elapsed time: `floor(elapsed / frame_duration)`.
    /// Feed it to `Atlas::get_animation_layout` with a wrap mode.
    pub fn frame_at(&self, elapsed: f32) -> i64 {
        if self.frame_duration <= 0.0 {
            return 0;
        }
        (elapsed / self.frame_duration).floor() as i64
    }
}

/// Where one packed entry lives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BitmapLayout {
    pub page_index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_info: Option<AnimationGridInfo>,
}

/// Normalized texture coordinates of a layout, flipped vertically for bottom-up samplers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureCoordinates {
    pub bottom_left: [f32; 2],
    pub top_right: [f32; 2],
}

impl BitmapLayout {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn texture_coordinates(&self, atlas_width: u32, atlas_height: u32) -> TextureCoordinates {
        let (aw, ah) = (atlas_width.max(1) as f32, atlas_height.max(1) as f32);
        let x0 = self.x as f32 / aw;
        let x1 = (self.x as f32 + self.width as f32) / aw;
        // image rows grow downward, texture v grows upward
        let top = 1.0 - self.y as f32 / ah;
        let bottom = 1.0 - (self.y as f32 + self.height as f32) / ah;
        TextureCoordinates {
            bottom_left: [x0, bottom],
            top_right: [x1, top],
        }
    }
}

/// A packed bitmap. Grid animations keep one layout per frame in `frames`;
/// `layout` is then the first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapInfo {
    pub name: String,
    pub tag: Option<i32>,
    pub layout: BitmapLayout,
    pub frames: Vec<BitmapLayout>,
}

impl BitmapInfo {
    pub fn is_animated(&self) -> bool {
        self.layout.animation_info.is_some()
    }

    pub fn animation_info(&self) -> Option<&AnimationGridInfo> {
        self.layout.animation_info.as_ref()
    }

    /// Number of frames (1 for still bitmaps).
    pub fn frame_count(&self) -> usize {
        if self.frames.is_empty() {
            1
        } else {
            self.frames.len()
        }
    }

    /// Layout of frame `index` without any wrapping.
    pub fn frame_layout(&self, index: usize) -> Option<&BitmapLayout> {
        if self.frames.is_empty() {
            (index == 0).then_some(&self.layout)
        } else {
            self.frames.get(index)
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Bearing {
    pub x: i32,
    pub y: i32,
}

/// One rasterized glyph.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterEntry {
    pub codepoint: u32,
    pub layout: BitmapLayout,
    pub advance_x: i32,
    pub advance_y: i32,
    /// Offset from the pen position to the bitmap's left / top edge.
    pub bearing: Bearing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterSet {
    pub font_name: String,
    pub line_height: f32,
    pub characters: BTreeMap<u32, CharacterEntry>,
}

impl CharacterSet {
    pub fn get(&self, codepoint: u32) -> Option<&CharacterEntry> {
        self.characters.get(&codepoint)
    }

    pub fn get_char(&self, c: char) -> Option<&CharacterEntry> {
        self.get(c as u32)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Entries are addressed by name or by integer tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey<'a> {
    Name(&'a str),
    Tag(i32),
}

impl<'a> From<&'a str> for EntryKey<'a> {
    fn from(v: &'a str) -> Self {
        EntryKey::Name(v)
    }
}

impl<'a> From<&'a String> for EntryKey<'a> {
    fn from(v: &'a String) -> Self {
        EntryKey::Name(v.as_str())
    }
}

impl From<i32> for EntryKey<'_> {
    fn from(v: i32) -> Self {
        EntryKey::Tag(v)
    }
}

/// Handle of a folder inside an arena (input tree or atlas). Folder 0 is the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(pub usize);

impl FolderId {
    pub const ROOT: FolderId = FolderId(0);
}

/// A folder of the atlas: bitmaps, character sets and child folders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FolderInfo {
    pub name: String,
    pub tag: Option<i32>,
    pub parent: Option<FolderId>,
    pub children: Vec<FolderId>,
    pub bitmaps: Vec<BitmapInfo>,
    pub character_sets: Vec<CharacterSet>,
}

impl FolderInfo {
    pub fn new(name: impl Into<String>, tag: Option<i32>, parent: Option<FolderId>) -> Self {
        Self {
            name: name.into(),
            tag,
            parent,
            ..Default::default()
        }
    }

    pub fn bitmap_info<'k>(&self, key: impl Into<EntryKey<'k>>) -> Option<&BitmapInfo> {
        match key.into() {
            EntryKey::Name(name) => self.bitmaps.iter().find(|b| b.name == name),
            EntryKey::Tag(tag) => self.bitmaps.iter().find(|b| b.tag == Some(tag)),
        }
    }

    pub fn character_set(&self, font_name: &str) -> Option<&CharacterSet> {
        self.character_sets.iter().find(|c| c.font_name == font_name)
    }
}

/// Index policy for animation frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WrapMode {
    /// Use the index as is; out-of-range indices give nothing.
    #[default]
    None,
    /// Clamp into `[min, max]`.
    Clamp,
    /// Wrap around `[min, max]`.
    Wrap,
    /// Reject out-of-range indices.
    CheckRanges,
}

/// Applies `mode` to `src` over the inclusive range `[min, max]`.
/// Returns `None` when the index is out of range and the mode does not fix it.
pub fn apply_wrap_mode(src: i64, min: i64, max: i64, mode: WrapMode) -> Option<i64> {
    if max < min {
        return None;
    }
    match mode {
        WrapMode::Clamp => Some(src.clamp(min, max)),
        // +1 because `max` is inside the range
        WrapMode::Wrap => Some(min + (src - min).rem_euclid(max - min + 1)),
        WrapMode::None | WrapMode::CheckRanges => (min..=max).contains(&src).then_some(src),
    }
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtlasStats {
    /// Total number of pages in the atlas.
    pub num_pages: usize,
    /// Number of bitmaps (an animation counts once).
    pub num_bitmaps: usize,
    /// Number of animated bitmaps.
    pub num_animations: usize,
    /// Number of packed rectangles (frames and glyphs included).
    pub num_rects: usize,
    /// Number of glyphs over all character sets.
    pub num_glyphs: usize,
    /// Total area of all pages.
    pub total_page_area: u64,
    /// Total area used by packed rectangles (padding excluded).
    pub used_area: u64,
    /// used_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
}

impl AtlasStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Bitmaps: {} ({} animated), Glyphs: {}, Rects: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px²",
            self.num_pages,
            self.num_bitmaps,
            self.num_animations,
            self.num_glyphs,
            self.num_rects,
            self.occupancy * 100.0,
            self.total_page_area,
            self.used_area,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_page_area.saturating_sub(self.used_area)
    }
}
