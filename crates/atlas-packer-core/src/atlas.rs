use crate::error::{AtlasError, Result};
use crate::model::{
    AtlasStats, BitmapInfo, BitmapLayout, CharacterSet, EntryKey, FolderId, FolderInfo,
    WrapMode, apply_wrap_mode,
};
use crate::pixel::{PixelFormat, PixelView};
use crate::storage::{PageImages, PageStorage, TextureArray};

/// Packed result: pages plus a folder tree of named/tagged entries.
///
/// Folders are kept in an arena, root first; a folder's children always come after it.
/// Apart from [`clear`](Atlas::clear) the atlas is read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Atlas<S = PageImages> {
    pub(crate) atlas_width: u32,
    pub(crate) atlas_height: u32,
    pub(crate) padding: u32,
    pub(crate) pages: S,
    pub(crate) folders: Vec<FolderInfo>,
}

/// Atlas whose pages are the layers of one 3D pixel array.
pub type TextureArrayAtlas = Atlas<TextureArray>;

impl<S: PageStorage> Atlas<S> {
    /// Assembles an atlas from parts (used by generation and loading).
    pub fn from_parts(
        atlas_width: u32,
        atlas_height: u32,
        padding: u32,
        pages: S,
        folders: Vec<FolderInfo>,
    ) -> Result<Self> {
        if pages.page_count() > 0 && pages.page_size() != (atlas_width, atlas_height) {
            let (w, h) = pages.page_size();
            return Err(AtlasError::Corrupt(format!(
                "pages are {}x{}, atlas is {}x{}",
                w, h, atlas_width, atlas_height
            )));
        }
        if folders.is_empty() {
            return Err(AtlasError::Corrupt("missing root folder".into()));
        }
        Ok(Self {
            atlas_width,
            atlas_height,
            padding,
            pages,
            folders,
        })
    }

    pub fn atlas_width(&self) -> u32 {
        self.atlas_width
    }

    pub fn atlas_height(&self) -> u32 {
        self.atlas_height
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// The one pixel format shared by every page.
    pub fn pixel_format(&self) -> PixelFormat {
        self.pages.pixel_format()
    }

    pub fn page_count(&self) -> usize {
        self.pages.page_count()
    }

    pub fn page(&self, index: usize) -> Option<PixelView<'_>> {
        self.pages.page(index)
    }

    pub fn storage(&self) -> &S {
        &self.pages
    }

    pub fn root(&self) -> &FolderInfo {
        &self.folders[FolderId::ROOT.0]
    }

    pub fn folder_by_id(&self, id: FolderId) -> Option<&FolderInfo> {
        self.folders.get(id.0)
    }

    /// All folders, root first, parents before children.
    pub fn folders(&self) -> &[FolderInfo] {
        &self.folders
    }

    /// Folder at `path` (`"a/b"`); `""` is the root.
    pub fn folder(&self, path: &str) -> Option<&FolderInfo> {
        let mut current = self.folders.first()?;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let id = current
                .children
                .iter()
                .copied()
                .find(|c| self.folders.get(c.0).is_some_and(|f| f.name == part))?;
            current = self.folders.get(id.0)?;
        }
        Some(current)
    }

    /// Looks up a bitmap in the folder at `folder_path` by name or tag.
    pub fn get_bitmap_info<'k>(
        &self,
        folder_path: &str,
        key: impl Into<EntryKey<'k>>,
    ) -> Option<&BitmapInfo> {
        self.folder(folder_path)?.bitmap_info(key)
    }

    /// Depth-first search of the whole tree for a bitmap.
    pub fn find_bitmap_info<'k>(&self, key: impl Into<EntryKey<'k>>) -> Option<&BitmapInfo> {
        let key = key.into();
        self.walk().find_map(|f| f.bitmap_info(key))
    }

    /// Depth-first search of the whole tree for a character set.
    pub fn character_set(&self, font_name: &str) -> Option<&CharacterSet> {
        self.walk().find_map(|f| f.character_set(font_name))
    }

    /// Layout of frame `frame_index` after applying `wrap` over the bitmap's frames.
    /// Still bitmaps have a single frame 0.
    pub fn get_animation_layout<'a>(
        &self,
        info: &'a BitmapInfo,
        frame_index: i64,
        wrap: WrapMode,
    ) -> Option<&'a BitmapLayout> {
        let last = info.frame_count() as i64 - 1;
        let index = apply_wrap_mode(frame_index, 0, last, wrap)?;
        info.frame_layout(index as usize)
    }

    /// Folders in depth-first pre-order, children in insertion order.
    pub fn walk(&self) -> impl Iterator<Item = &FolderInfo> + '_ {
        let mut stack = vec![FolderId::ROOT];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            let folder = self.folders.get(id.0)?;
            stack.extend(folder.children.iter().rev().copied());
            Some(folder)
        })
    }

    /// Every packed rectangle with a non-zero area (frames and glyphs included).
    pub fn layouts(&self) -> impl Iterator<Item = &BitmapLayout> + '_ {
        self.folders.iter().flat_map(|f| {
            let bitmaps = f.bitmaps.iter().flat_map(|b| {
                if b.frames.is_empty() {
                    std::slice::from_ref(&b.layout).iter()
                } else {
                    b.frames.iter()
                }
            });
            let glyphs = f
                .character_sets
                .iter()
                .flat_map(|c| c.characters.values().map(|e| &e.layout));
            bitmaps
                .chain(glyphs)
                .filter(|l| l.width > 0 && l.height > 0)
        })
    }

    /// Checks that every rectangle keeps `padding` to the page edges and that padded
    /// rectangles on one page never overlap.
    pub fn validate_layout(&self) -> Result<()> {
        let pad = self.padding;
        let mut per_page: Vec<Vec<&BitmapLayout>> = vec![Vec::new(); self.page_count()];
        for l in self.layouts() {
            let inside = l.x >= pad
                && l.y >= pad
                && l.x as u64 + l.width as u64 + pad as u64 <= self.atlas_width as u64
                && l.y as u64 + l.height as u64 + pad as u64 <= self.atlas_height as u64;
            if !inside {
                return Err(AtlasError::Corrupt(format!(
                    "rect {:?} breaks the {}px margin of a {}x{} page",
                    l.rect(),
                    pad,
                    self.atlas_width,
                    self.atlas_height
                )));
            }
            per_page
                .get_mut(l.page_index)
                .ok_or_else(|| AtlasError::Corrupt(format!("page {} missing", l.page_index)))?
                .push(l);
        }
        for (page, rects) in per_page.iter().enumerate() {
            for (i, a) in rects.iter().enumerate() {
                let ra = a.rect().expanded(pad);
                for b in &rects[i + 1..] {
                    if ra.intersects(&b.rect().expanded(pad)) {
                        return Err(AtlasError::Corrupt(format!(
                            "rects {:?} and {:?} overlap on page {}",
                            a.rect(),
                            b.rect(),
                            page
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> AtlasStats {
        let mut stats = AtlasStats {
            num_pages: self.page_count(),
            num_bitmaps: 0,
            num_animations: 0,
            num_rects: 0,
            num_glyphs: 0,
            total_page_area: self.page_count() as u64
                * self.atlas_width as u64
                * self.atlas_height as u64,
            used_area: 0,
            occupancy: 0.0,
        };
        for f in &self.folders {
            stats.num_bitmaps += f.bitmaps.len();
            stats.num_animations += f.bitmaps.iter().filter(|b| b.is_animated()).count();
            stats.num_glyphs += f.character_sets.iter().map(CharacterSet::len).sum::<usize>();
        }
        for l in self.layouts() {
            stats.num_rects += 1;
            stats.used_area += l.rect().area();
        }
        if stats.total_page_area > 0 {
            stats.occupancy = stats.used_area as f64 / stats.total_page_area as f64;
        }
        stats
    }

    /// Drops pages and entries, leaving an empty root.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.folders = vec![FolderInfo::default()];
    }

    /// Moves the pages into another storage strategy; the layout is unchanged.
    pub fn into_storage<T: PageStorage>(self) -> Result<Atlas<T>> {
        let pages = T::from_pages(
            self.atlas_width,
            self.atlas_height,
            self.pages.pixel_format(),
            self.pages.to_pages(),
        )?;
        Ok(Atlas {
            atlas_width: self.atlas_width,
            atlas_height: self.atlas_height,
            padding: self.padding,
            pages,
            folders: self.folders,
        })
    }
}
