//! On-disk form of an atlas: one JSON index plus one image file per page.
//!
//! `save_atlas("out/ui.json")` writes `out/ui.json` and `out/ui_0.png`, `out/ui_1.png`, ...
//! Unsigned-byte pages are PNG; float pages are OpenEXR (gray float pages are widened to
//! RGB in the file and collapsed back on load). Reloading gives back the same folder
//! tree, the same layouts and byte-identical pages, without packing anything.

use crate::atlas::Atlas;
use crate::error::{AtlasError, Result};
use crate::model::{
    AnimationGridInfo, Bearing, BitmapInfo, BitmapLayout, CharacterEntry, CharacterSet, FolderId,
    FolderInfo,
};
use crate::pixel::{PixelBuffer, PixelFormat};
use crate::storage::PageStorage;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDocument {
    pub atlas_width: u32,
    pub atlas_height: u32,
    #[serde(default)]
    pub padding: u32,
    pub pixel_format: PixelFormat,
    pub pages: Vec<PageDoc>,
    /// Entries of the root folder.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bitmaps: Vec<BitmapDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub character_sets: Vec<CharacterSetDoc>,
    #[serde(default)]
    pub folders: Vec<FolderDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageDoc {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Page image, relative to the index file.
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<i32>,
    #[serde(default)]
    pub folders: Vec<FolderDoc>,
    #[serde(default)]
    pub bitmaps: Vec<BitmapDoc>,
    #[serde(default)]
    pub character_sets: Vec<CharacterSetDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BitmapDoc {
    pub name: String,
    pub tag: Option<i32>,
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationGridInfo>,
    /// Every frame of an animation, frame 0 first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<FrameDoc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FrameDoc {
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterSetDoc {
    pub font_name: String,
    pub line_height: f32,
    pub glyphs: Vec<GlyphDoc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GlyphDoc {
    pub codepoint: u32,
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub advance_x: i32,
    pub advance_y: i32,
    pub bearing: Bearing,
}

impl FrameDoc {
    fn from_layout(l: &BitmapLayout) -> Self {
        Self {
            page: l.page_index,
            x: l.x,
            y: l.y,
            width: l.width,
            height: l.height,
        }
    }

    fn to_layout(self, animation_info: Option<AnimationGridInfo>) -> BitmapLayout {
        BitmapLayout {
            page_index: self.page,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            animation_info,
        }
    }
}

impl BitmapDoc {
    fn from_info(info: &BitmapInfo) -> Self {
        let l = &info.layout;
        Self {
            name: info.name.clone(),
            tag: info.tag,
            page: l.page_index,
            x: l.x,
            y: l.y,
            width: l.width,
            height: l.height,
            animation: l.animation_info,
            frames: info.frames.iter().map(FrameDoc::from_layout).collect(),
        }
    }

    fn into_info(self) -> BitmapInfo {
        let layout = FrameDoc {
            page: self.page,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
        .to_layout(self.animation);
        BitmapInfo {
            name: self.name,
            tag: self.tag,
            layout,
            frames: self
                .frames
                .into_iter()
                .map(|f| f.to_layout(self.animation))
                .collect(),
        }
    }
}

impl CharacterSetDoc {
    fn from_set(set: &CharacterSet) -> Self {
        Self {
            font_name: set.font_name.clone(),
            line_height: set.line_height,
            glyphs: set
                .characters
                .values()
                .map(|c| GlyphDoc {
                    codepoint: c.codepoint,
                    page: c.layout.page_index,
                    x: c.layout.x,
                    y: c.layout.y,
                    width: c.layout.width,
                    height: c.layout.height,
                    advance_x: c.advance_x,
                    advance_y: c.advance_y,
                    bearing: c.bearing,
                })
                .collect(),
        }
    }

    fn into_set(self) -> CharacterSet {
        let characters = self
            .glyphs
            .into_iter()
            .map(|g| {
                let entry = CharacterEntry {
                    codepoint: g.codepoint,
                    layout: BitmapLayout {
                        page_index: g.page,
                        x: g.x,
                        y: g.y,
                        width: g.width,
                        height: g.height,
                        animation_info: None,
                    },
                    advance_x: g.advance_x,
                    advance_y: g.advance_y,
                    bearing: g.bearing,
                };
                (g.codepoint, entry)
            })
            .collect();
        CharacterSet {
            font_name: self.font_name,
            line_height: self.line_height,
            characters,
        }
    }
}

fn folder_doc(folders: &[FolderInfo], id: FolderId) -> FolderDoc {
    let f = &folders[id.0];
    FolderDoc {
        name: f.name.clone(),
        tag: f.tag,
        folders: f.children.iter().map(|&c| folder_doc(folders, c)).collect(),
        bitmaps: f.bitmaps.iter().map(BitmapDoc::from_info).collect(),
        character_sets: f.character_sets.iter().map(CharacterSetDoc::from_set).collect(),
    }
}

/// Rebuilds the arena in depth-first order from nested documents.
fn push_folder(folders: &mut Vec<FolderInfo>, parent: FolderId, doc: FolderDoc) {
    let id = FolderId(folders.len());
    let mut info = FolderInfo::new(doc.name, doc.tag, Some(parent));
    info.bitmaps = doc.bitmaps.into_iter().map(BitmapDoc::into_info).collect();
    info.character_sets = doc
        .character_sets
        .into_iter()
        .map(CharacterSetDoc::into_set)
        .collect();
    folders.push(info);
    folders[parent.0].children.push(id);
    for child in doc.folders {
        push_folder(folders, id, child);
    }
}

/// Page file name for page `index` of an index named `stem`.
pub fn page_file_name(stem: &str, index: usize, format: PixelFormat) -> String {
    let ext = if format.is_float() { "exr" } else { "png" };
    format!("{}_{}.{}", stem, index, ext)
}

fn index_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

impl<S: PageStorage> Atlas<S> {
    /// The index document describing this atlas, with page files named after `stem`.
    pub fn index_document(&self, stem: &str) -> IndexDocument {
        let format = self.pixel_format();
        let root = self.root();
        IndexDocument {
            atlas_width: self.atlas_width,
            atlas_height: self.atlas_height,
            padding: self.padding,
            pixel_format: format,
            pages: (0..self.page_count())
                .map(|index| PageDoc {
                    index,
                    width: self.atlas_width,
                    height: self.atlas_height,
                    file: page_file_name(stem, index, format),
                })
                .collect(),
            bitmaps: root.bitmaps.iter().map(BitmapDoc::from_info).collect(),
            character_sets: root.character_sets.iter().map(CharacterSetDoc::from_set).collect(),
            folders: root
                .children
                .iter()
                .map(|&c| folder_doc(&self.folders, c))
                .collect(),
        }
    }

    /// Writes the index (`path` with a `.json` extension) and one image per page next to it.
    /// Files already written are left in place when a later write fails.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save_atlas(&self, path: impl AsRef<Path>) -> Result<()> {
        let index = index_path(path.as_ref());
        let stem = index
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| AtlasError::InvalidConfig(format!("bad atlas path {:?}", index)))?
            .to_string();
        let dir = index.parent().unwrap_or_else(|| Path::new(""));
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }

        let doc = self.index_document(&stem);
        let format = if self.pixel_format().is_float() {
            ImageFormat::OpenExr
        } else {
            ImageFormat::Png
        };
        for page in &doc.pages {
            let view = self
                .page(page.index)
                .ok_or_else(|| AtlasError::Corrupt(format!("page {} missing", page.index)))?;
            let file = dir.join(&page.file);
            view.to_dynamic_image()?.save_with_format(&file, format)?;
            debug!(file = %file.display(), "wrote page");
        }
        fs::write(&index, serde_json::to_string_pretty(&doc)?)?;
        info!(pages = doc.pages.len(), "saved atlas");
        Ok(())
    }
}

impl Atlas {
    /// Loads an atlas saved with [`Atlas::save_atlas`] into separate page images.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_atlas(path)
    }
}

/// Loads an atlas written by `save_atlas`, storing pages with strategy `S`.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_atlas<S: PageStorage>(path: impl AsRef<Path>) -> Result<Atlas<S>> {
    let index = index_path(path.as_ref());
    let dir = index.parent().unwrap_or_else(|| Path::new(""));
    let doc: IndexDocument = serde_json::from_str(&fs::read_to_string(&index)?)?;
    from_document(doc, dir)
}

/// Builds an atlas from an index document, reading page files relative to `dir`.
pub fn from_document<S: PageStorage>(doc: IndexDocument, dir: &Path) -> Result<Atlas<S>> {
    let (w, h, format) = (doc.atlas_width, doc.atlas_height, doc.pixel_format);
    if w == 0 || h == 0 {
        return Err(AtlasError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    if !format.is_color_pixel() {
        return Err(AtlasError::Corrupt(format!("unsupported page format {}", format)));
    }

    let mut pages = Vec::with_capacity(doc.pages.len());
    for (i, page) in doc.pages.iter().enumerate() {
        if page.index != i || page.width != w || page.height != h {
            return Err(AtlasError::Corrupt(format!(
                "page entry {} ({}x{}, index {}) does not match a {}x{} atlas",
                i, page.width, page.height, page.index, w, h
            )));
        }
        let file = dir.join(&page.file);
        let image = image::open(&file)?;
        if image.width() != w || image.height() != h {
            return Err(AtlasError::Corrupt(format!(
                "{} is {}x{}, expected {}x{}",
                file.display(),
                image.width(),
                image.height(),
                w,
                h
            )));
        }
        pages.push(PixelBuffer::from_image_as(image, format)?);
    }

    let root = FolderInfo {
        bitmaps: doc.bitmaps.into_iter().map(BitmapDoc::into_info).collect(),
        character_sets: doc
            .character_sets
            .into_iter()
            .map(CharacterSetDoc::into_set)
            .collect(),
        ..Default::default()
    };
    let mut folders = vec![root];
    for child in doc.folders {
        push_folder(&mut folders, FolderId::ROOT, child);
    }

    let storage = S::from_pages(w, h, format, pages)?;
    let atlas = Atlas::from_parts(w, h, doc.padding, storage, folders)?;
    for l in atlas.layouts() {
        if l.page_index >= atlas.page_count() {
            return Err(AtlasError::Corrupt(format!(
                "entry at {:?} refers to missing page {}",
                l.rect(),
                l.page_index
            )));
        }
    }
    atlas.validate_layout()?;
    info!(pages = atlas.page_count(), "loaded atlas");
    Ok(atlas)
}
