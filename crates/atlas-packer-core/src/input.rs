//! Builder-side description of an atlas: a tree of folders holding bitmaps, grid
//! animations and character-set requests.
//!
//! Folders live in an arena owned by [`AtlasInput`] and are addressed by [`FolderId`].
//! [`FolderInput`] is a short-lived mutable handle on one folder:
//!
//! ```ignore
//! let mut input = AtlasInput::new();
//! let mut sprites = input.add_folder("sprites", None)?;
//! sprites.add_bitmap(hero, "hero", Some(1))?;
//! sprites.add_animated_bitmap(walk, "walk", None, AnimationGridInfo::new(10, 5, 0.1))?;
//! ```

use crate::error::{AtlasError, Result};
use crate::glyph::GlyphRasterizer;
use crate::model::{AnimationGridInfo, FolderId};
use crate::pixel::PixelBuffer;
use std::fmt;

/// One bitmap source: a still image, an animation grid, or a list of animation frames.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub name: String,
    pub tag: Option<i32>,
    /// The image itself, or the first frame of a frame list.
    pub pixels: PixelBuffer,
    pub animation: Option<AnimationGridInfo>,
    /// Frames after the first one; non-empty only for frame-list animations, whose
    /// grid is then a single line of `1 + child_frames.len()` frames.
    pub child_frames: Vec<PixelBuffer>,
}

impl SourceEntry {
    /// Whether the animation comes from separate images rather than a grid.
    pub fn is_frame_list(&self) -> bool {
        !self.child_frames.is_empty()
    }

    /// Image of frame `index` of a frame list (frame 0 is `pixels`).
    pub fn frame_pixels(&self, index: usize) -> Option<&PixelBuffer> {
        match index {
            0 => Some(&self.pixels),
            i => self.child_frames.get(i - 1),
        }
    }
}

/// A character set to rasterize during generation.
pub struct CharacterSetRequest {
    pub rasterizer: Box<dyn GlyphRasterizer>,
    /// Deduplicated, in request order.
    pub codepoints: Vec<u32>,
    pub pixel_size: f32,
}

impl CharacterSetRequest {
    pub fn font_name(&self) -> &str {
        self.rasterizer.font_name()
    }
}

impl fmt::Debug for CharacterSetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterSetRequest")
            .field("font_name", &self.font_name())
            .field("codepoints", &self.codepoints.len())
            .field("pixel_size", &self.pixel_size)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct FolderInfoInput {
    pub name: String,
    pub tag: Option<i32>,
    pub parent: Option<FolderId>,
    pub children: Vec<FolderId>,
    pub bitmaps: Vec<SourceEntry>,
    pub character_sets: Vec<CharacterSetRequest>,
}

/// Sources for one generation. Consumed by `AtlasGenerator::generate`.
#[derive(Debug)]
pub struct AtlasInput {
    folders: Vec<FolderInfoInput>,
}

impl Default for AtlasInput {
    fn default() -> Self {
        Self::new()
    }
}

impl AtlasInput {
    pub fn new() -> Self {
        Self {
            folders: vec![FolderInfoInput::default()],
        }
    }

    /// Handle on the unnamed root folder.
    pub fn root(&mut self) -> FolderInput<'_> {
        FolderInput {
            input: self,
            id: FolderId::ROOT,
        }
    }

    /// Adds (or finds) a folder directly under the root.
    pub fn add_folder(&mut self, name: &str, tag: Option<i32>) -> Result<FolderInput<'_>> {
        let id = self.add_child_folder(FolderId::ROOT, name, tag)?;
        Ok(FolderInput { input: self, id })
    }

    pub fn folder(&mut self, id: FolderId) -> Option<FolderInput<'_>> {
        if id.0 < self.folders.len() {
            Some(FolderInput { input: self, id })
        } else {
            None
        }
    }

    pub fn folder_info(&self, id: FolderId) -> Option<&FolderInfoInput> {
        self.folders.get(id.0)
    }

    /// All folders, root first, in creation order.
    pub fn folders(&self) -> &[FolderInfoInput] {
        &self.folders
    }

    /// Number of bitmap sources and character-set requests over the whole tree.
    pub fn entry_count(&self) -> usize {
        self.folders
            .iter()
            .map(|f| f.bitmaps.len() + f.character_sets.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn into_folders(self) -> Vec<FolderInfoInput> {
        self.folders
    }

    fn add_child_folder(
        &mut self,
        parent: FolderId,
        name: &str,
        tag: Option<i32>,
    ) -> Result<FolderId> {
        // paths are split on '/', so such names could never be looked up
        if name.is_empty() || name.contains('/') {
            return Err(AtlasError::invalid_input(
                name,
                "folder names must be non-empty and contain no '/'",
            ));
        }
        let existing = self.folders[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.folders[c.0].name == name);
        if let Some(id) = existing {
            return Ok(id);
        }
        let id = FolderId(self.folders.len());
        self.folders.push(FolderInfoInput {
            name: name.to_string(),
            tag,
            parent: Some(parent),
            ..Default::default()
        });
        self.folders[parent.0].children.push(id);
        Ok(id)
    }
}

/// Mutable handle on one folder of an [`AtlasInput`].
#[derive(Debug)]
pub struct FolderInput<'a> {
    input: &'a mut AtlasInput,
    id: FolderId,
}

impl<'a> FolderInput<'a> {
    pub fn id(&self) -> FolderId {
        self.id
    }

    pub fn info(&self) -> &FolderInfoInput {
        &self.input.folders[self.id.0]
    }

    /// Adds a child folder; returns the existing one when `name` is already taken.
    pub fn add_folder(&mut self, name: &str, tag: Option<i32>) -> Result<FolderInput<'_>> {
        let id = self.input.add_child_folder(self.id, name, tag)?;
        Ok(FolderInput {
            input: &mut *self.input,
            id,
        })
    }

    /// Like `add_folder`, but moves the handle down into the child.
    pub fn into_folder(self, name: &str, tag: Option<i32>) -> Result<FolderInput<'a>> {
        let id = self.input.add_child_folder(self.id, name, tag)?;
        Ok(FolderInput {
            input: self.input,
            id,
        })
    }

    /// Adds a still bitmap.
    pub fn add_bitmap(
        &mut self,
        pixels: PixelBuffer,
        name: &str,
        tag: Option<i32>,
    ) -> Result<&mut Self> {
        self.push_bitmap(SourceEntry {
            name: name.to_string(),
            tag,
            pixels,
            animation: None,
            child_frames: Vec::new(),
        })
    }

    /// Adds a bitmap sliced into `grid.frame_count` frames, `grid.frames_per_line` per row.
    pub fn add_animated_bitmap(
        &mut self,
        pixels: PixelBuffer,
        name: &str,
        tag: Option<i32>,
        grid: AnimationGridInfo,
    ) -> Result<&mut Self> {
        self.push_bitmap(SourceEntry {
            name: name.to_string(),
            tag,
            pixels,
            animation: Some(grid),
            child_frames: Vec::new(),
        })
    }

    /// Adds an animation made of separate images (decoded GIF frames, for instance).
    /// Frames may differ in size; each one is packed on its own.
    pub fn add_frame_animation(
        &mut self,
        frames: Vec<PixelBuffer>,
        name: &str,
        tag: Option<i32>,
        frame_duration: f32,
    ) -> Result<&mut Self> {
        let mut frames = frames.into_iter();
        let Some(first) = frames.next() else {
            return Err(AtlasError::invalid_input(name, "animation has no frames"));
        };
        let child_frames: Vec<PixelBuffer> = frames.collect();
        let count = 1 + child_frames.len() as u32;
        self.push_bitmap(SourceEntry {
            name: name.to_string(),
            tag,
            pixels: first,
            animation: Some(AnimationGridInfo::new(count, count, frame_duration)),
            child_frames,
        })
    }

    /// Requests glyphs for `codepoints` from `rasterizer` at `pixel_size`.
    pub fn add_character_set(
        &mut self,
        rasterizer: Box<dyn GlyphRasterizer>,
        codepoints: impl IntoIterator<Item = u32>,
        pixel_size: f32,
    ) -> Result<&mut Self> {
        let font_name = rasterizer.font_name().to_string();
        if font_name.is_empty() {
            return Err(AtlasError::invalid_input("<character set>", "empty font name"));
        }
        let folder = &mut self.input.folders[self.id.0];
        if folder.character_sets.iter().any(|c| c.font_name() == font_name) {
            return Err(AtlasError::invalid_input(
                font_name,
                "character set already present in folder",
            ));
        }
        let mut unique: Vec<u32> = Vec::new();
        for cp in codepoints {
            if !unique.contains(&cp) {
                unique.push(cp);
            }
        }
        folder.character_sets.push(CharacterSetRequest {
            rasterizer,
            codepoints: unique,
            pixel_size,
        });
        Ok(self)
    }

    fn push_bitmap(&mut self, entry: SourceEntry) -> Result<&mut Self> {
        if entry.name.is_empty() {
            return Err(AtlasError::invalid_input("<bitmap>", "empty name"));
        }
        let folder = &mut self.input.folders[self.id.0];
        if folder.bitmaps.iter().any(|b| b.name == entry.name) {
            return Err(AtlasError::invalid_input(
                entry.name,
                "name already used in folder",
            ));
        }
        if let Some(tag) = entry.tag {
            if folder.bitmaps.iter().any(|b| b.tag == Some(tag)) {
                return Err(AtlasError::invalid_input(
                    entry.name,
                    format!("tag {} already used in folder", tag),
                ));
            }
        }
        folder.bitmaps.push(entry);
        Ok(self)
    }
}
