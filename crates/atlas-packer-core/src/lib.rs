//! Core library for building texture atlases.
//!
//! - Sources: still bitmaps, animations (grid sheets or frame lists) and font glyphs, grouped
//!   in a folder tree (`AtlasInput`)
//! - Pixel formats: every source format is merged into one page format (`PixelFormatMerger`)
//! - Packing: MaxRects best-short-side-fit over fixed-size pages, largest first, stable order
//! - Output: an `Atlas` with name/tag lookups, animation frame lookups and a lossless
//!   save/load contract (JSON index + PNG/EXR pages)
//!
//! Quick example:
//! ```ignore
//! use atlas_packer_core::prelude::*;
//! # fn main() -> atlas_packer_core::Result<()> {
//! let mut input = AtlasInput::new();
//! input
//!     .add_folder("ui", None)?
//!     .add_bitmap(PixelBuffer::zeroed(64, 64, PixelFormat::RGBA), "button", Some(1))?;
//! let params = AtlasGeneratorParams::builder().with_dimensions(256, 256).padding(1).build();
//! let atlas = generate_atlas(input, params)?;
//! let button = atlas.get_bitmap_info("ui", "button").unwrap();
//! println!("page {} at {},{}", button.layout.page_index, button.layout.x, button.layout.y);
//! atlas.save_atlas("out/ui.json")?;
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod compositing;
pub mod config;
pub mod error;
pub mod generator;
pub mod glyph;
pub mod index;
pub mod input;
pub mod merger;
pub mod model;
pub mod packer;
pub mod pixel;
pub mod storage;

pub use atlas::*;
pub use config::*;
pub use error::*;
pub use generator::*;
pub use glyph::*;
pub use index::{load_atlas, page_file_name};
pub use input::*;
pub use merger::*;
pub use model::*;
pub use pixel::*;
pub use storage::*;

/// Convenience prelude for common types and functions.
/// Importing `atlas_packer_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::{Atlas, TextureArrayAtlas};
    pub use crate::config::{AtlasGeneratorParams, AtlasGeneratorParamsBuilder};
    pub use crate::error::{AtlasError, Result};
    pub use crate::generator::{AtlasGenerator, GenerationContext, SkippedEntry, generate_atlas};
    pub use crate::glyph::{GlyphRasterizer, RasterizedGlyph};
    pub use crate::index::load_atlas;
    pub use crate::input::{AtlasInput, FolderInput};
    pub use crate::merger::{PixelFormatMergeParams, PixelFormatMerger};
    pub use crate::model::{
        AnimationGridInfo, AtlasStats, Bearing, BitmapInfo, BitmapLayout, CharacterEntry,
        CharacterSet, EntryKey, FolderId, FolderInfo, Rect, WrapMode, apply_wrap_mode,
    };
    pub use crate::pixel::{PixelBuffer, PixelComponentType, PixelFormat};
    pub use crate::storage::{PageImages, PageStorage, TextureArray};
}
