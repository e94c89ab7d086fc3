use crate::atlas::Atlas;
use crate::compositing::{Blit, compose_pages};
use crate::config::AtlasGeneratorParams;
use crate::error::{AtlasError, Result};
use crate::input::{AtlasInput, FolderInfoInput, SourceEntry};
use crate::merger::PixelFormatMerger;
use crate::model::{
    AnimationGridInfo, BitmapInfo, BitmapLayout, CharacterEntry, CharacterSet, FolderId,
    FolderInfo,
};
use crate::packer::PageSet;
use crate::pixel::{PixelBuffer, PixelView};
use crate::storage::{PageImages, PageStorage};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// An input entry left out of the atlas, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Folder path, `"a/b"`; empty for the root.
    pub folder: String,
    pub name: String,
    pub reason: String,
}

/// Caller-owned state of one generation: the pixel format merger and the diagnostics.
/// Both are reset at the start of every `generate` call.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    merger: PixelFormatMerger,
    skipped: Vec<SkippedEntry>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merger state of the last generation.
    pub fn merger(&self) -> &PixelFormatMerger {
        &self.merger
    }

    /// Entries skipped by the last generation, in collection order.
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    fn skip(&mut self, folder: &str, name: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(folder, name, %reason, "skipping input entry");
        self.skipped.push(SkippedEntry {
            folder: folder.to_string(),
            name: name.to_string(),
            reason,
        });
    }
}

/// Where a packed rectangle's layout goes in the output tree.
#[derive(Debug, Clone, Copy)]
enum SourceKind {
    Bitmap {
        folder: usize,
        bitmap: usize,
        frame: Option<usize>,
    },
    Glyph {
        folder: usize,
        set: usize,
        codepoint: u32,
    },
}

/// Where a packed rectangle's pixels come from.
#[derive(Debug, Clone, Copy)]
enum PixelSource {
    Input {
        folder: usize,
        bitmap: usize,
        /// Image of a frame-list animation; 0 for stills and grids.
        frame: usize,
    },
    Glyph(usize),
}

struct Prep {
    name: String,
    kind: SourceKind,
    source: PixelSource,
    src_x: u32,
    src_y: u32,
    w: u32,
    h: u32,
}

/// The packing engine: input tree in, atlas out.
#[derive(Debug, Clone, Default)]
pub struct AtlasGenerator {
    params: AtlasGeneratorParams,
}

impl AtlasGenerator {
    pub fn new(params: AtlasGeneratorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AtlasGeneratorParams {
        &self.params
    }

    /// Packs `input` into pages.
    ///
    /// Notes:
    /// - Malformed entries are skipped and reported in `ctx.skipped()`.
    /// - An entry larger than an empty page aborts with `OutOfSpace`; nothing is returned.
    /// - Sorting is stable, so identical inputs give identical atlases.
    #[instrument(skip_all)]
    pub fn generate(&self, input: AtlasInput, ctx: &mut GenerationContext) -> Result<Atlas> {
        self.params.validate()?;
        ctx.merger.reset(self.params.merge_params);
        ctx.skipped.clear();

        let inputs = input.into_folders();
        let order = depth_first(&inputs);
        let mut folders = skeleton(&inputs, &order);
        let mut glyph_pixels: Vec<PixelBuffer> = Vec::new();

        // Phase 1: collect & normalize
        let mut prepared = Vec::new();
        for (out_id, &id) in order.iter().enumerate() {
            self.collect_folder(
                &inputs,
                id,
                FolderId(out_id),
                &mut folders[out_id],
                &mut glyph_pixels,
                &mut prepared,
                ctx,
            );
        }
        if prepared.is_empty() {
            return Err(AtlasError::Empty);
        }
        debug!(
            rects = prepared.len(),
            glyphs = glyph_pixels.len(),
            skipped = ctx.skipped.len(),
            "collected sources"
        );

        // Phase 2: pack
        let format = ctx.merger.resolve()?;
        info!(
            %format,
            identical = ctx.merger.are_incoming_formats_identical(),
            "merged pixel format"
        );
        prepared.sort_by(|a, b| b.w.max(b.h).cmp(&a.w.max(a.h)));

        let (aw, ah, pad) = (
            self.params.atlas_width,
            self.params.atlas_height,
            self.params.padding,
        );
        let mut pages = PageSet::new(aw, ah, pad);
        let mut blits: Vec<Blit<'_>> = Vec::with_capacity(prepared.len());
        for p in &prepared {
            let placement = pages.place(p.w, p.h).ok_or_else(|| AtlasError::OutOfSpace {
                name: p.name.clone(),
                width: p.w,
                height: p.h,
                padding: pad,
                page_width: aw,
                page_height: ah,
            })?;
            let layout = BitmapLayout {
                page_index: placement.page_index,
                x: placement.rect.x,
                y: placement.rect.y,
                width: p.w,
                height: p.h,
                animation_info: None,
            };
            record_layout(&mut folders, p.kind, layout);
            let src: PixelView<'_> = match p.source {
                PixelSource::Input {
                    folder,
                    bitmap,
                    frame,
                } => inputs[folder].bitmaps[bitmap]
                    .frame_pixels(frame)
                    .ok_or_else(|| AtlasError::Corrupt(format!("{} lost its pixels", p.name)))?
                    .view(),
                PixelSource::Glyph(i) => glyph_pixels[i].view(),
            };
            blits.push(Blit {
                src,
                src_x: p.src_x,
                src_y: p.src_y,
                page_index: placement.page_index,
                dst: placement.rect,
            });
        }
        finish_animations(&mut folders);
        info!(pages = pages.page_count(), rects = blits.len(), "packed");

        // Phase 3: compose
        let page_buffers = compose_pages(aw, ah, format, pages.page_count(), &blits);
        let storage = PageImages::from_pages(aw, ah, format, page_buffers)?;
        let atlas = Atlas::from_parts(aw, ah, pad, storage, folders)?;
        if cfg!(debug_assertions) {
            atlas.validate_layout()?;
        }
        Ok(atlas)
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_folder(
        &self,
        inputs: &[FolderInfoInput],
        id: FolderId,
        out_id: FolderId,
        out: &mut FolderInfo,
        glyph_pixels: &mut Vec<PixelBuffer>,
        prepared: &mut Vec<Prep>,
        ctx: &mut GenerationContext,
    ) {
        let path = folder_path(inputs, id);
        let folder = &inputs[id.0];
        let out_id = out_id.0;

        for (index, entry) in folder.bitmaps.iter().enumerate() {
            if let Err(reason) = check_entry(entry) {
                ctx.skip(&path, &entry.name, reason);
                continue;
            }
            ctx.merger.merge(entry.pixels.format);
            let bitmap = out.bitmaps.len();
            let source = PixelSource::Input {
                folder: id.0,
                bitmap: index,
                frame: 0,
            };
            let (w, h) = (entry.pixels.width, entry.pixels.height);
            if entry.is_frame_list() {
                let grid = entry.animation;
                let frames: Vec<&PixelBuffer> =
                    (0..=entry.child_frames.len()).filter_map(|i| entry.frame_pixels(i)).collect();
                out.bitmaps.push(BitmapInfo {
                    name: entry.name.clone(),
                    tag: entry.tag,
                    layout: empty_layout(0, 0, grid),
                    frames: vec![empty_layout(0, 0, grid); frames.len()],
                });
                for (i, px) in frames.into_iter().enumerate() {
                    if i > 0 {
                        ctx.merger.merge(px.format);
                    }
                    prepared.push(Prep {
                        name: format!("{}#{}", entry.name, i),
                        kind: SourceKind::Bitmap {
                            folder: out_id,
                            bitmap,
                            frame: Some(i),
                        },
                        source: PixelSource::Input {
                            folder: id.0,
                            bitmap: index,
                            frame: i,
                        },
                        src_x: 0,
                        src_y: 0,
                        w: px.width,
                        h: px.height,
                    });
                }
                continue;
            }
            match entry.animation {
                None => {
                    out.bitmaps.push(BitmapInfo {
                        name: entry.name.clone(),
                        tag: entry.tag,
                        layout: empty_layout(0, 0, None),
                        frames: Vec::new(),
                    });
                    prepared.push(Prep {
                        name: entry.name.clone(),
                        kind: SourceKind::Bitmap {
                            folder: out_id,
                            bitmap,
                            frame: None,
                        },
                        source,
                        src_x: 0,
                        src_y: 0,
                        w,
                        h,
                    });
                }
                Some(grid) => {
                    let (fw, fh) = (w / grid.frames_per_line, h / grid.line_count());
                    out.bitmaps.push(BitmapInfo {
                        name: entry.name.clone(),
                        tag: entry.tag,
                        layout: empty_layout(0, 0, Some(grid)),
                        frames: vec![empty_layout(0, 0, Some(grid)); grid.frame_count as usize],
                    });
                    for i in 0..grid.frame_count {
                        prepared.push(Prep {
                            name: format!("{}#{}", entry.name, i),
                            kind: SourceKind::Bitmap {
                                folder: out_id,
                                bitmap,
                                frame: Some(i as usize),
                            },
                            source,
                            src_x: (i % grid.frames_per_line) * fw,
                            src_y: (i / grid.frames_per_line) * fh,
                            w: fw,
                            h: fh,
                        });
                    }
                }
            }
        }

        for request in &folder.character_sets {
            let font_name = request.font_name();
            if !request.pixel_size.is_finite() || request.pixel_size <= 0.0 {
                ctx.skip(&path, font_name, "pixel size must be positive and finite");
                continue;
            }
            let line_height = request.rasterizer.line_height(request.pixel_size);
            if !line_height.is_finite() {
                ctx.skip(&path, font_name, format!("invalid line height {}", line_height));
                continue;
            }
            let set = out.character_sets.len();
            let mut characters = BTreeMap::new();
            for &codepoint in &request.codepoints {
                let glyph_name = format!("{}:U+{:04X}", font_name, codepoint);
                let Some(glyph) = request.rasterizer.rasterize(codepoint, request.pixel_size) else {
                    ctx.skip(&path, &glyph_name, "glyph not available in font");
                    continue;
                };
                let bitmap = glyph.bitmap;
                let empty = bitmap.width == 0 || bitmap.height == 0;
                if !empty {
                    if let Err(e) = bitmap.check() {
                        ctx.skip(&path, &glyph_name, e.to_string());
                        continue;
                    }
                }
                let pad = self.params.padding;
                characters.insert(
                    codepoint,
                    CharacterEntry {
                        codepoint,
                        layout: empty_layout(pad, pad, None),
                        advance_x: glyph.advance_x,
                        advance_y: glyph.advance_y,
                        bearing: glyph.bearing,
                    },
                );
                if empty {
                    continue;
                }
                ctx.merger.merge(bitmap.format);
                prepared.push(Prep {
                    name: glyph_name,
                    kind: SourceKind::Glyph {
                        folder: out_id,
                        set,
                        codepoint,
                    },
                    source: PixelSource::Glyph(glyph_pixels.len()),
                    src_x: 0,
                    src_y: 0,
                    w: bitmap.width,
                    h: bitmap.height,
                });
                glyph_pixels.push(bitmap);
            }
            out.character_sets.push(CharacterSet {
                font_name: font_name.to_string(),
                line_height,
                characters,
            });
        }
    }
}

/// Generates an atlas with a throwaway context.
pub fn generate_atlas(input: AtlasInput, params: AtlasGeneratorParams) -> Result<Atlas> {
    AtlasGenerator::new(params).generate(input, &mut GenerationContext::new())
}

fn check_entry(entry: &SourceEntry) -> std::result::Result<(), String> {
    let px = &entry.pixels;
    px.check().map_err(|e| e.to_string())?;
    if px.width == 0 || px.height == 0 {
        return Err(format!("zero-sized bitmap ({}x{})", px.width, px.height));
    }
    if entry.is_frame_list() {
        return check_frame_list(entry);
    }
    if let Some(grid) = entry.animation {
        check_grid(&grid, px.width, px.height)?;
    }
    Ok(())
}

fn check_frame_list(entry: &SourceEntry) -> std::result::Result<(), String> {
    let count = entry.child_frames.len() + 1;
    match entry.animation {
        Some(grid) if grid.frame_count as usize == count => check_duration(grid.frame_duration)?,
        _ => return Err(format!("animation info does not describe {} frames", count)),
    }
    for (i, frame) in entry.child_frames.iter().enumerate() {
        frame
            .check()
            .map_err(|e| format!("frame {}: {}", i + 1, e))?;
        if frame.width == 0 || frame.height == 0 {
            return Err(format!("frame {} is zero-sized", i + 1));
        }
    }
    Ok(())
}

fn check_duration(frame_duration: f32) -> std::result::Result<(), String> {
    if !frame_duration.is_finite() || frame_duration <= 0.0 {
        return Err(format!("invalid frame duration {}", frame_duration));
    }
    Ok(())
}

fn check_grid(grid: &AnimationGridInfo, width: u32, height: u32) -> std::result::Result<(), String> {
    if grid.frame_count == 0 || grid.frames_per_line == 0 {
        return Err("animation grid needs at least one frame per line".into());
    }
    check_duration(grid.frame_duration)?;
    let (fw, fh) = (width / grid.frames_per_line, height / grid.line_count());
    if fw == 0 || fh == 0 {
        return Err(format!(
            "{}x{} image cannot hold a {}x{} frame grid",
            width,
            height,
            grid.frames_per_line,
            grid.line_count()
        ));
    }
    Ok(())
}

fn empty_layout(x: u32, y: u32, animation_info: Option<AnimationGridInfo>) -> BitmapLayout {
    BitmapLayout {
        page_index: 0,
        x,
        y,
        width: 0,
        height: 0,
        animation_info,
    }
}

fn record_layout(folders: &mut [FolderInfo], kind: SourceKind, mut layout: BitmapLayout) {
    match kind {
        SourceKind::Bitmap {
            folder,
            bitmap,
            frame,
        } => {
            let info = &mut folders[folder].bitmaps[bitmap];
            match frame {
                None => info.layout = layout,
                Some(i) => {
                    layout.animation_info = info.layout.animation_info;
                    info.frames[i] = layout;
                }
            }
        }
        SourceKind::Glyph {
            folder,
            set,
            codepoint,
        } => {
            if let Some(entry) = folders[folder].character_sets[set]
                .characters
                .get_mut(&codepoint)
            {
                entry.layout = layout;
            }
        }
    }
}

/// An animation's main layout is its first frame.
fn finish_animations(folders: &mut [FolderInfo]) {
    for info in folders.iter_mut().flat_map(|f| f.bitmaps.iter_mut()) {
        if let Some(first) = info.frames.first() {
            info.layout = *first;
        }
    }
}

/// Output folders in depth-first order (`order`), with parent/child links remapped to
/// their new positions. No entries yet.
fn skeleton(inputs: &[FolderInfoInput], order: &[FolderId]) -> Vec<FolderInfo> {
    let mut remap = vec![0usize; inputs.len()];
    for (out_id, id) in order.iter().enumerate() {
        remap[id.0] = out_id;
    }
    order
        .iter()
        .map(|id| {
            let f = &inputs[id.0];
            FolderInfo {
                children: f.children.iter().map(|c| FolderId(remap[c.0])).collect(),
                ..FolderInfo::new(f.name.clone(), f.tag, f.parent.map(|p| FolderId(remap[p.0])))
            }
        })
        .collect()
}

/// Folder ids in depth-first pre-order, children in insertion order.
fn depth_first(inputs: &[FolderInfoInput]) -> Vec<FolderId> {
    let mut order = Vec::with_capacity(inputs.len());
    let mut stack = vec![FolderId::ROOT];
    while let Some(id) = stack.pop() {
        order.push(id);
        stack.extend(inputs[id.0].children.iter().rev().copied());
    }
    order
}

fn folder_path(inputs: &[FolderInfoInput], id: FolderId) -> String {
    let mut parts = Vec::new();
    let mut current = Some(id);
    while let Some(c) = current {
        let folder = &inputs[c.0];
        if folder.parent.is_some() {
            parts.push(folder.name.as_str());
        }
        current = folder.parent;
    }
    parts.reverse();
    parts.join("/")
}

