use atlas_packer_core::prelude::*;
use atlas_packer_core::{PixelData, page_file_name};
use std::fs;
use tempfile::tempdir;

fn noise_u8(w: u32, h: u32, format: PixelFormat, seed: u32) -> PixelBuffer {
    let n = (w * h * format.component_count) as usize;
    let data = (0..n)
        .map(|i| ((i as u32).wrapping_mul(2654435761).wrapping_add(seed) >> 24) as u8)
        .collect();
    PixelBuffer::from_u8(w, h, format, data).unwrap()
}

fn noise_f32(w: u32, h: u32, format: PixelFormat) -> PixelBuffer {
    let n = (w * h * format.component_count) as usize;
    let data = (0..n).map(|i| (i % 17) as f32 * 0.25 - 1.0).collect();
    PixelBuffer::from_f32(w, h, format, data).unwrap()
}

fn params(w: u32, h: u32, padding: u32) -> AtlasGeneratorParams {
    AtlasGeneratorParams::builder()
        .with_dimensions(w, h)
        .padding(padding)
        .build()
}

#[test]
fn nested_tree_survives_save_and_load() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(noise_u8(9, 5, PixelFormat::RGBA, 1), "logo", Some(100))
        .unwrap();
    // "ui" is created before "fx", but "ui/icons" after "fx"
    input.add_folder("ui", Some(1)).unwrap();
    input
        .add_folder("fx", None)
        .unwrap()
        .add_animated_bitmap(
            noise_u8(24, 16, PixelFormat::RGBA, 2),
            "spark",
            Some(5),
            AnimationGridInfo::new(6, 3, 0.125),
        )
        .unwrap();
    input
        .add_folder("ui", Some(1))
        .unwrap()
        .add_folder("icons", None)
        .unwrap()
        .add_bitmap(noise_u8(12, 12, PixelFormat::RGBA, 3), "gear", Some(2))
        .unwrap()
        .add_bitmap(noise_u8(7, 14, PixelFormat::RGBA, 4), "pin", None)
        .unwrap();
    let atlas = generate_atlas(input, params(48, 48, 1)).unwrap();
    assert!(atlas.page_count() >= 1);

    let dir = tempdir().unwrap();
    let path = dir.path().join("sprites.json");
    atlas.save_atlas(&path).unwrap();
    assert!(dir.path().join(page_file_name("sprites", 0, PixelFormat::RGBA)).exists());

    let loaded = Atlas::load(&path).unwrap();
    assert_eq!(loaded, atlas);

    let gear = loaded.get_bitmap_info("ui/icons", "gear").unwrap();
    assert_eq!(gear.tag, Some(2));
    assert_eq!(loaded.find_bitmap_info(100).unwrap().name, "logo");
    let spark = loaded.get_bitmap_info("fx", 5).unwrap();
    assert_eq!(spark.frames.len(), 6);
    assert_eq!(spark.animation_info().unwrap().frame_duration, 0.125);
    let names: Vec<&str> = loaded.walk().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["", "ui", "icons", "fx"]);
}

#[test]
fn gray_pages_stay_gray() {
    let mut input = AtlasInput::new();
    let mut root = input.root();
    root.add_bitmap(noise_u8(10, 10, PixelFormat::GRAY, 7), "a", None)
        .unwrap()
        .add_bitmap(noise_u8(6, 3, PixelFormat::GRAY, 8), "b", None)
        .unwrap();
    let atlas = generate_atlas(input, params(32, 32, 0)).unwrap();
    assert_eq!(atlas.pixel_format(), PixelFormat::GRAY);

    let dir = tempdir().unwrap();
    let path = dir.path().join("gray.json");
    atlas.save_atlas(&path).unwrap();
    let loaded = Atlas::load(&path).unwrap();
    assert_eq!(loaded.pixel_format(), PixelFormat::GRAY);
    assert_eq!(loaded, atlas);
}

#[test]
fn float_pages_round_trip_through_exr() {
    for format in [PixelFormat::RGBA_FLOAT, PixelFormat::RGB_FLOAT, PixelFormat::GRAY_FLOAT] {
        let mut input = AtlasInput::new();
        input
            .add_folder("hdr", None)
            .unwrap()
            .add_bitmap(noise_f32(8, 6, format), "sky", None)
            .unwrap();
        let atlas = generate_atlas(input, params(16, 16, 1)).unwrap();
        assert_eq!(atlas.pixel_format(), format);

        let dir = tempdir().unwrap();
        let path = dir.path().join("hdr.json");
        atlas.save_atlas(&path).unwrap();
        assert!(dir.path().join("hdr_0.exr").exists());
        let loaded = Atlas::load(&path).unwrap();
        assert_eq!(loaded, atlas, "{format} did not round-trip");
        let page = loaded.page(0).unwrap().to_buffer();
        assert!(matches!(page.data, PixelData::F32(_)));
    }
}

#[test]
fn index_path_gets_a_json_extension() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(noise_u8(4, 4, PixelFormat::RGB, 9), "dot", None)
        .unwrap();
    let atlas = generate_atlas(input, params(8, 8, 0)).unwrap();
    let dir = tempdir().unwrap();
    atlas.save_atlas(dir.path().join("nested/out/atlas")).unwrap();
    assert!(dir.path().join("nested/out/atlas.json").exists());
    assert!(dir.path().join("nested/out/atlas_0.png").exists());
    let loaded = Atlas::load(dir.path().join("nested/out/atlas.json")).unwrap();
    assert_eq!(loaded, atlas);
}

#[test]
fn index_document_lists_pages_and_root_entries() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(noise_u8(30, 30, PixelFormat::RGBA, 1), "a", None)
        .unwrap()
        .add_bitmap(noise_u8(30, 30, PixelFormat::RGBA, 2), "b", None)
        .unwrap();
    let atlas = generate_atlas(input, params(32, 32, 1)).unwrap();
    let doc = atlas.index_document("big");
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].file, "big_1.png");
    assert_eq!(doc.bitmaps.len(), 2);
    assert!(doc.folders.is_empty());
}

#[test]
fn mismatched_page_image_is_rejected() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(noise_u8(5, 5, PixelFormat::RGBA, 3), "a", None)
        .unwrap();
    let atlas = generate_atlas(input, params(16, 16, 0)).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    atlas.save_atlas(&path).unwrap();

    image::RgbaImage::new(8, 8)
        .save(dir.path().join("bad_0.png"))
        .unwrap();
    let err = Atlas::load(&path).unwrap_err();
    assert!(matches!(err, AtlasError::Corrupt(_)), "{err:?}");
}

#[test]
fn entry_on_missing_page_is_rejected() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(noise_u8(5, 5, PixelFormat::RGBA, 3), "a", None)
        .unwrap();
    let atlas = generate_atlas(input, params(16, 16, 0)).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("idx.json");
    atlas.save_atlas(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    doc["bitmaps"][0]["page"] = serde_json::json!(3);
    fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    let err = Atlas::load(&path).unwrap_err();
    assert!(matches!(err, AtlasError::Corrupt(_)), "{err:?}");
}

#[test]
fn missing_index_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = Atlas::load(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, AtlasError::Io(_)), "{err:?}");
}

#[test]
fn page_names_follow_the_format() {
    assert_eq!(page_file_name("atlas", 0, PixelFormat::RGBA), "atlas_0.png");
    assert_eq!(page_file_name("atlas", 3, PixelFormat::GRAY), "atlas_3.png");
    assert_eq!(page_file_name("hdr", 1, PixelFormat::RGB_FLOAT), "hdr_1.exr");
}

/// 3x5 glyphs with a negative horizontal bearing; space has no ink.
struct ThinFont;

impl GlyphRasterizer for ThinFont {
    fn font_name(&self) -> &str {
        "thin"
    }

    fn line_height(&self, pixel_size: f32) -> f32 {
        pixel_size + 1.5
    }

    fn rasterize(&self, codepoint: u32, _pixel_size: f32) -> Option<RasterizedGlyph> {
        let bitmap = if codepoint == ' ' as u32 {
            PixelBuffer::zeroed(0, 0, PixelFormat::GRAY)
        } else {
            noise_u8(3, 5, PixelFormat::GRAY, codepoint)
        };
        Some(RasterizedGlyph {
            bitmap,
            advance_x: 4,
            advance_y: 0,
            bearing: Bearing { x: -1, y: 4 },
        })
    }
}

#[test]
fn character_sets_survive_save_and_load() {
    let mut input = AtlasInput::new();
    input
        .add_folder("text", Some(9))
        .unwrap()
        .add_character_set(Box::new(ThinFont), " abc".chars().map(u32::from), 12.0)
        .unwrap();
    let atlas = generate_atlas(input, params(32, 32, 1)).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("text.json");
    atlas.save_atlas(&path).unwrap();
    let loaded = Atlas::load(&path).unwrap();
    assert_eq!(loaded, atlas);

    let set = loaded.character_set("thin").unwrap();
    assert_eq!(set.line_height, 13.5);
    assert_eq!(set.len(), 4);
    let space = set.get_char(' ').unwrap();
    assert_eq!((space.layout.width, space.layout.height), (0, 0));
    assert_eq!((space.layout.x, space.layout.y), (1, 1));
    let b = set.get_char('b').unwrap();
    assert_eq!(b.bearing, Bearing { x: -1, y: 4 });
    assert_eq!((b.layout.width, b.layout.height), (3, 5));
    assert_eq!(b, atlas.character_set("thin").unwrap().get_char('b').unwrap());
}

#[test]
fn rect_outside_the_page_is_rejected() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(noise_u8(5, 5, PixelFormat::RGBA, 3), "a", None)
        .unwrap();
    let atlas = generate_atlas(input, params(16, 16, 0)).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("idx.json");
    atlas.save_atlas(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    doc["bitmaps"][0]["x"] = serde_json::json!(u32::MAX - 2);
    fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    let err = Atlas::load(&path).unwrap_err();
    assert!(matches!(err, AtlasError::Corrupt(_)), "{err:?}");
}
