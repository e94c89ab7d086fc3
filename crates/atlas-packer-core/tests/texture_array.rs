use atlas_packer_core::prelude::*;
use atlas_packer_core::PixelData;
use tempfile::tempdir;

fn tile(w: u32, h: u32, value: u8) -> PixelBuffer {
    PixelBuffer::from_u8(w, h, PixelFormat::RGBA, vec![value; (w * h * 4) as usize]).unwrap()
}

/// Three 20x20 tiles on 24x24 pages: one tile per page.
fn three_page_atlas() -> Atlas {
    let mut input = AtlasInput::new();
    let mut root = input.root();
    for (i, name) in ["a", "b", "c"].into_iter().enumerate() {
        root.add_bitmap(tile(20, 20, 10 + i as u8), name, Some(i as i32))
            .unwrap();
    }
    let params = AtlasGeneratorParams::builder()
        .with_dimensions(24, 24)
        .padding(2)
        .build();
    generate_atlas(input, params).unwrap()
}

#[test]
fn array_layers_match_separate_pages() {
    let atlas = three_page_atlas();
    assert_eq!(atlas.page_count(), 3);
    let array: TextureArrayAtlas = atlas.clone().into_storage().unwrap();

    assert_eq!(array.storage().depth(), 3);
    assert_eq!(array.storage().page_size(), (24, 24));
    assert_eq!(array.storage().data().len(), 3 * 24 * 24 * 4);
    for i in 0..3 {
        assert_eq!(array.page(i).unwrap().to_buffer(), atlas.page(i).unwrap().to_buffer());
    }
    assert!(array.page(3).is_none());
    assert_eq!(array.folders(), atlas.folders());
    assert_eq!(array.stats().num_pages, 3);

    let back: Atlas = array.into_storage().unwrap();
    assert_eq!(back, atlas);
}

#[test]
fn layer_order_follows_page_index() {
    let array: TextureArrayAtlas = three_page_atlas().into_storage().unwrap();
    let PixelData::U8(data) = array.storage().data() else {
        panic!("expected 8-bit layers");
    };
    let layer = 24 * 24 * 4;
    for name in ["a", "b", "c"] {
        let info = array.find_bitmap_info(name).unwrap();
        let l = info.layout;
        let at = l.page_index * layer + ((l.y * 24 + l.x) * 4) as usize;
        let expected = 10 + (info.tag.unwrap() as u8);
        assert_eq!(data[at], expected, "{name} landed in the wrong layer");
    }
}

#[test]
fn saved_atlas_loads_as_a_texture_array() {
    let atlas = three_page_atlas();
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiles.json");
    atlas.save_atlas(&path).unwrap();

    let array: TextureArrayAtlas = load_atlas(&path).unwrap();
    assert_eq!(array.page_count(), 3);
    assert_eq!(array.folders(), atlas.folders());

    // saving from array storage writes the same files
    let again = dir.path().join("again.json");
    array.save_atlas(&again).unwrap();
    assert_eq!(Atlas::load(&again).unwrap(), atlas);
}

#[test]
fn clear_empties_both_storages() {
    let mut atlas = three_page_atlas();
    let mut array: TextureArrayAtlas = atlas.clone().into_storage().unwrap();
    atlas.clear();
    array.clear();
    for (pages, folders) in [
        (atlas.page_count(), atlas.folders().len()),
        (array.page_count(), array.folders().len()),
    ] {
        assert_eq!(pages, 0);
        assert_eq!(folders, 1);
    }
    assert!(array.storage().data().is_empty());
    assert!(array.find_bitmap_info("a").is_none());
}

#[test]
fn mismatched_pages_are_rejected() {
    let pages = vec![
        PixelBuffer::zeroed(8, 8, PixelFormat::RGBA),
        PixelBuffer::zeroed(8, 4, PixelFormat::RGBA),
    ];
    let err = TextureArray::from_pages(8, 8, PixelFormat::RGBA, pages.clone()).unwrap_err();
    assert!(matches!(err, AtlasError::Corrupt(_)), "{err:?}");
    let err = PageImages::from_pages(8, 8, PixelFormat::RGBA, pages).unwrap_err();
    assert!(matches!(err, AtlasError::Corrupt(_)), "{err:?}");

    let gray = vec![PixelBuffer::zeroed(8, 8, PixelFormat::GRAY)];
    assert!(TextureArray::from_pages(8, 8, PixelFormat::RGBA, gray).is_err());
}
