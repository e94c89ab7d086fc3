use atlas_packer_core::prelude::*;

#[test]
fn defaults_are_valid() {
    let params = AtlasGeneratorParams::default();
    assert_eq!((params.atlas_width, params.atlas_height, params.padding), (1024, 1024, 0));
    assert!(params.merge_params.forced_pixel_format.is_none());
    assert!(params.merge_params.upgrade_pixel_format);
    assert!(params.merge_params.accept_luminance);
    assert!(params.merge_params.accept_float);
    assert!(params.validate().is_ok());
}

#[test]
fn test_zero_width() {
    let params = AtlasGeneratorParams::builder().with_dimensions(0, 1024).build();
    match params.validate() {
        Err(AtlasError::InvalidDimensions { width, height }) => {
            assert_eq!(width, 0);
            assert_eq!(height, 1024);
        }
        other => panic!("Expected InvalidDimensions error, got {:?}", other),
    }
}

#[test]
fn test_zero_height() {
    let params = AtlasGeneratorParams::builder().with_dimensions(1024, 0).build();
    assert!(matches!(
        params.validate(),
        Err(AtlasError::InvalidDimensions { width: 1024, height: 0 })
    ));
}

#[test]
fn test_padding_leaves_no_room() {
    let params = AtlasGeneratorParams::builder()
        .with_dimensions(100, 100)
        .padding(50)
        .build();
    match params.validate() {
        Err(AtlasError::InvalidConfig(msg)) => assert!(msg.contains("padding")),
        other => panic!("Expected InvalidConfig error, got {:?}", other),
    }
    let ok = AtlasGeneratorParams::builder()
        .with_dimensions(100, 100)
        .padding(49)
        .build();
    assert!(ok.validate().is_ok());
}

#[test]
fn builder_sets_merge_policy() {
    let params = AtlasGeneratorParams::builder()
        .forced_pixel_format(Some(PixelFormat::RGBA))
        .upgrade_pixel_format(false)
        .accept_luminance(false)
        .accept_float(false)
        .build();
    let m = params.merge_params;
    assert_eq!(m.forced_pixel_format, Some(PixelFormat::RGBA));
    assert!(!m.upgrade_pixel_format && !m.accept_luminance && !m.accept_float);
}

#[test]
fn params_deserialize_with_defaults() {
    let params: AtlasGeneratorParams =
        serde_json::from_str(r#"{"atlas_width": 512, "atlas_height": 256}"#).unwrap();
    assert_eq!(params.padding, 0);
    assert_eq!(params.merge_params, PixelFormatMergeParams::default());

    let text = serde_json::to_string(&AtlasGeneratorParams::default()).unwrap();
    let back: AtlasGeneratorParams = serde_json::from_str(&text).unwrap();
    assert_eq!(back, AtlasGeneratorParams::default());
}

#[test]
fn generation_rejects_invalid_params() {
    let mut input = AtlasInput::new();
    input
        .root()
        .add_bitmap(PixelBuffer::zeroed(4, 4, PixelFormat::RGBA), "a", None)
        .unwrap();
    let params = AtlasGeneratorParams::builder().with_dimensions(0, 16).build();
    assert!(matches!(
        generate_atlas(input, params),
        Err(AtlasError::InvalidDimensions { .. })
    ));
}
