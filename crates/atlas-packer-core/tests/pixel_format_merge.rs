use atlas_packer_core::prelude::*;

fn merged(params: PixelFormatMergeParams, formats: &[PixelFormat]) -> PixelFormatMerger {
    let mut m = PixelFormatMerger::new(params);
    for &f in formats {
        m.merge(f);
    }
    m
}

#[test]
fn gray_and_rgb_without_luminance_gives_rgb() {
    let params = PixelFormatMergeParams {
        accept_luminance: false,
        ..Default::default()
    };
    let m = merged(params, &[PixelFormat::GRAY, PixelFormat::RGB]);
    assert_eq!(m.get_result(), PixelFormat::RGB);
    assert!(!m.are_incoming_formats_identical());

    // gray alone is widened too
    let m = merged(params, &[PixelFormat::GRAY, PixelFormat::GRAY]);
    assert_eq!(m.get_result(), PixelFormat::RGB);
    assert!(m.are_incoming_formats_identical());
}

#[test]
fn rgb_and_float_without_float_gives_rgb() {
    let params = PixelFormatMergeParams {
        accept_float: false,
        ..Default::default()
    };
    let m = merged(params, &[PixelFormat::RGB, PixelFormat::RGB_FLOAT]);
    assert_eq!(m.get_result(), PixelFormat::RGB);
}

#[test]
fn widening_is_monotonic() {
    let m = merged(
        PixelFormatMergeParams::default(),
        &[PixelFormat::RGBA, PixelFormat::GRAY, PixelFormat::RGB],
    );
    assert_eq!(m.get_result(), PixelFormat::RGBA);

    let m = merged(
        PixelFormatMergeParams::default(),
        &[PixelFormat::GRAY, PixelFormat::RGB_FLOAT],
    );
    assert_eq!(m.get_result(), PixelFormat::RGB_FLOAT);

    let m = merged(PixelFormatMergeParams::default(), &[PixelFormat::GRAY]);
    assert_eq!(m.get_result(), PixelFormat::GRAY);
}

#[test]
fn identical_formats_are_reported() {
    let m = merged(PixelFormatMergeParams::default(), &[PixelFormat::RGBA; 5]);
    assert!(m.are_incoming_formats_identical());
    assert_eq!(m.get_result(), PixelFormat::RGBA);
}

#[test]
fn forced_format_wins() {
    let params = PixelFormatMergeParams {
        forced_pixel_format: Some(PixelFormat::GRAY),
        ..Default::default()
    };
    let m = merged(params, &[PixelFormat::RGBA_FLOAT]);
    assert_eq!(m.get_result(), PixelFormat::GRAY);
    assert_eq!(m.resolve().unwrap(), PixelFormat::GRAY);
}

#[test]
fn invalid_forced_format_is_ignored() {
    let params = PixelFormatMergeParams {
        forced_pixel_format: Some(PixelFormat::default()),
        ..Default::default()
    };
    let m = merged(params, &[PixelFormat::RGB]);
    assert_eq!(m.get_result(), PixelFormat::RGB);
}

#[test]
fn no_merge_yields_invalid_result() {
    let m = PixelFormatMerger::default();
    assert!(!m.get_result().is_valid());
    assert!(matches!(m.resolve(), Err(AtlasError::Empty)));
}

#[test]
fn non_color_formats_are_ignored() {
    let m = merged(
        PixelFormatMergeParams::default(),
        &[PixelFormat::DEPTH_STENCIL, PixelFormat::RGB],
    );
    assert_eq!(m.get_result(), PixelFormat::RGB);
    assert!(m.are_incoming_formats_identical());
}

#[test]
fn conflicting_forced_format_is_relaxed_or_rejected() {
    let strict = PixelFormatMergeParams {
        forced_pixel_format: Some(PixelFormat::GRAY_FLOAT),
        upgrade_pixel_format: false,
        accept_luminance: false,
        accept_float: true,
    };
    let m = merged(strict, &[PixelFormat::RGB]);
    assert!(matches!(m.resolve(), Err(AtlasError::Format(_))));

    let relaxed = PixelFormatMergeParams {
        upgrade_pixel_format: true,
        accept_float: false,
        ..strict
    };
    let m = merged(relaxed, &[PixelFormat::RGB]);
    assert_eq!(m.resolve().unwrap(), PixelFormat::RGB);

    let depth = PixelFormatMergeParams {
        forced_pixel_format: Some(PixelFormat::DEPTH_STENCIL),
        ..Default::default()
    };
    let m = merged(depth, &[PixelFormat::RGBA]);
    assert_eq!(m.resolve().unwrap(), PixelFormat::RGBA);
}

#[test]
fn reset_forgets_previous_formats() {
    let mut m = merged(
        PixelFormatMergeParams::default(),
        &[PixelFormat::GRAY, PixelFormat::RGBA],
    );
    m.reset(PixelFormatMergeParams::default());
    assert!(m.are_incoming_formats_identical());
    m.merge(PixelFormat::RGB);
    assert_eq!(m.get_result(), PixelFormat::RGB);
}
