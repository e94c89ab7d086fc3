use atlas_packer_core::prelude::*;
use atlas_packer_core::{PixelData, blit_converted};
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb};

#[test]
fn decoded_images_keep_their_precision() {
    let gray = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(2, 2, Luma([7u8])));
    assert_eq!(PixelBuffer::from_image(&gray).format, PixelFormat::GRAY);

    let gray_alpha = DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(1, 1, LumaA([9u8, 128])));
    let buf = PixelBuffer::from_image(&gray_alpha);
    assert_eq!(buf.format, PixelFormat::RGBA);
    assert_eq!(buf.data, PixelData::U8(vec![9, 9, 9, 128]));

    let deep = DynamicImage::ImageRgb16(ImageBuffer::from_pixel(1, 1, Rgb([65535u16, 0, 0])));
    let buf = PixelBuffer::from_image(&deep);
    assert_eq!(buf.format, PixelFormat::RGB_FLOAT);
    assert_eq!(buf.data, PixelData::F32(vec![1.0, 0.0, 0.0]));

    let deep_gray = DynamicImage::ImageLuma16(ImageBuffer::from_pixel(1, 1, Luma([65535u16])));
    assert_eq!(PixelBuffer::from_image(&deep_gray).format, PixelFormat::GRAY_FLOAT);
}

#[test]
fn gray_widens_to_opaque_rgba() {
    let gray = PixelBuffer::from_u8(2, 1, PixelFormat::GRAY, vec![3, 250]).unwrap();
    let rgba = gray.converted(PixelFormat::RGBA);
    assert_eq!(rgba.data, PixelData::U8(vec![3, 3, 3, 255, 250, 250, 250, 255]));
    let rgb = gray.converted(PixelFormat::RGB);
    assert_eq!(rgb.data, PixelData::U8(vec![3, 3, 3, 250, 250, 250]));
}

#[test]
fn bytes_and_floats_convert_both_ways() {
    let rgb = PixelBuffer::from_u8(1, 1, PixelFormat::RGB, vec![255, 0, 51]).unwrap();
    let float = rgb.converted(PixelFormat::RGBA_FLOAT);
    assert_eq!(float.data, PixelData::F32(vec![1.0, 0.0, 0.2, 1.0]));
    let back = float.converted(PixelFormat::RGB);
    assert_eq!(back, rgb);

    // out-of-range floats saturate when narrowed to bytes
    let hdr = PixelBuffer::from_f32(1, 1, PixelFormat::GRAY_FLOAT, vec![4.0]).unwrap();
    assert_eq!(hdr.converted(PixelFormat::GRAY).data, PixelData::U8(vec![255]));
}

#[test]
fn blit_clips_to_the_destination() {
    let src = PixelBuffer::from_u8(2, 2, PixelFormat::GRAY, vec![1, 2, 3, 4]).unwrap();
    let mut dst = PixelBuffer::zeroed(3, 3, PixelFormat::GRAY);
    blit_converted(&src.view(), 0, 0, 2, 2, &mut dst, 2, 2);
    assert_eq!(dst.data, PixelData::U8(vec![0, 0, 0, 0, 0, 0, 0, 0, 1]));

    let mut dst = PixelBuffer::zeroed(2, 1, PixelFormat::GRAY);
    blit_converted(&src.view(), 0, 1, 2, 1, &mut dst, 0, 0);
    assert_eq!(dst.data, PixelData::U8(vec![3, 4]));
}

#[test]
fn malformed_buffers_fail_checks() {
    assert!(PixelBuffer::from_u8(2, 2, PixelFormat::RGBA, vec![0; 15]).is_err());
    assert!(PixelBuffer::from_u8(1, 1, PixelFormat::RGBA_FLOAT, vec![0; 4]).is_err());
    assert!(PixelBuffer::from_u8(1, 1, PixelFormat::DEPTH_STENCIL, vec![0]).is_err());
    assert!(!PixelFormat::DEPTH_STENCIL.is_color_pixel());
    assert_eq!(PixelFormat::RGBA_FLOAT.pixel_size(), 16);
}
