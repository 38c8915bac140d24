use super::*;

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, image::Rgba([200, 40, 40, 255]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

fn jpeg_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([10, 120, 200]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Jpeg)
        .unwrap();
    out
}

#[test]
fn decodes_png() {
    let img = decode_raster(&png_bytes(3, 2), "a.png").unwrap();
    assert_eq!(img.dimensions(), (3, 2));
    assert_eq!(img.get_pixel(0, 0).0, [200, 40, 40, 255]);
}

#[test]
fn garbage_reports_original_reference() {
    let err = decode_raster(b"definitely not an image", "uploads/x.jpg").unwrap_err();
    match err {
        AutopostError::ImageLoad { reference, .. } => assert_eq!(reference, "uploads/x.jpg"),
        other => panic!("unexpected error: {other:?}"),
    }
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
        }
    }
    !crc
}

/// A valid 1x1 PNG whose IHDR is rewritten to claim `w`x`h`.
fn png_claiming(w: u32, h: u32) -> Vec<u8> {
    let mut bytes = png_bytes(1, 1);
    // Signature (8) + length (4), then "IHDR" + 13 data bytes + CRC.
    bytes[16..20].copy_from_slice(&w.to_be_bytes());
    bytes[20..24].copy_from_slice(&h.to_be_bytes());
    let crc = crc32(&bytes[12..29]);
    bytes[29..33].copy_from_slice(&crc.to_be_bytes());
    bytes
}

#[test]
fn oversized_dimensions_are_refused() {
    let bytes = png_claiming(60_000, 60_000);
    assert!(bytes.len() < 200);
    match decode_raster(&bytes, "bomb.png").unwrap_err() {
        AutopostError::ImageLoad { reference, .. } => assert_eq!(reference, "bomb.png"),
        other => panic!("unexpected error: {other:?}"),
    }

    // Within the side cap but far over the allocation budget.
    let bytes = png_claiming(MAX_DECODE_SIDE, MAX_DECODE_SIDE);
    assert!(decode_raster(&bytes, "wide.png").is_err());
}

#[test]
fn limits_are_explicit() {
    let limits = decode_limits();
    assert_eq!(limits.max_image_width, Some(MAX_DECODE_SIDE));
    assert_eq!(limits.max_image_height, Some(MAX_DECODE_SIDE));
    assert_eq!(limits.max_alloc, Some(MAX_DECODE_ALLOC));
}

#[test]
fn empty_bytes_fail() {
    assert!(decode_raster(&[], "x").is_err());
}

#[test]
fn truncated_jpeg_marker_is_patched() {
    let bytes = jpeg_bytes(16, 16);
    assert!(bytes.ends_with(&[0xFF, 0xD9]));
    let cut = &bytes[..bytes.len() - 2];
    assert!(patch_truncated_jpeg(cut).is_some());
    let img = decode_raster(cut, "cut.jpg").unwrap();
    assert_eq!(img.dimensions(), (16, 16));
}

#[test]
fn complete_jpeg_is_not_patched() {
    assert!(patch_truncated_jpeg(&jpeg_bytes(8, 8)).is_none());
    assert!(patch_truncated_jpeg(&png_bytes(2, 2)).is_none());
}

#[test]
fn svg_is_rasterized() {
    let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="#ff0000"/></svg>"##;
    let img = rasterize_svg(svg, 80).unwrap();
    assert_eq!(img.dimensions(), (80, 40));
    let px = img.get_pixel(40, 20).0;
    assert_eq!(px[3], 255);
    assert!(px[0] > 240 && px[1] < 10);
}

#[test]
fn premultiply_roundtrips_opaque_and_transparent() {
    let mut px = vec![100, 50, 25, 255, 9, 9, 9, 0];
    premultiply_rgba8_in_place(&mut px);
    assert_eq!(&px[..4], &[100, 50, 25, 255]);
    assert_eq!(&px[4..], &[0, 0, 0, 0]);
    let mut half = vec![64, 32, 0, 128];
    unpremultiply_rgba8_in_place(&mut half);
    assert_eq!(half[0], 128);
}
