use super::*;

#[test]
fn side_and_margin_scale_with_canvas() {
    assert_eq!(qr_side(1080), 238);
    assert_eq!(qr_margin(1080), 24);
    // Small frames: the absolute floor would exceed 36%, so the relative cap wins.
    assert_eq!(qr_side(200), 72);
    // Huge frames: the absolute cap of 360 would fall under 16%.
    assert_eq!(qr_side(4000), 640);
    for m in [300, 720, 1080, 1920] {
        let s = f64::from(qr_side(m));
        let m = f64::from(m);
        assert!(s >= (0.16 * m).round() && s <= (0.36 * m).round());
    }
}

#[test]
fn generated_code_is_exact_size_with_dark_modules() {
    let img = ModuleQr.generate("http://127.0.0.1:8000/go/abc123", 238).unwrap();
    assert_eq!(img.dimensions(), (238, 238));
    let dark = img.pixels().filter(|p| p.0[0] < 128).count();
    assert!(dark > 238 * 238 / 10);
    // Quiet zone around the symbol stays white.
    assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
}

#[test]
fn tiny_side_is_resized_down() {
    let img = ModuleQr.generate("https://example.com/x", 10).unwrap();
    assert_eq!(img.dimensions(), (10, 10));
}

#[test]
fn stamp_sits_bottom_right_inside_frame() {
    let stamp = QrStamp::new(&ModuleQr, "https://example.com", 1080, 1350).unwrap();
    let r = stamp.rect();
    assert_eq!(r.right(), 1080 - 24);
    assert_eq!(r.bottom(), 1350 - 24);

    let mut frame = RgbaImage::from_pixel(1080, 1350, image::Rgba([255, 0, 0, 255]));
    stamp.apply(&mut frame);
    // Padding box corner is white, the area outside stays red.
    assert_eq!(frame.get_pixel(r.x as u32, r.y as u32).0, [255, 255, 255, 255]);
    assert_eq!(frame.get_pixel(r.x as u32 - 1, r.y as u32).0, [255, 0, 0, 255]);
}

#[test]
fn disabled_generator_is_a_capability_error() {
    let err = QrStamp::new(&DisabledQr, "https://example.com", 100, 100).unwrap_err();
    assert!(matches!(err, AutopostError::CapabilityUnavailable(_)));
}

#[test]
fn stamped_frames_paste_on_every_frame() {
    let frames = vec![
        RgbaImage::from_pixel(400, 400, image::Rgba([0, 0, 255, 255])),
        RgbaImage::from_pixel(400, 400, image::Rgba([0, 255, 0, 255])),
    ];
    let stamp = QrStamp::new(&ModuleQr, "https://example.com", 400, 400).unwrap();
    let r = stamp.rect();

    let stamped = StampedFrames::new(&frames, Some(&stamp));
    assert_eq!(stamped.frame_count(), 2);
    assert_eq!(stamped.frame_size(), (400, 400));
    for i in 0..2 {
        let f = stamped.frame_at(i).unwrap();
        assert_eq!(f.get_pixel(r.x as u32, r.y as u32).0, [255, 255, 255, 255]);
    }
    assert!(stamped.frame_at(2).is_none());

    let plain = StampedFrames::new(&frames, None);
    assert_eq!(plain.frame_at(0).unwrap(), frames[0]);
}
