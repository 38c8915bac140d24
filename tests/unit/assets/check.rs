use super::*;

#[test]
fn flat_small_image_is_clean_but_low_quality() {
    let img = RgbaImage::from_pixel(300, 200, image::Rgba([240, 240, 240, 255]));
    let check = analyze_image(&img, "uploads/plain.jpg");
    assert_eq!(check.background, "clean");
    assert_eq!(check.quality, "low");
    assert_eq!(check.meta.width, 300);
    assert!(check.meta.edge_density < 0.01);
    assert!(check.suggestions.iter().any(|s| s.contains("resolution")));
}

#[test]
fn checkerboard_is_busy_and_sharp() {
    let img = RgbaImage::from_fn(800, 800, |x, y| {
        if (x / 2 + y / 2) % 2 == 0 {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    });
    let check = analyze_image(&img, "noise.png");
    assert_eq!(check.background, "busy");
    assert_eq!(check.quality, "ok");
}

#[test]
fn category_from_name_and_portrait_hint() {
    let img = RgbaImage::from_pixel(900, 600, image::Rgba([10, 10, 10, 255]));
    let check = analyze_image(&img, "https://cdn.example/RedSneaker_01.jpg?x=1");
    assert_eq!(check.category.as_deref(), Some("shoes"));
    assert!(check.suggestions.iter().any(|s| s.contains("portrait")));
    assert_eq!(guess_category("uploads/lamp.png"), None);
}
