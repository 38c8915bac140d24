use super::*;

#[test]
fn ratio_lookup_table() {
    assert_eq!(
        Ratio::parse("1:1").unwrap().canvas(),
        Canvas {
            width: 1080,
            height: 1080
        }
    );
    assert_eq!(Ratio::parse("4x5").unwrap(), Ratio::Portrait);
    assert_eq!(Ratio::parse(" 9:16 ").unwrap().canvas().height, 1920);
    assert_eq!(Ratio::parse("square").unwrap(), Ratio::Square);
}

#[test]
fn unknown_ratio_is_bad_ratio() {
    let err = Ratio::parse("16:9").unwrap_err();
    assert!(matches!(
        err,
        AutopostError::Validation {
            code: "bad_ratio",
            ..
        }
    ));
}

#[test]
fn mode_aliases_map_to_normal() {
    assert_eq!(Mode::parse("Funny").unwrap(), Mode::Normal);
    assert_eq!(Mode::parse("κανονικό").unwrap(), Mode::Normal);
    assert_eq!(Mode::parse("VIDEO").unwrap(), Mode::Video);
    assert!(Mode::parse("gif").is_err());
}

#[test]
fn min_images_by_mode() {
    assert_eq!(Mode::Normal.min_images(), 1);
    assert_eq!(Mode::Copy.min_images(), 1);
    assert_eq!(Mode::Carousel.min_images(), 2);
    assert_eq!(Mode::Video.min_images(), 2);
}

#[test]
fn rect_containment() {
    let outer = PixelRect::new(0, 0, 100, 100);
    assert!(outer.contains_rect(PixelRect::new(10, 10, 90, 90)));
    assert!(!outer.contains_rect(PixelRect::new(10, 10, 91, 10)));
}

#[test]
fn ratio_serde_uses_colon_form() {
    let s = serde_json::to_string(&Ratio::Portrait).unwrap();
    assert_eq!(s, "\"4:5\"");
}
