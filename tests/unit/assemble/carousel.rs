use super::*;
use crate::render::text::BlockShaper;

fn src(v: u8) -> RgbaImage {
    RgbaImage::from_pixel(120, 90, image::Rgba([v, 0, 0, 255]))
}

#[test]
fn single_source_is_insufficient() {
    let err = render_frames(
        &LayoutRenderer,
        &[src(1)],
        Ratio::Square,
        &Mapping::default(),
        None,
        None,
        &mut BlockShaper,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        AutopostError::InsufficientMedia {
            required: 2,
            got: 1
        }
    ));
}

#[test]
fn frames_follow_source_order() {
    let out = render_frames(
        &LayoutRenderer,
        &[src(10), src(250)],
        Ratio::Square,
        &Mapping::default(),
        None,
        None,
        &mut BlockShaper,
    )
    .unwrap();
    assert_eq!(out.len(), 2);
    assert!(out[0].image.get_pixel(540, 540).0[0] < 30);
    assert!(out[1].image.get_pixel(540, 540).0[0] > 230);
    assert!(out.iter().all(|o| o.image.dimensions() == (1080, 1080)));
}

#[test]
fn sheet_grid_geometry() {
    let frames: Vec<RgbaImage> = (0..4)
        .map(|_| RgbaImage::from_pixel(1080, 1350, image::Rgba([0, 0, 255, 255])))
        .collect();
    let layout = SheetLayout {
        columns: 3,
        thumb_width: 100,
        gap: 10,
    };
    let sheet = contact_sheet(&frames, layout).unwrap();
    // 3 columns, 2 rows of 100x125 thumbnails.
    assert_eq!(sheet.dimensions(), (3 * 100 + 4 * 10, 2 * 125 + 3 * 10));
    assert_eq!(sheet.get_pixel(2, 2).0, [255, 255, 255, 255]);
    assert!(sheet.get_pixel(60, 60).0[2] > 240);
    // Empty slot in the second row stays white.
    assert_eq!(sheet.get_pixel(300, 200).0, [255, 255, 255, 255]);
}

#[test]
fn sheet_narrows_to_frame_count() {
    let frames = vec![src(1), src(2)];
    let sheet = contact_sheet(&frames, SheetLayout::default()).unwrap();
    assert_eq!(sheet.width(), 2 * 360 + 3 * 12);
}
