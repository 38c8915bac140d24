use super::*;

fn solid(v: u8) -> RgbaImage {
    RgbaImage::from_pixel(40, 20, image::Rgba([v, v, v, 255]))
}

fn default_params() -> KenBurnsParams {
    KenBurnsParams {
        fps: 30,
        seconds_per_image: 2.0,
        zoom: 1.08,
        crossfade_seconds: 0.35,
    }
}

#[test]
fn frame_counts_follow_timing() {
    let p = default_params();
    assert_eq!(p.hold_frames(), 60);
    assert_eq!(p.fade_frames(), 10);

    let sources = [solid(0), solid(100), solid(200)];
    let seq = KenBurnsSequence::new(&sources, p).unwrap();
    assert_eq!(seq.len(), 3 * 60 + 2 * 10);
    assert_eq!(seq.dimensions(), (40, 20));
}

#[test]
fn zoom_interpolates_linearly() {
    let p = default_params();
    assert_eq!(p.scale_at(0), 1.0);
    assert!((p.scale_at(59) - 1.08).abs() < 1e-12);
    assert!(p.scale_at(30) > 1.0 && p.scale_at(30) < 1.08);

    let single = KenBurnsParams {
        seconds_per_image: 0.01,
        ..p
    };
    assert_eq!(single.hold_frames(), 1);
    assert_eq!(single.scale_at(0), 1.0);
}

#[test]
fn crossfade_ramps_into_next_source() {
    let sources = [solid(0), solid(200)];
    let seq = KenBurnsSequence::new(&sources, default_params()).unwrap();
    let first_fade = seq.frame(60).unwrap().get_pixel(5, 5).0[0];
    let last_fade = seq.frame(69).unwrap().get_pixel(5, 5).0[0];
    assert!((15..=25).contains(&first_fade), "got {first_fade}");
    assert!((170..200).contains(&last_fade), "got {last_fade}");
    assert_eq!(seq.frame(70).unwrap().get_pixel(5, 5).0[0], 200);
    assert!(seq.frame(seq.len()).is_none());
    assert!(matches!(seq.plan()[65], SubFrame::Fade { from: 0, .. }));
}

#[test]
fn every_subframe_keeps_size() {
    let sources = [solid(10), solid(20)];
    let p = KenBurnsParams {
        fps: 4,
        seconds_per_image: 1.0,
        zoom: 1.5,
        crossfade_seconds: 0.5,
    };
    let seq = KenBurnsSequence::new(&sources, p).unwrap();
    assert_eq!(seq.len(), 4 + 2 + 4);
    assert!(seq.iter().all(|f| f.dimensions() == (40, 20)));
}

#[test]
fn zoom_center_crops_toward_middle() {
    let src = RgbaImage::from_fn(100, 100, |x, _| {
        if (25..75).contains(&x) {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([0, 0, 0, 255])
        }
    });
    let z = zoom_center(&src, 2.0);
    assert_eq!(z.dimensions(), (100, 100));
    assert!(z.get_pixel(5, 50).0[0] > 200);
}

#[test]
fn rejects_mismatched_or_empty_sources() {
    assert!(KenBurnsSequence::new(&[], default_params()).is_err());
    let mixed = [solid(0), RgbaImage::new(10, 10)];
    assert!(KenBurnsSequence::new(&mixed, default_params()).is_err());
}

#[test]
fn crossfade_never_repeats_a_hold_frame() {
    let sources = [solid(0), solid(200)];
    let p = KenBurnsParams {
        fps: 4,
        seconds_per_image: 1.0,
        zoom: 1.0,
        crossfade_seconds: 0.75,
    };
    let seq = KenBurnsSequence::new(&sources, p).unwrap();
    let alphas: Vec<f64> = seq
        .plan()
        .iter()
        .filter_map(|f| match *f {
            SubFrame::Fade { alpha, .. } => Some(alpha),
            SubFrame::Hold { .. } => None,
        })
        .collect();
    assert_eq!(alphas, [0.25, 0.5, 0.75]);

    // Last hold of the first source, the three blends, first hold of the second.
    let around: Vec<u8> = (3..=7)
        .map(|i| seq.frame(i).unwrap().get_pixel(5, 5).0[0])
        .collect();
    assert_eq!(around, [0, 50, 100, 150, 200]);
}
