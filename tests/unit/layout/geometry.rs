use super::*;

const RATIOS: [Ratio; 3] = [Ratio::Square, Ratio::Portrait, Ratio::Story];

#[test]
fn cover_fit_always_matches_canvas() {
    let inputs = [(600, 800), (4000, 300), (1, 1), (1080, 1920), (333, 777), (2000, 2000)];
    for ratio in RATIOS {
        let canvas = ratio.canvas();
        for (w, h) in inputs {
            let src = RgbaImage::from_pixel(w, h, image::Rgba([9, 9, 9, 255]));
            let out = cover_fit(&src, canvas);
            assert_eq!(
                out.dimensions(),
                (canvas.width, canvas.height),
                "{w}x{h} -> {ratio:?}"
            );
        }
    }
}

#[test]
fn cover_fit_center_crops_wide_input() {
    // Left third red, middle third green, right third blue.
    let src = RgbaImage::from_fn(300, 100, |x, _| match x / 100 {
        0 => image::Rgba([255, 0, 0, 255]),
        1 => image::Rgba([0, 255, 0, 255]),
        _ => image::Rgba([0, 0, 255, 255]),
    });
    let out = cover_fit(&src, Canvas { width: 100, height: 100 });
    let c = out.get_pixel(50, 50).0;
    assert!(c[1] > 200 && c[0] < 50 && c[2] < 50);
}

#[test]
fn cover_fit_handles_extreme_aspect_sources() {
    for (w, h) in [(2, 3000), (20, 3000), (3000, 2), (1, 5000)] {
        let src = RgbaImage::from_fn(w, h, |_, y| {
            if y < h / 2 {
                image::Rgba([255, 0, 0, 255])
            } else {
                image::Rgba([0, 0, 255, 255])
            }
        });
        for ratio in RATIOS {
            let canvas = ratio.canvas();
            let out = cover_fit(&src, canvas);
            assert_eq!(out.dimensions(), (canvas.width, canvas.height), "{w}x{h}");
        }
    }

    // A tall strip keeps only its middle: no red from the top edge survives at the corners.
    let src = RgbaImage::from_fn(20, 3000, |_, y| match y {
        0..1000 => image::Rgba([255, 0, 0, 255]),
        1000..2000 => image::Rgba([0, 255, 0, 255]),
        _ => image::Rgba([0, 0, 255, 255]),
    });
    let out = cover_fit(&src, Canvas { width: 1080, height: 1080 });
    for (x, y) in [(0, 0), (1079, 1079), (540, 540)] {
        let c = out.get_pixel(x, y).0;
        assert!(c[1] > 200 && c[0] < 50 && c[2] < 50, "({x},{y}) = {c:?}");
    }
}

#[test]
fn cover_fit_is_opaque() {
    let src = RgbaImage::from_pixel(10, 10, image::Rgba([200, 200, 200, 0]));
    let out = cover_fit(&src, Canvas { width: 20, height: 20 });
    assert!(out.pixels().all(|p| p.0[3] == 255));
}

#[test]
fn safe_area_fractions() {
    assert_eq!(safe_area(Ratio::Square), PixelRect::new(0, 0, 1080, 918));
    assert_eq!(safe_area(Ratio::Portrait).h, 1107);
    assert_eq!(safe_area(Ratio::Story).h, 1498);
}

#[test]
fn slots_stay_inside_canvas_and_safe_area() {
    for ratio in RATIOS {
        let g = SlotGrid::for_ratio(ratio);
        let canvas_rect = PixelRect::new(0, 0, g.canvas.width, g.canvas.height);
        assert!(g.safe.contains_rect(g.cta));
        assert!(g.safe.contains_rect(g.badge));
        for with_cta in [true, false] {
            let panel = g.panel(with_cta);
            assert!(g.safe.contains_rect(panel));
            if with_cta {
                assert!(panel.bottom() <= g.cta.y);
            }
            let (t, p) = g.panel_boxes(panel, true, true);
            assert!(panel.contains_rect(t.unwrap()));
            assert!(panel.contains_rect(p.unwrap()));
        }
        let logo = g.logo_rect(400, 200).unwrap();
        assert!(canvas_rect.contains_rect(logo));
        assert!(logo.w <= g.logo_max && logo.h <= g.logo_max);
        assert!(f64::from(logo.w) <= 0.11 * f64::from(g.canvas.min_side()));
    }
}

#[test]
fn cta_is_centered() {
    let g = SlotGrid::for_ratio(Ratio::Portrait);
    let left = g.cta.x;
    let right = g.canvas.width as i32 - g.cta.right();
    assert!((left - right).abs() <= 1);
}

#[test]
fn reserved_corner_pushes_cta_and_panel_up() {
    for ratio in RATIOS {
        let canvas = ratio.canvas();
        let tile = PixelRect::new(canvas.width as i32 - 290, canvas.height as i32 - 290, 266, 266);
        let mut g = SlotGrid::for_ratio(ratio);
        let before = g;
        g.avoid(tile);

        assert!(!g.cta.intersects(tile), "{ratio:?}");
        assert!(g.safe.contains_rect(g.cta));
        assert_eq!((g.cta.x, g.cta.w, g.cta.h), (before.cta.x, before.cta.w, before.cta.h));
        for with_cta in [true, false] {
            let panel = g.panel(with_cta);
            assert!(!panel.intersects(tile), "{ratio:?} with_cta={with_cta}");
            assert!(g.safe.contains_rect(panel));
            if with_cta {
                assert!(panel.bottom() <= g.cta.y);
            }
        }
    }
}

#[test]
fn far_away_reservation_changes_nothing() {
    let mut g = SlotGrid::for_ratio(Ratio::Story);
    let before = g;
    g.avoid(PixelRect::new(0, 1900, 10, 10));
    assert_eq!(g.cta, before.cta);
    assert_eq!(g.panel(true), before.panel(true));
    assert_eq!(g.panel(false), before.panel(false));
}
