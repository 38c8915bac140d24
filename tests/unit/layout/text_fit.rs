use super::*;
use crate::render::text::BlockShaper;

fn bx(w: f32, h: f32, lines: usize) -> FitBox {
    FitBox {
        max_width: w,
        max_height: h,
        max_lines: lines,
    }
}

#[test]
fn short_text_keeps_start_size() {
    let mut s = BlockShaper;
    let fit = fit_text(&mut s, "Summer Sale", bx(1000.0, 200.0, 2), 54, 18).unwrap();
    assert_eq!(fit.size_px, 54);
    assert_eq!(fit.lines, vec!["Summer Sale".to_string()]);
    assert!(!fit.truncated);
}

#[test]
fn long_text_wraps_then_shrinks() {
    let mut s = BlockShaper;
    // 10px per char at size 50/3; box is 300px wide.
    let fit = fit_text(
        &mut s,
        "Limited edition leather weekender bag with brass hardware",
        bx(300.0, 80.0, 2),
        40,
        10,
    )
    .unwrap();
    assert!(fit.size_px < 40);
    assert!(fit.lines.len() <= 2);
    assert!(fit.max_width() <= 300.0);
    assert!(fit.height() <= 80.0 || fit.truncated);
}

#[test]
fn shrinks_in_one_pixel_steps_to_first_fit() {
    let mut s = BlockShaper;
    // "abcdefghij" is 10 chars: width = 6 * size. Fits 240 at size 40 exactly.
    let fit = fit_text(&mut s, "abcdefghij", bx(240.0, 100.0, 1), 45, 10).unwrap();
    assert_eq!(fit.size_px, 40);
}

#[test]
fn single_overflowing_word_is_char_truncated() {
    let mut s = BlockShaper;
    let fit = fit_text(
        &mut s,
        "Supercalifragilisticexpialidocious",
        bx(60.0, 100.0, 2),
        30,
        10,
    )
    .unwrap();
    assert!(fit.truncated);
    assert_eq!(fit.lines.len(), 1);
    assert!(fit.lines[0].ends_with(ELLIPSIS));
    assert!(fit.widths[0] <= 60.0);
}

#[test]
fn surplus_lines_are_dropped_with_ellipsis() {
    let mut s = BlockShaper;
    let text = "one two three four five six seven eight nine ten eleven twelve";
    let fit = fit_text(&mut s, text, bx(60.0, 1000.0, 2), 20, 10).unwrap();
    assert!(fit.truncated);
    assert_eq!(fit.lines.len(), 2);
    assert!(fit.lines[1].ends_with(ELLIPSIS));
    assert!(fit.widths.iter().all(|&w| w <= 60.0));
}

#[test]
fn empty_text_is_skipped() {
    let mut s = BlockShaper;
    assert!(fit_text(&mut s, "   ", bx(100.0, 100.0, 2), 20, 10).is_none());
}

#[test]
fn truncate_keeps_fitting_text() {
    let mut s = BlockShaper;
    assert_eq!(truncate_to_width(&mut s, "abc", 10.0, 100.0), "abc");
    assert_eq!(truncate_to_width(&mut s, "abcdef", 10.0, 30.0), "abcd…");
    assert_eq!(truncate_to_width(&mut s, "abcdef", 10.0, 3.0), "");
}

#[test]
fn never_overflows_width_for_many_inputs() {
    let mut s = BlockShaper;
    let words = ["a", "Sale", "Ultra-wide", "XXXXXXXXXXXXXXXXXXXXXXXXXXXX", "ünïcødé", "20%"];
    for w in [40.0f32, 120.0, 333.0, 900.0] {
        for n in 1..12 {
            let text: Vec<&str> = (0..n).map(|i| words[(i * 7 + n) % words.len()]).collect();
            let text = text.join(" ");
            if let Some(fit) = fit_text(&mut s, &text, bx(w, 90.0, 2), 54, 18) {
                assert!(
                    fit.widths.iter().all(|&lw| lw <= w),
                    "overflow for {text:?} in {w}"
                );
            }
        }
    }
}
