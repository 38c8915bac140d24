use super::*;

#[test]
fn block_measure_is_linear_in_chars() {
    let mut s = BlockShaper;
    assert_eq!(s.measure("", 20.0), 0.0);
    assert!((s.measure("abcd", 10.0) - 24.0).abs() < 1e-4);
    assert!((s.measure("ααα", 10.0) - 18.0).abs() < 1e-4);
}

#[test]
fn block_shape_skips_whitespace() {
    let mut s = BlockShaper;
    let line = s.shape_line("a b", 10.0).unwrap();
    let GlyphPaint::Blocks(blocks) = &line.paint[0] else {
        panic!("expected blocks");
    };
    assert_eq!(blocks.len(), 2);
    assert!(blocks.iter().all(|r| r.x1 <= f64::from(line.width) + 1e-6));
    assert!((line.height - 12.0).abs() < 1e-4);
}

#[test]
fn block_engine_is_selected_by_config() {
    let cfg = EngineConfig {
        text_backend: TextBackendKind::Block,
        ..EngineConfig::default()
    };
    let engine = text_engine_for(&cfg).unwrap();
    assert_eq!(engine.name(), "block");
}

#[test]
fn missing_font_file_is_an_error() {
    let cfg = EngineConfig {
        text_backend: TextBackendKind::Parley,
        font_path: Some("/definitely/not/here.ttf".into()),
        ..EngineConfig::default()
    };
    assert!(text_engine_for(&cfg).is_err());
}

#[test]
fn parley_measures_monotonically_when_fonts_exist() {
    let Some(engine) = ParleyTextEngine::from_system_fonts() else {
        eprintln!("skipping: no system fonts available");
        return;
    };
    let mut shaper = engine.shaper().unwrap();
    let small = shaper.measure("Summer Sale", 20.0);
    let big = shaper.measure("Summer Sale", 40.0);
    assert!(small > 0.0);
    assert!(big > small);
    let line = shaper.shape_line("Summer Sale", 40.0).unwrap();
    assert!((line.width - big).abs() < 1.0);
}

#[test]
fn parley_shapers_share_one_font_blob() {
    let Some(engine) = ParleyTextEngine::from_system_fonts() else {
        eprintln!("skipping: no system fonts available");
        return;
    };
    let mut a = engine.parley_shaper().unwrap();
    let mut b = engine.parley_shaper().unwrap();
    assert_eq!(a.font.data.id(), engine.font.data.id());
    assert_eq!(b.font.data.id(), engine.font.data.id());
    assert_eq!(a.family_name, b.family_name);
    assert_eq!(a.measure("Shop Now", 32.0), b.measure("Shop Now", 32.0));
    assert_eq!(a.measure("Shop Now", 32.0), a.measure("Shop Now", 32.0));
}
