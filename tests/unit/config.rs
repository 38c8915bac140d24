use super::*;

#[test]
fn defaults_match_pricing_and_video_parameters() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.costs.image, 1);
    assert_eq!(cfg.costs.carousel_per_frame, 1);
    assert_eq!(cfg.costs.video, 5);
    assert_eq!(cfg.initial_credits, 200);
    assert_eq!(cfg.video.fps, 30);
    assert_eq!(cfg.video.backends.len(), 5);
    assert_eq!(cfg.video.backends[0].container, "mp4");
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_fills_defaults() {
    let json = r#"{ "static_root": "/tmp/x", "costs": { "video": 7 } }"#;
    let cfg = EngineConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.static_root, PathBuf::from("/tmp/x"));
    assert_eq!(cfg.costs.video, 7);
    assert_eq!(cfg.costs.image, 1);
    assert_eq!(cfg.video.fps, 30);
}

#[test]
fn enum_fields_use_snake_case() {
    let json = r#"{ "text_backend": "block", "background_removal": "key_out" }"#;
    let cfg = EngineConfig::from_reader(json.as_bytes()).unwrap();
    assert_eq!(cfg.text_backend, TextBackendKind::Block);
    assert_eq!(cfg.background_removal, BackgroundRemovalKind::KeyOut);
}

#[test]
fn bad_json_is_serde_error() {
    let err = EngineConfig::from_reader("{ nope".as_bytes()).unwrap_err();
    assert!(err.to_string().contains("serialization error:"));
}

#[test]
fn zero_fps_is_rejected() {
    let mut cfg = EngineConfig::default();
    cfg.video.fps = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn generated_url_joins_prefix() {
    let mut cfg = EngineConfig::default();
    cfg.url_prefix = "/static/".to_string();
    assert_eq!(
        cfg.generated_url("prev_1.jpg"),
        "/static/generated/prev_1.jpg"
    );
}
