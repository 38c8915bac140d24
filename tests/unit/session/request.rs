use super::*;

fn parse(json: &str) -> RenderRequest {
    serde_json::from_str(json).unwrap()
}

#[test]
fn defaults_to_normal_portrait() {
    let v = parse(r#"{"image_url":"uploads/a.jpg"}"#).validate().unwrap();
    assert_eq!(v.mode, Mode::Normal);
    assert_eq!(v.ratio, Ratio::Portrait);
    assert_eq!(v.images, vec!["uploads/a.jpg"]);
    assert!(!v.remove_background);
}

#[test]
fn collects_strings_and_objects_in_order_without_duplicates() {
    let req = parse(
        r#"{
            "mode": "carousel",
            "images": ["a.jpg", {"url": "b.jpg"}, {"path": "a.jpg"}, {"image": " c.jpg "}, {"foo": 1}],
            "image_url": "b.jpg"
        }"#,
    );
    assert_eq!(req.collect_images(), vec!["a.jpg", "b.jpg", "c.jpg"]);
    assert_eq!(req.validate().unwrap().images.len(), 3);
}

#[test]
fn legacy_list_keys_are_accepted() {
    let req = parse(r#"{"mode":"video","extra_images":["a.jpg","b.jpg"]}"#);
    assert_eq!(req.validate().unwrap().images, vec!["a.jpg", "b.jpg"]);
    let req = parse(r#"{"mode":"video","media_urls":["a.jpg","b.jpg"]}"#);
    assert_eq!(req.validate().unwrap().mode, Mode::Video);
}

#[test]
fn single_image_modes_need_a_source() {
    let err = parse(r#"{"mode":"copy","image_url":"  "}"#)
        .validate()
        .unwrap_err();
    assert!(matches!(
        err,
        AutopostError::Validation {
            code: "missing_image_url",
            ..
        }
    ));
}

#[test]
fn single_image_mode_prefers_image_url() {
    let v = parse(r#"{"images":["x.jpg","y.jpg"],"image_url":"y.jpg"}"#)
        .validate()
        .unwrap();
    assert_eq!(v.images, vec!["y.jpg"]);
    let v = parse(r#"{"images":["x.jpg","y.jpg"]}"#).validate().unwrap();
    assert_eq!(v.images, vec!["x.jpg"]);
}

#[test]
fn multi_image_modes_count_distinct_sources() {
    for mode in ["carousel", "video"] {
        let one = RenderRequest {
            mode: Some(mode.to_string()),
            images: vec!["a.jpg".into(), "a.jpg".into()],
            ..RenderRequest::default()
        };
        let err = one.validate().unwrap_err();
        assert!(matches!(
            err,
            AutopostError::InsufficientMedia {
                required: 2,
                got: 1
            }
        ));

        let two = RenderRequest {
            images: vec!["a.jpg".into(), "b.jpg".into()],
            ..one
        };
        assert_eq!(two.validate().unwrap().images.len(), 2);
    }
}

#[test]
fn rejects_unknown_ratio_mode_and_directive() {
    let bad_ratio = parse(r#"{"ratio":"16:9","image_url":"a.jpg"}"#).validate();
    assert!(matches!(
        bad_ratio,
        Err(AutopostError::Validation {
            code: "bad_ratio",
            ..
        })
    ));
    let bad_mode = parse(r#"{"mode":"gif","image_url":"a.jpg"}"#).validate();
    assert!(matches!(
        bad_mode,
        Err(AutopostError::Validation {
            code: "bad_mode",
            ..
        })
    ));
    let bad_bg = parse(r#"{"ai_bg":"blur","image_url":"a.jpg"}"#).validate();
    assert!(matches!(
        bad_bg,
        Err(AutopostError::Validation {
            code: "bad_ai_bg",
            ..
        })
    ));
}

#[test]
fn ratio_is_checked_before_media_count() {
    let err = parse(r#"{"mode":"carousel","ratio":"2:1","images":["a.jpg"]}"#)
        .validate()
        .unwrap_err();
    assert!(matches!(
        err,
        AutopostError::Validation {
            code: "bad_ratio",
            ..
        }
    ));
}

#[test]
fn aliases_and_remove_directive() {
    let v = parse(r#"{"mode":"Professional","ratio":"9x16","image_url":"a.jpg","ai_bg":"REMOVE"}"#)
        .validate()
        .unwrap();
    assert_eq!(v.mode, Mode::Normal);
    assert_eq!(v.ratio, Ratio::Story);
    assert!(v.remove_background);
}

#[test]
fn round_trips_verbatim_including_unknown_keys() {
    let src = r#"{"mode":"normal","image_url":"a.jpg","mapping":{"title":"T","tone":"warm"},"template":"x"}"#;
    let req = parse(src);
    let back: serde_json::Value = serde_json::to_value(&req).unwrap();
    assert_eq!(back["template"], "x");
    assert_eq!(back["mapping"]["tone"], "warm");
    assert_eq!(parse(&back.to_string()), req);
}
