use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        AutopostError::validation("bad_ratio", "x")
            .to_string()
            .contains("validation error (bad_ratio):")
    );
    assert!(
        AutopostError::encode("x")
            .to_string()
            .contains("encode error:")
    );
    assert!(
        AutopostError::capability("qr")
            .to_string()
            .contains("capability unavailable:")
    );
    assert!(
        AutopostError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = AutopostError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn validation_maps_to_422_with_its_code() {
    let api = AutopostError::validation("missing_image_url", "image_url is required").to_api_error();
    assert_eq!(api.status, 422);
    assert_eq!(api.code, "missing_image_url");
}

#[test]
fn insufficient_credits_has_distinct_status() {
    let api = AutopostError::InsufficientCredits {
        required: 5,
        available: 0,
    }
    .to_api_error();
    assert_eq!(api.status, 402);
    assert_eq!(api.code, "insufficient_credits");
}

#[test]
fn internal_errors_do_not_leak_source_text() {
    let err = AutopostError::Other(anyhow::anyhow!("/secret/path exploded"));
    let api = err.to_api_error();
    assert_eq!(api.code, "internal");
    assert!(!api.message.contains("secret"));
}

#[test]
fn media_and_not_found_codes() {
    let api = AutopostError::InsufficientMedia {
        required: 2,
        got: 1,
    }
    .to_api_error();
    assert_eq!(api.code, "insufficient_media");
    assert_eq!(AutopostError::not_found("prev_1").to_api_error().status, 404);
}
