use super::*;

#[test]
fn fnv_is_stable_and_salt_sensitive() {
    let a = fnv1a64_str("https://shop.example/p/1", 0);
    let b = fnv1a64_str("https://shop.example/p/1", 0);
    let c = fnv1a64_str("https://shop.example/p/1", 1);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn base36_known_values() {
    assert_eq!(to_base36(0), "0");
    assert_eq!(to_base36(35), "z");
    assert_eq!(to_base36(36), "10");
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u16(255, 255), 255);
    assert_eq!(mul_div255_u16(0, 255), 0);
    assert_eq!(mul_div255_u8(128, 255), 128);
}

#[test]
fn lerp_endpoints() {
    assert_eq!(lerp_u8(10, 200, 0.0), 10);
    assert_eq!(lerp_u8(10, 200, 1.0), 200);
    assert_eq!(lerp_u8(0, 100, 0.5), 50);
}

#[test]
fn px_clamps_negative_and_nan() {
    assert_eq!(px(-3.0), 0);
    assert_eq!(px(f64::NAN), 0);
    assert_eq!(px(47.5), 48);
}
