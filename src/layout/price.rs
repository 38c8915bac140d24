/// Extract the first number from a price string.
///
/// Spaces are removed first and a comma is accepted as the decimal separator, so
/// `"1 299,90 €"` parses as `1299.9`.
pub fn parse_price(s: &str) -> Option<f64> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = compact.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end + 1 < bytes.len()
        && (bytes[end] == b'.' || bytes[end] == b',')
        && bytes[end + 1].is_ascii_digit()
    {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    compact[start..end].replace(',', ".").parse::<f64>().ok()
}

/// Discount percentage from `price` and `old_price`.
///
/// `Some(pct)` only when both parse, `new < old`, and the rounded percentage is positive.
pub fn compute_discount(price: &str, old_price: &str) -> Option<u32> {
    let new = parse_price(price)?;
    let old = parse_price(old_price)?;
    if old <= 0.0 || new >= old || new < 0.0 {
        return None;
    }
    let pct = ((1.0 - new / old) * 100.0).round();
    if pct >= 1.0 { Some(pct as u32) } else { None }
}

/// Resolve the badge percentage for a mapping.
///
/// Parsed prices always win. An explicit percentage is used only when the prices do not both
/// parse and the badge was not switched off.
pub fn resolve_discount(
    price: Option<&str>,
    old_price: Option<&str>,
    explicit_pct: Option<f64>,
    badge_enabled: Option<bool>,
) -> Option<u32> {
    if badge_enabled == Some(false) {
        return None;
    }
    let prices_parse = price.and_then(parse_price).is_some()
        && old_price.and_then(parse_price).is_some();
    if prices_parse {
        return compute_discount(price?, old_price?);
    }
    let pct = explicit_pct?;
    if !pct.is_finite() {
        return None;
    }
    let pct = pct.round().clamp(0.0, 99.0);
    if pct >= 1.0 { Some(pct as u32) } else { None }
}

/// Badge label for a percentage.
pub fn discount_label(pct: u32) -> String {
    format!("-{pct}%")
}
