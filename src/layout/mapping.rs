use serde::{Deserialize, Deserializer};

/// Field mapping drawn onto a creative.
///
/// Unknown keys are kept in `extra` so the record round-trips verbatim into sidecar metadata.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mapping {
    /// Product title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Current price text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Previous price text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<String>,
    /// Explicit discount percentage, used when the prices do not parse.
    #[serde(
        default,
        deserialize_with = "loose_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_pct: Option<f64>,
    /// `false` suppresses the discount badge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_badge: Option<bool>,
    /// Call-to-action label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
    /// Brand logo reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    /// Destination for the short link / QR code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    /// Request a QR code for `target_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_enabled: Option<bool>,
    /// Background music reference (video only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm_url: Option<String>,
    /// Unrecognized keys.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Mapping {
    /// Trimmed non-empty title.
    pub fn title(&self) -> Option<&str> {
        non_empty(self.title.as_deref())
    }

    /// Trimmed non-empty price.
    pub fn price(&self) -> Option<&str> {
        non_empty(self.price.as_deref())
    }

    /// Trimmed non-empty old price.
    pub fn old_price(&self) -> Option<&str> {
        non_empty(self.old_price.as_deref())
    }

    /// Trimmed non-empty CTA label.
    pub fn cta(&self) -> Option<&str> {
        non_empty(self.cta.as_deref())
    }

    /// Trimmed non-empty logo reference.
    pub fn logo_url(&self) -> Option<&str> {
        non_empty(self.logo_url.as_deref())
    }

    /// Trimmed non-empty short-link target.
    pub fn target_url(&self) -> Option<&str> {
        non_empty(self.target_url.as_deref())
    }

    /// Trimmed non-empty music reference.
    pub fn bgm_url(&self) -> Option<&str> {
        non_empty(self.bgm_url.as_deref())
    }

    /// QR requested with a usable target.
    pub fn wants_qr(&self) -> bool {
        self.qr_enabled == Some(true) && self.target_url().is_some()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn loose_number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match v {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok(),
        _ => None,
    })
}
