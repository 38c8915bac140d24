use crate::foundation::core::{Mode, Ratio};
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::layout::mapping::Mapping;

/// Ratio used when a request names none.
pub const DEFAULT_RATIO: &str = "4:5";
/// Mode used when a request names none.
pub const DEFAULT_MODE: &str = "normal";

/// An image reference as it appears in a request: a bare string or an object.
///
/// Object entries use the first non-empty key among `image`, `url` and `path`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// `"uploads/a.jpg"`
    Plain(String),
    /// `{"image": ...}`, `{"url": ...}` or `{"path": ...}`
    Object {
        /// Preferred key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        /// Alternative key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Alternative key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
}

impl ImageRef {
    /// Trimmed reference, if any.
    pub fn reference(&self) -> Option<&str> {
        let candidates = match self {
            Self::Plain(s) => [Some(s.as_str()), None, None],
            Self::Object { image, url, path } => {
                [image.as_deref(), url.as_deref(), path.as_deref()]
            }
        };
        candidates
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self::Plain(s.to_string())
    }
}

/// Render request as received from a client.
///
/// Kept loosely typed so it can be stored verbatim as the render context of a preview and
/// replayed later; [`RenderRequest::validate`] produces the typed form.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    /// `normal`, `copy`, `carousel` or `video` (plus legacy aliases).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// `1:1`, `4:5` or `9:16` (plus `4x5`-style aliases).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<String>,
    /// Single source image.
    #[serde(
        default,
        alias = "product_image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_url: Option<String>,
    /// Ordered sources for multi-image modes.
    #[serde(
        default,
        alias = "extra_images",
        alias = "media_urls",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<ImageRef>,
    /// Text, price and link fields.
    #[serde(default)]
    pub mapping: Mapping,
    /// `remove` requests background removal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_bg: Option<String>,
    /// Unrecognized keys, kept for the stored render context.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A request that passed validation.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedRequest {
    /// Canonical mode.
    pub mode: Mode,
    /// Canonical ratio.
    pub ratio: Ratio,
    /// Distinct sources in request order; exactly one for single-image modes.
    pub images: Vec<String>,
    /// Field mapping.
    pub mapping: Mapping,
    /// Background removal requested.
    pub remove_background: bool,
}

impl RenderRequest {
    /// Distinct image references, list entries first and `image_url` last, first occurrence wins.
    pub fn collect_images(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let listed = self.images.iter().filter_map(ImageRef::reference);
        let single = self
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        for r in listed.chain(single) {
            if !out.iter().any(|seen| seen == r) {
                out.push(r.to_string());
            }
        }
        out
    }

    /// Check mode, ratio, media count and directives without touching any resource.
    pub fn validate(&self) -> AutopostResult<ValidatedRequest> {
        let mode = Mode::parse(self.mode.as_deref().unwrap_or(DEFAULT_MODE))?;
        let ratio = Ratio::parse(self.ratio.as_deref().unwrap_or(DEFAULT_RATIO))?;
        let remove_background = parse_ai_bg(self.ai_bg.as_deref())?;

        let mut images = self.collect_images();
        if mode.is_multi_image() {
            if images.len() < mode.min_images() {
                return Err(AutopostError::InsufficientMedia {
                    required: mode.min_images(),
                    got: images.len(),
                });
            }
        } else {
            let primary = self
                .image_url
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| images.first().cloned());
            let Some(primary) = primary else {
                return Err(AutopostError::validation(
                    "missing_image_url",
                    format!("image_url is required for {} mode", mode.as_str()),
                ));
            };
            images = vec![primary];
        }

        Ok(ValidatedRequest {
            mode,
            ratio,
            images,
            mapping: self.mapping.clone(),
            remove_background,
        })
    }
}

fn parse_ai_bg(v: Option<&str>) -> AutopostResult<bool> {
    match v.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        None | Some("" | "none" | "keep" | "off") => Ok(false),
        Some("remove") => Ok(true),
        Some(other) => Err(AutopostError::validation(
            "bad_ai_bg",
            format!("unsupported ai_bg directive '{other}' (expected 'remove' or none)"),
        )),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/request.rs"]
mod tests;
