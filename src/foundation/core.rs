use crate::foundation::error::{AutopostError, AutopostResult};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Shorter side of the canvas.
    pub fn min_side(self) -> u32 {
        self.width.min(self.height)
    }
}

/// Supported target aspect ratios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Ratio {
    /// 1:1, 1080x1080.
    #[serde(rename = "1:1")]
    Square,
    /// 4:5, 1080x1350.
    #[serde(rename = "4:5")]
    Portrait,
    /// 9:16, 1080x1920.
    #[serde(rename = "9:16")]
    Story,
}

impl Ratio {
    /// Parse a ratio string, accepting the `4x5` / `square` style aliases.
    pub fn parse(s: &str) -> AutopostResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1:1" | "1x1" | "square" => Ok(Self::Square),
            "4:5" | "4x5" => Ok(Self::Portrait),
            "9:16" | "9x16" | "story" => Ok(Self::Story),
            other => Err(AutopostError::validation(
                "bad_ratio",
                format!("unsupported ratio '{other}' (expected 1:1, 4:5 or 9:16)"),
            )),
        }
    }

    /// Canonical `w:h` string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "4:5",
            Self::Story => "9:16",
        }
    }

    /// Fixed canvas size for the ratio.
    pub fn canvas(self) -> Canvas {
        match self {
            Self::Square => Canvas {
                width: 1080,
                height: 1080,
            },
            Self::Portrait => Canvas {
                width: 1080,
                height: 1350,
            },
            Self::Story => Canvas {
                width: 1080,
                height: 1920,
            },
        }
    }

    /// Fraction of the canvas height reserved (from the top) for overlay content.
    pub fn safe_fraction(self) -> f64 {
        match self {
            Self::Square => 0.85,
            Self::Portrait => 0.82,
            Self::Story => 0.78,
        }
    }
}

/// Render mode of a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Single branded image.
    Normal,
    /// Single image rendered for copy-led posts; same pipeline as `Normal`.
    Copy,
    /// N frames plus a contact sheet.
    Carousel,
    /// Ken Burns video plus poster.
    Video,
}

impl Mode {
    /// Parse a mode string, accepting the legacy tone aliases which map to `Normal`.
    pub fn parse(s: &str) -> AutopostResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "normal" | "κανονικό" | "κανονικο" | "funny" | "professional" => Ok(Self::Normal),
            "copy" => Ok(Self::Copy),
            "carousel" => Ok(Self::Carousel),
            "video" => Ok(Self::Video),
            other => Err(AutopostError::validation(
                "bad_mode",
                format!("unsupported mode '{other}'"),
            )),
        }
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Copy => "copy",
            Self::Carousel => "carousel",
            Self::Video => "video",
        }
    }

    /// `true` for carousel and video.
    pub fn is_multi_image(self) -> bool {
        matches!(self, Self::Carousel | Self::Video)
    }

    /// Minimum number of distinct sources the mode needs.
    pub fn min_images(self) -> usize {
        if self.is_multi_image() { 2 } else { 1 }
    }
}

/// Integer pixel rectangle, used for reported slot geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: u32,
    /// Height.
    pub h: u32,
}

impl PixelRect {
    /// Create a rectangle.
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    pub fn right(self) -> i32 {
        self.x + self.w as i32
    }

    /// Exclusive bottom edge.
    pub fn bottom(self) -> i32 {
        self.y + self.h as i32
    }

    /// `true` if `other` lies fully inside `self`.
    pub fn contains_rect(self, other: PixelRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// `true` if the two rectangles share at least one pixel.
    pub fn intersects(self, other: PixelRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub(crate) fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
