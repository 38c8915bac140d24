use image::{GrayImage, RgbaImage, imageops};

/// Minimum shorter side for an image to count as good quality.
const SAFE_MIN_DIM: u32 = 600;
/// Edge density above which the background is considered busy.
const BUSY_EDGE_DENSITY: f64 = 0.22;
/// Mean edge response below which the image is considered soft.
const MIN_SHARPNESS: f64 = 4.0;
/// Edge intensity counted as an edge pixel.
const EDGE_THRESHOLD: u8 = 10;

const FIND_EDGES: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 8.0, -1.0, -1.0, -1.0, -1.0];

/// Heuristic suitability report for a product photo.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageCheck {
    /// Product category guessed from the file name.
    pub category: Option<String>,
    /// `clean` or `busy`.
    pub background: String,
    /// `ok` or `low`.
    pub quality: String,
    /// Actionable hints for the uploader.
    pub suggestions: Vec<String>,
    /// Raw measurements.
    pub meta: ImageCheckMeta,
}

/// Measurements behind an [`ImageCheck`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ImageCheckMeta {
    /// Source width.
    pub width: u32,
    /// Source height.
    pub height: u32,
    /// Share of edge pixels on a 256px-wide downscale, `0..=1`.
    pub edge_density: f64,
    /// Mean edge response over the full image.
    pub sharpness: f64,
}

/// Analyze a decoded image; `source` is only used for the category guess.
pub fn analyze_image(image: &RgbaImage, source: &str) -> ImageCheck {
    let (width, height) = image.dimensions();
    let gray = imageops::grayscale(image);
    let edges: GrayImage = imageops::filter3x3(&gray, &FIND_EDGES);

    let edge_density = edge_density(&edges);
    let sharpness = mean_intensity(&edges);

    let background = if edge_density > BUSY_EDGE_DENSITY {
        "busy"
    } else {
        "clean"
    };
    let quality = if width.min(height) >= SAFE_MIN_DIM && sharpness >= MIN_SHARPNESS {
        "ok"
    } else {
        "low"
    };
    let category = guess_category(source);

    let mut suggestions = Vec::new();
    if background == "busy" {
        suggestions.push("clean up the background".to_string());
    }
    if quality == "low" {
        suggestions.push("use a higher resolution or sharper photo".to_string());
    }
    if matches!(category, Some("tshirt" | "dress" | "shoes")) && height < width {
        suggestions.push("prefer a portrait shot (4:5)".to_string());
    }

    ImageCheck {
        category: category.map(str::to_string),
        background: background.to_string(),
        quality: quality.to_string(),
        suggestions,
        meta: ImageCheckMeta {
            width,
            height,
            edge_density: round3(edge_density),
            sharpness: round3(sharpness),
        },
    }
}

fn edge_density(edges: &GrayImage) -> f64 {
    let (w, h) = edges.dimensions();
    if w == 0 || h == 0 {
        return 0.0;
    }
    let sw = 256u32;
    let sh = ((256.0 * f64::from(h) / f64::from(w)) as u32).max(1);
    let small = imageops::resize(edges, sw, sh, imageops::FilterType::Triangle);
    let total = small.pixels().len().max(1);
    let hits = small.pixels().filter(|p| p.0[0] > EDGE_THRESHOLD).count();
    hits as f64 / total as f64
}

fn mean_intensity(img: &GrayImage) -> f64 {
    let n = img.pixels().len();
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = img.pixels().map(|p| u64::from(p.0[0])).sum();
    sum as f64 / n as f64
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn guess_category(source: &str) -> Option<&'static str> {
    let path = source.split(['?', '#']).next().unwrap_or(source);
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.rsplit_once('.').map_or(name, |(s, _)| s).to_lowercase();
    const KEYS: [(&str, &str); 15] = [
        ("shoe", "shoes"),
        ("sneaker", "shoes"),
        ("boot", "shoes"),
        ("dress", "dress"),
        ("skirt", "skirt"),
        ("shirt", "tshirt"),
        ("tshirt", "tshirt"),
        ("tee", "tshirt"),
        ("bag", "bag"),
        ("watch", "watch"),
        ("skin", "skincare"),
        ("cream", "skincare"),
        ("serum", "skincare"),
        ("jean", "jeans"),
        ("pants", "pants"),
    ];
    KEYS.iter()
        .find(|(key, _)| stem.contains(key))
        .map(|(_, cat)| *cat)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/check.rs"]
mod tests;
