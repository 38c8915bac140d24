use crate::render::text::TextShaper;

/// Ellipsis appended to truncated lines.
pub const ELLIPSIS: &str = "…";

/// Box a text field must fit into.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitBox {
    /// Maximum line width in pixels.
    pub max_width: f32,
    /// Maximum total height in pixels.
    pub max_height: f32,
    /// Maximum number of lines.
    pub max_lines: usize,
}

/// Result of shrink-to-fit.
#[derive(Clone, Debug, PartialEq)]
pub struct FittedText {
    /// Chosen font size in whole pixels.
    pub size_px: u32,
    /// Wrapped lines.
    pub lines: Vec<String>,
    /// Measured width of each line.
    pub widths: Vec<f32>,
    /// Line box height at the chosen size.
    pub line_height: f32,
    /// `true` when the floor size was reached and content was cut.
    pub truncated: bool,
}

impl FittedText {
    /// Widest line.
    pub fn max_width(&self) -> f32 {
        self.widths.iter().copied().fold(0.0, f32::max)
    }

    /// Total block height.
    pub fn height(&self) -> f32 {
        self.line_height * self.lines.len() as f32
    }
}

/// Greedy word wrap at `size_px`.
///
/// A word wider than `max_width` on its own still gets its own line; callers detect the overflow
/// through the measured widths.
pub fn wrap_words(
    shaper: &mut dyn TextShaper,
    text: &str,
    size_px: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if shaper.measure(&candidate, size_px) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cut `text` at character granularity and append an ellipsis so it fits `max_width`.
///
/// Returns the input unchanged when it already fits, and an empty string when not even the
/// ellipsis fits.
pub fn truncate_to_width(
    shaper: &mut dyn TextShaper,
    text: &str,
    size_px: f32,
    max_width: f32,
) -> String {
    if shaper.measure(text, size_px) <= max_width {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    let mut keep = chars.len();
    while keep > 0 {
        keep -= 1;
        let head: String = chars[..keep].iter().collect();
        let candidate = format!("{}{ELLIPSIS}", head.trim_end());
        if shaper.measure(&candidate, size_px) <= max_width {
            return candidate;
        }
    }
    if shaper.measure(ELLIPSIS, size_px) <= max_width {
        ELLIPSIS.to_string()
    } else {
        String::new()
    }
}

/// Wrap and shrink `text` from `start_px` down to `floor_px` in 1px steps until it fits `bx`.
///
/// At the floor, overflowing lines are cut with an ellipsis and surplus lines are dropped, so every
/// returned line is at most `bx.max_width` wide.
pub fn fit_text(
    shaper: &mut dyn TextShaper,
    text: &str,
    bx: FitBox,
    start_px: u32,
    floor_px: u32,
) -> Option<FittedText> {
    let text = text.trim();
    if text.is_empty() || bx.max_width <= 0.0 || bx.max_lines == 0 {
        return None;
    }
    let floor_px = floor_px.max(1);
    let start_px = start_px.max(floor_px);

    for size in (floor_px..=start_px).rev() {
        let s = size as f32;
        let lines = wrap_words(shaper, text, s, bx.max_width);
        let widths: Vec<f32> = lines.iter().map(|l| shaper.measure(l, s)).collect();
        let line_height = shaper.line_height(s);
        let fits_w = widths.iter().all(|&w| w <= bx.max_width);
        let fits_h = line_height * lines.len() as f32 <= bx.max_height;
        if fits_w && fits_h && lines.len() <= bx.max_lines {
            return Some(FittedText {
                size_px: size,
                lines,
                widths,
                line_height,
                truncated: false,
            });
        }
    }

    let s = floor_px as f32;
    let mut lines = wrap_words(shaper, text, s, bx.max_width);
    let line_height = shaper.line_height(s);
    let height_lines = ((bx.max_height / line_height).floor() as usize).max(1);
    let keep = bx.max_lines.min(height_lines).min(lines.len());
    let dropped = lines.len() > keep;
    lines.truncate(keep);
    if dropped && let Some(last) = lines.last_mut() {
        *last = format!("{last}{ELLIPSIS}");
    }
    let lines: Vec<String> = lines
        .into_iter()
        .map(|l| truncate_to_width(shaper, &l, s, bx.max_width))
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }
    let widths = lines.iter().map(|l| shaper.measure(l, s)).collect();
    Some(FittedText {
        size_px: floor_px,
        lines,
        widths,
        line_height,
        truncated: true,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/layout/text_fit.rs"]
mod tests;
