use image::{RgbaImage, imageops};

use crate::foundation::core::{PixelRect, Ratio};
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::layout::mapping::Mapping;
use crate::render::compose::{LayoutOutput, LayoutRenderer};
use crate::render::text::TextShaper;

/// Minimum sources for any multi-frame output.
pub const MIN_FRAMES: usize = 2;

/// Contact sheet grid settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SheetLayout {
    /// Thumbnails per row.
    pub columns: u32,
    /// Thumbnail width; height follows the frame aspect.
    pub thumb_width: u32,
    /// Gap between thumbnails and around the grid.
    pub gap: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            columns: 3,
            thumb_width: 360,
            gap: 12,
        }
    }
}

/// Render each source with the same mapping, in order.
///
/// Fails with [`AutopostError::InsufficientMedia`] before any work when fewer than two sources are
/// given. Frames are independent; one frame's output never depends on another's.
#[tracing::instrument(skip_all, fields(frames = sources.len(), ratio = ratio.as_str()))]
pub fn render_frames(
    renderer: &LayoutRenderer,
    sources: &[RgbaImage],
    ratio: Ratio,
    mapping: &Mapping,
    logo: Option<&RgbaImage>,
    reserved: Option<PixelRect>,
    shaper: &mut dyn TextShaper,
) -> AutopostResult<Vec<LayoutOutput>> {
    if sources.len() < MIN_FRAMES {
        return Err(AutopostError::InsufficientMedia {
            required: MIN_FRAMES,
            got: sources.len(),
        });
    }
    sources
        .iter()
        .map(|src| renderer.render_around(src, ratio, mapping, logo, reserved, shaper))
        .collect()
}

/// Tile frames into a grid of uniform thumbnails on a white background.
pub fn contact_sheet(frames: &[RgbaImage], layout: SheetLayout) -> AutopostResult<RgbaImage> {
    let Some(first) = frames.first() else {
        return Err(AutopostError::InsufficientMedia {
            required: 1,
            got: 0,
        });
    };
    if layout.columns == 0 || layout.thumb_width == 0 {
        return Err(AutopostError::validation(
            "bad_config",
            "sheet columns and thumb_width must be non-zero",
        ));
    }
    let (fw, fh) = first.dimensions();
    let tw = layout.thumb_width;
    let th = ((f64::from(tw) * f64::from(fh) / f64::from(fw.max(1))).round() as u32).max(1);

    let n = frames.len() as u32;
    let cols = layout.columns.min(n);
    let rows = n.div_ceil(cols);
    let g = layout.gap;
    let width = cols * tw + (cols + 1) * g;
    let height = rows * th + (rows + 1) * g;

    let mut sheet = RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    for (i, frame) in frames.iter().enumerate() {
        let i = i as u32;
        let thumb = imageops::resize(frame, tw, th, imageops::FilterType::Triangle);
        let x = g + (i % cols) * (tw + g);
        let y = g + (i / cols) * (th + g);
        imageops::overlay(&mut sheet, &thumb, i64::from(x), i64::from(y));
    }
    Ok(sheet)
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/carousel.rs"]
mod tests;
