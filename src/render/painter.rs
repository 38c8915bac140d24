use std::sync::Arc;

use image::RgbaImage;

use crate::assets::decode::{premultiply_rgba8_in_place, unpremultiply_rgba8_in_place};
use crate::foundation::core::PixelRect;
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::render::text::{GlyphPaint, ShapedLine};

/// Straight-alpha RGBA8 colour.
pub type Rgba = [u8; 4];

/// Immediate-mode 2D painter over a `vello_cpu` render context.
///
/// The base raster is drawn first as an image paint; every later call is layered on top in call
/// order. [`Painter::finish`] flushes and returns a straight-alpha image.
pub struct Painter {
    ctx: vello_cpu::RenderContext,
    width: u16,
    height: u16,
}

impl Painter {
    /// Start a painter whose first layer is `base`.
    pub fn new(base: &RgbaImage) -> AutopostResult<Self> {
        let (w, h) = base.dimensions();
        let width: u16 = w
            .try_into()
            .map_err(|_| AutopostError::validation("bad_canvas", "canvas width exceeds u16"))?;
        let height: u16 = h
            .try_into()
            .map_err(|_| AutopostError::validation("bad_canvas", "canvas height exceeds u16"))?;
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        ctx.reset();
        let mut this = Self { ctx, width, height };
        this.draw_image(base, 0.0, 0.0)?;
        Ok(this)
    }

    /// Fill an axis-aligned rectangle.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgba) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(to_color(color));
        let r = rect.to_kurbo();
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1));
    }

    /// Fill a rounded rectangle.
    pub fn fill_rounded_rect(&mut self, rect: PixelRect, radius: f64, color: Rgba) {
        use kurbo::Shape;

        let r = rect.to_kurbo();
        let rr = kurbo::RoundedRect::new(r.x0, r.y0, r.x1, r.y1, radius);
        let mut path = vello_cpu::kurbo::BezPath::new();
        for el in rr.path_elements(0.1) {
            push_el(&mut path, el);
        }
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(to_color(color));
        self.ctx.fill_path(&path);
    }

    /// Stroke a horizontal line of `thickness` pixels from `x0` to `x1` at `y`.
    pub fn hline(&mut self, x0: f64, x1: f64, y: f64, thickness: f64, color: Rgba) {
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(to_color(color));
        let half = thickness / 2.0;
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(x0, y - half, x1, y + half));
    }

    /// Draw a straight-alpha raster with its top-left at `(x, y)`.
    pub fn draw_image(&mut self, img: &RgbaImage, x: f64, y: f64) -> AutopostResult<()> {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Ok(());
        }
        let paint = image_paint(img)?;
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
        self.ctx.set_paint(paint);
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(w),
            f64::from(h),
        ));
        Ok(())
    }

    /// Paint a shaped line with its box top-left at `(x, y)`, with a soft drop shadow.
    pub fn draw_text_line(&mut self, line: &ShapedLine, x: f64, y: f64, color: Rgba) {
        let size = f64::from(line.height) / 1.2;
        let offset = (size * 0.06).clamp(1.0, 4.0);
        self.paint_line(line, x + offset, y + offset, [0, 0, 0, 150]);
        self.paint_line(line, x, y, color);
    }

    fn paint_line(&mut self, line: &ShapedLine, x: f64, y: f64, color: Rgba) {
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
        self.ctx.set_paint(to_color(color));
        for run in &line.paint {
            match run {
                GlyphPaint::Outline { font, size, glyphs } => {
                    self.ctx
                        .glyph_run(font)
                        .font_size(*size)
                        .fill_glyphs(glyphs.iter().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        }));
                }
                GlyphPaint::Blocks(blocks) => {
                    for b in blocks {
                        self.ctx
                            .fill_rect(&vello_cpu::kurbo::Rect::new(b.x0, b.y0, b.x1, b.y1));
                    }
                }
            }
        }
    }

    /// Rasterize everything and return straight-alpha RGBA8.
    pub fn finish(mut self) -> AutopostResult<RgbaImage> {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        let mut data = pixmap.data_as_u8_slice().to_vec();
        unpremultiply_rgba8_in_place(&mut data);
        RgbaImage::from_raw(u32::from(self.width), u32::from(self.height), data).ok_or_else(
            || AutopostError::Other(anyhow::anyhow!("pixmap byte len mismatch")),
        )
    }
}

fn to_color(c: Rgba) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c[0], c[1], c[2], c[3])
}

fn push_el(out: &mut vello_cpu::kurbo::BezPath, el: kurbo::PathEl) {
    use kurbo::PathEl;

    match el {
        PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
        PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
        PathEl::QuadTo(p1, p2) => out.quad_to(
            vello_cpu::kurbo::Point::new(p1.x, p1.y),
            vello_cpu::kurbo::Point::new(p2.x, p2.y),
        ),
        PathEl::CurveTo(p1, p2, p3) => out.curve_to(
            vello_cpu::kurbo::Point::new(p1.x, p1.y),
            vello_cpu::kurbo::Point::new(p2.x, p2.y),
            vello_cpu::kurbo::Point::new(p3.x, p3.y),
        ),
        PathEl::ClosePath => out.close_path(),
    }
}

fn image_paint(img: &RgbaImage) -> AutopostResult<vello_cpu::Image> {
    let (width, height) = img.dimensions();
    let w: u16 = width
        .try_into()
        .map_err(|_| AutopostError::validation("bad_canvas", "image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| AutopostError::validation("bad_canvas", "image height exceeds u16"))?;
    let mut bytes = img.as_raw().clone();
    premultiply_rgba8_in_place(&mut bytes);
    let opaque = bytes.chunks_exact(4).all(|px| px[3] == 255);
    let pixels: Vec<vello_cpu::peniko::color::PremulRgba8> = bytes
        .chunks_exact(4)
        .map(|px| vello_cpu::peniko::color::PremulRgba8::from_u8_array([px[0], px[1], px[2], px[3]]))
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, opaque);
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/painter.rs"]
mod tests;
