use image::{RgbaImage, imageops};

use crate::foundation::core::{Canvas, PixelRect, Ratio};
use crate::foundation::math::px;

/// Scale `src` uniformly so it covers `canvas`, then center-crop the overflow.
///
/// The result always has exactly the canvas dimensions; aspect is never distorted and nothing is
/// letterboxed. Degenerate inputs produce a black canvas.
pub fn cover_fit(src: &RgbaImage, canvas: Canvas) -> RgbaImage {
    let (sw, sh) = src.dimensions();
    if sw == 0 || sh == 0 || canvas.width == 0 || canvas.height == 0 {
        return RgbaImage::from_pixel(canvas.width, canvas.height, image::Rgba([0, 0, 0, 255]));
    }
    let scale = (f64::from(canvas.width) / f64::from(sw)).max(f64::from(canvas.height) / f64::from(sh));
    // Crop in source space first; only the visible window is ever resampled.
    let cw = ((f64::from(canvas.width) / scale).round() as u32).clamp(1, sw);
    let ch = ((f64::from(canvas.height) / scale).round() as u32).clamp(1, sh);
    let window = imageops::crop_imm(src, (sw - cw) / 2, (sh - ch) / 2, cw, ch).to_image();

    let mut out = if (cw, ch) == (canvas.width, canvas.height) {
        window
    } else {
        imageops::resize(&window, canvas.width, canvas.height, imageops::FilterType::CatmullRom)
    };
    flatten_onto_black(&mut out);
    out
}

fn flatten_onto_black(img: &mut RgbaImage) {
    for px in img.pixels_mut() {
        let a = u16::from(px.0[3]);
        if a == 255 {
            continue;
        }
        for c in 0..3 {
            px.0[c] = crate::foundation::math::mul_div255_u8(u16::from(px.0[c]), a);
        }
        px.0[3] = 255;
    }
}

/// Top-aligned overlay region, a ratio-dependent share of the canvas height.
pub fn safe_area(ratio: Ratio) -> PixelRect {
    let canvas = ratio.canvas();
    PixelRect::new(
        0,
        0,
        canvas.width,
        px(f64::from(canvas.height) * ratio.safe_fraction()),
    )
}

/// Fixed slot geometry derived from the canvas, before content is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotGrid {
    /// Canvas the grid was computed for.
    pub canvas: Canvas,
    /// Overlay region.
    pub safe: PixelRect,
    /// Edge margin.
    pub margin: u32,
    /// Inner padding for panels and buttons.
    pub padding: u32,
    /// Largest side of the logo box.
    pub logo_max: u32,
    /// Badge box (top-left).
    pub badge: PixelRect,
    /// CTA button, bottom-centered in the safe area.
    pub cta: PixelRect,
    /// Title/price panel height.
    pub panel_height: u32,
    /// Vertical gap between panel and CTA.
    pub gap: u32,
    /// Region kept clear of the CTA and panel.
    pub reserved: Option<PixelRect>,
}

impl SlotGrid {
    /// Compute the grid for `ratio`.
    pub fn for_ratio(ratio: Ratio) -> Self {
        let canvas = ratio.canvas();
        let m = f64::from(canvas.min_side());
        let safe = safe_area(ratio);
        let margin = px(0.04 * m);
        let padding = px(0.025 * m);
        let gap = px(0.02 * m);

        let badge = PixelRect::new(margin as i32, margin as i32, px(0.26 * m), px(0.1 * m));

        let cta_w = px(0.5 * f64::from(canvas.width));
        let cta_h = px(0.09 * m);
        let cta = PixelRect::new(
            ((canvas.width - cta_w) / 2) as i32,
            safe.bottom() - margin as i32 - cta_h as i32,
            cta_w,
            cta_h,
        );

        Self {
            canvas,
            safe,
            margin,
            padding,
            logo_max: (0.11 * m).floor() as u32,
            badge,
            cta,
            panel_height: px(0.24 * m),
            gap,
            reserved: None,
        }
    }

    /// Keep the CTA and the panel clear of `reserved`, e.g. a QR tile pasted after layout.
    pub fn avoid(&mut self, reserved: PixelRect) {
        self.reserved = Some(reserved);
        self.cta = self.lifted(self.cta);
    }

    /// `rect` moved up above the reserved region when it would touch it.
    ///
    /// The clearance is two gaps so a Ken Burns zoom does not push the element under the tile.
    fn lifted(&self, rect: PixelRect) -> PixelRect {
        let Some(reserved) = self.reserved else {
            return rect;
        };
        let clearance = 2 * self.gap;
        let padded = PixelRect::new(
            reserved.x - clearance as i32,
            reserved.y - clearance as i32,
            reserved.w + 2 * clearance,
            reserved.h + 2 * clearance,
        );
        if !rect.intersects(padded) {
            return rect;
        }
        let top = self.safe.y + self.margin as i32;
        PixelRect {
            y: (padded.y - rect.h as i32).max(top),
            ..rect
        }
    }

    /// Panel rectangle, stacked above the CTA when one is drawn.
    pub fn panel(&self, with_cta: bool) -> PixelRect {
        let bottom = if with_cta {
            self.cta.y - self.gap as i32
        } else {
            self.safe.bottom() - self.margin as i32
        };
        let w = self.canvas.width - 2 * self.margin;
        self.lifted(PixelRect::new(
            self.margin as i32,
            bottom - self.panel_height as i32,
            w,
            self.panel_height,
        ))
    }

    /// Split the panel interior into `(title, price)` boxes.
    pub fn panel_boxes(
        &self,
        panel: PixelRect,
        has_title: bool,
        has_price: bool,
    ) -> (Option<PixelRect>, Option<PixelRect>) {
        let p = self.padding;
        let inner = PixelRect::new(
            panel.x + p as i32,
            panel.y + p as i32,
            panel.w.saturating_sub(2 * p),
            panel.h.saturating_sub(2 * p),
        );
        match (has_title, has_price) {
            (true, true) => {
                let price_h = (inner.h * 2) / 5;
                let title_h = inner.h - price_h;
                (
                    Some(PixelRect::new(inner.x, inner.y, inner.w, title_h)),
                    Some(PixelRect::new(
                        inner.x,
                        inner.y + title_h as i32,
                        inner.w,
                        price_h,
                    )),
                )
            }
            (true, false) => (Some(inner), None),
            (false, true) => (None, Some(inner)),
            (false, false) => (None, None),
        }
    }

    /// Fit a `w`x`h` logo into the top-right box, preserving aspect.
    pub fn logo_rect(&self, w: u32, h: u32) -> Option<PixelRect> {
        if w == 0 || h == 0 || self.logo_max == 0 {
            return None;
        }
        let s = (f64::from(self.logo_max) / f64::from(w.max(h))).min(1.0);
        let lw = (f64::from(w) * s).floor().max(1.0) as u32;
        let lh = (f64::from(h) * s).floor().max(1.0) as u32;
        Some(PixelRect::new(
            (self.canvas.width - self.margin - lw) as i32,
            self.margin as i32,
            lw,
            lh,
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/geometry.rs"]
mod tests;
