use image::{RgbaImage, imageops};

use crate::foundation::core::{PixelRect, Ratio};
use crate::foundation::error::AutopostResult;
use crate::foundation::math::px;
use crate::layout::geometry::{SlotGrid, cover_fit};
use crate::layout::mapping::Mapping;
use crate::layout::price::{discount_label, resolve_discount};
use crate::layout::text_fit::{FitBox, FittedText, fit_text};
use crate::render::painter::{Painter, Rgba};
use crate::render::text::TextShaper;

/// Smallest font size the shrink loop may reach.
pub const FONT_FLOOR_PX: u32 = 18;
/// Smallest CTA font size.
pub const CTA_FONT_FLOOR_PX: u32 = 16;

const PANEL_BG: Rgba = [0, 0, 0, 150];
const BADGE_BG: Rgba = [220, 38, 38, 240];
const CTA_BG: Rgba = [255, 255, 255, 240];
const CTA_FG: Rgba = [17, 17, 17, 255];
const TITLE_FG: Rgba = [255, 255, 255, 255];
const PRICE_FG: Rgba = [255, 214, 10, 255];
const OLD_PRICE_FG: Rgba = [210, 210, 210, 255];

/// Which optional elements were drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppliedFlags {
    /// Any overlay element was drawn.
    pub overlay_applied: bool,
    /// Brand logo drawn.
    pub logo_applied: bool,
    /// Discount badge drawn.
    pub discount_badge_applied: bool,
    /// CTA button drawn.
    pub cta_applied: bool,
    /// QR code pasted.
    pub qr_applied: bool,
}

impl AppliedFlags {
    /// Set every flag that is set in `other`.
    pub fn merge(&mut self, other: AppliedFlags) {
        self.overlay_applied |= other.overlay_applied;
        self.logo_applied |= other.logo_applied;
        self.discount_badge_applied |= other.discount_badge_applied;
        self.cta_applied |= other.cta_applied;
        self.qr_applied |= other.qr_applied;
    }
}

/// Bounding box of every drawn element.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SlotsUsed {
    /// Logo box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<PixelRect>,
    /// Discount badge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<PixelRect>,
    /// Title/price panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panel: Option<PixelRect>,
    /// Title text extent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<PixelRect>,
    /// Price text extent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<PixelRect>,
    /// Struck-through old price extent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_price: Option<PixelRect>,
    /// CTA button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<PixelRect>,
    /// QR code including its padding box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr: Option<PixelRect>,
}

/// Text actually drawn, after wrapping and truncation.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DrawnText {
    /// Badge label such as `-25%`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Title lines.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<String>,
    /// Title font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_size_px: Option<u32>,
    /// Price line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Price font size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_size_px: Option<u32>,
    /// CTA label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
}

/// Output of one layout render.
#[derive(Clone, Debug)]
pub struct LayoutOutput {
    /// Composited canvas.
    pub image: RgbaImage,
    /// Drawn elements.
    pub applied: AppliedFlags,
    /// Element geometry.
    pub slots: SlotsUsed,
    /// Overlay region.
    pub safe_area: PixelRect,
    /// Drawn text.
    pub text: DrawnText,
}

/// Composites a base image and a [`Mapping`] onto a fixed-size canvas.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutRenderer;

impl LayoutRenderer {
    /// Render one creative.
    ///
    /// Draw order: base (cover-fit), logo, discount badge, title/price panel, CTA.
    pub fn render(
        &self,
        base: &RgbaImage,
        ratio: Ratio,
        mapping: &Mapping,
        logo: Option<&RgbaImage>,
        shaper: &mut dyn TextShaper,
    ) -> AutopostResult<LayoutOutput> {
        self.render_around(base, ratio, mapping, logo, None, shaper)
    }

    /// [`LayoutRenderer::render`] keeping the panel and CTA clear of `reserved`.
    pub fn render_around(
        &self,
        base: &RgbaImage,
        ratio: Ratio,
        mapping: &Mapping,
        logo: Option<&RgbaImage>,
        reserved: Option<PixelRect>,
        shaper: &mut dyn TextShaper,
    ) -> AutopostResult<LayoutOutput> {
        let canvas = ratio.canvas();
        let m = f64::from(canvas.min_side());
        let mut grid = SlotGrid::for_ratio(ratio);
        if let Some(r) = reserved {
            grid.avoid(r);
        }
        let fitted = cover_fit(base, canvas);
        let mut painter = Painter::new(&fitted)?;

        let mut applied = AppliedFlags::default();
        let mut slots = SlotsUsed::default();
        let mut text = DrawnText::default();

        if let Some(logo) = logo
            && let Some(rect) = grid.logo_rect(logo.width(), logo.height())
        {
            let scaled = imageops::resize(logo, rect.w, rect.h, imageops::FilterType::Lanczos3);
            painter.draw_image(&scaled, f64::from(rect.x), f64::from(rect.y))?;
            slots.logo = Some(rect);
            applied.logo_applied = true;
        }

        let pct = resolve_discount(
            mapping.price(),
            mapping.old_price(),
            mapping.discount_pct,
            mapping.discount_badge,
        );
        if let Some(pct) = pct {
            let label = discount_label(pct);
            let b = grid.badge;
            let pad = px(0.02 * m);
            let fit = fit_text(
                shaper,
                &label,
                FitBox {
                    max_width: b.w.saturating_sub(2 * pad) as f32,
                    max_height: b.h.saturating_sub(pad) as f32,
                    max_lines: 1,
                },
                px(0.06 * m),
                FONT_FLOOR_PX,
            );
            if let Some(fit) = fit {
                painter.fill_rounded_rect(b, f64::from(b.h) * 0.2, BADGE_BG);
                draw_centered(&mut painter, shaper, &fit, b, TITLE_FG)?;
                slots.badge = Some(b);
                applied.discount_badge_applied = true;
                text.badge = Some(label);
            }
        }

        let title = mapping.title();
        let price = mapping.price();
        let cta = mapping.cta();
        if title.is_some() || price.is_some() {
            let panel = grid.panel(cta.is_some());
            let (title_box, price_box) = grid.panel_boxes(panel, title.is_some(), price.is_some());
            painter.fill_rounded_rect(panel, f64::from(grid.padding) * 0.6, PANEL_BG);
            slots.panel = Some(panel);

            let price_fit = match (price, price_box) {
                (Some(p), Some(bx)) => fit_text(
                    shaper,
                    p,
                    FitBox {
                        max_width: bx.w as f32,
                        max_height: bx.h as f32,
                        max_lines: 1,
                    },
                    px(0.075 * m),
                    FONT_FLOOR_PX,
                ),
                _ => None,
            };

            let title_start = match &price_fit {
                Some(pf) => px(0.05 * m).min(pf.size_px.saturating_sub(2).max(FONT_FLOOR_PX)),
                None => px(0.05 * m),
            };
            let title_fit = match (title, title_box) {
                (Some(t), Some(bx)) => fit_text(
                    shaper,
                    t,
                    FitBox {
                        max_width: bx.w as f32,
                        max_height: bx.h as f32,
                        max_lines: 2,
                    },
                    title_start,
                    FONT_FLOOR_PX,
                ),
                _ => None,
            };

            if let (Some(fit), Some(bx)) = (&title_fit, title_box) {
                slots.title = Some(draw_block(&mut painter, shaper, fit, bx, TITLE_FG)?);
                text.title = fit.lines.clone();
                text.title_size_px = Some(fit.size_px);
            }
            if let (Some(fit), Some(bx)) = (&price_fit, price_box) {
                let drawn = draw_block(&mut painter, shaper, fit, bx, PRICE_FG)?;
                slots.price = Some(drawn);
                text.price = fit.lines.first().cloned();
                text.price_size_px = Some(fit.size_px);

                if applied.discount_badge_applied
                    && let Some(old) = mapping.old_price()
                {
                    slots.old_price =
                        draw_old_price(&mut painter, shaper, old, fit.size_px, drawn, bx)?;
                }
            }
        }

        if let Some(label) = cta {
            let b = grid.cta;
            let pad = grid.padding;
            let fit = fit_text(
                shaper,
                label,
                FitBox {
                    max_width: b.w.saturating_sub(2 * pad) as f32,
                    max_height: b.h.saturating_sub(pad / 2) as f32,
                    max_lines: 1,
                },
                px(0.045 * m),
                CTA_FONT_FLOOR_PX,
            );
            if let Some(fit) = fit {
                painter.fill_rounded_rect(b, f64::from(b.h) / 2.0, CTA_BG);
                draw_centered(&mut painter, shaper, &fit, b, CTA_FG)?;
                slots.cta = Some(b);
                applied.cta_applied = true;
                text.cta = fit.lines.first().cloned();
            }
        }

        applied.overlay_applied = applied.logo_applied
            || applied.discount_badge_applied
            || applied.cta_applied
            || slots.panel.is_some();

        Ok(LayoutOutput {
            image: painter.finish()?,
            applied,
            slots,
            safe_area: grid.safe,
            text,
        })
    }
}

/// Draw wrapped lines left-aligned and vertically centered in `bx`; returns the text extent.
fn draw_block(
    painter: &mut Painter,
    shaper: &mut dyn TextShaper,
    fit: &FittedText,
    bx: PixelRect,
    color: Rgba,
) -> AutopostResult<PixelRect> {
    let total_h = fit.height();
    let top = f64::from(bx.y) + (f64::from(bx.h) - f64::from(total_h)).max(0.0) / 2.0;
    for (i, line) in fit.lines.iter().enumerate() {
        let shaped = shaper.shape_line(line, fit.size_px as f32)?;
        let y = top + f64::from(fit.line_height) * i as f64;
        painter.draw_text_line(&shaped, f64::from(bx.x), y, color);
    }
    Ok(PixelRect::new(
        bx.x,
        top.round() as i32,
        (fit.max_width().ceil() as u32).min(bx.w),
        total_h.ceil() as u32,
    ))
}

/// Draw a single fitted line centered in `bx`.
fn draw_centered(
    painter: &mut Painter,
    shaper: &mut dyn TextShaper,
    fit: &FittedText,
    bx: PixelRect,
    color: Rgba,
) -> AutopostResult<()> {
    let Some(line) = fit.lines.first() else {
        return Ok(());
    };
    let shaped = shaper.shape_line(line, fit.size_px as f32)?;
    let x = f64::from(bx.x) + (f64::from(bx.w) - f64::from(shaped.width)).max(0.0) / 2.0;
    let y = f64::from(bx.y) + (f64::from(bx.h) - f64::from(fit.line_height)).max(0.0) / 2.0;
    painter.draw_text_line(&shaped, x, y, color);
    Ok(())
}

/// Old price, smaller and struck through, to the right of the price when there is room.
fn draw_old_price(
    painter: &mut Painter,
    shaper: &mut dyn TextShaper,
    old: &str,
    price_size: u32,
    price_rect: PixelRect,
    bx: PixelRect,
) -> AutopostResult<Option<PixelRect>> {
    let size = ((price_size as f32) * 0.55).round().max(FONT_FLOOR_PX as f32);
    let gap = (price_size as f32 * 0.4).round();
    let x = price_rect.right() as f32 + gap;
    let avail = bx.right() as f32 - x;
    let w = shaper.measure(old, size);
    if avail <= 0.0 || w > avail {
        return Ok(None);
    }
    let shaped = shaper.shape_line(old, size)?;
    let lh = shaper.line_height(size);
    let y = price_rect.y as f32 + (price_rect.h as f32 - lh).max(0.0) / 2.0;
    painter.draw_text_line(&shaped, f64::from(x), f64::from(y), OLD_PRICE_FG);
    let strike_y = f64::from(y + lh * 0.6);
    painter.hline(
        f64::from(x),
        f64::from(x + w),
        strike_y,
        (f64::from(size) * 0.08).max(2.0),
        OLD_PRICE_FG,
    );
    Ok(Some(PixelRect::new(
        x.round() as i32,
        y.round() as i32,
        w.ceil() as u32,
        lh.ceil() as u32,
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compose.rs"]
mod tests;
