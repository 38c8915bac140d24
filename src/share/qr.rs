use image::{RgbaImage, imageops};

use crate::encode::sink::FrameSource;
use crate::foundation::core::PixelRect;
use crate::foundation::error::{AutopostError, AutopostResult};

/// Quiet-zone width in modules.
const QUIET_MODULES: usize = 2;

/// Renders QR codes.
pub trait QrGenerator: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;
    /// Render `data` as an opaque black-on-white square of exactly `side` pixels.
    fn generate(&self, data: &str, side: u32) -> AutopostResult<RgbaImage>;
}

/// QR generator backed by the `qrcode` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModuleQr;

impl QrGenerator for ModuleQr {
    fn name(&self) -> &'static str {
        "qrcode"
    }

    fn generate(&self, data: &str, side: u32) -> AutopostResult<RgbaImage> {
        let code = qrcode::QrCode::with_error_correction_level(data.as_bytes(), qrcode::EcLevel::M)
            .map_err(|e| AutopostError::validation("bad_url", format!("cannot encode QR: {e}")))?;
        let width = code.width();
        let colors = code.to_colors();
        let total = width + 2 * QUIET_MODULES;
        let module_px = (side as usize / total).max(1) as u32;
        let drawn = total as u32 * module_px;

        let mut img = RgbaImage::from_pixel(drawn, drawn, image::Rgba([255, 255, 255, 255]));
        for (i, c) in colors.iter().enumerate() {
            if *c != qrcode::Color::Dark {
                continue;
            }
            let mx = (i % width + QUIET_MODULES) as u32 * module_px;
            let my = (i / width + QUIET_MODULES) as u32 * module_px;
            for y in my..my + module_px {
                for x in mx..mx + module_px {
                    img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
                }
            }
        }

        if drawn == side {
            return Ok(img);
        }
        if drawn > side {
            return Ok(imageops::resize(
                &img,
                side,
                side,
                imageops::FilterType::Nearest,
            ));
        }
        let mut out = RgbaImage::from_pixel(side, side, image::Rgba([255, 255, 255, 255]));
        let off = i64::from((side - drawn) / 2);
        imageops::overlay(&mut out, &img, off, off);
        Ok(out)
    }
}

/// Generator used when QR output is switched off in configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledQr;

impl QrGenerator for DisabledQr {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn generate(&self, _data: &str, _side: u32) -> AutopostResult<RgbaImage> {
        Err(AutopostError::capability("qr generation is disabled"))
    }
}

/// QR side for an image whose shorter side is `min_side`.
///
/// `22%` of the short side clamped to `160..=360` px, then kept within `16%..=36%` of the short side.
pub fn qr_side(min_side: u32) -> u32 {
    let m = f64::from(min_side);
    let side = (0.22 * m).round().clamp(160.0, 360.0);
    side.clamp((0.16 * m).round(), (0.36 * m).round().max(1.0)) as u32
}

/// Margin from the bottom-right corner.
pub fn qr_margin(min_side: u32) -> u32 {
    (0.022 * f64::from(min_side)).round() as u32
}

/// A QR ready to be pasted onto same-sized frames.
#[derive(Clone, Debug)]
pub struct QrStamp {
    tile: RgbaImage,
    rect: PixelRect,
}

impl QrStamp {
    /// Render the QR for `data` sized for a `width`x`height` frame.
    pub fn new(
        generator: &dyn QrGenerator,
        data: &str,
        width: u32,
        height: u32,
    ) -> AutopostResult<Self> {
        let min_side = width.min(height);
        let side = qr_side(min_side);
        let margin = qr_margin(min_side);
        let pad = (side / 16).max(4);
        let qr = generator.generate(data, side)?;

        let tile_side = side + 2 * pad;
        let mut tile =
            RgbaImage::from_pixel(tile_side, tile_side, image::Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut tile, &qr, i64::from(pad), i64::from(pad));

        let x = width.saturating_sub(margin + tile_side);
        let y = height.saturating_sub(margin + tile_side);
        Ok(Self {
            tile,
            rect: PixelRect::new(x as i32, y as i32, tile_side, tile_side),
        })
    }

    /// Box covered by the white padding tile.
    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    /// Paste onto `img` in place.
    pub fn apply(&self, img: &mut RgbaImage) {
        imageops::overlay(
            img,
            &self.tile,
            i64::from(self.rect.x),
            i64::from(self.rect.y),
        );
    }
}

/// Frame source that pastes a [`QrStamp`] onto every frame of another source.
///
/// Used for video so the zoom of the Ken Burns pass never crops the code.
pub struct StampedFrames<'a> {
    inner: &'a dyn FrameSource,
    stamp: Option<&'a QrStamp>,
}

impl<'a> StampedFrames<'a> {
    /// Wrap `inner`; with `stamp == None` frames pass through unchanged.
    pub fn new(inner: &'a dyn FrameSource, stamp: Option<&'a QrStamp>) -> Self {
        Self { inner, stamp }
    }
}

impl FrameSource for StampedFrames<'_> {
    fn frame_count(&self) -> usize {
        self.inner.frame_count()
    }

    fn frame_size(&self) -> (u32, u32) {
        self.inner.frame_size()
    }

    fn frame_at(&self, idx: usize) -> Option<RgbaImage> {
        let mut frame = self.inner.frame_at(idx)?;
        if let Some(stamp) = self.stamp {
            stamp.apply(&mut frame);
        }
        Some(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/share/qr.rs"]
mod tests;
