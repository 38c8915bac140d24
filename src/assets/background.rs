use image::{Rgba, RgbaImage};

use crate::config::BackgroundRemovalKind;
use crate::foundation::error::{AutopostError, AutopostResult};

/// Background removal capability, selected once at startup.
pub trait BackgroundRemover: Send + Sync {
    /// Replace the background of `image` with white, returning an opaque image.
    fn remove(&self, image: &RgbaImage) -> AutopostResult<RgbaImage>;
}

/// Placeholder used when no remover is configured; every call fails loudly.
#[derive(Debug, Default)]
pub struct NoBackgroundRemoval;

impl BackgroundRemover for NoBackgroundRemoval {
    fn remove(&self, _image: &RgbaImage) -> AutopostResult<RgbaImage> {
        Err(AutopostError::capability(
            "background removal is not configured",
        ))
    }
}

/// Keys out pixels close to the colour sampled along the image border.
///
/// Suits studio shots on a roughly uniform backdrop; pixels within `tolerance` (Euclidean RGB
/// distance) of the border median become white, with a soft ramp over the next `feather` units.
#[derive(Debug, Clone, Copy)]
pub struct KeyOutRemover {
    /// Hard cut-off distance.
    pub tolerance: f32,
    /// Width of the soft transition band.
    pub feather: f32,
}

impl Default for KeyOutRemover {
    fn default() -> Self {
        Self {
            tolerance: 40.0,
            feather: 30.0,
        }
    }
}

impl BackgroundRemover for KeyOutRemover {
    fn remove(&self, image: &RgbaImage) -> AutopostResult<RgbaImage> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Ok(image.clone());
        }
        let key = border_median(image);
        let mut out = image.clone();
        for px in out.pixels_mut() {
            let d = color_distance(px.0, key);
            let keep = if d <= self.tolerance {
                0.0
            } else if d >= self.tolerance + self.feather || self.feather <= 0.0 {
                1.0
            } else {
                (d - self.tolerance) / self.feather
            };
            let alpha = keep * f32::from(px.0[3]) / 255.0;
            for c in 0..3 {
                let v = f32::from(px.0[c]) * alpha + 255.0 * (1.0 - alpha);
                px.0[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            px.0[3] = 255;
        }
        Ok(out)
    }
}

/// Build the configured remover.
pub fn background_remover_for(kind: BackgroundRemovalKind) -> Box<dyn BackgroundRemover> {
    match kind {
        BackgroundRemovalKind::Off => Box::new(NoBackgroundRemoval),
        BackgroundRemovalKind::KeyOut => Box::new(KeyOutRemover::default()),
    }
}

fn border_median(image: &RgbaImage) -> [u8; 4] {
    let (w, h) = image.dimensions();
    let mut samples: Vec<Rgba<u8>> = Vec::with_capacity(((w + h) * 2) as usize);
    for x in 0..w {
        samples.push(*image.get_pixel(x, 0));
        samples.push(*image.get_pixel(x, h - 1));
    }
    for y in 0..h {
        samples.push(*image.get_pixel(0, y));
        samples.push(*image.get_pixel(w - 1, y));
    }
    let mut out = [0u8, 0, 0, 255];
    for (c, slot) in out.iter_mut().enumerate().take(3) {
        let mut ch: Vec<u8> = samples.iter().map(|p| p.0[c]).collect();
        ch.sort_unstable();
        *slot = ch[ch.len() / 2];
    }
    out
}

fn color_distance(a: [u8; 4], b: [u8; 4]) -> f32 {
    let dr = f32::from(a[0]) - f32::from(b[0]);
    let dg = f32::from(a[1]) - f32::from(b[1]);
    let db = f32::from(a[2]) - f32::from(b[2]);
    (dr * dr + dg * dg + db * db).sqrt()
}
