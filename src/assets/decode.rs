use std::io::Cursor;

use anyhow::Context;
use image::RgbaImage;

use crate::foundation::error::{AutopostError, AutopostResult};

/// Largest side used when rasterizing SVG sources.
const SVG_MAX_SIDE: u32 = 2048;

/// Largest accepted width or height of a raster source.
pub const MAX_DECODE_SIDE: u32 = 16_384;
/// Upper bound on decoder allocations for one source.
pub const MAX_DECODE_ALLOC: u64 = 512 * 1024 * 1024;

/// Decode encoded image bytes into straight-alpha RGBA8.
///
/// Strategies, in order: decoding by sniffed content, then recovery of a JPEG stream that was cut
/// off before its end-of-image marker. Both run under [`decode_limits`], so a small file declaring
/// huge dimensions fails instead of allocating. SVG documents are rasterized. The error carries
/// `reference` unchanged.
pub fn decode_raster(bytes: &[u8], reference: &str) -> AutopostResult<RgbaImage> {
    if bytes.is_empty() {
        return Err(AutopostError::image_load(reference, "empty image data"));
    }
    if looks_like_svg(bytes) {
        return rasterize_svg(bytes, SVG_MAX_SIDE)
            .map_err(|e| AutopostError::image_load(reference, e.to_string()));
    }

    let mut last_err = match decode_bounded(bytes, None) {
        Ok(img) => return Ok(img),
        Err(e) => e.to_string(),
    };

    if let Some(patched) = patch_truncated_jpeg(bytes) {
        match decode_bounded(&patched, Some(image::ImageFormat::Jpeg)) {
            Ok(img) => {
                tracing::warn!(reference, "decoded truncated jpeg after appending EOI marker");
                return Ok(img);
            }
            Err(e) => last_err = e.to_string(),
        }
    }

    Err(AutopostError::image_load(reference, last_err))
}

/// Decoder limits applied to every raster source.
pub fn decode_limits() -> image::Limits {
    let mut limits = image::Limits::default();
    limits.max_image_width = Some(MAX_DECODE_SIDE);
    limits.max_image_height = Some(MAX_DECODE_SIDE);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

fn decode_bounded(bytes: &[u8], format: Option<image::ImageFormat>) -> AutopostResult<RgbaImage> {
    let mut reader = image::ImageReader::new(Cursor::new(bytes));
    match format {
        Some(f) => reader.set_format(f),
        None => {
            reader = reader
                .with_guessed_format()
                .context("guess image format")?;
        }
    }
    reader.limits(decode_limits());
    let img = reader.decode().context("decode image")?;
    Ok(img.to_rgba8())
}

fn patch_truncated_jpeg(bytes: &[u8]) -> Option<Vec<u8>> {
    let is_jpeg = bytes.len() > 4 && bytes[0] == 0xFF && bytes[1] == 0xD8;
    let has_eoi = bytes.ends_with(&[0xFF, 0xD9]);
    if !is_jpeg || has_eoi {
        return None;
    }
    let mut patched = bytes.to_vec();
    patched.extend_from_slice(&[0xFF, 0xD9]);
    Some(patched)
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let t = text.trim_start();
    (t.starts_with("<?xml") || t.starts_with("<svg")) && text.contains("<svg")
}

/// Rasterize an SVG document so its longer side is at most `max_side` pixels.
pub fn rasterize_svg(bytes: &[u8], max_side: u32) -> AutopostResult<RgbaImage> {
    let opts = usvg::Options::default();
    let tree = usvg::Tree::from_data(bytes, &opts).context("parse svg tree")?;

    let size = tree.size();
    let (sw, sh) = (size.width(), size.height());
    if !sw.is_finite() || !sh.is_finite() || sw <= 0.0 || sh <= 0.0 {
        return Err(AutopostError::Other(anyhow::anyhow!(
            "svg has invalid width/height"
        )));
    }
    let scale = (max_side as f32 / sw.max(sh)).min(4.0);
    let w = ((sw * scale).ceil() as u32).max(1);
    let h = ((sh * scale).ceil() as u32).max(1);

    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| anyhow::anyhow!("failed to allocate svg pixmap"))?;
    let xform = resvg::tiny_skia::Transform::from_scale(w as f32 / sw, h as f32 / sh);
    resvg::render(&tree, xform, &mut pixmap.as_mut());

    let mut data = pixmap.data().to_vec();
    unpremultiply_rgba8_in_place(&mut data);
    RgbaImage::from_raw(w, h, data)
        .ok_or_else(|| AutopostError::Other(anyhow::anyhow!("svg raster buffer size mismatch")))
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

pub(crate) fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u32;
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
