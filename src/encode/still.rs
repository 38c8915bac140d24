use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use image::{ImageEncoder, RgbaImage};

use crate::foundation::error::AutopostResult;
use crate::foundation::fs::ensure_parent_dir;

/// JPEG quality used for every still artifact.
pub const JPEG_QUALITY: u8 = 92;

/// Write `img` as an opaque JPEG.
pub fn save_jpeg(img: &RgbaImage, path: &Path) -> AutopostResult<()> {
    ensure_parent_dir(path)?;
    let rgb = image::DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let file = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut w = BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut w, JPEG_QUALITY)
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .with_context(|| format!("encode jpeg '{}'", path.display()))?;
    Ok(())
}

/// Write `img` as a lossless WebP.
pub fn save_webp(img: &RgbaImage, path: &Path) -> AutopostResult<()> {
    ensure_parent_dir(path)?;
    let file = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let w = BufWriter::new(file);
    image::codecs::webp::WebPEncoder::new_lossless(w)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .with_context(|| format!("encode webp '{}'", path.display()))?;
    Ok(())
}
