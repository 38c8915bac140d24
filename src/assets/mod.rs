//! Source images: resolving references, decoding, suitability checks and background removal.

/// Background removal capability.
pub mod background;
/// Suitability heuristics for product photos.
pub mod check;
/// Tolerant raster/SVG decoding.
pub mod decode;
/// Reference resolution and remote download cache.
pub mod loader;
