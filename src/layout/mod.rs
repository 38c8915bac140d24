//! Pure layout: slot geometry, price parsing, and text wrapping/shrink-to-fit.

/// Canvas, safe area and slot rectangles.
pub mod geometry;
/// Field mapping drawn onto creatives.
pub mod mapping;
/// Price parsing and discount computation.
pub mod price;
/// Word wrap, truncation and font-size fitting.
pub mod text_fit;
