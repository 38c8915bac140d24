//! CPU compositing of a single creative.
//!
//! `compose` drives the layout; `painter` and `text` wrap `vello_cpu` and `parley`.

/// Layout renderer producing one composited canvas.
pub mod compose;
/// Thin drawing surface over `vello_cpu`.
pub mod painter;
/// Text shaping backends.
pub mod text;
