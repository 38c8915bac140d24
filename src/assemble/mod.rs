//! Multi-frame outputs built on top of the layout renderer.

/// Carousel frames and contact sheets.
pub mod carousel;
/// Ken Burns zoom/crossfade sequences.
pub mod kenburns;
