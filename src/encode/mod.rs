//! Encoding of rendered frames into files.
//!
//! Video goes through `ffmpeg` with an ordered backend fallback chain; stills use the `image`
//! encoders directly.

/// `ffmpeg`-based sink and tool wrapper.
pub mod ffmpeg;
/// Frame source/sink traits and an in-memory sink.
pub mod sink;
/// JPEG and WebP still output.
pub mod still;
/// Fallback chain, transcode, music mux.
pub mod video;
