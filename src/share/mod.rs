//! Short links and the QR overlay that points at them.

/// QR generation and stamping.
pub mod qr;
/// Persistent URL shortener with click log.
pub mod shortlink;
