//! Autopost composes branded social-media creatives and manages their preview/commit lifecycle.
//!
//! A [`Studio`] is built once from an [`EngineConfig`] and then:
//!
//! - renders a [`RenderRequest`] into a preview (single image, carousel, or Ken Burns video),
//!   with optional logo, discount badge, title/price panel, CTA button and QR short link
//! - commits a preview, charging the cost recorded at render time exactly once
//! - deletes or regenerates previews and lists committed posts
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Multi-frame assembly (carousel, Ken Burns).
pub mod assemble;
/// Source image loading and analysis.
pub mod assets;
/// Engine configuration.
pub mod config;
/// Frame encoding (video, stills).
pub mod encode;
/// Pure layout computations.
pub mod layout;
/// Credit ledger.
pub mod ledger;
/// Creative compositing.
pub mod render;
/// Preview/commit orchestration.
pub mod session;
/// Short links and QR codes.
pub mod share;

pub use crate::foundation::core::{Canvas, Mode, PixelRect, Ratio};
pub use crate::foundation::error::{ApiError, AutopostError, AutopostResult};

pub use crate::config::{CostTable, EngineConfig, TextBackendKind, VideoConfig};
pub use crate::encode::video::EncodeStatus;
pub use crate::layout::mapping::Mapping;
pub use crate::ledger::credits::{CreditLedger, FileLedger, MemoryLedger};
pub use crate::render::compose::{AppliedFlags, DrawnText, LayoutRenderer, SlotsUsed};
pub use crate::session::request::{ImageRef, RenderRequest};
pub use crate::session::sidecar::{CommitRecord, Sidecar};
pub use crate::session::studio::{CommitResponse, DeleteResponse, RenderResponse, Studio};
pub use crate::share::shortlink::{ClickEvent, Shortlink, ShortlinkStore};
