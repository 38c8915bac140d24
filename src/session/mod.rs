//! Preview/commit lifecycle.
//!
//! A render writes `prev_<ms>` artifacts plus a sidecar; a commit charges the sidecar's cost and
//! copies the artifacts to `post_<ms>`.

/// Artifact naming.
pub mod ids;
/// Client render requests and validation.
pub mod request;
/// Sidecar and commit records.
pub mod sidecar;
/// The orchestrator.
pub mod studio;
