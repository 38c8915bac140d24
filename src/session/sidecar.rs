use std::path::{Path, PathBuf};

use crate::encode::video::EncodeStatus;
use crate::foundation::core::{Mode, Ratio};
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::fs::write_atomic;
use crate::session::ids::{META_SUFFIX, POST_PREFIX};
use crate::session::request::RenderRequest;

/// Artifact family recorded in the sidecar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// One still.
    Image,
    /// Frames plus contact sheet.
    Carousel,
    /// Poster plus video.
    Video,
}

impl ArtifactKind {
    /// Family produced by `mode`.
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Normal | Mode::Copy => Self::Image,
            Mode::Carousel => Self::Carousel,
            Mode::Video => Self::Video,
        }
    }
}

/// Metadata written next to every preview as `prev_<ms>.meta.json`.
///
/// `cost` is fixed at render time; commit charges this value and never recomputes it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sidecar {
    /// Artifact family.
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// `prev_<ms>`.
    pub preview_id: String,
    /// Canonical mode.
    pub mode: Mode,
    /// Canonical ratio.
    pub ratio: Ratio,
    /// Number of rendered frames.
    pub frames: usize,
    /// Credits required to commit.
    pub cost: u64,
    /// Artifact file names in the generated directory, primary artifact first.
    pub files: Vec<String>,
    /// Render time, unix milliseconds.
    pub created_ms: u64,
    /// Video outcome, for video previews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encode_status: Option<EncodeStatus>,
    /// The request as received, for regeneration.
    pub render_context: RenderRequest,
}

impl Sidecar {
    /// Primary artifact file name.
    pub fn primary(&self) -> Option<&str> {
        self.files.first().map(String::as_str)
    }

    /// Write atomically into `dir`.
    pub fn write(&self, dir: &Path) -> AutopostResult<PathBuf> {
        let path = meta_path(dir, &self.preview_id);
        write_json(&path, self)?;
        Ok(path)
    }

    /// Read the sidecar for `stem`, `None` when absent.
    pub fn read(dir: &Path, stem: &str) -> AutopostResult<Option<Self>> {
        read_json(&meta_path(dir, stem))
    }
}

/// Record of a successful commit, written as `post_<ms>.meta.json`.
///
/// Its existence marks the preview as committed; a later commit of the same preview returns it
/// unchanged instead of charging again.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CommitRecord {
    /// `post_<ms>`.
    pub post_id: String,
    /// Preview the post was promoted from.
    pub preview_id: String,
    /// Artifact family.
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    /// Public URL of the primary committed artifact.
    pub committed_url: String,
    /// Credits charged.
    pub cost: u64,
    /// Account charged.
    pub account: String,
    /// Commit time, unix milliseconds.
    pub committed_ms: u64,
    /// Committed file names, primary first.
    pub files: Vec<String>,
}

impl CommitRecord {
    /// Write atomically into `dir`.
    pub fn write(&self, dir: &Path) -> AutopostResult<PathBuf> {
        let path = meta_path(dir, &self.post_id);
        write_json(&path, self)?;
        Ok(path)
    }

    /// Read the record for `post_stem`, `None` when absent.
    pub fn read(dir: &Path, post_stem: &str) -> AutopostResult<Option<Self>> {
        read_json(&meta_path(dir, post_stem))
    }

    /// Every commit record in `dir`, newest first.
    ///
    /// Unreadable records are skipped with a warning.
    pub fn list(dir: &Path) -> AutopostResult<Vec<Self>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("list '{}'", dir.display()))
                    .into());
            }
        };
        let mut out = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(META_SUFFIX) else {
                continue;
            };
            if !stem.starts_with(POST_PREFIX) {
                continue;
            }
            match Self::read(dir, stem) {
                Ok(Some(rec)) => out.push(rec),
                Ok(None) => {}
                Err(e) => tracing::warn!(record = %name, error = %e, "skipping unreadable commit record"),
            }
        }
        out.sort_by(|a, b| {
            b.committed_ms
                .cmp(&a.committed_ms)
                .then_with(|| b.post_id.cmp(&a.post_id))
        });
        Ok(out)
    }
}

/// `<dir>/<stem>.meta.json`
pub fn meta_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}{META_SUFFIX}"))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> AutopostResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| AutopostError::serde(format!("encode '{}': {e}", path.display())))?;
    write_atomic(path, &bytes)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> AutopostResult<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("read '{}'", path.display()))
                .into());
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| AutopostError::serde(format!("decode '{}': {e}", path.display())))
}

#[cfg(test)]
#[path = "../../tests/unit/session/sidecar.rs"]
mod tests;
