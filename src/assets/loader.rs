use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use image::RgbaImage;

use crate::assets::decode::decode_raster;
use crate::config::EngineConfig;
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::math::fnv1a64_str;

/// A decoded source image together with where it came from.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    /// Reference as supplied by the caller.
    pub reference: String,
    /// Local file the pixels were read from.
    pub path: PathBuf,
    /// Straight-alpha RGBA8 pixels.
    pub image: RgbaImage,
}

/// Resolves image references (static-root paths or HTTP(S) URLs) to local decoded rasters.
///
/// Remote sources are downloaded once into the cache directory, keyed by a hash of the URL.
pub struct ImageLoader {
    static_root: PathBuf,
    static_segment: String,
    download_dir: PathBuf,
    max_bytes: u64,
    client: reqwest::blocking::Client,
}

impl ImageLoader {
    /// Build a loader from engine configuration.
    pub fn new(cfg: &EngineConfig) -> AutopostResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.download_timeout_secs.max(1)))
            .user_agent(concat!("autopost/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            static_root: cfg.static_root.clone(),
            static_segment: cfg.url_prefix.trim_matches('/').to_string(),
            download_dir: cfg.download_dir(),
            max_bytes: cfg.max_download_bytes,
            client,
        })
    }

    /// Load and decode `reference`.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, reference: &str) -> AutopostResult<LoadedImage> {
        let path = self.materialize(reference)?;
        let bytes = std::fs::read(&path).map_err(|e| {
            AutopostError::image_load(reference, format!("read '{}': {e}", path.display()))
        })?;
        let image = decode_raster(&bytes, reference)?;
        Ok(LoadedImage {
            reference: reference.to_string(),
            path,
            image,
        })
    }

    /// Resolve `reference` to a local file, downloading remote URLs into the cache.
    pub fn materialize(&self, reference: &str) -> AutopostResult<PathBuf> {
        let reference = reference.trim();
        if is_remote(reference) {
            return self.download(reference);
        }
        self.resolve_local(reference)
    }

    /// Map a static-root reference (`/static/uploads/a.jpg`, `uploads/a.jpg`) to an existing file.
    pub fn resolve_local(&self, reference: &str) -> AutopostResult<PathBuf> {
        let mut rel = reference.trim().trim_start_matches('/');
        if !self.static_segment.is_empty()
            && let Some(rest) = rel.strip_prefix(self.static_segment.as_str())
            && rest.starts_with('/')
        {
            rel = rest.trim_start_matches('/');
        }
        let norm = normalize_rel_path(rel)?;
        let path = self.static_root.join(Path::new(&norm));
        if !path.is_file() {
            return Err(AutopostError::not_found(format!(
                "image '{reference}' does not exist"
            )));
        }
        Ok(path)
    }

    fn download(&self, url: &str) -> AutopostResult<PathBuf> {
        let key = format!("{:016x}", fnv1a64_str(url, 0));
        if let Some(hit) = self.cached(&key) {
            tracing::debug!(url, path = %hit.display(), "download cache hit");
            return Ok(hit);
        }

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AutopostError::image_load(url, format!("request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(AutopostError::image_load(
                url,
                format!("unexpected http status {}", resp.status()),
            ));
        }
        if let Some(len) = resp.content_length()
            && len > self.max_bytes
        {
            return Err(AutopostError::image_load(
                url,
                format!("response of {len} bytes exceeds limit {}", self.max_bytes),
            ));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let mut bytes = Vec::new();
        resp.take(self.max_bytes + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| AutopostError::image_load(url, format!("read body: {e}")))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(AutopostError::image_load(url, "response exceeds size limit"));
        }
        if bytes.is_empty() {
            return Err(AutopostError::image_load(url, "empty response body"));
        }

        let ext = extension_from_url(url)
            .or_else(|| content_type.as_deref().and_then(extension_from_content_type))
            .unwrap_or("bin");
        std::fs::create_dir_all(&self.download_dir).with_context(|| {
            format!(
                "failed to create download directory '{}'",
                self.download_dir.display()
            )
        })?;
        let out = self.download_dir.join(format!("{key}.{ext}"));
        let tmp = self.download_dir.join(format!("{key}.part"));
        std::fs::write(&tmp, &bytes)
            .with_context(|| format!("write download '{}'", tmp.display()))?;
        std::fs::rename(&tmp, &out)
            .with_context(|| format!("move download into '{}'", out.display()))?;
        tracing::info!(url, path = %out.display(), bytes = bytes.len(), "downloaded remote source");
        Ok(out)
    }

    fn cached(&self, key: &str) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.download_dir).ok()?;
        entries.flatten().map(|e| e.path()).find(|p| {
            p.file_stem().and_then(|s| s.to_str()) == Some(key)
                && p.extension().and_then(|s| s.to_str()) != Some("part")
                && p.metadata().map(|m| m.len() > 0).unwrap_or(false)
        })
    }
}

/// `true` for `http://` and `https://` references.
pub fn is_remote(reference: &str) -> bool {
    let r = reference.trim().to_ascii_lowercase();
    r.starts_with("http://") || r.starts_with("https://")
}

/// Normalize and validate static-root-relative paths.
///
/// The result uses `/` separators, drops `.` segments, and rejects parent traversals (`..`).
pub(crate) fn normalize_rel_path(source: &str) -> AutopostResult<String> {
    let s = source.replace('\\', "/");
    if s.is_empty() {
        return Err(AutopostError::validation(
            "missing_image_url",
            "image path must be non-empty",
        ));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(AutopostError::not_found(format!(
                "path '{source}' escapes the static root"
            )));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(AutopostError::validation(
            "missing_image_url",
            "image path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// File extension from the last URL path segment, ignoring query and fragment.
pub(crate) fn extension_from_url(url: &str) -> Option<&'static str> {
    let without_query = url.split(['?', '#']).next()?;
    let after_scheme = without_query.split_once("://").map_or(without_query, |(_, r)| r);
    let path = after_scheme.split_once('/').map(|(_, p)| p)?;
    let last = path.rsplit('/').next()?;
    let (_, ext) = last.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "webp" => Some("webp"),
        "gif" => Some("gif"),
        "bmp" => Some("bmp"),
        "svg" => Some("svg"),
        "mp3" => Some("mp3"),
        "wav" => Some("wav"),
        "m4a" => Some("m4a"),
        "aac" => Some("aac"),
        "ogg" => Some("ogg"),
        _ => None,
    }
}

/// File extension implied by a `Content-Type` header value.
pub(crate) fn extension_from_content_type(ct: &str) -> Option<&'static str> {
    let mime = ct.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/svg+xml" => Some("svg"),
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        "audio/mp4" | "audio/x-m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/ogg" => Some("ogg"),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
