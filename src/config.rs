use crate::foundation::error::{AutopostError, AutopostResult};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Engine configuration: storage layout, pricing, capabilities and video parameters.
///
/// Every field has a default, so a partial JSON file (or none at all) is valid.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Writable root that the static file host serves.
    pub static_root: PathBuf,
    /// URL prefix under which `static_root` is published.
    pub url_prefix: String,
    /// Absolute base used for short links (`<base>/go/<code>`).
    pub public_base_url: String,
    /// Timeout for remote image/audio downloads.
    pub download_timeout_secs: u64,
    /// Maximum accepted size of a downloaded file.
    pub max_download_bytes: u64,
    /// Optional TTF/OTF file used for text rendering.
    pub font_path: Option<PathBuf>,
    /// Text shaping backend selected at startup.
    pub text_backend: TextBackendKind,
    /// Whether QR generation is available.
    pub qr_enabled: bool,
    /// Background removal capability.
    pub background_removal: BackgroundRemovalKind,
    /// Credits granted to an account the first time it is seen.
    pub initial_credits: u64,
    /// Commit price table.
    pub costs: CostTable,
    /// Video assembly/encoding parameters.
    pub video: VideoConfig,
    /// Carousel contact sheet parameters.
    pub sheet: SheetConfig,
    /// CTA label filled in on regenerate when the original request had none.
    pub default_cta: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            static_root: PathBuf::from("static"),
            url_prefix: "/static".to_string(),
            public_base_url: "http://127.0.0.1:8000".to_string(),
            download_timeout_secs: 10,
            max_download_bytes: 25 * 1024 * 1024,
            font_path: None,
            text_backend: TextBackendKind::Parley,
            qr_enabled: true,
            background_removal: BackgroundRemovalKind::Off,
            initial_credits: 200,
            costs: CostTable::default(),
            video: VideoConfig::default(),
            sheet: SheetConfig::default(),
            default_cta: "Shop now".to_string(),
        }
    }
}

/// Which text shaper to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextBackendKind {
    /// Parley layout with outline glyphs.
    Parley,
    /// Font-free fixed-advance block glyphs.
    Block,
}

/// Which background remover to construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundRemovalKind {
    /// No remover; `ai_bg = "remove"` fails with `capability_unavailable`.
    Off,
    /// Border-colour keying onto white.
    KeyOut,
}

/// Credits charged at commit time, frozen into the sidecar at render time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CostTable {
    /// Single image.
    pub image: u64,
    /// Per carousel frame.
    pub carousel_per_frame: u64,
    /// Flat video price.
    pub video: u64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            image: 1,
            carousel_per_frame: 1,
            video: 5,
        }
    }
}

/// An encoder attempt: container plus ffmpeg codec name.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EncoderBackend {
    /// Output container (`mp4`, `avi`).
    pub container: String,
    /// ffmpeg video codec.
    pub codec: String,
}

impl EncoderBackend {
    fn new(container: &str, codec: &str) -> Self {
        Self {
            container: container.to_string(),
            codec: codec.to_string(),
        }
    }
}

/// Ken Burns and encoder parameters.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Output frame rate.
    pub fps: u32,
    /// Hold time per source frame.
    pub seconds_per_image: f64,
    /// Final zoom factor reached at the end of each hold.
    pub zoom: f64,
    /// Crossfade length between consecutive frames.
    pub crossfade_seconds: f64,
    /// `ffmpeg` executable.
    pub ffmpeg_path: PathBuf,
    /// `ffprobe` executable.
    pub ffprobe_path: PathBuf,
    /// Ordered fallback chain of encoder attempts.
    pub backends: Vec<EncoderBackend>,
    /// Re-encode the first successful output to H.264/yuv420p.
    pub transcode_h264: bool,
    /// Also write a VP9 WebM next to the MP4.
    pub emit_webm: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            seconds_per_image: 2.0,
            zoom: 1.08,
            crossfade_seconds: 0.35,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            backends: vec![
                EncoderBackend::new("mp4", "mpeg4"),
                EncoderBackend::new("mp4", "libx264"),
                EncoderBackend::new("mp4", "libopenh264"),
                EncoderBackend::new("avi", "mjpeg"),
                EncoderBackend::new("avi", "libxvid"),
            ],
            transcode_h264: true,
            emit_webm: false,
        }
    }
}

/// Carousel contact sheet grid.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Fixed column count.
    pub columns: u32,
    /// Thumbnail width; height follows the canvas aspect.
    pub thumb_width: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            columns: 3,
            thumb_width: 360,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> AutopostResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| AutopostError::serde(format!("parse engine config JSON: {e}")))
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> AutopostResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            AutopostError::serde(format!("open engine config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Defaults overridden by `AUTOPOST_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_string("AUTOPOST_STATIC_ROOT") {
            cfg.static_root = PathBuf::from(v);
        }
        if let Some(v) = env_string("AUTOPOST_URL_PREFIX") {
            cfg.url_prefix = v;
        }
        if let Some(v) = env_string("AUTOPOST_PUBLIC_BASE_URL") {
            cfg.public_base_url = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPOST_DOWNLOAD_TIMEOUT_SECS").filter(|&n| n > 0) {
            cfg.download_timeout_secs = v;
        }
        if let Some(v) = env_string("AUTOPOST_FONT_PATH") {
            cfg.font_path = Some(PathBuf::from(v));
        }
        match env_string("AUTOPOST_TEXT_BACKEND").as_deref() {
            Some("block") => cfg.text_backend = TextBackendKind::Block,
            Some("parley") => cfg.text_backend = TextBackendKind::Parley,
            _ => {}
        }
        if let Some(v) = env_parse::<bool>("AUTOPOST_QR_ENABLED") {
            cfg.qr_enabled = v;
        }
        match env_string("AUTOPOST_BACKGROUND_REMOVAL").as_deref() {
            Some("key_out") => cfg.background_removal = BackgroundRemovalKind::KeyOut,
            Some("off") => cfg.background_removal = BackgroundRemovalKind::Off,
            _ => {}
        }
        if let Some(v) = env_parse::<u64>("AUTOPOST_INITIAL_CREDITS") {
            cfg.initial_credits = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPOST_COST_IMAGE") {
            cfg.costs.image = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPOST_COST_CAROUSEL_PER_FRAME") {
            cfg.costs.carousel_per_frame = v;
        }
        if let Some(v) = env_parse::<u64>("AUTOPOST_COST_VIDEO") {
            cfg.costs.video = v;
        }
        if let Some(v) = env_parse::<u32>("AUTOPOST_VIDEO_FPS").filter(|&n| n > 0) {
            cfg.video.fps = v;
        }
        if let Some(v) = env_string("AUTOPOST_FFMPEG") {
            cfg.video.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = env_string("AUTOPOST_FFPROBE") {
            cfg.video.ffprobe_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<bool>("AUTOPOST_EMIT_WEBM") {
            cfg.video.emit_webm = v;
        }
        if let Some(v) = env_string("AUTOPOST_DEFAULT_CTA") {
            cfg.default_cta = v;
        }
        cfg
    }

    /// Reject configurations that cannot render anything.
    pub fn validate(&self) -> AutopostResult<()> {
        if self.video.fps == 0 {
            return Err(AutopostError::validation("bad_config", "video.fps must be > 0"));
        }
        if !self.video.seconds_per_image.is_finite() || self.video.seconds_per_image <= 0.0 {
            return Err(AutopostError::validation(
                "bad_config",
                "video.seconds_per_image must be finite and > 0",
            ));
        }
        if !self.video.zoom.is_finite() || self.video.zoom < 1.0 {
            return Err(AutopostError::validation(
                "bad_config",
                "video.zoom must be finite and >= 1.0",
            ));
        }
        if !self.video.crossfade_seconds.is_finite() || self.video.crossfade_seconds < 0.0 {
            return Err(AutopostError::validation(
                "bad_config",
                "video.crossfade_seconds must be finite and >= 0",
            ));
        }
        if self.sheet.columns == 0 || self.sheet.thumb_width == 0 {
            return Err(AutopostError::validation(
                "bad_config",
                "sheet columns and thumb_width must be > 0",
            ));
        }
        Ok(())
    }

    /// Directory holding previews, committed posts and sidecars.
    pub fn generated_dir(&self) -> PathBuf {
        self.static_root.join("generated")
    }

    /// Cache directory for downloaded remote sources.
    pub fn download_dir(&self) -> PathBuf {
        self.static_root.join("uploads").join("tmp")
    }

    /// Directory for append-only logs (short-link clicks).
    pub fn logs_dir(&self) -> PathBuf {
        self.static_root.join("logs")
    }

    /// Directory for small JSON stores (short links, credits).
    pub fn data_dir(&self) -> PathBuf {
        self.static_root.join("data")
    }

    /// Public URL for a file in [`EngineConfig::generated_dir`].
    pub fn generated_url(&self, file_name: &str) -> String {
        format!(
            "{}/generated/{}",
            self.url_prefix.trim_end_matches('/'),
            file_name
        )
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse::<T>().ok())
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
