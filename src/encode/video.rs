use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::config::{EncoderBackend, VideoConfig};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegTool};
use crate::encode::sink::{FrameSource, drain_into};
use crate::encode::still::save_jpeg;
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::fs::remove_quietly;

/// Outcome of the encode chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeStatus {
    /// A video was produced (and transcoded when enabled).
    Ok,
    /// No playable mp4 was produced; only the poster exists.
    Error,
    /// A video was produced but the H.264 transcode did not succeed.
    TranscodeSkipped,
}

impl EncodeStatus {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::TranscodeSkipped => "transcode_skipped",
        }
    }
}

/// Files and status produced by [`VideoEncoder::encode`].
#[derive(Clone, Debug)]
pub struct EncodedVideo {
    /// Poster JPEG from the first frame; always written.
    pub poster: PathBuf,
    /// Final video, when any backend succeeded.
    pub video: Option<PathBuf>,
    /// VP9 sibling, when requested and produced.
    pub webm: Option<PathBuf>,
    /// Chain outcome.
    pub status: EncodeStatus,
    /// Backend that produced the video (`container/codec`).
    pub backend: Option<String>,
    /// Background music was muxed in.
    pub bgm_muxed: bool,
    /// Last failure, for diagnostics.
    pub error: Option<String>,
}

/// Turns an ordered frame sequence into a video file via a fallback chain of ffmpeg backends.
#[derive(Clone, Debug)]
pub struct VideoEncoder {
    tool: FfmpegTool,
    backends: Vec<EncoderBackend>,
    fps: u32,
    transcode_h264: bool,
    emit_webm: bool,
}

impl VideoEncoder {
    /// Build from video configuration.
    pub fn from_config(cfg: &VideoConfig) -> Self {
        Self {
            tool: FfmpegTool::new(&cfg.ffmpeg_path, &cfg.ffprobe_path),
            backends: cfg.backends.clone(),
            fps: cfg.fps,
            transcode_h264: cfg.transcode_h264,
            emit_webm: cfg.emit_webm,
        }
    }

    /// Underlying tool handle.
    pub fn tool(&self) -> &FfmpegTool {
        &self.tool
    }

    /// Encode `frames` to `<dir>/<stem>.mp4` with a `<dir>/<stem>.jpg` poster.
    ///
    /// Output from a non-mp4 backend is remuxed into mp4; when that fails no video is published.
    /// Never fails because of the encoder itself: backend failures cascade through the chain and
    /// end as [`EncodeStatus::Error`]. Only a poster write failure is returned as `Err`.
    #[tracing::instrument(skip(self, frames, bgm), fields(frames = frames.frame_count()))]
    pub fn encode(
        &self,
        frames: &dyn FrameSource,
        dir: &Path,
        stem: &str,
        bgm: Option<&Path>,
    ) -> AutopostResult<EncodedVideo> {
        let first = frames
            .frame_at(0)
            .ok_or(AutopostError::InsufficientMedia {
                required: 1,
                got: 0,
            })?;
        let poster = dir.join(format!("{stem}.jpg"));
        save_jpeg(&first, &poster)?;
        drop(first);

        let mut out = EncodedVideo {
            poster,
            video: None,
            webm: None,
            status: EncodeStatus::Error,
            backend: None,
            bgm_muxed: false,
            error: None,
        };

        let (raw, backend) = match self.encode_with_fallback(frames, dir, stem) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "all video backends failed; poster only");
                out.error = Some(e.to_string());
                return Ok(out);
            }
        };
        out.backend = Some(format!("{}/{}", backend.container, backend.codec));
        out.status = EncodeStatus::Ok;

        let mut current = raw;
        if self.transcode_h264 {
            let target = dir.join(format!("{stem}_h264.mp4"));
            match self.transcode(&current, &target) {
                Ok(()) => {
                    remove_quietly(&current);
                    current = target;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "h264 transcode failed; keeping original encode");
                    remove_quietly(&target);
                    out.status = EncodeStatus::TranscodeSkipped;
                    out.error = Some(e.to_string());
                }
            }
        }

        if current.extension().and_then(|e| e.to_str()) != Some("mp4") {
            let target = dir.join(format!("{stem}_remux.mp4"));
            match self.remux_mp4(&current, &target) {
                Ok(()) => {
                    remove_quietly(&current);
                    current = target;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "mp4 remux failed; no video published");
                    remove_quietly(&target);
                    remove_quietly(&current);
                    out.status = EncodeStatus::Error;
                    out.error = Some(format!("remux to mp4: {e}"));
                    return Ok(out);
                }
            }
        }

        if let Some(bgm) = bgm {
            let target = with_suffix(&current, "_bgm");
            match self.mux_bgm(&current, bgm, &target) {
                Ok(()) => {
                    remove_quietly(&current);
                    current = target;
                    out.bgm_muxed = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, bgm = %bgm.display(), "bgm mux failed; silent video kept");
                    remove_quietly(&target);
                }
            }
        }

        let final_path = dir.join(format!("{stem}.mp4"));
        if let Err(e) = std::fs::rename(&current, &final_path) {
            tracing::warn!(error = %e, "rename of encoded video failed");
            out.status = EncodeStatus::Error;
            out.error = Some(format!("rename encoded video: {e}"));
            remove_quietly(&current);
            return Ok(out);
        }
        tracing::info!(video = %final_path.display(), backend = ?out.backend, "video encoded");

        if self.emit_webm {
            let webm = dir.join(format!("{stem}.webm"));
            match self.transcode_webm(&final_path, &webm) {
                Ok(()) => out.webm = Some(webm),
                Err(e) => {
                    tracing::warn!(error = %e, "webm transcode failed");
                    remove_quietly(&webm);
                }
            }
        }
        out.video = Some(final_path);
        Ok(out)
    }

    fn encode_with_fallback(
        &self,
        frames: &dyn FrameSource,
        dir: &Path,
        stem: &str,
    ) -> AutopostResult<(PathBuf, EncoderBackend)> {
        let mut last_err = AutopostError::encode("no video backends configured");
        for backend in &self.backends {
            let tmp = dir.join(format!("{stem}_tmp.{}", backend.container));
            remove_quietly(&tmp);
            let mut sink = FfmpegSink::new(&self.tool, backend.clone(), &tmp);
            match drain_into(frames, self.fps, &mut sink) {
                Ok(_) => {
                    tracing::debug!(container = %backend.container, codec = %backend.codec, "backend ok");
                    return Ok((tmp, backend.clone()));
                }
                Err(e) => {
                    tracing::warn!(
                        container = %backend.container,
                        codec = %backend.codec,
                        error = %e,
                        "video backend failed"
                    );
                    drop(sink);
                    remove_quietly(&tmp);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn transcode(&self, src: &Path, out: &Path) -> AutopostResult<()> {
        let fps = self.fps.to_string();
        self.tool.run(
            [
                OsStr::new("-i"),
                src.as_os_str(),
                OsStr::new("-vf"),
                OsStr::new("format=yuv420p"),
                OsStr::new("-r"),
                OsStr::new(&fps),
                OsStr::new("-c:v"),
                OsStr::new("libx264"),
                OsStr::new("-preset"),
                OsStr::new("veryfast"),
                OsStr::new("-crf"),
                OsStr::new("23"),
                OsStr::new("-movflags"),
                OsStr::new("+faststart"),
                OsStr::new("-an"),
            ],
            out,
        )
    }

    fn remux_mp4(&self, src: &Path, out: &Path) -> AutopostResult<()> {
        self.tool.run(
            [
                OsStr::new("-i"),
                src.as_os_str(),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-movflags"),
                OsStr::new("+faststart"),
                OsStr::new("-f"),
                OsStr::new("mp4"),
            ],
            out,
        )
    }

    fn mux_bgm(&self, video: &Path, bgm: &Path, out: &Path) -> AutopostResult<()> {
        if !self.tool.has_audio_stream(bgm)? {
            return Err(AutopostError::encode(format!(
                "'{}' has no audio stream",
                bgm.display()
            )));
        }
        self.tool.run(
            [
                OsStr::new("-i"),
                video.as_os_str(),
                OsStr::new("-stream_loop"),
                OsStr::new("-1"),
                OsStr::new("-i"),
                bgm.as_os_str(),
                OsStr::new("-map"),
                OsStr::new("0:v:0"),
                OsStr::new("-map"),
                OsStr::new("1:a:0"),
                OsStr::new("-c:v"),
                OsStr::new("copy"),
                OsStr::new("-c:a"),
                OsStr::new("aac"),
                OsStr::new("-shortest"),
            ],
            out,
        )
    }

    fn transcode_webm(&self, src: &Path, out: &Path) -> AutopostResult<()> {
        self.tool.run(
            [
                OsStr::new("-i"),
                src.as_os_str(),
                OsStr::new("-c:v"),
                OsStr::new("libvpx-vp9"),
                OsStr::new("-b:v"),
                OsStr::new("1.6M"),
                OsStr::new("-pix_fmt"),
                OsStr::new("yuv420p"),
                OsStr::new("-an"),
            ],
            out,
        )
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("video");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/video.rs"]
mod tests;
