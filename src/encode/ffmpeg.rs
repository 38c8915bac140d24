use std::ffi::OsStr;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use image::RgbaImage;

use crate::config::EncoderBackend;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::fs::ensure_parent_dir;
use crate::foundation::math::mul_div255_u16;

/// Handle on the system `ffmpeg`/`ffprobe` binaries.
#[derive(Clone, Debug)]
pub struct FfmpegTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegTool {
    /// Use the given binaries (bare names are looked up on `PATH`).
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// `ffmpeg` binary path.
    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }

    /// Return `true` when `ffmpeg -version` runs.
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run `ffmpeg -y -v error <args>` and require a non-empty `out`.
    pub fn run<I, S>(&self, args: I, out: &Path) -> AutopostResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error"])
            .args(args)
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                AutopostError::encode(format!(
                    "failed to spawn '{}': {e}",
                    self.ffmpeg.display()
                ))
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AutopostError::encode(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        require_non_empty(out)
    }

    /// Return `true` when `path` holds at least one audio stream.
    pub fn has_audio_stream(&self, path: &Path) -> AutopostResult<bool> {
        let out = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                AutopostError::encode(format!(
                    "failed to spawn '{}': {e}",
                    self.ffprobe.display()
                ))
            })?;
        if !out.status.success() {
            return Err(AutopostError::encode(format!(
                "ffprobe failed for '{}'",
                path.display()
            )));
        }

        #[derive(serde::Deserialize)]
        struct ProbeOut {
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }
        #[derive(serde::Deserialize)]
        struct ProbeStream {
            codec_type: Option<String>,
        }

        let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
            .map_err(|e| AutopostError::serde(format!("ffprobe json: {e}")))?;
        Ok(parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio")))
    }
}

/// Sink that streams raw RGBA frames into one `ffmpeg` backend (container + codec).
pub struct FfmpegSink {
    ffmpeg: PathBuf,
    backend: EncoderBackend,
    out_path: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
}

impl FfmpegSink {
    /// Create a sink that writes `out_path` with `backend`.
    pub fn new(tool: &FfmpegTool, backend: EncoderBackend, out_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: tool.ffmpeg.clone(),
            backend,
            out_path: out_path.into(),
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> AutopostResult<()> {
        if cfg.fps == 0 {
            return Err(AutopostError::validation("bad_config", "fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(AutopostError::encode("frame width/height must be non-zero"));
        }
        ensure_parent_dir(&self.out_path)?;

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-c:v",
            &self.backend.codec,
        ]);
        if self.backend.codec == "mjpeg" {
            cmd.args(["-q:v", "3"]);
        } else {
            cmd.args(["-pix_fmt", "yuv420p"]);
        }
        cmd.args(["-f", &self.backend.container]).arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            AutopostError::encode(format!(
                "failed to spawn '{}': {e}",
                self.ffmpeg.display()
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AutopostError::encode("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AutopostError::encode("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        self.scratch = vec![0u8; cfg.width as usize * cfg.height as usize * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &RgbaImage) -> AutopostResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| AutopostError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(AutopostError::encode("out-of-order frame index"));
        }
        self.last_idx = Some(idx);
        if frame.dimensions() != (cfg.width, cfg.height) {
            return Err(AutopostError::encode(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }

        flatten_over_black(&mut self.scratch, frame.as_raw());
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(AutopostError::encode("ffmpeg sink is already finalized"));
        };
        stdin
            .write_all(&self.scratch)
            .map_err(|e| AutopostError::encode(format!("write frame to ffmpeg: {e}")))
    }

    fn end(&mut self) -> AutopostResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| AutopostError::encode("ffmpeg sink not started"))?;
        let status = child
            .wait()
            .map_err(|e| AutopostError::encode(format!("wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| AutopostError::encode("ffmpeg stderr drain thread panicked"))?
                .unwrap_or_default(),
            None => Vec::new(),
        };
        self.cfg = None;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(AutopostError::encode(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }
        require_non_empty(&self.out_path)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn flatten_over_black(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        d[0] = mul_div255_u16(u16::from(s[0]), a) as u8;
        d[1] = mul_div255_u16(u16::from(s[1]), a) as u8;
        d[2] = mul_div255_u16(u16::from(s[2]), a) as u8;
        d[3] = 255;
    }
}

fn require_non_empty(path: &Path) -> AutopostResult<()> {
    match std::fs::metadata(path) {
        Ok(m) if m.len() > 0 => Ok(()),
        Ok(_) => Err(AutopostError::encode(format!(
            "'{}' is empty after encode",
            path.display()
        ))),
        Err(e) => Err(AutopostError::encode(format!(
            "'{}' missing after encode: {e}",
            path.display()
        ))),
    }
}
