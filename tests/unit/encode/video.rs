use super::*;
use image::RgbaImage;

fn frames(n: u8) -> Vec<RgbaImage> {
    (0..n)
        .map(|i| RgbaImage::from_pixel(64, 48, image::Rgba([i * 20, 80, 160, 255])))
        .collect()
}

fn config(ffmpeg: &str) -> VideoConfig {
    VideoConfig {
        ffmpeg_path: ffmpeg.into(),
        ffprobe_path: "ffprobe".into(),
        fps: 10,
        ..VideoConfig::default()
    }
}

#[test]
fn missing_encoder_degrades_to_poster() {
    let dir = tempfile::tempdir().unwrap();
    let enc = VideoEncoder::from_config(&config("/nonexistent/ffmpeg-autopost"));
    let out = enc.encode(&frames(3), dir.path(), "prev_1", None).unwrap();
    assert_eq!(out.status, EncodeStatus::Error);
    assert!(out.video.is_none());
    assert!(out.error.is_some());
    assert!(out.poster.exists());
    assert_eq!(out.poster, dir.path().join("prev_1.jpg"));
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains("_tmp"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn empty_backend_list_is_an_encode_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config("ffmpeg");
    cfg.backends.clear();
    let out = VideoEncoder::from_config(&cfg)
        .encode(&frames(2), dir.path(), "prev_2", None)
        .unwrap();
    assert_eq!(out.status, EncodeStatus::Error);
    assert!(out.poster.exists());
}

#[test]
fn encodes_with_system_ffmpeg_when_present() {
    let enc = VideoEncoder::from_config(&config("ffmpeg"));
    if !enc.tool().is_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = enc.encode(&frames(4), dir.path(), "prev_3", None).unwrap();
    assert_ne!(out.status, EncodeStatus::Error, "{:?}", out.error);
    let video = out.video.unwrap();
    assert!(std::fs::metadata(&video).unwrap().len() > 0);
    assert_eq!(video.file_stem().unwrap(), "prev_3");
}

#[test]
fn unusable_bgm_keeps_silent_video() {
    let enc = VideoEncoder::from_config(&config("ffmpeg"));
    if !enc.tool().is_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let bgm = dir.path().join("not_audio.mp3");
    std::fs::write(&bgm, b"definitely not audio").unwrap();
    let out = enc
        .encode(&frames(3), dir.path(), "prev_4", Some(&bgm))
        .unwrap();
    assert!(!out.bgm_muxed);
    assert!(out.video.is_some_and(|v| v.exists()));
}

/// Shell stand-in for ffmpeg: drains piped frames, exits 1 when any `fail_on` word is among its
/// arguments, otherwise writes a few bytes to the output path (always the last argument).
#[cfg(unix)]
fn stub_ffmpeg(dir: &Path, fail_on: &[&str]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("ffmpeg-stub");
    let script = format!(
        r#"#!/bin/sh
[ "$1" = "-version" ] && exit 0
for arg; do out="$arg"; done
case " $* " in *" pipe:0 "*) cat > /dev/null ;; esac
for bad in {}; do
  case " $* " in *" $bad "*) exit 1 ;; esac
done
printf 'stub' > "$out"
"#,
        fail_on.join(" ")
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    // A fork in a parallel test may still hold the write handle (ETXTBSY) for a moment.
    for _ in 0..50 {
        if std::process::Command::new(&path).arg("-version").status().is_ok() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    path
}

#[cfg(unix)]
fn avi_only_encoder(ffmpeg: &Path) -> VideoEncoder {
    let mut cfg = config("unused");
    cfg.ffmpeg_path = ffmpeg.to_path_buf();
    cfg.backends = vec![
        EncoderBackend {
            container: "mp4".into(),
            codec: "mpeg4".into(),
        },
        EncoderBackend {
            container: "avi".into(),
            codec: "mjpeg".into(),
        },
    ];
    VideoEncoder::from_config(&cfg)
}

#[cfg(unix)]
fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(unix)]
#[test]
fn avi_fallback_is_remuxed_to_mp4() {
    let bin = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let enc = avi_only_encoder(&stub_ffmpeg(bin.path(), &["mpeg4", "libx264"]));

    let out = enc.encode(&frames(3), dir.path(), "prev_5", None).unwrap();
    assert_eq!(out.backend.as_deref(), Some("avi/mjpeg"));
    assert_eq!(out.status, EncodeStatus::TranscodeSkipped);
    assert_eq!(out.video.as_deref(), Some(dir.path().join("prev_5.mp4").as_path()));
    assert_eq!(names_in(dir.path()), ["prev_5.jpg", "prev_5.mp4"]);
}

#[cfg(unix)]
#[test]
fn failed_remux_never_publishes_an_avi() {
    let bin = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let enc = avi_only_encoder(&stub_ffmpeg(bin.path(), &["mpeg4", "libx264", "copy"]));

    let out = enc.encode(&frames(3), dir.path(), "prev_6", None).unwrap();
    assert_eq!(out.status, EncodeStatus::Error);
    assert!(out.video.is_none());
    assert!(out.error.as_deref().is_some_and(|e| e.contains("remux")));
    assert_eq!(names_in(dir.path()), ["prev_6.jpg"]);
}

#[test]
fn status_wire_names() {
    assert_eq!(EncodeStatus::Ok.as_str(), "ok");
    assert_eq!(
        serde_json::to_value(EncodeStatus::TranscodeSkipped).unwrap(),
        "transcode_skipped"
    );
}
